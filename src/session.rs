use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, warn};
use uuid::Uuid;

/// An anonymous signed-in identity. Store calls require one to exist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
  pub uid: String,
  pub signed_in_at: DateTime<Utc>,
}

impl Session {
  pub fn anonymous() -> Self {
    Self { uid: format!("anon-{}", Uuid::new_v4().simple()), signed_in_at: Utc::now() }
  }

  /// Reuse the identity saved at `path`, or sign in anonymously and save it.
  /// A corrupt session file is replaced rather than treated as fatal.
  pub async fn restore_or_create(path: &Path) -> Result<Self> {
    match tokio::fs::read_to_string(path).await {
      Ok(content) => match serde_json::from_str::<Session>(&content) {
        Ok(session) => {
          info!(uid = %session.uid, "session: restored");
          return Ok(session);
        }
        Err(e) => warn!(err = %e, path = %path.display(), "session: unreadable, signing in again"),
      },
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
      Err(e) => return Err(e).with_context(|| format!("Failed to read session file {}", path.display())),
    }

    let session = Self::anonymous();
    if let Some(dir) = path.parent() {
      tokio::fs::create_dir_all(dir).await.with_context(|| format!("Failed to create {}", dir.display()))?;
    }
    let content = serde_json::to_string_pretty(&session).context("Failed to encode session")?;
    tokio::fs::write(path, content).await.with_context(|| format!("Failed to write session file {}", path.display()))?;
    info!(uid = %session.uid, "session: signed in anonymously");
    Ok(session)
  }
}
