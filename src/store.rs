//! Local document store for catalog entries.
//!
//! All records live in a single JSON array on disk. Every mutation rewrites the
//! file through a temp file + rename so a crash never leaves a half-written
//! document behind.

use anyhow::{Context, Result, anyhow};
use chrono::Utc;
use directories::ProjectDirs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use uuid::Uuid;

use crate::catalog::{VideoFields, VideoRecord};
use crate::session::Session;

#[derive(Debug, Clone)]
pub struct VideoStore {
  path: PathBuf,
  session: Session,
}

/// Platform data directory for the store, session and logs.
pub fn data_dir() -> Option<PathBuf> {
  ProjectDirs::from("", "", "porch").map(|dirs| dirs.data_dir().to_path_buf())
}

impl VideoStore {
  pub fn open(path: impl Into<PathBuf>, session: Session) -> Self {
    Self { path: path.into(), session }
  }

  pub fn default_path() -> Option<PathBuf> {
    data_dir().map(|dir| dir.join("videos.json"))
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  /// All records, newest first. A store that was never written is empty.
  pub async fn list(&self) -> Result<Vec<VideoRecord>> {
    let mut videos = self.read_all().await?;
    videos.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    info!(count = videos.len(), "store: loaded");
    Ok(videos)
  }

  pub async fn create(&self, fields: VideoFields) -> Result<VideoRecord> {
    let mut videos = self.read_all().await?;
    let now = Utc::now();
    let mut record = VideoRecord {
      id: Uuid::new_v4().simple().to_string(),
      title: String::new(),
      description: String::new(),
      video_url: String::new(),
      thumbnail: None,
      category: String::new(),
      tags: Vec::new(),
      duration: None,
      created_at: now,
      updated_at: now,
    };
    record.apply(fields);
    videos.push(record.clone());
    self.write_all(&videos).await?;
    info!(uid = %self.session.uid, id = %record.id, "store: created");
    Ok(record)
  }

  pub async fn update(&self, id: &str, fields: VideoFields) -> Result<()> {
    let mut videos = self.read_all().await?;
    let record = videos.iter_mut().find(|v| v.id == id).ok_or_else(|| anyhow!("video not found: {}", id))?;
    record.apply(fields);
    record.updated_at = Utc::now();
    self.write_all(&videos).await?;
    info!(uid = %self.session.uid, id, "store: updated");
    Ok(())
  }

  pub async fn delete(&self, id: &str) -> Result<()> {
    let mut videos = self.read_all().await?;
    let before = videos.len();
    videos.retain(|v| v.id != id);
    if videos.len() == before {
      return Err(anyhow!("video not found: {}", id));
    }
    self.write_all(&videos).await?;
    info!(uid = %self.session.uid, id, "store: deleted");
    Ok(())
  }

  async fn read_all(&self) -> Result<Vec<VideoRecord>> {
    let content = match tokio::fs::read_to_string(&self.path).await {
      Ok(content) => content,
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
        debug!(path = %self.path.display(), "store: no document yet");
        return Ok(Vec::new());
      }
      Err(e) => return Err(e).with_context(|| format!("Failed to read store {}", self.path.display())),
    };
    if content.trim().is_empty() {
      return Ok(Vec::new());
    }
    serde_json::from_str(&content).with_context(|| format!("Store {} is not a valid video list", self.path.display()))
  }

  async fn write_all(&self, videos: &[VideoRecord]) -> Result<()> {
    if let Some(dir) = self.path.parent() {
      tokio::fs::create_dir_all(dir).await.with_context(|| format!("Failed to create {}", dir.display()))?;
    }
    let content = serde_json::to_string_pretty(videos).context("Failed to encode video list")?;
    let tmp = self.path.with_extension("json.tmp");
    tokio::fs::write(&tmp, content).await.with_context(|| format!("Failed to write {}", tmp.display()))?;
    tokio::fs::rename(&tmp, &self.path).await.with_context(|| format!("Failed to replace {}", self.path.display()))?;
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn fields(title: &str, tags: &[&str]) -> VideoFields {
    VideoFields {
      title: title.to_string(),
      video_url: "https://youtu.be/dQw4w9WgXcQ".to_string(),
      category: tags.first().map(|t| t.to_string()).unwrap_or_default(),
      tags: tags.iter().map(|t| t.to_string()).collect(),
      ..Default::default()
    }
  }

  fn store_in(dir: &tempfile::TempDir) -> VideoStore {
    VideoStore::open(dir.path().join("videos.json"), Session::anonymous())
  }

  #[tokio::test]
  async fn missing_document_lists_empty() {
    let dir = tempfile::tempdir().unwrap();
    assert!(store_in(&dir).list().await.unwrap().is_empty());
  }

  #[tokio::test]
  async fn create_assigns_id_and_lists_newest_first() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);
    let first = store.create(fields("First", &["Music"])).await.unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    let second = store.create(fields("Second", &["Freestyle"])).await.unwrap();
    assert!(!first.id.is_empty());
    assert_ne!(first.id, second.id);

    let listed = store.list().await.unwrap();
    let titles: Vec<&str> = listed.iter().map(|v| v.title.as_str()).collect();
    assert_eq!(titles, ["Second", "First"]);
  }

  #[tokio::test]
  async fn update_keeps_id_and_created_at() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);
    let created = store.create(fields("Draft", &["All"])).await.unwrap();
    store.update(&created.id, fields("Final", &["Interviews", "All"])).await.unwrap();

    let listed = store.list().await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, created.id);
    assert_eq!(listed[0].title, "Final");
    assert_eq!(listed[0].category, "Interviews");
    assert_eq!(listed[0].created_at, created.created_at);
    assert!(listed[0].updated_at >= created.updated_at);
  }

  #[tokio::test]
  async fn delete_removes_record() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);
    let keep = store.create(fields("Keep", &["Music"])).await.unwrap();
    let drop = store.create(fields("Drop", &["Music"])).await.unwrap();
    store.delete(&drop.id).await.unwrap();
    let listed = store.list().await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, keep.id);
  }

  #[tokio::test]
  async fn unknown_id_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);
    assert!(store.update("nope", fields("x", &[])).await.is_err());
    assert!(store.delete("nope").await.is_err());
  }

  #[tokio::test]
  async fn corrupt_document_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);
    std::fs::write(store.path(), "{ not a list").unwrap();
    assert!(store.list().await.is_err());
  }

  #[tokio::test]
  async fn reads_documents_written_by_other_clients() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);
    let json = r#"[{"id":"legacy","title":"Old upload","videoUrl":"https://youtu.be/abcdefghijk","category":"Music"}]"#;
    std::fs::write(store.path(), json).unwrap();
    let listed = store.list().await.unwrap();
    assert_eq!(listed[0].category, "Music");
    assert!(listed[0].tags.is_empty());
  }
}
