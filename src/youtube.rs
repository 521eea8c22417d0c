use anyhow::{Context, Result, anyhow};
use futures::stream::{self, StreamExt};
use regex::Regex;
use reqwest::{Client, Url};
use serde::Deserialize;
use std::collections::HashMap;
use std::process::Stdio;
use std::sync::LazyLock;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::catalog::VideoRecord;
use crate::config::Config;
use crate::constants::constants;
use crate::duration::iso_from_seconds;

// Watch-page, short-link, embed and shorts URLs. Hardcoded, so a failure is a source bug.
static VIDEO_ID: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"(?:youtube\.com/(?:watch\?(?:[^#\s]*&)?v=|embed/|shorts/|v/)|youtu\.be/)([A-Za-z0-9_-]{11})(?:[^A-Za-z0-9_-]|$)")
    .expect("hardcoded video id regex is invalid")
});

/// Pull the 11-character video id out of a pasted YouTube link.
pub fn extract_video_id(url: &str) -> Option<String> {
  VIDEO_ID.captures(url.trim()).and_then(|caps| caps.get(1)).map(|m| m.as_str().to_string())
}

/// Default thumbnail for a video URL, used when a record has none stored.
pub fn thumbnail_for_url(url: &str) -> Option<String> {
  extract_video_id(url).map(|id| constants().thumbnail_template.replace("{id}", &id))
}

/// The subset of platform metadata the admin form can pre-fill.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VideoMetadata {
  pub title: String,
  pub description: String,
  pub thumbnail_url: Option<String>,
  /// `PT#H#M#S` encoding.
  pub duration: Option<String>,
}

// --- Data API response ---

#[derive(Debug, Deserialize)]
struct ApiVideoList {
  #[serde(default)]
  items: Vec<ApiVideo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiVideo {
  snippet: ApiSnippet,
  content_details: Option<ApiContentDetails>,
}

#[derive(Debug, Deserialize)]
struct ApiSnippet {
  #[serde(default)]
  title: String,
  #[serde(default)]
  description: String,
  #[serde(default)]
  thumbnails: HashMap<String, ApiThumbnail>,
}

#[derive(Debug, Deserialize)]
struct ApiThumbnail {
  url: String,
}

#[derive(Debug, Deserialize)]
struct ApiContentDetails {
  duration: Option<String>,
}

/// Thumbnail sizes the Data API may return, largest first.
const THUMBNAIL_PREFERENCE: [&str; 5] = ["maxres", "standard", "high", "medium", "default"];

/// Metadata from a `videos?part=snippet,contentDetails` response. An empty
/// item list means the id is unknown to the platform.
fn first_video(list: ApiVideoList) -> Option<VideoMetadata> {
  let video = list.items.into_iter().next()?;
  let thumbnail_url =
    THUMBNAIL_PREFERENCE.iter().find_map(|size| video.snippet.thumbnails.get(*size)).map(|t| t.url.clone());
  Some(VideoMetadata {
    title: video.snippet.title,
    description: video.snippet.description,
    thumbnail_url,
    duration: video.content_details.and_then(|d| d.duration),
  })
}

// --- yt-dlp output ---

/// The yt-dlp print templates for metadata lookups. Title and description are
/// JSON-encoded so multi-line text stays on one line.
const PRINT_TEMPLATES: [&str; 4] = ["%(title)j", "%(duration)s", "%(thumbnail)s", "%(description)j"];

fn parse_ytdlp_output(stdout: &str) -> Option<VideoMetadata> {
  let opt = |s: Option<&str>| -> Option<String> {
    s.map(str::trim).filter(|s| !s.is_empty() && *s != "NA").map(|s| s.to_string())
  };
  let decode = |s: Option<String>| -> Option<String> { s.and_then(|raw| serde_json::from_str::<String>(&raw).ok()) };

  let mut lines = stdout.lines();
  let title = decode(opt(lines.next())).filter(|t| !t.is_empty())?;
  let duration = opt(lines.next()).and_then(|s| s.parse::<f64>().ok()).map(|secs| iso_from_seconds(secs.round() as u64));
  let thumbnail_url = opt(lines.next());
  let description = decode(opt(lines.next())).unwrap_or_default();
  Some(VideoMetadata { title, description, thumbnail_url, duration })
}

// --- Provider ---

/// Where video metadata comes from: the Data API when a key is configured,
/// otherwise a local `yt-dlp`.
#[derive(Debug, Clone)]
pub enum MetadataSource {
  DataApi { client: Client, api_key: String },
  YtDlp,
}

impl MetadataSource {
  /// `YOUTUBE_API_KEY` wins over the key saved in preferences.
  pub fn from_config(config: &Config) -> Self {
    let api_key = std::env::var("YOUTUBE_API_KEY").ok().or_else(|| config.youtube_api_key.clone());
    match api_key.filter(|k| !k.trim().is_empty()) {
      Some(api_key) => MetadataSource::DataApi { client: Client::new(), api_key },
      None => MetadataSource::YtDlp,
    }
  }

  pub fn label(&self) -> &'static str {
    match self {
      MetadataSource::DataApi { .. } => "data-api",
      MetadataSource::YtDlp => "yt-dlp",
    }
  }

  /// Look up a video by id. Misses and faults are logged and come back as
  /// `None`; the caller falls back to manual entry.
  pub async fn fetch_by_id(&self, video_id: &str) -> Option<VideoMetadata> {
    match self.try_fetch(video_id).await {
      Ok(Some(meta)) => {
        debug!(video_id, source = self.label(), "metadata: fetched");
        Some(meta)
      }
      Ok(None) => {
        info!(video_id, source = self.label(), "metadata: no such video");
        None
      }
      Err(e) => {
        warn!(video_id, source = self.label(), err = %format!("{:#}", e), "metadata: lookup failed");
        None
      }
    }
  }

  /// Resolve a pasted URL first, then fetch.
  pub async fn fetch_for_url(&self, url: &str) -> Option<VideoMetadata> {
    let Some(video_id) = extract_video_id(url) else {
      debug!(url, "metadata: not a recognised YouTube URL");
      return None;
    };
    self.fetch_by_id(&video_id).await
  }

  async fn try_fetch(&self, video_id: &str) -> Result<Option<VideoMetadata>> {
    match self {
      MetadataSource::DataApi { client, api_key } => {
        let url = Url::parse_with_params(
          &format!("{}/videos", constants().youtube_api_base),
          &[("part", "snippet,contentDetails"), ("id", video_id), ("key", api_key.as_str())],
        )
        .context("Invalid Data API URL")?;
        let response = client
          .get(url)
          .send()
          .await
          .context("Data API request failed")?;
        if !response.status().is_success() {
          return Err(anyhow!("Data API returned {}", response.status()));
        }
        let list = response.json::<ApiVideoList>().await.context("Unexpected Data API response shape")?;
        Ok(first_video(list))
      }
      MetadataSource::YtDlp => {
        let url = format!("https://youtube.com/watch?v={}", video_id);
        let mut cmd = Command::new("yt-dlp");
        for template in PRINT_TEMPLATES {
          cmd.args(["--print", template]);
        }
        let output = cmd
          .args(["--skip-download", "--no-warnings", "--", &url])
          .stdin(Stdio::null())
          .stdout(Stdio::piped())
          .stderr(Stdio::piped())
          .output()
          .await
          .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
              anyhow!("yt-dlp not found. Install it with: brew install yt-dlp (macOS) or pip install yt-dlp")
            } else {
              anyhow!(e).context("Failed to execute yt-dlp to get video info")
            }
          })?;
        if !output.status.success() {
          debug!(stderr = %String::from_utf8_lossy(&output.stderr).trim(), "metadata: yt-dlp failed");
          return Ok(None);
        }
        let stdout = String::from_utf8(output.stdout).context("yt-dlp output non-UTF8")?;
        Ok(parse_ytdlp_output(&stdout))
      }
    }
  }
}

// --- Backfill ---

/// Records worth a metadata lookup: no stored duration or thumbnail, and a
/// URL we can resolve.
pub fn needs_backfill(record: &VideoRecord) -> bool {
  (record.duration.is_none() || record.thumbnail.is_none()) && extract_video_id(&record.video_url).is_some()
}

/// Fetch metadata for every record that needs it, up to `backfill_concurrency`
/// lookups at a time. Returns `(record id, metadata)` for the hits only.
pub async fn backfill(source: &MetadataSource, records: &[VideoRecord]) -> Vec<(String, VideoMetadata)> {
  stream::iter(records.iter().filter(|r| needs_backfill(r)))
    .map(|record| async move { source.fetch_for_url(&record.video_url).await.map(|meta| (record.id.clone(), meta)) })
    .buffer_unordered(constants().backfill_concurrency.max(1))
    .filter_map(|hit| async move { hit })
    .collect()
    .await
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::catalog::tests::record;

  #[test]
  fn extracts_id_from_known_url_shapes() {
    let id = Some("dQw4w9WgXcQ".to_string());
    assert_eq!(extract_video_id("https://www.youtube.com/watch?v=dQw4w9WgXcQ"), id);
    assert_eq!(extract_video_id("https://youtube.com/watch?feature=share&v=dQw4w9WgXcQ&t=42"), id);
    assert_eq!(extract_video_id("https://m.youtube.com/watch?v=dQw4w9WgXcQ"), id);
    assert_eq!(extract_video_id("https://youtu.be/dQw4w9WgXcQ?si=abc"), id);
    assert_eq!(extract_video_id("https://www.youtube.com/embed/dQw4w9WgXcQ"), id);
    assert_eq!(extract_video_id("https://youtube.com/shorts/dQw4w9WgXcQ"), id);
    assert_eq!(extract_video_id("  youtu.be/dQw4w9WgXcQ  "), id);
  }

  #[test]
  fn rejects_unrecognised_links() {
    assert_eq!(extract_video_id(""), None);
    assert_eq!(extract_video_id("https://vimeo.com/123456789"), None);
    assert_eq!(extract_video_id("https://youtu.be/short"), None);
    assert_eq!(extract_video_id("https://youtu.be/dQw4w9WgXcQextra"), None);
    assert_eq!(extract_video_id("https://www.youtube.com/@channel/videos"), None);
  }

  #[test]
  fn thumbnail_uses_template() {
    assert_eq!(
      thumbnail_for_url("https://youtu.be/dQw4w9WgXcQ").as_deref(),
      Some("https://img.youtube.com/vi/dQw4w9WgXcQ/hqdefault.jpg")
    );
    assert_eq!(thumbnail_for_url("not a link"), None);
  }

  fn parse_api(body: &str) -> serde_json::Result<Option<VideoMetadata>> {
    serde_json::from_str::<ApiVideoList>(body).map(first_video)
  }

  #[test]
  fn parses_data_api_response() {
    let body = r#"{
      "items": [{
        "snippet": {
          "title": "Porch Sessions Ep. 3",
          "description": "Talking shop",
          "thumbnails": {
            "default": {"url": "https://i.ytimg.com/vi/x/default.jpg"},
            "high": {"url": "https://i.ytimg.com/vi/x/hqdefault.jpg"}
          }
        },
        "contentDetails": {"duration": "PT1H2M3S"}
      }]
    }"#;
    let meta = parse_api(body).unwrap().unwrap();
    assert_eq!(meta.title, "Porch Sessions Ep. 3");
    assert_eq!(meta.description, "Talking shop");
    assert_eq!(meta.thumbnail_url.as_deref(), Some("https://i.ytimg.com/vi/x/hqdefault.jpg"));
    assert_eq!(meta.duration.as_deref(), Some("PT1H2M3S"));
  }

  #[test]
  fn empty_api_items_is_a_miss() {
    assert_eq!(parse_api(r#"{"items": []}"#).unwrap(), None);
    assert_eq!(parse_api(r#"{"kind": "youtube#videoListResponse"}"#).unwrap(), None);
    assert!(parse_api("<html>").is_err());
  }

  #[test]
  fn parses_ytdlp_output() {
    let stdout = "\"Cypher \\\"Live\\\"\"\n253.0\nhttps://i.ytimg.com/vi/x/maxresdefault.jpg\n\"line one\\nline two\"\n";
    let meta = parse_ytdlp_output(stdout).unwrap();
    assert_eq!(meta.title, "Cypher \"Live\"");
    assert_eq!(meta.duration.as_deref(), Some("PT4M13S"));
    assert_eq!(meta.thumbnail_url.as_deref(), Some("https://i.ytimg.com/vi/x/maxresdefault.jpg"));
    assert_eq!(meta.description, "line one\nline two");
  }

  #[test]
  fn ytdlp_placeholders_become_none() {
    let meta = parse_ytdlp_output("\"Live stream\"\nNA\nNA\nNA\n").unwrap();
    assert_eq!(meta.duration, None);
    assert_eq!(meta.thumbnail_url, None);
    assert_eq!(meta.description, "");
    assert_eq!(parse_ytdlp_output(""), None);
  }

  #[test]
  fn backfill_skips_complete_and_unresolvable_records() {
    let mut complete = record("dQw4w9WgXcQ", "t", "Music", &["Music"]);
    complete.duration = Some("PT3M".to_string());
    complete.thumbnail = Some("https://cdn.example/t.jpg".to_string());
    let mut foreign = record("x", "t", "Music", &["Music"]);
    foreign.video_url = "https://vimeo.com/1".to_string();
    let missing = record("dQw4w9WgXcQ", "t", "Music", &["Music"]);

    assert!(!needs_backfill(&complete));
    assert!(!needs_backfill(&foreign));
    assert!(needs_backfill(&missing));
  }
}
