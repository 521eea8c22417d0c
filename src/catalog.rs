use anyhow::{Result, bail};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::constants::constants;
use crate::youtube::thumbnail_for_url;

/// Treat an explicit `null` the same as a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
  D: Deserializer<'de>,
  T: Default + Deserialize<'de>,
{
  Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// A catalog entry as persisted by the store.
///
/// `category` is the legacy single label and `tags` the multi-label list. They
/// are written together by the form but stored independently, so readers must
/// consult both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoRecord {
  pub id: String,
  #[serde(default, deserialize_with = "null_as_default")]
  pub title: String,
  #[serde(default, deserialize_with = "null_as_default")]
  pub description: String,
  #[serde(default, deserialize_with = "null_as_default")]
  pub video_url: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub thumbnail: Option<String>,
  #[serde(default, deserialize_with = "null_as_default")]
  pub category: String,
  #[serde(default, deserialize_with = "null_as_default")]
  pub tags: Vec<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub duration: Option<String>,
  #[serde(default, deserialize_with = "null_as_default")]
  pub created_at: DateTime<Utc>,
  #[serde(default, deserialize_with = "null_as_default")]
  pub updated_at: DateTime<Utc>,
}

impl VideoRecord {
  /// Stored thumbnail, or one derived from the video URL.
  pub fn thumbnail_url(&self) -> Option<String> {
    self.thumbnail.clone().filter(|t| !t.trim().is_empty()).or_else(|| thumbnail_for_url(&self.video_url))
  }

  /// Overwrite the editable fields, leaving id and timestamps alone.
  pub fn apply(&mut self, fields: VideoFields) {
    self.title = fields.title;
    self.description = fields.description;
    self.video_url = fields.video_url;
    self.thumbnail = fields.thumbnail;
    self.category = fields.category;
    self.tags = fields.tags;
    self.duration = fields.duration;
  }
}

/// Editable subset of a record, used for create and update.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VideoFields {
  pub title: String,
  pub description: String,
  pub video_url: String,
  pub thumbnail: Option<String>,
  pub category: String,
  pub tags: Vec<String>,
  pub duration: Option<String>,
}

impl VideoFields {
  /// Reject submissions missing a required field.
  pub fn validate(&self) -> Result<()> {
    if self.title.trim().is_empty() {
      bail!("Title is required.");
    }
    if self.video_url.trim().is_empty() {
      bail!("Video URL is required.");
    }
    Ok(())
  }
}

impl From<&VideoRecord> for VideoFields {
  fn from(record: &VideoRecord) -> Self {
    Self {
      title: record.title.clone(),
      description: record.description.clone(),
      video_url: record.video_url.clone(),
      thumbnail: record.thumbnail.clone(),
      category: record.category.clone(),
      tags: record.tags.clone(),
      duration: record.duration.clone(),
    }
  }
}

// --- Filtering ---

/// A record belongs to a category if either its primary label or any tag matches.
pub fn matches_category(record: &VideoRecord, category: &str) -> bool {
  if category == constants().all_category {
    return true;
  }
  record.category == category || record.tags.iter().any(|t| t == category)
}

/// Case-insensitive substring match over title, description and tags.
/// `needle` must already be trimmed and lower-cased; empty matches everything.
fn matches_search(record: &VideoRecord, needle: &str) -> bool {
  if needle.is_empty() {
    return true;
  }
  record.title.to_lowercase().contains(needle)
    || record.description.to_lowercase().contains(needle)
    || record.tags.iter().any(|t| t.to_lowercase().contains(needle))
}

/// Positions of the records that pass both the category and the search filter,
/// in input order.
pub fn filter_indices(records: &[VideoRecord], category: &str, search: &str) -> Vec<usize> {
  let needle = search.trim().to_lowercase();
  records
    .iter()
    .enumerate()
    .filter(|(_, r)| matches_category(r, category) && matches_search(r, &needle))
    .map(|(i, _)| i)
    .collect()
}

/// The visible subset of `records` for a category and search term. Stable.
pub fn filter_videos<'a>(records: &'a [VideoRecord], category: &str, search: &str) -> Vec<&'a VideoRecord> {
  filter_indices(records, category, search).into_iter().map(|i| &records[i]).collect()
}
