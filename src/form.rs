use anyhow::Result;

use crate::catalog::{VideoFields, VideoRecord};
use crate::category::detect;
use crate::constants::constants;
use crate::youtube::VideoMetadata;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
  Url,
  Title,
  Description,
  Thumbnail,
  Duration,
  Tags,
}

impl FormField {
  pub const ALL: [FormField; 6] =
    [FormField::Url, FormField::Title, FormField::Description, FormField::Thumbnail, FormField::Duration, FormField::Tags];

  pub fn label(self) -> &'static str {
    match self {
      FormField::Url => "Video URL",
      FormField::Title => "Title",
      FormField::Description => "Description",
      FormField::Thumbnail => "Thumbnail",
      FormField::Duration => "Duration",
      FormField::Tags => "Categories",
    }
  }
}

/// Admin add/edit form state.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoForm {
  /// Id of the record being edited; `None` when adding.
  pub editing: Option<String>,
  pub url: String,
  pub title: String,
  pub description: String,
  pub thumbnail: String,
  pub duration: String,
  /// Selected categories in selection order. The first one becomes `category`.
  pub tags: Vec<String>,
  pub focus: FormField,
  /// Char index within the focused text field.
  pub cursor: usize,
  /// Highlighted entry in the category picker.
  pub tag_cursor: usize,
  /// URL the last metadata lookup was issued for.
  pub fetched_url: Option<String>,
}

impl VideoForm {
  pub fn new() -> Self {
    Self {
      editing: None,
      url: String::new(),
      title: String::new(),
      description: String::new(),
      thumbnail: String::new(),
      duration: String::new(),
      tags: vec![constants().all_category.clone()],
      focus: FormField::Url,
      cursor: 0,
      tag_cursor: 0,
      fetched_url: None,
    }
  }

  pub fn edit(record: &VideoRecord) -> Self {
    let mut tags = record.tags.clone();
    // Legacy records may only carry the primary label.
    if tags.is_empty() && !record.category.trim().is_empty() {
      tags.push(record.category.clone());
    }
    if tags.is_empty() {
      tags.push(constants().all_category.clone());
    }
    Self {
      editing: Some(record.id.clone()),
      url: record.video_url.clone(),
      title: record.title.clone(),
      description: record.description.clone(),
      thumbnail: record.thumbnail.clone().unwrap_or_default(),
      duration: record.duration.clone().unwrap_or_default(),
      tags,
      focus: FormField::Title,
      cursor: record.title.chars().count(),
      tag_cursor: 0,
      fetched_url: Some(record.video_url.clone()),
    }
  }

  pub fn text(&self, field: FormField) -> Option<&str> {
    match field {
      FormField::Url => Some(&self.url),
      FormField::Title => Some(&self.title),
      FormField::Description => Some(&self.description),
      FormField::Thumbnail => Some(&self.thumbnail),
      FormField::Duration => Some(&self.duration),
      FormField::Tags => None,
    }
  }

  /// The focused text buffer and its cursor, or `None` on the category picker.
  pub fn focused_text_mut(&mut self) -> Option<(&mut String, &mut usize)> {
    let buf = match self.focus {
      FormField::Url => &mut self.url,
      FormField::Title => &mut self.title,
      FormField::Description => &mut self.description,
      FormField::Thumbnail => &mut self.thumbnail,
      FormField::Duration => &mut self.duration,
      FormField::Tags => return None,
    };
    Some((buf, &mut self.cursor))
  }

  fn focus(&mut self, field: FormField) {
    self.focus = field;
    self.cursor = self.text(field).map_or(0, |t| t.chars().count());
  }

  pub fn next_field(&mut self) {
    let idx = FormField::ALL.iter().position(|f| *f == self.focus).unwrap_or(0);
    self.focus(FormField::ALL[(idx + 1) % FormField::ALL.len()]);
  }

  pub fn prev_field(&mut self) {
    let idx = FormField::ALL.iter().position(|f| *f == self.focus).unwrap_or(0);
    self.focus(FormField::ALL[(idx + FormField::ALL.len() - 1) % FormField::ALL.len()]);
  }

  /// URL that still needs a metadata lookup, if any.
  pub fn pending_lookup(&self) -> Option<String> {
    let url = self.url.trim();
    if url.is_empty() || self.fetched_url.as_deref() == Some(url) {
      return None;
    }
    Some(url.to_string())
  }

  /// Add or remove a category. Removing the last one re-seeds the sentinel so
  /// a record is never saved untagged.
  pub fn toggle_tag(&mut self, name: &str) {
    if let Some(pos) = self.tags.iter().position(|t| t == name) {
      self.tags.remove(pos);
    } else {
      self.tags.push(name.to_string());
    }
    if self.tags.is_empty() {
      self.tags.push(constants().all_category.clone());
    }
  }

  /// Pre-fill from platform metadata. Categories are only suggested while the
  /// operator hasn't picked any beyond the seeded sentinel.
  pub fn apply_metadata(&mut self, meta: VideoMetadata) {
    let untouched = self.tags.len() == 1 && self.tags[0] == constants().all_category;
    if untouched {
      self.tags = detect(&meta.title, &meta.description);
    }
    self.title = meta.title;
    self.description = meta.description;
    if let Some(thumbnail) = meta.thumbnail_url {
      self.thumbnail = thumbnail;
    }
    if let Some(duration) = meta.duration {
      self.duration = duration;
    }
    self.cursor = self.text(self.focus).map_or(0, |t| t.chars().count());
  }

  /// Validated fields ready for the store.
  pub fn to_fields(&self) -> Result<VideoFields> {
    let optional = |s: &str| Some(s.trim().to_string()).filter(|s| !s.is_empty());
    let tags = if self.tags.is_empty() { vec![constants().all_category.clone()] } else { self.tags.clone() };
    let fields = VideoFields {
      title: self.title.trim().to_string(),
      description: self.description.trim().to_string(),
      video_url: self.url.trim().to_string(),
      thumbnail: optional(&self.thumbnail),
      category: tags[0].clone(),
      tags,
      duration: optional(&self.duration),
    };
    fields.validate()?;
    Ok(fields)
  }
}

impl Default for VideoForm {
  fn default() -> Self {
    Self::new()
  }
}
