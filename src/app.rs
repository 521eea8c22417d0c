use anyhow::Result;
use ratatui::widgets::ListState;
use std::time::{Duration, Instant};
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::catalog::{VideoRecord, filter_indices};
use crate::category::reconcile;
use crate::config::Config;
use crate::constants::constants;
use crate::form::VideoForm;
use crate::store::VideoStore;
use crate::theme::{THEMES, Theme};
use crate::youtube::{MetadataSource, VideoMetadata};

// --- Types ---

pub type MetadataResult = (String, Option<VideoMetadata>);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppMode {
  Browse,
  Search,
  Form,
  ConfirmDelete,
}

/// Outcome of a store mutation, reported back to the UI loop.
#[derive(Debug)]
pub enum WriteOutcome {
  Created(VideoRecord),
  /// Title of the updated record.
  Updated(String),
  /// Title of the deleted record.
  Deleted(String),
}

/// In-flight async task receivers. A newer request replaces the older receiver.
#[derive(Default)]
pub(crate) struct AsyncTasks {
  pub(crate) reload_rx: Option<oneshot::Receiver<Result<Vec<VideoRecord>>>>,
  pub(crate) write_rx: Option<oneshot::Receiver<Result<WriteOutcome>>>,
  pub(crate) metadata_rx: Option<oneshot::Receiver<MetadataResult>>,
}

impl AsyncTasks {
  pub(crate) fn is_idle(&self) -> bool {
    self.reload_rx.is_none() && self.write_rx.is_none() && self.metadata_rx.is_none()
  }
}

pub struct App {
  pub mode: AppMode,
  /// Whether add/edit/delete are available.
  pub admin: bool,
  pub theme_index: usize,
  /// Snapshot from the last successful reload.
  pub videos: Vec<VideoRecord>,
  /// Reconciled category list for the current snapshot.
  pub categories: Vec<String>,
  pub category_index: usize,
  pub search: String,
  /// Cursor position within the search input (char index).
  pub search_cursor: usize,
  /// Horizontal scroll offset for the search input.
  pub search_scroll: usize,
  /// Indices into `videos` that pass the category and search filters.
  pub visible: Vec<usize>,
  pub list_state: ListState,
  pub form: Option<VideoForm>,
  /// Record awaiting delete confirmation.
  pub pending_delete: Option<String>,
  pub last_error: Option<String>,
  pub status_message: Option<String>,
  /// Informational message, lower priority than status/error.
  pub info_message: Option<String>,
  pub should_quit: bool,
  store: VideoStore,
  metadata: MetadataSource,
  pub(crate) tasks: AsyncTasks,
  /// Category to restore once the first snapshot arrives.
  wanted_category: Option<String>,
  error_time: Option<Instant>,
}

impl App {
  pub fn new(store: VideoStore, metadata: MetadataSource, config: &Config, admin: bool) -> Self {
    let theme_index =
      if let Some(ref name) = config.theme_name { THEMES.iter().position(|t| t.name == name.as_str()).unwrap_or(0) } else { 0 };
    let categories = constants().taxonomy.clone();

    let mut app = Self {
      mode: AppMode::Browse,
      admin,
      theme_index,
      videos: Vec::new(),
      categories,
      category_index: 0,
      search: String::new(),
      search_cursor: 0,
      search_scroll: 0,
      visible: Vec::new(),
      list_state: ListState::default(),
      form: None,
      pending_delete: None,
      last_error: None,
      status_message: None,
      info_message: None,
      should_quit: false,
      store,
      metadata,
      tasks: AsyncTasks::default(),
      wanted_category: config.last_category.clone(),
      error_time: None,
    };
    if let Some(name) = app.wanted_category.clone() {
      app.select_category(&name);
    }
    app
  }

  pub fn theme(&self) -> &'static Theme {
    // Safety: theme_index is always bounded by modular arithmetic in next_theme()
    // and clamped to THEMES.len() - 1 on initialization.
    &THEMES[self.theme_index]
  }

  pub fn next_theme(&mut self) {
    self.theme_index = (self.theme_index + 1) % THEMES.len();
  }

  /// Persist theme and category for the next launch.
  pub fn save_config(&self, mut config: Config) {
    config.theme_name = Some(self.theme().name.to_string());
    config.last_category = Some(self.selected_category().to_string());
    config.save();
  }

  /// Set an error message with auto-dismiss tracking.
  pub fn set_error(&mut self, msg: String) {
    self.last_error = Some(msg);
    self.error_time = Some(Instant::now());
  }

  /// Clear the current error message and its expiry timer.
  pub fn clear_error(&mut self) {
    self.last_error = None;
    self.error_time = None;
  }

  /// Clear stale error messages after a few seconds.
  pub fn expire_error(&mut self) {
    if let Some(t) = self.error_time
      && t.elapsed() >= Duration::from_secs(constants().error_dismiss_secs)
    {
      self.last_error = None;
      self.error_time = None;
    }
  }

  // --- Filtering ---

  pub fn selected_category(&self) -> &str {
    self.categories.get(self.category_index).map_or(constants().all_category.as_str(), String::as_str)
  }

  /// Select a category by name. Unknown names leave the selection unchanged
  /// and are remembered in case a later snapshot introduces them.
  pub fn select_category(&mut self, name: &str) -> bool {
    match self.categories.iter().position(|c| c == name) {
      Some(idx) => {
        self.category_index = idx;
        self.wanted_category = None;
        self.recompute_filter();
        true
      }
      None => {
        self.wanted_category = Some(name.to_string());
        false
      }
    }
  }

  pub fn next_category(&mut self) {
    if !self.categories.is_empty() {
      self.category_index = (self.category_index + 1) % self.categories.len();
      self.wanted_category = None;
      self.recompute_filter();
    }
  }

  pub fn prev_category(&mut self) {
    if !self.categories.is_empty() {
      let count = self.categories.len();
      self.category_index = (self.category_index + count - 1) % count;
      self.wanted_category = None;
      self.recompute_filter();
    }
  }

  pub fn set_search(&mut self, search: &str) {
    self.search = search.to_string();
    self.search_cursor = self.search.chars().count();
    self.recompute_filter();
  }

  /// Rebuild `visible` from the snapshot and the current filters.
  /// Clamps the list selection to stay within the visible range.
  pub fn recompute_filter(&mut self) {
    let category = self.selected_category().to_string();
    self.visible = filter_indices(&self.videos, &category, &self.search);
    if self.visible.is_empty() {
      self.list_state.select(None);
    } else {
      let sel = self.list_state.selected().unwrap_or(0);
      if sel >= self.visible.len() {
        self.list_state.select(Some(self.visible.len() - 1));
      } else {
        self.list_state.select(Some(sel));
      }
    }
  }

  /// Replace the snapshot wholesale and recompute categories. The selected
  /// category is kept by name when it still exists, otherwise reset to "All".
  pub fn apply_snapshot(&mut self, videos: Vec<VideoRecord>) {
    let current = self.wanted_category.take().unwrap_or_else(|| self.selected_category().to_string());
    self.videos = videos;
    self.categories = reconcile(&self.videos);
    match self.categories.iter().position(|c| *c == current) {
      Some(idx) => self.category_index = idx,
      None => {
        debug!(category = %current, "app: category no longer present, showing all");
        self.category_index = 0;
      }
    }
    self.recompute_filter();
  }

  pub fn selected_video(&self) -> Option<&VideoRecord> {
    let sel = self.list_state.selected()?;
    self.visible.get(sel).and_then(|&idx| self.videos.get(idx))
  }

  pub fn select_next(&mut self) {
    let count = self.visible.len();
    if count > 0 {
      let i = self.list_state.selected().map_or(0, |i| (i + 1) % count);
      self.list_state.select(Some(i));
    }
  }

  pub fn select_prev(&mut self) {
    let count = self.visible.len();
    if count > 0 {
      let i = self.list_state.selected().map_or(0, |i| if i == 0 { count - 1 } else { i - 1 });
      self.list_state.select(Some(i));
    }
  }

  // --- Store ---

  pub fn trigger_reload(&mut self) {
    self.status_message = Some("Loading catalog…".to_string());
    let store = self.store.clone();
    let (tx, rx) = oneshot::channel();
    tokio::spawn(async move {
      let _ = tx.send(store.list().await);
    });
    self.tasks.reload_rx = Some(rx);
  }

  pub fn begin_add(&mut self) {
    if !self.admin {
      return;
    }
    self.clear_error();
    self.form = Some(VideoForm::new());
    self.mode = AppMode::Form;
  }

  pub fn begin_edit(&mut self) {
    if !self.admin {
      return;
    }
    let Some(record) = self.selected_video() else { return };
    let form = VideoForm::edit(record);
    self.clear_error();
    self.form = Some(form);
    self.mode = AppMode::Form;
  }

  pub fn cancel_form(&mut self) {
    self.form = None;
    self.tasks.metadata_rx = None;
    self.mode = AppMode::Browse;
  }

  /// Validate and save the open form. Validation failures leave the form
  /// open with nothing written.
  pub fn submit_form(&mut self) {
    let Some(form) = &self.form else { return };
    if self.tasks.write_rx.is_some() {
      return;
    }
    let fields = match form.to_fields() {
      Ok(fields) => fields,
      Err(e) => {
        self.set_error(format!("{:#}", e));
        return;
      }
    };
    let editing = form.editing.clone();
    let title = fields.title.clone();
    let store = self.store.clone();
    self.status_message = Some("Saving…".to_string());

    let (tx, rx) = oneshot::channel();
    tokio::spawn(async move {
      let result = match editing {
        Some(id) => store.update(&id, fields).await.map(|_| WriteOutcome::Updated(title)),
        None => store.create(fields).await.map(WriteOutcome::Created),
      };
      let _ = tx.send(result);
    });
    self.tasks.write_rx = Some(rx);
  }

  pub fn request_delete(&mut self) {
    if !self.admin {
      return;
    }
    if let Some(record) = self.selected_video() {
      self.pending_delete = Some(record.id.clone());
      self.mode = AppMode::ConfirmDelete;
    }
  }

  /// Delete the record awaiting confirmation. While another write is still
  /// running the prompt stays open so the operator can confirm again.
  pub fn confirm_delete(&mut self) {
    if self.tasks.write_rx.is_some() {
      self.set_error("A save is still running; try again in a moment.".to_string());
      return;
    }
    self.mode = AppMode::Browse;
    let Some(id) = self.pending_delete.take() else { return };
    let title = self.videos.iter().find(|v| v.id == id).map(|v| v.title.clone()).unwrap_or_else(|| id.clone());
    let store = self.store.clone();
    self.status_message = Some("Deleting…".to_string());
    let (tx, rx) = oneshot::channel();
    tokio::spawn(async move {
      let _ = tx.send(store.delete(&id).await.map(|_| WriteOutcome::Deleted(title)));
    });
    self.tasks.write_rx = Some(rx);
  }

  pub fn cancel_delete(&mut self) {
    self.pending_delete = None;
    self.mode = AppMode::Browse;
  }

  // --- Metadata ---

  /// Look up metadata for the form's URL if it changed since the last lookup.
  pub fn trigger_metadata_lookup(&mut self) {
    let Some(form) = &mut self.form else { return };
    let Some(url) = form.pending_lookup() else { return };
    form.fetched_url = Some(url.clone());

    let source = self.metadata.clone();
    self.info_message = Some("Fetching video details…".to_string());
    let (tx, rx) = oneshot::channel();
    tokio::spawn(async move {
      let meta = source.fetch_for_url(&url).await;
      let _ = tx.send((url, meta));
    });
    self.tasks.metadata_rx = Some(rx);
  }

  // --- Pending tasks ---

  pub fn check_pending(&mut self) {
    if let Some(mut rx) = self.tasks.reload_rx.take() {
      match rx.try_recv() {
        Ok(result) => {
          self.status_message = None;
          match result {
            Ok(videos) => self.apply_snapshot(videos),
            Err(e) => {
              warn!(err = %format!("{:#}", e), "app: reload failed");
              self.set_error(format!("Failed to load catalog: {:#} (r to retry)", e));
            }
          }
        }
        Err(oneshot::error::TryRecvError::Empty) => {
          self.tasks.reload_rx = Some(rx);
        }
        Err(oneshot::error::TryRecvError::Closed) => {
          self.status_message = None;
          self.set_error("Load task failed.".to_string());
        }
      }
    }

    if let Some(mut rx) = self.tasks.write_rx.take() {
      match rx.try_recv() {
        Ok(result) => {
          self.status_message = None;
          match result {
            Ok(outcome) => {
              let msg = match &outcome {
                WriteOutcome::Created(record) => format!("Added \"{}\".", record.title),
                WriteOutcome::Updated(title) => format!("Saved \"{}\".", title),
                WriteOutcome::Deleted(title) => format!("Deleted \"{}\".", title),
              };
              info!(?outcome, "app: write finished");
              if matches!(outcome, WriteOutcome::Created(_) | WriteOutcome::Updated(_)) {
                self.cancel_form();
              }
              self.info_message = Some(msg);
              self.trigger_reload();
            }
            Err(e) => {
              warn!(err = %format!("{:#}", e), "app: write failed");
              self.set_error(format!("Save failed: {:#}", e));
            }
          }
        }
        Err(oneshot::error::TryRecvError::Empty) => {
          self.tasks.write_rx = Some(rx);
        }
        Err(oneshot::error::TryRecvError::Closed) => {
          self.status_message = None;
          self.set_error("Save task failed.".to_string());
        }
      }
    }

    if let Some(mut rx) = self.tasks.metadata_rx.take() {
      match rx.try_recv() {
        Ok((url, meta)) => {
          self.info_message = None;
          if let Some(form) = &mut self.form
            && form.url.trim() == url
          {
            match meta {
              Some(meta) => form.apply_metadata(meta),
              None => self.info_message = Some("No details found; fill in manually.".to_string()),
            }
          }
        }
        Err(oneshot::error::TryRecvError::Empty) => {
          self.tasks.metadata_rx = Some(rx);
        }
        Err(oneshot::error::TryRecvError::Closed) => {
          self.info_message = None;
        }
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::catalog::tests::record;
  use crate::session::Session;

  fn app_in(dir: &tempfile::TempDir, admin: bool) -> App {
    let store = VideoStore::open(dir.path().join("videos.json"), Session::anonymous());
    App::new(store, MetadataSource::YtDlp, &Config::default(), admin)
  }

  fn snapshot() -> Vec<VideoRecord> {
    vec![
      record("a", "Summer single", "Music", &["Music"]),
      record("b", "Park session", "All", &["Freestyle", "All"]),
      record("c", "Corner talk", "Vlogs", &["Vlogs"]),
    ]
  }

  async fn settle(app: &mut App) {
    for _ in 0..200 {
      app.check_pending();
      if app.tasks.is_idle() {
        return;
      }
      tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("tasks did not settle");
  }

  #[test]
  fn starts_with_baseline_categories() {
    let dir = tempfile::tempdir().unwrap();
    let app = app_in(&dir, false);
    assert_eq!(app.categories, constants().taxonomy);
    assert_eq!(app.selected_category(), "All");
  }

  #[test]
  fn snapshot_reconciles_categories_and_filters() {
    let dir = tempfile::tempdir().unwrap();
    let mut app = app_in(&dir, false);
    app.apply_snapshot(snapshot());
    assert_eq!(app.categories.last().map(String::as_str), Some("Vlogs"));
    assert_eq!(app.visible, [0, 1, 2]);

    assert!(app.select_category("Freestyle"));
    assert_eq!(app.visible, [1]);
    assert_eq!(app.selected_video().map(|v| v.id.as_str()), Some("b"));
  }

  #[test]
  fn selection_survives_reload_by_name() {
    let dir = tempfile::tempdir().unwrap();
    let mut app = app_in(&dir, false);
    app.apply_snapshot(snapshot());
    app.select_category("Vlogs");
    app.apply_snapshot(snapshot());
    assert_eq!(app.selected_category(), "Vlogs");

    app.apply_snapshot(snapshot().into_iter().take(2).collect());
    assert_eq!(app.selected_category(), "All");
  }

  #[test]
  fn remembered_category_applies_once_it_exists() {
    let dir = tempfile::tempdir().unwrap();
    let store = VideoStore::open(dir.path().join("videos.json"), Session::anonymous());
    let config = Config { last_category: Some("Vlogs".to_string()), ..Default::default() };
    let mut app = App::new(store, MetadataSource::YtDlp, &config, false);
    assert_eq!(app.selected_category(), "All");
    app.apply_snapshot(snapshot());
    assert_eq!(app.selected_category(), "Vlogs");
    assert_eq!(app.visible, [2]);
  }

  #[test]
  fn search_narrows_and_clamps_selection() {
    let dir = tempfile::tempdir().unwrap();
    let mut app = app_in(&dir, false);
    app.apply_snapshot(snapshot());
    app.list_state.select(Some(2));
    app.set_search("session");
    assert_eq!(app.visible, [1]);
    assert_eq!(app.list_state.selected(), Some(0));
    app.set_search("nothing matches");
    assert_eq!(app.list_state.selected(), None);
    assert!(app.selected_video().is_none());
  }

  #[test]
  fn category_cycling_wraps() {
    let dir = tempfile::tempdir().unwrap();
    let mut app = app_in(&dir, false);
    app.prev_category();
    assert_eq!(app.selected_category(), "Off The Porch");
    app.next_category();
    assert_eq!(app.selected_category(), "All");
  }

  #[test]
  fn admin_actions_require_admin() {
    let dir = tempfile::tempdir().unwrap();
    let mut app = app_in(&dir, false);
    app.apply_snapshot(snapshot());
    app.begin_add();
    assert!(app.form.is_none());
    app.request_delete();
    assert_eq!(app.mode, AppMode::Browse);
  }

  #[tokio::test]
  async fn invalid_form_stays_open_without_writing() {
    let dir = tempfile::tempdir().unwrap();
    let mut app = app_in(&dir, true);
    app.begin_add();
    app.submit_form();
    assert!(app.last_error.is_some());
    assert!(app.tasks.write_rx.is_none());
    assert_eq!(app.mode, AppMode::Form);
  }

  #[tokio::test]
  async fn add_edit_delete_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let mut app = app_in(&dir, true);
    app.trigger_reload();
    settle(&mut app).await;
    assert!(app.videos.is_empty());

    app.begin_add();
    if let Some(form) = app.form.as_mut() {
      form.url = "https://youtu.be/dQw4w9WgXcQ".to_string();
      form.title = "Porch cypher".to_string();
      form.tags = vec!["Freestyle".to_string()];
      form.fetched_url = Some(form.url.clone());
    }
    app.submit_form();
    settle(&mut app).await;
    assert_eq!(app.mode, AppMode::Browse);
    assert_eq!(app.videos.len(), 1);
    assert_eq!(app.videos[0].category, "Freestyle");

    app.begin_edit();
    if let Some(form) = app.form.as_mut() {
      form.title = "Porch cypher vol. 2".to_string();
    }
    app.submit_form();
    settle(&mut app).await;
    assert_eq!(app.videos[0].title, "Porch cypher vol. 2");
    assert_eq!(app.info_message.as_deref(), Some("Saved \"Porch cypher vol. 2\"."));

    app.request_delete();
    assert_eq!(app.mode, AppMode::ConfirmDelete);
    app.confirm_delete();
    settle(&mut app).await;
    assert!(app.videos.is_empty());
    assert_eq!(app.info_message.as_deref(), Some("Deleted \"Porch cypher vol. 2\"."));
    assert_eq!(app.categories, constants().taxonomy);
  }

  #[tokio::test]
  async fn delete_waits_for_running_save() {
    let dir = tempfile::tempdir().unwrap();
    let mut app = app_in(&dir, true);
    app.apply_snapshot(snapshot());
    app.request_delete();
    let (_tx, rx) = oneshot::channel();
    app.tasks.write_rx = Some(rx);

    app.confirm_delete();
    assert_eq!(app.mode, AppMode::ConfirmDelete);
    assert_eq!(app.pending_delete.as_deref(), Some("a"));
    assert!(app.last_error.as_deref().is_some_and(|e| e.contains("still running")));
  }

  #[tokio::test]
  async fn failed_reload_keeps_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let mut app = app_in(&dir, false);
    app.apply_snapshot(snapshot());
    std::fs::write(dir.path().join("videos.json"), "{ broken").unwrap();
    app.trigger_reload();
    settle(&mut app).await;
    assert_eq!(app.videos.len(), 3);
    assert!(app.last_error.as_deref().is_some_and(|e| e.contains("retry")));
  }
}
