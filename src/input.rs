use ratatui::crossterm::event::{self, KeyCode, KeyModifiers};
use tracing::debug;

use crate::app::{App, AppMode};
use crate::form::FormField;

// --- Helpers ---

/// Convert a char index to a byte offset within the string.
pub fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
  s.char_indices().nth(char_idx).map_or(s.len(), |(i, _)| i)
}

/// Apply a single-line editing key to `text`. Returns true if the key was
/// consumed (whether or not the text changed).
pub fn edit_text(text: &mut String, cursor: &mut usize, code: KeyCode) -> bool {
  match code {
    KeyCode::Char(c) => {
      let byte_idx = char_to_byte_index(text, *cursor);
      text.insert(byte_idx, c);
      *cursor += 1;
    }
    KeyCode::Backspace => {
      if *cursor > 0 {
        *cursor -= 1;
        let byte_idx = char_to_byte_index(text, *cursor);
        text.remove(byte_idx);
      }
    }
    KeyCode::Delete => {
      if *cursor < text.chars().count() {
        let byte_idx = char_to_byte_index(text, *cursor);
        text.remove(byte_idx);
      }
    }
    KeyCode::Left => {
      *cursor = cursor.saturating_sub(1);
    }
    KeyCode::Right => {
      if *cursor < text.chars().count() {
        *cursor += 1;
      }
    }
    KeyCode::Home => {
      *cursor = 0;
    }
    KeyCode::End => {
      *cursor = text.chars().count();
    }
    _ => return false,
  }
  true
}

/// Open a URL in the platform's default browser.
fn open_in_browser(app: &mut App, url: &str) {
  #[cfg(target_os = "macos")]
  let cmd = "open";
  #[cfg(not(target_os = "macos"))]
  let cmd = "xdg-open";
  match std::process::Command::new(cmd)
    .arg(url)
    .stdin(std::process::Stdio::null())
    .stdout(std::process::Stdio::null())
    .stderr(std::process::Stdio::null())
    .spawn()
  {
    Ok(mut child) => {
      // Reap the child in a background thread to avoid zombie processes.
      std::thread::spawn(move || {
        let _ = child.wait();
      });
    }
    Err(e) => {
      app.set_error(format!("Failed to open browser: {}", e));
    }
  }
}

// --- Event Handling ---

pub fn handle_key_event(app: &mut App, key: event::KeyEvent) {
  if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
    app.should_quit = true;
    return;
  }

  if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('t') {
    app.next_theme();
    return;
  }

  match app.mode {
    AppMode::Browse => handle_browse_key(app, key),
    AppMode::Search => handle_search_key(app, key),
    AppMode::Form => handle_form_key(app, key),
    AppMode::ConfirmDelete => handle_confirm_key(app, key),
  }
}

fn handle_browse_key(app: &mut App, key: event::KeyEvent) {
  app.clear_error();
  app.info_message = None;
  match key.code {
    KeyCode::Down | KeyCode::Char('j') => app.select_next(),
    KeyCode::Up | KeyCode::Char('k') => app.select_prev(),
    KeyCode::Right | KeyCode::Tab | KeyCode::Char('l') => app.next_category(),
    KeyCode::Left | KeyCode::BackTab | KeyCode::Char('h') => app.prev_category(),
    KeyCode::Char('/') => app.mode = AppMode::Search,
    KeyCode::Char('r') => app.trigger_reload(),
    KeyCode::Enter | KeyCode::Char('o') => {
      if let Some(url) = app.selected_video().map(|v| v.video_url.clone()) {
        open_in_browser(app, &url);
      }
    }
    KeyCode::Char('a') => app.begin_add(),
    KeyCode::Char('e') => app.begin_edit(),
    KeyCode::Char('d') => app.request_delete(),
    KeyCode::Esc => {
      if !app.search.is_empty() {
        app.set_search("");
        app.search_scroll = 0;
      } else {
        app.should_quit = true;
      }
    }
    KeyCode::Char('q') => app.should_quit = true,
    _ => {}
  }
}

fn handle_search_key(app: &mut App, key: event::KeyEvent) {
  match key.code {
    KeyCode::Enter => {
      app.mode = AppMode::Browse;
    }
    KeyCode::Esc => {
      app.set_search("");
      app.search_scroll = 0;
      app.mode = AppMode::Browse;
    }
    KeyCode::Down => {
      app.select_next();
    }
    KeyCode::Up => {
      app.select_prev();
    }
    code => {
      let before = app.search.clone();
      if edit_text(&mut app.search, &mut app.search_cursor, code) && app.search != before {
        app.recompute_filter();
      }
    }
  }
}

fn handle_form_key(app: &mut App, key: event::KeyEvent) {
  let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
  if ctrl && key.code == KeyCode::Char('s') {
    app.submit_form();
    return;
  }
  if ctrl && key.code == KeyCode::Char('f') {
    if let Some(form) = app.form.as_mut() {
      form.fetched_url = None;
    }
    app.trigger_metadata_lookup();
    return;
  }

  let categories = app.categories.clone();
  let Some(form) = app.form.as_mut() else {
    app.mode = AppMode::Browse;
    return;
  };

  match key.code {
    KeyCode::Esc => {
      app.cancel_form();
    }
    KeyCode::Tab | KeyCode::BackTab => {
      let leaving_url = form.focus == FormField::Url;
      if key.code == KeyCode::Tab {
        form.next_field();
      } else {
        form.prev_field();
      }
      if leaving_url {
        app.trigger_metadata_lookup();
      }
    }
    KeyCode::Enter => {
      if form.focus == FormField::Tags {
        app.submit_form();
      } else {
        let leaving_url = form.focus == FormField::Url;
        form.next_field();
        if leaving_url {
          app.trigger_metadata_lookup();
        }
      }
    }
    code if form.focus == FormField::Tags => {
      let count = categories.len();
      match code {
        KeyCode::Left | KeyCode::Char('h') if count > 0 => {
          form.tag_cursor = if form.tag_cursor == 0 { count - 1 } else { form.tag_cursor - 1 };
        }
        KeyCode::Right | KeyCode::Char('l') if count > 0 => {
          form.tag_cursor = (form.tag_cursor + 1) % count;
        }
        KeyCode::Char(' ') => {
          if let Some(name) = categories.get(form.tag_cursor) {
            form.toggle_tag(name);
            debug!(tags = ?form.tags, "form: toggled category");
          }
        }
        _ => {}
      }
    }
    code => {
      if let Some((text, cursor)) = form.focused_text_mut() {
        edit_text(text, cursor, code);
      }
    }
  }
}

fn handle_confirm_key(app: &mut App, key: event::KeyEvent) {
  match key.code {
    KeyCode::Char('y') | KeyCode::Char('Y') => app.confirm_delete(),
    KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => app.cancel_delete(),
    _ => {}
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::catalog::tests::record;
  use crate::config::Config;
  use crate::session::Session;
  use crate::store::VideoStore;
  use crate::youtube::MetadataSource;
  use ratatui::crossterm::event::KeyEvent;

  fn app(admin: bool) -> (tempfile::TempDir, App) {
    let dir = tempfile::tempdir().unwrap();
    let store = VideoStore::open(dir.path().join("videos.json"), Session::anonymous());
    let mut app = App::new(store, MetadataSource::YtDlp, &Config::default(), admin);
    app.apply_snapshot(vec![
      record("a", "Summer single", "Music", &["Music"]),
      record("b", "Park session", "All", &["Freestyle", "All"]),
    ]);
    (dir, app)
  }

  fn press(app: &mut App, code: KeyCode) {
    handle_key_event(app, KeyEvent::new(code, KeyModifiers::NONE));
  }

  fn type_str(app: &mut App, s: &str) {
    for c in s.chars() {
      press(app, KeyCode::Char(c));
    }
  }

  // --- char_to_byte_index ---

  #[test]
  fn char_to_byte_ascii() {
    assert_eq!(char_to_byte_index("hello", 0), 0);
    assert_eq!(char_to_byte_index("hello", 3), 3);
    assert_eq!(char_to_byte_index("hello", 5), 5); // past end
  }

  #[test]
  fn char_to_byte_multibyte() {
    let s = "aé日"; // a=1 byte, é=2 bytes, 日=3 bytes
    assert_eq!(char_to_byte_index(s, 0), 0);
    assert_eq!(char_to_byte_index(s, 1), 1);
    assert_eq!(char_to_byte_index(s, 2), 3);
    assert_eq!(char_to_byte_index(s, 3), 6);
  }

  // --- edit_text ---

  #[test]
  fn editing_inserts_at_cursor() {
    let mut text = "pch".to_string();
    let mut cursor = 1;
    assert!(edit_text(&mut text, &mut cursor, KeyCode::Char('o')));
    assert!(edit_text(&mut text, &mut cursor, KeyCode::Right));
    assert!(edit_text(&mut text, &mut cursor, KeyCode::Char('r')));
    assert_eq!(text, "porch");
    assert!(edit_text(&mut text, &mut cursor, KeyCode::Home));
    assert!(edit_text(&mut text, &mut cursor, KeyCode::Delete));
    assert!(edit_text(&mut text, &mut cursor, KeyCode::End));
    assert!(edit_text(&mut text, &mut cursor, KeyCode::Backspace));
    assert_eq!(text, "orc");
    assert!(!edit_text(&mut text, &mut cursor, KeyCode::F(1)));
  }

  // --- modes ---

  #[test]
  fn search_filters_live_and_escape_clears() {
    let (_dir, mut app) = app(false);
    press(&mut app, KeyCode::Char('/'));
    assert_eq!(app.mode, AppMode::Search);
    type_str(&mut app, "FREE");
    assert_eq!(app.visible, [1]);
    press(&mut app, KeyCode::Esc);
    assert_eq!(app.mode, AppMode::Browse);
    assert!(app.search.is_empty());
    assert_eq!(app.visible, [0, 1]);
  }

  #[test]
  fn arrows_cycle_categories() {
    let (_dir, mut app) = app(false);
    press(&mut app, KeyCode::Right);
    assert_eq!(app.selected_category(), "Music");
    assert_eq!(app.visible, [0]);
    press(&mut app, KeyCode::Left);
    press(&mut app, KeyCode::Left);
    assert_eq!(app.selected_category(), "Off The Porch");
    assert!(app.visible.is_empty());
  }

  #[test]
  fn escape_quits_when_nothing_to_clear() {
    let (_dir, mut app) = app(false);
    press(&mut app, KeyCode::Esc);
    assert!(app.should_quit);
  }

  #[test]
  fn viewers_cannot_open_the_form() {
    let (_dir, mut app) = app(false);
    press(&mut app, KeyCode::Char('a'));
    assert_eq!(app.mode, AppMode::Browse);
    assert!(app.form.is_none());
  }

  #[test]
  fn form_typing_and_category_picker() {
    let (_dir, mut app) = app(true);
    press(&mut app, KeyCode::Char('a'));
    assert_eq!(app.mode, AppMode::Form);
    // Skip past the URL field without typing, so no lookup is issued.
    press(&mut app, KeyCode::Tab);
    type_str(&mut app, "Porch talk");
    for _ in 0..4 {
      press(&mut app, KeyCode::Tab);
    }
    let form = app.form.as_ref().unwrap();
    assert_eq!(form.title, "Porch talk");
    assert_eq!(form.focus, FormField::Tags);

    // Categories: All, Music, ...; move to Music and select it.
    press(&mut app, KeyCode::Right);
    press(&mut app, KeyCode::Char(' '));
    assert_eq!(app.form.as_ref().unwrap().tags, ["All", "Music"]);
    assert!(app.tasks.metadata_rx.is_none());
  }

  #[test]
  fn delete_needs_confirmation() {
    let (_dir, mut app) = app(true);
    press(&mut app, KeyCode::Char('d'));
    assert_eq!(app.mode, AppMode::ConfirmDelete);
    press(&mut app, KeyCode::Char('n'));
    assert_eq!(app.mode, AppMode::Browse);
    assert!(app.pending_delete.is_none());
  }
}
