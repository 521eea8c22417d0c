use ratatui::{
  Frame,
  layout::{Alignment, Constraint, Flex, Layout, Rect},
  style::{Modifier, Style, Stylize},
  text::{Line, Span},
  widgets::{Block, BorderType, Clear, List, ListItem, Padding, Paragraph, Tabs, Wrap},
};

use crate::app::{App, AppMode};
use crate::duration::format_duration;
use crate::form::{FormField, VideoForm};
use crate::theme::Theme;

// --- Helpers ---

/// Compute the display width of the first `n` chars (accounting for double-width CJK).
pub fn display_width(s: &str, n: usize) -> usize {
  use unicode_width::UnicodeWidthChar;
  s.chars().take(n).map(|c| c.width().unwrap_or(0)).sum()
}

/// Truncate a string to `max_width` characters, appending "…" if truncated.
fn truncate_str(s: &str, max_width: usize) -> String {
  if s.chars().count() <= max_width {
    s.to_string()
  } else {
    let truncated: String = s.chars().take(max_width.saturating_sub(1)).collect();
    format!("{}…", truncated)
  }
}

/// The visible window of `text` for a single-line input `inner_w` columns wide,
/// updating `scroll` so the cursor stays in view. Returns the text and the
/// cursor column relative to the window.
fn scrolled_input(text: &str, cursor: usize, scroll: &mut usize, inner_w: usize) -> (String, usize) {
  if inner_w == 0 {
    *scroll = 0;
    return (String::new(), 0);
  }
  let cursor_col = display_width(text, cursor);
  if cursor_col < *scroll {
    *scroll = cursor_col;
  } else if cursor_col >= *scroll + inner_w {
    *scroll = cursor_col.saturating_sub(inner_w) + 1;
  }
  let start_col = *scroll;
  let visible: String = text
    .chars()
    .scan(0usize, |col, c| {
      let w = unicode_width::UnicodeWidthChar::width(c).unwrap_or(0);
      let start = *col;
      *col += w;
      Some((start, *col, c))
    })
    .skip_while(|(_, end, _)| *end <= start_col)
    .take_while(|(start, _, _)| *start < start_col + inner_w)
    .map(|(_, _, c)| c)
    .collect();
  (visible, cursor_col - start_col)
}

fn rounded_block<'a>(theme: &Theme, title: impl Into<Line<'a>>, focused: bool) -> Block<'a> {
  let color = if focused { theme.accent } else { theme.border };
  Block::bordered()
    .title(title)
    .title_style(Style::default().fg(color).add_modifier(Modifier::BOLD))
    .border_type(BorderType::Rounded)
    .border_style(Style::default().fg(color))
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
  let [row] = Layout::vertical([Constraint::Length(height.min(area.height))]).flex(Flex::Center).areas(area);
  let [cell] = Layout::horizontal([Constraint::Length(width.min(area.width))]).flex(Flex::Center).areas(row);
  cell
}

// --- UI Rendering ---

pub fn ui(frame: &mut Frame, app: &mut App) {
  let theme = app.theme();

  frame.render_widget(Block::default().style(Style::default().bg(theme.bg)), frame.area());

  let [header_area, tabs_area, main_area, status_area, search_area, footer_area] = Layout::vertical([
    Constraint::Length(1),
    Constraint::Length(1),
    Constraint::Min(3),
    Constraint::Length(1),
    Constraint::Length(3),
    Constraint::Length(1),
  ])
  .areas(frame.area());

  render_header(frame, app, header_area);
  render_categories(frame, app, tabs_area);
  render_main(frame, app, main_area);
  render_status(frame, app, status_area);
  render_search(frame, app, search_area);
  render_footer(frame, app, footer_area);

  match app.mode {
    AppMode::Form => render_form(frame, app),
    AppMode::ConfirmDelete => render_confirm(frame, app),
    _ => {}
  }
}

fn render_header(frame: &mut Frame, app: &App, area: Rect) {
  let theme = app.theme();
  let mut spans = vec![Span::styled(" ▶ porch ", Style::default().fg(theme.accent).add_modifier(Modifier::BOLD))];
  if app.admin {
    spans.push(Span::styled(" admin ", Style::default().fg(theme.key_fg).bg(theme.accent)));
  }
  frame.render_widget(Line::from(spans), area);

  let version = format!("v{} ", env!("CARGO_PKG_VERSION"));
  let right = Line::from(Span::styled(&version, Style::default().fg(theme.muted)));
  let right_area =
    Rect { x: area.x + area.width.saturating_sub(version.len() as u16), width: version.len() as u16, ..area };
  frame.render_widget(right, right_area);
}

fn render_categories(frame: &mut Frame, app: &App, area: Rect) {
  let theme = app.theme();
  let tabs = Tabs::new(app.categories.iter().map(|c| Line::from(c.as_str())))
    .select(app.category_index)
    .style(Style::default().fg(theme.muted))
    .highlight_style(Style::default().fg(theme.highlight_fg).bg(theme.highlight_bg).add_modifier(Modifier::BOLD))
    .divider(Span::styled("·", Style::default().fg(theme.border)));
  frame.render_widget(tabs, area);
}

fn render_main(frame: &mut Frame, app: &mut App, area: Rect) {
  let [list_area, details_area] =
    Layout::horizontal([Constraint::Percentage(60), Constraint::Percentage(40)]).areas(area);
  render_list(frame, app, list_area);
  render_details(frame, app, details_area);
}

fn render_list(frame: &mut Frame, app: &mut App, area: Rect) {
  let theme = app.theme();

  // Inner width: area minus 2 borders minus 2 chars for highlight symbol ("▶ ")
  let inner_w = area.width.saturating_sub(4) as usize;

  let items: Vec<ListItem> = app
    .visible
    .iter()
    .enumerate()
    .filter_map(|(i, &idx)| app.videos.get(idx).map(|video| (i, video)))
    .map(|(i, video)| {
      let is_selected = Some(i) == app.list_state.selected();
      let fg = if is_selected { theme.highlight_fg } else { theme.fg };
      let bg = if is_selected {
        theme.highlight_bg
      } else if i % 2 == 1 {
        theme.stripe_bg
      } else {
        theme.bg
      };

      let right = format_duration(video.duration.as_deref()).unwrap_or_default();
      let line = if right.is_empty() {
        Line::from(Span::styled(truncate_str(&video.title, inner_w), Style::default().fg(fg)))
      } else {
        // Reserve space for right side + 2-char gap
        let right_w = right.chars().count();
        let title = truncate_str(&video.title, inner_w.saturating_sub(right_w + 2));
        let gap = inner_w.saturating_sub(title.chars().count() + right_w);
        Line::from(vec![
          Span::styled(title, Style::default().fg(fg)),
          Span::raw(" ".repeat(gap)),
          Span::styled(right, Style::default().fg(theme.muted)),
        ])
      };
      ListItem::new(line).bg(bg)
    })
    .collect();

  let title = format!(" {} — {} of {} ", app.selected_category(), app.visible.len(), app.videos.len());
  let list = List::new(items)
    .block(rounded_block(theme, title, app.mode == AppMode::Browse))
    .highlight_symbol("▶ ")
    .highlight_style(Style::default().fg(theme.highlight_fg).bg(theme.highlight_bg).add_modifier(Modifier::BOLD));

  if app.visible.is_empty() {
    let message = if app.videos.is_empty() { "The catalog is empty." } else { "No videos match." };
    let empty = Paragraph::new(vec![Line::from(""), Line::from(Span::styled(message, Style::default().fg(theme.muted)))])
      .alignment(Alignment::Center)
      .block(rounded_block(theme, " Videos ", app.mode == AppMode::Browse));
    frame.render_widget(empty, area);
  } else {
    frame.render_stateful_widget(list, area, &mut app.list_state);
  }
}

fn render_details(frame: &mut Frame, app: &App, area: Rect) {
  let theme = app.theme();
  let block = rounded_block(theme, " Details ", false).padding(Padding::horizontal(1));

  let Some(video) = app.selected_video() else {
    frame.render_widget(block, area);
    return;
  };

  let inner_w = area.width.saturating_sub(4) as usize;
  let label = |name: &'static str| Span::styled(format!("{:<10}", name), Style::default().fg(theme.muted));
  let value_w = inner_w.saturating_sub(10);

  let mut lines = vec![
    Line::from(Span::styled(video.title.clone(), Style::default().fg(theme.fg).add_modifier(Modifier::BOLD))),
    Line::from(""),
  ];
  if let Some(duration) = format_duration(video.duration.as_deref()) {
    lines.push(Line::from(vec![label("Duration"), Span::styled(duration, Style::default().fg(theme.fg))]));
  }
  if !video.category.is_empty() {
    lines.push(Line::from(vec![label("Category"), Span::styled(video.category.clone(), Style::default().fg(theme.fg))]));
  }
  if !video.tags.is_empty() {
    lines.push(Line::from(vec![
      label("Tags"),
      Span::styled(truncate_str(&video.tags.join(", "), value_w), Style::default().fg(theme.fg)),
    ]));
  }
  if let Some(thumb) = video.thumbnail_url() {
    lines.push(Line::from(vec![
      label("Thumbnail"),
      Span::styled(truncate_str(&thumb, value_w), Style::default().fg(theme.muted)),
    ]));
  }
  lines.push(Line::from(""));
  lines.push(Line::from(Span::styled(
    truncate_str(&video.video_url, inner_w),
    Style::default().fg(theme.accent).add_modifier(Modifier::UNDERLINED),
  )));
  if !video.description.is_empty() {
    lines.push(Line::from(""));
    lines.extend(video.description.lines().map(|l| Line::from(Span::styled(l.to_string(), Style::default().fg(theme.fg)))));
  }

  let paragraph = Paragraph::new(lines).wrap(Wrap { trim: false }).block(block);
  frame.render_widget(paragraph, area);
}

fn render_status(frame: &mut Frame, app: &App, area: Rect) {
  let theme = app.theme();
  let (text, style) = if let Some(msg) = &app.status_message {
    (format!(" ⏳ {}", msg), Style::default().fg(theme.status))
  } else if let Some(err) = &app.last_error {
    (format!(" ⚠  {}", err), Style::default().fg(theme.error))
  } else if let Some(info) = &app.info_message {
    (format!(" ℹ  {}", info), Style::default().fg(theme.status))
  } else if !app.tasks.is_idle() {
    (" Working…".to_string(), Style::default().fg(theme.muted))
  } else {
    (" Ready".to_string(), Style::default().fg(theme.muted))
  };
  frame.render_widget(Paragraph::new(text).style(style), area);
}

fn render_search(frame: &mut Frame, app: &mut App, area: Rect) {
  let theme = app.theme();
  let focused = app.mode == AppMode::Search;
  let block = rounded_block(theme, " Search ", focused).padding(Padding::horizontal(1));

  let inner_w = area.width.saturating_sub(4) as usize;
  let (visible, cursor_col) = scrolled_input(&app.search, app.search_cursor, &mut app.search_scroll, inner_w);

  let paragraph = Paragraph::new(visible).style(Style::default().fg(theme.fg)).block(block);
  frame.render_widget(paragraph, area);

  if focused {
    frame.set_cursor_position((area.x + 2 + cursor_col as u16, area.y + 1));
  }
}

fn render_form(frame: &mut Frame, app: &App) {
  let Some(form) = &app.form else { return };
  let theme = app.theme();
  let area = centered(frame.area(), 80, 20);
  frame.render_widget(Clear, area);

  let title = if form.editing.is_some() { " Edit video " } else { " Add video " };
  let block = rounded_block(theme, title, true).padding(Padding::horizontal(1)).style(Style::default().bg(theme.bg));
  let inner = block.inner(area);
  frame.render_widget(block, area);

  let rows = Layout::vertical(
    FormField::ALL.iter().map(|f| if *f == FormField::Description { Constraint::Length(5) } else { Constraint::Length(2) }),
  )
  .split(inner);

  for (field, row) in FormField::ALL.iter().zip(rows.iter()) {
    render_form_field(frame, theme, form, &app.categories, *field, *row);
  }
}

fn render_form_field(frame: &mut Frame, theme: &Theme, form: &VideoForm, categories: &[String], field: FormField, area: Rect) {
  let focused = form.focus == field;
  let label_style = if focused { Style::default().fg(theme.accent).add_modifier(Modifier::BOLD) } else { Style::default().fg(theme.muted) };
  let [label_area, value_area] = Layout::horizontal([Constraint::Length(13), Constraint::Min(1)]).areas(area);
  frame.render_widget(Paragraph::new(Span::styled(field.label(), label_style)), label_area);

  if field == FormField::Tags {
    let spans: Vec<Span> = categories
      .iter()
      .enumerate()
      .flat_map(|(i, name)| {
        let selected = form.tags.iter().any(|t| t == name);
        let mark = if selected { "[x] " } else { "[ ] " };
        let mut style = Style::default().fg(if selected { theme.fg } else { theme.muted });
        if focused && i == form.tag_cursor {
          style = style.fg(theme.highlight_fg).bg(theme.highlight_bg);
        }
        [Span::styled(format!("{}{}", mark, name), style), Span::raw("  ")]
      })
      .collect();
    frame.render_widget(Paragraph::new(Line::from(spans)).wrap(Wrap { trim: true }), value_area);
    return;
  }

  let text = form.text(field).unwrap_or_default();
  if field == FormField::Description {
    frame.render_widget(Paragraph::new(text).style(Style::default().fg(theme.fg)).wrap(Wrap { trim: false }), value_area);
  } else {
    let mut scroll = 0;
    let width = value_area.width as usize;
    let cursor = if focused { form.cursor } else { 0 };
    let (visible, cursor_col) = scrolled_input(text, cursor, &mut scroll, width.max(1));
    let mut line = vec![Span::styled(visible, Style::default().fg(theme.fg))];
    if field == FormField::Duration
      && let Some(pretty) = format_duration(Some(text))
    {
      line.push(Span::styled(format!("  ({})", pretty), Style::default().fg(theme.muted)));
    }
    frame.render_widget(Paragraph::new(Line::from(line)), value_area);
    if focused {
      frame.set_cursor_position((value_area.x + cursor_col as u16, value_area.y));
    }
  }
}

fn render_confirm(frame: &mut Frame, app: &App) {
  let theme = app.theme();
  let title = app
    .pending_delete
    .as_ref()
    .and_then(|id| app.videos.iter().find(|v| &v.id == id))
    .map_or_else(String::new, |v| v.title.clone());
  let area = centered(frame.area(), 60, 7);
  frame.render_widget(Clear, area);
  let text = vec![
    Line::from(""),
    Line::from(Span::styled(format!("Delete \"{}\"?", truncate_str(&title, 40)), Style::default().fg(theme.fg))),
    Line::from(""),
    Line::from(Span::styled("y to delete · n to keep", Style::default().fg(theme.muted))),
  ];
  let paragraph = Paragraph::new(text)
    .alignment(Alignment::Center)
    .block(rounded_block(theme, " Confirm ", true).style(Style::default().bg(theme.bg)));
  frame.render_widget(paragraph, area);
}

fn render_footer(frame: &mut Frame, app: &App, area: Rect) {
  let theme = app.theme();
  let keys: Vec<(&str, &str)> = match app.mode {
    AppMode::Browse => {
      let mut k = vec![("j/k", "Navigate"), ("←/→", "Category"), ("/", "Search"), ("Enter", "Open"), ("r", "Reload")];
      if app.admin {
        k.extend([("a", "Add"), ("e", "Edit"), ("d", "Delete")]);
      }
      k.push(("^t", "Theme"));
      k.push(("q", "Quit"));
      k
    }
    AppMode::Search => vec![("Enter", "Done"), ("↑/↓", "Navigate"), ("Esc", "Clear")],
    AppMode::Form => vec![("Tab", "Next field"), ("Space", "Toggle category"), ("^f", "Fetch details"), ("^s", "Save"), ("Esc", "Cancel")],
    AppMode::ConfirmDelete => vec![("y", "Delete"), ("n", "Keep")],
  };

  let spans: Vec<Span> = keys
    .iter()
    .enumerate()
    .flat_map(|(i, (key, action))| {
      let mut s = vec![
        Span::styled(format!(" {} ", key), Style::default().fg(theme.key_fg).bg(theme.key_bg)),
        Span::styled(format!(" {} ", action), Style::default().fg(theme.muted)),
      ];
      if i < keys.len() - 1 {
        s.push(Span::raw("  "));
      }
      s
    })
    .collect();

  frame.render_widget(Line::from(spans), area);

  let theme_label = format!("{} ", theme.name);
  let right = Line::from(Span::styled(&theme_label, Style::default().fg(theme.muted)));
  let right_area =
    Rect { x: area.x + area.width.saturating_sub(theme_label.len() as u16), width: theme_label.len() as u16, ..area };
  frame.render_widget(right, right_area);
}
