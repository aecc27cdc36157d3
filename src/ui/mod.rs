pub mod components;
pub mod renderfns;
pub mod view;
pub mod views;

use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::ListState;

use crate::api::ErrorInfo;
use crate::app::App;
use crate::query::{PageChange, QueryView};
use crate::ui::renderfns::{draw_footer, draw_header};

/// Main draw function
pub fn draw(frame: &mut Frame, app: &mut App) {
  let chunks = Layout::default()
    .direction(Direction::Vertical)
    .constraints([
      Constraint::Length(1), // Header
      Constraint::Min(1),    // Main content
      Constraint::Length(1), // Footer
    ])
    .split(frame.area());

  let shortcuts = app.shortcuts();
  draw_header(frame, chunks[0], &app.title(), app.session(), &shortcuts);

  if let Some(view) = app.current_view_mut() {
    view.render(frame, chunks[1]);
  }
  app.command_input().render_overlay(frame, chunks[1]);

  draw_footer(frame, chunks[2], &app.view_breadcrumb(), app.status());
}

/// Keep the list selection within `len` items
pub fn ensure_valid_selection(state: &mut ListState, len: usize) {
  if len == 0 {
    state.select(None);
  } else {
    match state.selected() {
      Some(i) if i >= len => state.select(Some(len - 1)),
      None => state.select(Some(0)),
      _ => {}
    }
  }
}

/// Paging keys shared by the list views
pub fn page_change_for(key: KeyEvent) -> Option<PageChange> {
  match key.code {
    KeyCode::Char('n') | KeyCode::Right | KeyCode::PageDown => Some(PageChange::Next),
    KeyCode::Char('p') | KeyCode::Left | KeyCode::PageUp => Some(PageChange::Prev),
    KeyCode::Char('g') => Some(PageChange::Goto(1)),
    KeyCode::Char('G') => Some(PageChange::Goto(u32::MAX)),
    _ => None,
  }
}

/// Block title for a paginated list: name, page position, loading/error
pub fn list_title<T>(name: &str, view: &QueryView<Vec<T>>) -> String {
  let mut title = format!(" {}", name);
  match &view.pagination {
    Some(p) => {
      let prev = if p.has_prev() { "‹ " } else { "" };
      let next = if p.has_next() { " ›" } else { "" };
      title.push_str(&format!(
        " ({}page {}/{}{}, {} total)",
        prev,
        p.page,
        p.page_count(),
        next,
        p.total
      ));
      if !p.search.is_empty() {
        title.push_str(&format!(" [/{}]", p.search));
      }
    }
    None => title.push_str(&format!(" ({})", view.data.len())),
  }
  if view.loading {
    title.push_str(" (loading...)");
  }
  if let Some(error) = &view.error {
    title.push_str(&format!(" (error: {})", error));
  }
  title.push(' ');
  title
}

/// Empty-state text after a failed load; only suggests retrying when it can help
pub fn load_failed_message(what: &str, error: &ErrorInfo) -> String {
  if error.is_retryable() {
    format!("Failed to load {}. Press 'r' to retry.", what)
  } else {
    format!("Failed to load {}: {}", what, error)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::PaginationState;
  use crossterm::event::KeyModifiers;

  #[test]
  fn test_ensure_valid_selection() {
    let mut state = ListState::default();
    ensure_valid_selection(&mut state, 3);
    assert_eq!(state.selected(), Some(0));
    state.select(Some(7));
    ensure_valid_selection(&mut state, 3);
    assert_eq!(state.selected(), Some(2));
    ensure_valid_selection(&mut state, 0);
    assert_eq!(state.selected(), None);
  }

  #[test]
  fn test_page_keys() {
    let key = |c| KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE);
    assert_eq!(page_change_for(key('n')), Some(PageChange::Next));
    assert_eq!(page_change_for(key('p')), Some(PageChange::Prev));
    assert_eq!(page_change_for(key('x')), None);
  }

  #[test]
  fn test_list_title() {
    let mut view: QueryView<Vec<u8>> = QueryView::empty();
    view.data = vec![1, 2];
    assert_eq!(list_title("Contacts", &view), " Contacts (2) ");

    view.pagination = Some(PaginationState {
      page: 2,
      limit: 10,
      total: 25,
      search: "ada".into(),
    });
    view.error = Some(ErrorInfo::network("offline"));
    assert_eq!(
      list_title("Contacts", &view),
      " Contacts (‹ page 2/3 ›, 25 total) [/ada] (error: network error: offline) "
    );
  }

  #[test]
  fn test_load_failed_message() {
    assert_eq!(
      load_failed_message("contacts", &ErrorInfo::network("offline")),
      "Failed to load contacts. Press 'r' to retry."
    );
    assert_eq!(
      load_failed_message("contacts", &ErrorInfo::from_status(404, "gone")),
      "Failed to load contacts: server error: gone"
    );
  }
}
