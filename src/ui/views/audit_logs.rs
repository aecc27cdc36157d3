use chrono::Utc;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};

use crate::api::types::AuditLog;
use crate::cache::{
  EvictScope, ListParams, ResourceKey, ResourceKind, Store, FILTER_FROM, MAX_PAGE_SIZE,
};
use crate::format::format_relative;
use crate::query::{PageChange, Query};
use crate::session::AccessGate;
use crate::ui::components::{KeyResult, SearchEvent, SearchInput};
use crate::ui::renderfns::{action_color, truncate};
use crate::ui::view::{Context, ShortcutInfo, View, ViewAction};
use crate::ui::views::QrAnalyticsView;
use crate::ui::{ensure_valid_selection, list_title, load_failed_message, page_change_for};

fn audit_key() -> ResourceKey {
  ResourceKey::list(ResourceKind::AuditLogs)
}

/// Admin-only audit trail. Members see a notice and nothing is fetched.
pub struct AuditLogsView {
  store: Store<Vec<AuditLog>, ListParams>,
  query: Query<Vec<AuditLog>, ListParams>,
  params: ListParams,
  list_state: ListState,
  search: SearchInput,
}

impl AuditLogsView {
  pub fn new(ctx: &Context) -> Self {
    let store = ctx.stores.audit_logs.clone();
    let api = ctx.api.clone();
    let query = Query::new(
      store.clone(),
      ResourceKind::AuditLogs,
      AccessGate::AdminOnly,
      ctx.config.cache.policy(),
      move |params: ListParams| {
        let api = api.clone();
        async move { api.fetch_audit_logs(&params).await }
      },
    );

    let params = store
      .with_entry(&audit_key(), |entry| entry.params.clone())
      .unwrap_or_else(|| ListParams::with_limit(ctx.config.lists.page_size.clamp(1, MAX_PAGE_SIZE)));

    Self {
      store,
      query,
      params,
      list_state: ListState::default(),
      search: SearchInput::new(),
    }
  }

  fn change_page(&mut self, change: PageChange) {
    let pagination = self
      .store
      .with_entry(&audit_key(), |entry| entry.pagination.clone())
      .flatten();
    self.params = self.params.apply(change, pagination.as_ref());
  }

  /// Toggle a "last 24 hours" window on the log
  fn toggle_recent(&mut self) {
    let change = if self.params.filters.contains_key(FILTER_FROM) {
      PageChange::Filter(FILTER_FROM.into(), None)
    } else {
      let since = Utc::now() - chrono::Duration::hours(24);
      PageChange::Filter(FILTER_FROM.into(), Some(since.to_rfc3339()))
    };
    self.change_page(change);
  }

  fn handle_search(&mut self, key: KeyEvent) -> Option<ViewAction> {
    match self.search.handle_key(key, &self.params.search) {
      KeyResult::Handled => Some(ViewAction::None),
      KeyResult::Event(SearchEvent::Submitted(query)) => {
        self.change_page(PageChange::Search(query));
        Some(ViewAction::None)
      }
      KeyResult::Event(SearchEvent::Cancelled) => Some(ViewAction::None),
      KeyResult::NotHandled => None,
    }
  }

  fn handle_navigation(&mut self, key: KeyEvent) -> Option<ViewAction> {
    if let Some(change) = page_change_for(key) {
      self.change_page(change);
      return Some(ViewAction::None);
    }
    match key.code {
      KeyCode::Char('j') | KeyCode::Down => self.list_state.select_next(),
      KeyCode::Char('k') | KeyCode::Up => self.list_state.select_previous(),
      KeyCode::Char('t') => self.toggle_recent(),
      _ => return None,
    }
    Some(ViewAction::None)
  }

  fn handle_actions(&mut self, key: KeyEvent, ctx: &Context) -> Option<ViewAction> {
    match key.code {
      KeyCode::Char('r') => {
        self.query.refresh();
        Some(ViewAction::None)
      }
      KeyCode::Enter => {
        let idx = self.list_state.selected()?;
        let logs = self.query.view().data;
        let qr_id = logs.get(idx)?.qr_code_id()?;
        Some(ViewAction::Push(Box::new(QrAnalyticsView::new(ctx, qr_id))))
      }
      KeyCode::Char('q') | KeyCode::Esc => Some(ViewAction::Pop),
      _ => None,
    }
  }

  fn render_list(&mut self, frame: &mut Frame, area: Rect) {
    let view = self.query.view();
    ensure_valid_selection(&mut self.list_state, view.data.len());

    let mut title = list_title("Audit log", &view);
    if self.params.filters.contains_key(FILTER_FROM) {
      title.push_str("[last 24h] ");
    }
    let block = Block::default()
      .title(title)
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    if view.data.is_empty() && !view.loading {
      let content = if !self.query.is_permitted() {
        "The audit log is only available to admins.".to_string()
      } else if let Some(error) = &view.error {
        load_failed_message("the audit log", error)
      } else {
        "No audit entries.".to_string()
      };
      let paragraph = Paragraph::new(content)
        .block(block)
        .style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, area);
      return;
    }

    let now = Utc::now();
    let items: Vec<ListItem> = view
      .data
      .iter()
      .map(|log| {
        let target = match (&log.target_type, &log.target_id) {
          (Some(kind), Some(id)) => format!("{}:{}", kind, id),
          (Some(kind), None) => kind.clone(),
          _ => "-".to_string(),
        };
        ListItem::new(Line::from(vec![
          Span::styled(
            format!("{:<12}", format_relative(&log.created_at, now)),
            Style::default().fg(Color::DarkGray),
          ),
          Span::raw(" "),
          Span::styled(
            format!("{:<24}", truncate(&log.actor, 24)),
            Style::default().fg(Color::Cyan),
          ),
          Span::raw(" "),
          Span::styled(
            format!("{:<22}", truncate(&log.action, 22)),
            Style::default().fg(action_color(&log.action)),
          ),
          Span::raw(" "),
          Span::raw(truncate(&target, 40)),
          Span::styled(
            log
              .ip_address
              .as_deref()
              .map(|ip| format!("  {}", ip))
              .unwrap_or_default(),
            Style::default().fg(Color::DarkGray),
          ),
        ]))
      })
      .collect();

    let list = List::new(items)
      .block(block)
      .highlight_style(
        Style::default()
          .bg(Color::DarkGray)
          .add_modifier(Modifier::BOLD),
      )
      .highlight_symbol("> ");

    frame.render_stateful_widget(list, area, &mut self.list_state);
  }
}

impl View for AuditLogsView {
  fn handle_key(&mut self, key: KeyEvent, ctx: &Context) -> ViewAction {
    self
      .handle_search(key)
      .or_else(|| self.handle_navigation(key))
      .or_else(|| self.handle_actions(key, ctx))
      .unwrap_or(ViewAction::None)
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    self.render_list(frame, area);
    self.search.render_overlay(frame, area);
  }

  fn breadcrumb_label(&self) -> String {
    "Audit log".to_string()
  }

  fn tick(&mut self, ctx: &Context) {
    self.query.sync(ctx.session, audit_key(), self.params.clone());
  }

  fn scopes(&self) -> Vec<EvictScope> {
    vec![self.query.scope()]
  }

  fn unbind(&mut self) {
    self.query.unbind();
  }

  fn is_capturing_input(&self) -> bool {
    self.search.is_active()
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new(":", "command").with_priority(10),
      ShortcutInfo::new("/", "search").with_priority(20),
      ShortcutInfo::new("n/p", "page").with_priority(30),
      ShortcutInfo::new("t", "last 24h").with_priority(40),
      ShortcutInfo::new("enter", "qr analytics").with_priority(45),
      ShortcutInfo::new("r", "refresh").with_priority(50),
    ]
  }
}
