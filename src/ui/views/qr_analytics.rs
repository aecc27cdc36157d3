use chrono::Utc;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};

use crate::api::types::{QrAnalytics, ScanBreakdown};
use crate::cache::{EntityParams, EvictScope, ResourceKey, ResourceKind};
use crate::format::{format_clock_time, format_relative, format_timestamp};
use crate::query::Query;
use crate::session::AccessGate;
use crate::ui::renderfns::{bar, truncate};
use crate::ui::load_failed_message;
use crate::ui::view::{Context, ShortcutInfo, View, ViewAction};

/// Days of history shown in the scan chart
const CHART_DAYS: usize = 14;
const BAR_WIDTH: usize = 30;

/// Scan analytics of a single QR code
pub struct QrAnalyticsView {
  qr_id: String,
  query: Query<QrAnalytics, EntityParams>,
}

impl QrAnalyticsView {
  pub fn new(ctx: &Context, qr_id: &str) -> Self {
    let api = ctx.api.clone();
    let query = Query::new(
      ctx.stores.qr_analytics.clone(),
      ResourceKind::QrAnalytics,
      AccessGate::Authenticated,
      ctx.config.cache.policy(),
      move |params: EntityParams| {
        let api = api.clone();
        async move { api.fetch_qr_analytics(&params).await }
      },
    );

    Self {
      qr_id: qr_id.trim().to_string(),
      query,
    }
  }

  fn key(&self) -> ResourceKey {
    ResourceKey::entity(ResourceKind::QrAnalytics, &self.qr_id)
  }

  fn summary_lines(analytics: &QrAnalytics) -> Vec<Line<'static>> {
    let label = |text: &str| Span::styled(format!("{:<16}", text), Style::default().fg(Color::DarkGray));
    let last_scan = match analytics.last_scanned_at.as_deref() {
      Some(ts) => format!(
        "{} ({})",
        format_relative(ts, Utc::now()),
        format_timestamp(ts)
      ),
      None => "never".to_string(),
    };
    let peak = analytics
      .peak_hour
      .as_deref()
      .map(format_clock_time)
      .unwrap_or_else(|| "-".to_string());
    vec![
      Line::from(vec![
        label("Name"),
        Span::styled(analytics.name.clone(), Style::default().fg(Color::Cyan).bold()),
      ]),
      Line::from(vec![label("Total scans"), Span::raw(analytics.total_scans.to_string())]),
      Line::from(vec![label("Unique scans"), Span::raw(analytics.unique_scans.to_string())]),
      Line::from(vec![label("Last scanned"), Span::raw(last_scan)]),
      Line::from(vec![label("Peak hour"), Span::raw(peak)]),
    ]
  }

  fn chart_lines(analytics: &QrAnalytics) -> Vec<Line<'static>> {
    let start = analytics.scans_by_day.len().saturating_sub(CHART_DAYS);
    let days = &analytics.scans_by_day[start..];
    let max = days.iter().map(|d| d.count).max().unwrap_or(0);
    if days.is_empty() {
      return vec![Line::styled("No scans recorded yet.", Style::default().fg(Color::DarkGray))];
    }
    days
      .iter()
      .map(|day| {
        Line::from(vec![
          Span::styled(format!("{} ", day.date), Style::default().fg(Color::DarkGray)),
          Span::styled(format!("{:<width$}", bar(day.count, max, BAR_WIDTH), width = BAR_WIDTH), Style::default().fg(Color::Green)),
          Span::raw(format!(" {}", day.count)),
        ])
      })
      .collect()
  }

  fn breakdown_lines(rows: &[ScanBreakdown]) -> Vec<Line<'static>> {
    if rows.is_empty() {
      return vec![Line::styled("-", Style::default().fg(Color::DarkGray))];
    }
    rows
      .iter()
      .map(|row| {
        Line::from(vec![
          Span::raw(format!("{:<20}", truncate(&row.label, 20))),
          Span::styled(row.count.to_string(), Style::default().fg(Color::Yellow)),
        ])
      })
      .collect()
  }

  fn render_detail(&self, frame: &mut Frame, area: Rect) {
    let view = self.query.view();
    let mut title = format!(" QR {} ", self.qr_id);
    if view.loading {
      title.push_str("(loading...) ");
    }
    if let Some(error) = &view.error {
      title.push_str(&format!("(error: {}) ", error));
    }

    let block = Block::default()
      .title(title)
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    if view.fetched_at.is_none() {
      let message = if !self.query.is_permitted() {
        "Signed out. Use :login to load analytics.".to_string()
      } else if let Some(error) = &view.error {
        load_failed_message("analytics", error)
      } else {
        "Loading analytics...".to_string()
      };
      let paragraph = Paragraph::new(message).style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, inner);
      return;
    }

    let analytics = &view.data;
    let rows = Layout::default()
      .direction(Direction::Vertical)
      .constraints([Constraint::Length(6), Constraint::Min(3)])
      .split(inner);
    frame.render_widget(Paragraph::new(Self::summary_lines(analytics)), rows[0]);

    let columns = Layout::default()
      .direction(Direction::Horizontal)
      .constraints([
        Constraint::Percentage(50),
        Constraint::Percentage(25),
        Constraint::Percentage(25),
      ])
      .split(rows[1]);

    let section = |title: &'static str| {
      Block::default()
        .title(title)
        .borders(Borders::TOP)
        .border_style(Style::default().fg(Color::DarkGray))
    };
    frame.render_widget(
      Paragraph::new(Self::chart_lines(analytics)).block(section(" Scans per day ")),
      columns[0],
    );
    frame.render_widget(
      Paragraph::new(Self::breakdown_lines(&analytics.top_locations))
        .block(section(" Top locations "))
        .wrap(Wrap { trim: true }),
      columns[1],
    );
    frame.render_widget(
      Paragraph::new(Self::breakdown_lines(&analytics.devices))
        .block(section(" Devices "))
        .wrap(Wrap { trim: true }),
      columns[2],
    );
  }
}

impl View for QrAnalyticsView {
  fn handle_key(&mut self, key: KeyEvent, _ctx: &Context) -> ViewAction {
    match key.code {
      KeyCode::Char('r') => {
        self.query.refresh();
        ViewAction::None
      }
      KeyCode::Char('q') | KeyCode::Esc => ViewAction::Pop,
      _ => ViewAction::None,
    }
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    self.render_detail(frame, area);
  }

  fn breadcrumb_label(&self) -> String {
    format!("QR {}", self.qr_id)
  }

  fn tick(&mut self, ctx: &Context) {
    let params = EntityParams::new(self.qr_id.clone());
    self.query.sync(ctx.session, self.key(), params);
  }

  fn scopes(&self) -> Vec<EvictScope> {
    vec![self.query.scope()]
  }

  fn unbind(&mut self) {
    self.query.unbind();
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new(":", "command").with_priority(10),
      ShortcutInfo::new("r", "refresh").with_priority(50),
      ShortcutInfo::new("q", "back").with_priority(90),
    ]
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::types::DailyScans;

  fn analytics(counts: &[u64]) -> QrAnalytics {
    QrAnalytics {
      qr_id: "qr-1".into(),
      name: "Menu".into(),
      scans_by_day: counts
        .iter()
        .enumerate()
        .map(|(i, count)| DailyScans {
          date: format!("2024-01-{:02}", i + 1),
          count: *count,
        })
        .collect(),
      ..Default::default()
    }
  }

  #[test]
  fn test_chart_shows_recent_days_only() {
    let lines = QrAnalyticsView::chart_lines(&analytics(&[1; 20]));
    assert_eq!(lines.len(), CHART_DAYS);
    assert!(lines[0].spans[0].content.starts_with("2024-01-07"));
  }

  #[test]
  fn test_summary_peak_hour() {
    let mut data = analytics(&[]);
    data.peak_hour = Some("18:00".into());
    let lines = QrAnalyticsView::summary_lines(&data);
    assert_eq!(lines.len(), 5);
    assert_eq!(lines[4].spans[1].content, "6:00 PM");
    assert_eq!(lines[3].spans[1].content, "never");
  }

  #[test]
  fn test_empty_chart() {
    let lines = QrAnalyticsView::chart_lines(&analytics(&[]));
    assert_eq!(lines.len(), 1);
  }
}
