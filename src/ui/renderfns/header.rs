use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

use crate::api::types::Plan;
use crate::format::{format_currency, format_timestamp};
use crate::session::SessionState;
use crate::ui::view::ShortcutInfo;

/// Draw the header bar: title, signed-in user and plan, then shortcuts
pub fn draw_header(
  frame: &mut Frame,
  area: Rect,
  title: &str,
  session: &SessionState,
  shortcuts: &[ShortcutInfo],
) {
  let separator = || Span::styled("│", Style::default().fg(Color::DarkGray));
  let mut spans = vec![
    Span::styled(" qrdash ", Style::default().fg(Color::Cyan).bold()),
    separator(),
    Span::styled(format!(" {} ", title), Style::default().fg(Color::White)),
    separator(),
  ];

  match session.user.as_ref().filter(|_| session.is_authenticated) {
    Some(user) => {
      spans.push(Span::styled(
        format!(" {} ", user.display_name()),
        Style::default().fg(Color::Yellow).bold(),
      ));
      if user.is_admin() {
        spans.push(Span::styled("admin ", Style::default().fg(Color::Magenta)));
      }
      if let Some(plan) = &user.plan {
        spans.push(separator());
        spans.push(Span::styled(
          format!(" {} ", plan_label(plan)),
          Style::default().fg(Color::Green),
        ));
      }
    }
    None => spans.push(Span::styled(" signed out ", Style::default().fg(Color::Red))),
  }

  let mut shortcuts = shortcuts.to_vec();
  shortcuts.sort_by_key(|s| s.priority);
  for shortcut in shortcuts {
    spans.push(Span::raw("  "));
    spans.push(Span::styled(
      format!("<{}>", shortcut.key),
      Style::default().fg(Color::Cyan),
    ));
    spans.push(Span::styled(
      format!(" {}", shortcut.label),
      Style::default().fg(Color::DarkGray),
    ));
  }

  let paragraph = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::Black));
  frame.render_widget(paragraph, area);
}

/// "Pro $19.00/mo" or "Pro $19.00/mo, trial until Jan 5, 2024 12:00 AM"
pub fn plan_label(plan: &Plan) -> String {
  let price = format_currency(&plan.price, &plan.currency);
  match plan.trial_ends_at.as_deref().filter(|_| plan.is_trial()) {
    Some(ends) => format!("{} {}/mo, trial until {}", plan.name, price, format_timestamp(ends)),
    None => format!("{} {}/mo", plan.name, price),
  }
}

/// Host part of the API URL, used when no title is configured
pub fn extract_host(url: &str) -> &str {
  let rest = url
    .strip_prefix("https://")
    .or_else(|| url.strip_prefix("http://"))
    .unwrap_or(url);
  rest.split('/').next().unwrap_or(rest)
}
