use ratatui::prelude::Color;

/// Truncate to at most `max_len` characters, adding "..." if truncated
pub fn truncate(s: &str, max_len: usize) -> String {
  if s.chars().count() <= max_len {
    s.to_string()
  } else {
    let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
    format!("{}...", kept)
  }
}

/// Display color for an audit log action ("contact.deleted", "qr_code.created", ...)
pub fn action_color(action: &str) -> Color {
  let verb = action.rsplit('.').next().unwrap_or(action);
  match verb {
    "deleted" | "revoked" | "failed" => Color::Red,
    "created" | "restored" => Color::Green,
    "updated" | "renamed" => Color::Yellow,
    _ => Color::White,
  }
}

pub fn subscribed_color(subscribed: bool) -> Color {
  if subscribed {
    Color::Green
  } else {
    Color::DarkGray
  }
}

/// Horizontal bar of `width` cells scaled by `value / max`
pub fn bar(value: u64, max: u64, width: usize) -> String {
  if max == 0 {
    return String::new();
  }
  let filled = (value.min(max) as u128 * width as u128 / max as u128) as usize;
  let filled = if value > 0 { filled.max(1) } else { 0 };
  "█".repeat(filled)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_truncate() {
    assert_eq!(truncate("hello", 5), "hello");
    assert_eq!(truncate("hello world", 8), "hello...");
    assert_eq!(truncate("Zoë Ångström", 6), "Zoë...");
  }

  #[test]
  fn test_action_color() {
    assert_eq!(action_color("contact.deleted"), Color::Red);
    assert_eq!(action_color("qr_code.created"), Color::Green);
    assert_eq!(action_color("plan.updated"), Color::Yellow);
    assert_eq!(action_color("login"), Color::White);
  }

  #[test]
  fn test_bar() {
    assert_eq!(bar(50, 100, 10), "█████");
    assert_eq!(bar(1, 1000, 10), "█");
    assert_eq!(bar(0, 100, 10), "");
    assert_eq!(bar(5, 0, 10), "");
  }
}
