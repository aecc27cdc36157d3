//! Display formatting for timestamps, times of day and money.
//!
//! Every function takes the raw API string and hands it back unchanged when
//! it cannot be parsed, so a bad value shows up as-is instead of vanishing.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Utc};

const TIMESTAMP_FORMAT: &str = "%b %-d, %Y %-I:%M %p";
const DATE_FORMAT: &str = "%b %-d, %Y";

fn parse_timestamp(input: &str) -> Option<DateTime<FixedOffset>> {
  let input = input.trim();
  DateTime::parse_from_rfc3339(input).ok().or_else(|| {
    NaiveDateTime::parse_from_str(input, "%Y-%m-%dT%H:%M:%S%.f")
      .ok()
      .map(|naive| naive.and_utc().fixed_offset())
  })
}

/// "2024-01-05T15:04:00Z" -> "Jan 5, 2024 3:04 PM"
///
/// Wall-clock time is shown in the timestamp's own offset. Bare dates
/// ("2024-01-05") format without a time.
pub fn format_timestamp(input: &str) -> String {
  if let Some(ts) = parse_timestamp(input) {
    return ts.format(TIMESTAMP_FORMAT).to_string();
  }
  match NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d") {
    Ok(date) => date.format(DATE_FORMAT).to_string(),
    Err(_) => input.to_string(),
  }
}

/// Age of `input` relative to `now`: "just now", "5m ago", "3h ago", "2d ago".
///
/// From 30 days on, and for timestamps in the future, the absolute
/// `format_timestamp` form is used instead.
pub fn format_relative(input: &str, now: DateTime<Utc>) -> String {
  let Some(ts) = parse_timestamp(input) else {
    return input.to_string();
  };
  let elapsed = now.signed_duration_since(ts);
  let secs = elapsed.num_seconds();

  if secs < -60 {
    format_timestamp(input)
  } else if secs < 60 {
    "just now".to_string()
  } else if elapsed.num_minutes() < 60 {
    format!("{}m ago", elapsed.num_minutes())
  } else if elapsed.num_hours() < 24 {
    format!("{}h ago", elapsed.num_hours())
  } else if elapsed.num_days() < 30 {
    format!("{}d ago", elapsed.num_days())
  } else {
    format_timestamp(input)
  }
}

/// "14:30" -> "2:30 PM". Seconds ("14:30:15") are accepted and dropped.
pub fn format_clock_time(input: &str) -> String {
  let trimmed = input.trim();
  NaiveTime::parse_from_str(trimmed, "%H:%M")
    .or_else(|_| NaiveTime::parse_from_str(trimmed, "%H:%M:%S"))
    .map(|time| time.format("%-I:%M %p").to_string())
    .unwrap_or_else(|_| input.to_string())
}

fn currency_symbol(code: &str) -> Option<&'static str> {
  match code {
    "USD" => Some("$"),
    "EUR" => Some("€"),
    "GBP" => Some("£"),
    "JPY" => Some("¥"),
    _ => None,
  }
}

/// Insert thousands separators into a run of digits.
fn group_thousands(digits: &str) -> String {
  let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
  for (i, ch) in digits.chars().enumerate() {
    if i > 0 && (digits.len() - i) % 3 == 0 {
      grouped.push(',');
    }
    grouped.push(ch);
  }
  grouped
}

/// "1234.5", "USD" -> "$1,234.50"
///
/// USD, EUR, GBP and JPY get their symbol (JPY without decimals); any other
/// code is written in front: "CHF 1,234.50".
pub fn format_currency(amount: &str, code: &str) -> String {
  let Ok(value) = amount.trim().parse::<f64>() else {
    return amount.to_string();
  };
  if !value.is_finite() {
    return amount.to_string();
  }

  let code = code.trim().to_uppercase();
  let decimals = if code == "JPY" { 0 } else { 2 };
  let fixed = format!("{:.*}", decimals, value.abs());
  let (whole, fraction) = match fixed.split_once('.') {
    Some((whole, fraction)) => (whole, Some(fraction)),
    None => (fixed.as_str(), None),
  };

  let mut number = group_thousands(whole);
  if let Some(fraction) = fraction {
    number.push('.');
    number.push_str(fraction);
  }

  // "-0.00" is still zero
  let sign = if value < 0.0 && fixed.chars().any(|c| c.is_ascii_digit() && c != '0') {
    "-"
  } else {
    ""
  };
  match currency_symbol(&code) {
    Some(symbol) => format!("{}{}{}", sign, symbol, number),
    None if code.is_empty() => format!("{}{}", sign, number),
    None => format!("{}{} {}", sign, code, number),
  }
}
