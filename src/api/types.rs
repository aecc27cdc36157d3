use serde::{Deserialize, Serialize};

/// Signed-in user as returned by `/api/auth/me`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
  pub id: String,
  pub email: String,
  #[serde(default)]
  pub name: String,
  #[serde(default)]
  pub role: String,
  pub plan: Option<Plan>,
}

impl User {
  pub fn is_admin(&self) -> bool {
    self.role.eq_ignore_ascii_case("admin")
  }

  pub fn display_name(&self) -> &str {
    if self.name.is_empty() {
      &self.email
    } else {
      &self.name
    }
  }
}

/// Subscription summary attached to a user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
  pub name: String,
  /// Decimal amount as a string, e.g. "19.00"
  pub price: String,
  pub currency: String,
  /// "active", "trialing", "canceled", ...
  #[serde(default)]
  pub status: String,
  pub trial_ends_at: Option<String>,
}

impl Plan {
  pub fn is_trial(&self) -> bool {
    self.status == "trialing"
  }
}

/// Pagination metadata from list endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
  pub page: u32,
  pub limit: u32,
  pub total: u64,
  pub total_pages: Option<u32>,
}

/// Admin audit log record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditLog {
  pub id: String,
  /// RFC 3339 timestamp
  pub created_at: String,
  /// Email or name of the acting user
  pub actor: String,
  /// e.g. "qr_code.created", "contact.deleted"
  pub action: String,
  pub target_type: Option<String>,
  pub target_id: Option<String>,
  pub ip_address: Option<String>,
}

impl AuditLog {
  /// QR code id this entry refers to, if any
  pub fn qr_code_id(&self) -> Option<&str> {
    match self.target_type.as_deref() {
      Some("qr_code") => self.target_id.as_deref(),
      _ => None,
    }
  }
}

/// Contact captured through a QR landing page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
  pub id: String,
  pub name: String,
  pub email: String,
  pub phone: Option<String>,
  #[serde(default)]
  pub tags: Vec<String>,
  #[serde(default)]
  pub subscribed: bool,
  pub created_at: String,
}

/// Fields sent when creating or updating a contact
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactDraft {
  pub name: String,
  pub email: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub phone: Option<String>,
  #[serde(default)]
  pub tags: Vec<String>,
  #[serde(default)]
  pub subscribed: bool,
}

impl ContactDraft {
  /// Parse `Name <email>` (phone optional after the address).
  pub fn parse(input: &str) -> Option<Self> {
    let (name, rest) = input.split_once('<')?;
    let (email, tail) = rest.split_once('>')?;
    let name = name.trim();
    let email = email.trim();
    if name.is_empty() || !email.contains('@') {
      return None;
    }
    let phone = Some(tail.trim()).filter(|p| !p.is_empty()).map(String::from);
    Some(Self {
      name: name.to_string(),
      email: email.to_string(),
      phone,
      tags: Vec::new(),
      subscribed: true,
    })
  }
}

impl From<&Contact> for ContactDraft {
  fn from(contact: &Contact) -> Self {
    Self {
      name: contact.name.clone(),
      email: contact.email.clone(),
      phone: contact.phone.clone(),
      tags: contact.tags.clone(),
      subscribed: contact.subscribed,
    }
  }
}

/// Scan analytics for a single QR code
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QrAnalytics {
  pub qr_id: String,
  #[serde(default)]
  pub name: String,
  #[serde(default)]
  pub total_scans: u64,
  #[serde(default)]
  pub unique_scans: u64,
  pub last_scanned_at: Option<String>,
  /// Busiest hour of day, "HH:MM"
  pub peak_hour: Option<String>,
  #[serde(default)]
  pub scans_by_day: Vec<DailyScans>,
  #[serde(default)]
  pub top_locations: Vec<ScanBreakdown>,
  #[serde(default)]
  pub devices: Vec<ScanBreakdown>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyScans {
  /// YYYY-MM-DD
  pub date: String,
  pub count: u64,
}

/// Scan count grouped by a label (country, device type, ...)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanBreakdown {
  pub label: String,
  pub count: u64,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_parse_contact_draft() {
    let draft = ContactDraft::parse("Ada Lovelace <ada@example.com>").unwrap();
    assert_eq!(draft.name, "Ada Lovelace");
    assert_eq!(draft.email, "ada@example.com");
    assert_eq!(draft.phone, None);

    let draft = ContactDraft::parse("Bob <bob@example.com> +1 555 0100").unwrap();
    assert_eq!(draft.phone.as_deref(), Some("+1 555 0100"));
  }

  #[test]
  fn test_parse_contact_draft_rejects_garbage() {
    assert!(ContactDraft::parse("no email here").is_none());
    assert!(ContactDraft::parse("<a@b.c>").is_none());
    assert!(ContactDraft::parse("Name <not-an-email>").is_none());
  }

  #[test]
  fn test_admin_role() {
    let user: User =
      serde_json::from_str(r#"{"id":"u1","email":"a@b.c","role":"ADMIN","plan":null}"#).unwrap();
    assert!(user.is_admin());
    assert_eq!(user.display_name(), "a@b.c");
  }

  #[test]
  fn test_audit_log_qr_target() {
    let log = AuditLog {
      id: "1".into(),
      created_at: "2024-01-01T00:00:00Z".into(),
      actor: "root".into(),
      action: "qr_code.updated".into(),
      target_type: Some("qr_code".into()),
      target_id: Some("qr-9".into()),
      ip_address: None,
    };
    assert_eq!(log.qr_code_id(), Some("qr-9"));
  }
}
