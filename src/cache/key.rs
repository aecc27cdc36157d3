//! Resource keys and eviction scopes.

use std::fmt;

/// Kinds of remote resources the dashboard caches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceKind {
  AuditLogs,
  Contacts,
  QrAnalytics,
}

impl ResourceKind {
  pub fn as_str(&self) -> &'static str {
    match self {
      ResourceKind::AuditLogs => "audit-logs",
      ResourceKind::Contacts => "contacts",
      ResourceKind::QrAnalytics => "qr-analytics",
    }
  }
}

/// Stable identity of one cached entity or list, e.g. `contacts` or
/// `qr-analytics:7f3a`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceKey(String);

impl ResourceKey {
  /// Key of a list resource; its params live in the entry, not the key.
  pub fn list(kind: ResourceKind) -> Self {
    Self(kind.as_str().to_string())
  }

  /// Key of a single entity of the given kind.
  pub fn entity(kind: ResourceKind, id: &str) -> Self {
    Self(format!("{}:{}", kind.as_str(), id))
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }

  /// Whether the key sits under `prefix` (the prefix itself or `prefix:...`).
  pub fn has_prefix(&self, prefix: &str) -> bool {
    match self.0.strip_prefix(prefix) {
      Some(rest) => rest.is_empty() || rest.starts_with(':'),
      None => false,
    }
  }
}

impl fmt::Display for ResourceKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

/// Which entries an eviction removes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EvictScope {
  Key(ResourceKey),
  Prefix(String),
  All,
}

impl EvictScope {
  /// Every entry of a resource kind.
  pub fn kind(kind: ResourceKind) -> Self {
    EvictScope::Prefix(kind.as_str().to_string())
  }

  pub fn matches(&self, key: &ResourceKey) -> bool {
    match self {
      EvictScope::Key(k) => k == key,
      EvictScope::Prefix(prefix) => key.has_prefix(prefix),
      EvictScope::All => true,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_key_format() {
    assert_eq!(ResourceKey::list(ResourceKind::Contacts).as_str(), "contacts");
    assert_eq!(
      ResourceKey::entity(ResourceKind::QrAnalytics, "abc").as_str(),
      "qr-analytics:abc"
    );
  }

  #[test]
  fn test_prefix_scope() {
    let scope = EvictScope::kind(ResourceKind::QrAnalytics);
    assert!(scope.matches(&ResourceKey::entity(ResourceKind::QrAnalytics, "1")));
    assert!(!scope.matches(&ResourceKey::list(ResourceKind::Contacts)));

    // "contacts" must not swallow a hypothetical "contacts-archive" key
    let scope = EvictScope::Prefix("contacts".into());
    assert!(scope.matches(&ResourceKey::list(ResourceKind::Contacts)));
    assert!(!scope.matches(&ResourceKey("contacts-archive".into())));
  }

  #[test]
  fn test_key_and_all_scopes() {
    let key = ResourceKey::list(ResourceKind::AuditLogs);
    assert!(EvictScope::Key(key.clone()).matches(&key));
    assert!(!EvictScope::Key(key.clone()).matches(&ResourceKey::list(ResourceKind::Contacts)));
    assert!(EvictScope::All.matches(&key));
  }
}
