use crate::api::types::{AuditLog, Contact, QrAnalytics};

use super::key::EvictScope;
use super::params::{EntityParams, ListParams};
use super::store::Store;
use super::traits::Evict;

/// Every resource store the dashboard uses, built once at start-up and
/// handed to the views that bind to them.
#[derive(Clone, Default)]
pub struct Stores {
  pub audit_logs: Store<Vec<AuditLog>, ListParams>,
  pub contacts: Store<Vec<Contact>, ListParams>,
  pub qr_analytics: Store<QrAnalytics, EntityParams>,
}

impl Stores {
  pub fn new() -> Self {
    Self::default()
  }

  /// Total number of cached entries across all stores
  pub fn len(&self) -> usize {
    self.audit_logs.len() + self.contacts.len() + self.qr_analytics.len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }
}

impl Evict for Stores {
  fn evict(&self, scope: &EvictScope) -> usize {
    self.audit_logs.evict(scope) + self.contacts.evict(scope) + self.qr_analytics.evict(scope)
  }
}
