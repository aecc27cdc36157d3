//! Session state, access gates, and sign-out cache eviction.

use std::collections::BTreeSet;
use tracing::info;

use crate::api::types::User;
use crate::cache::{Evict, EvictScope};

/// Who is signed in. Owned by the app and read by every query binding.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState {
  pub is_authenticated: bool,
  pub user: Option<User>,
}

impl SessionState {
  pub fn signed_in(user: User) -> Self {
    Self {
      is_authenticated: true,
      user: Some(user),
    }
  }

  pub fn signed_out() -> Self {
    Self::default()
  }

  pub fn is_admin(&self) -> bool {
    self.is_authenticated && self.user.as_ref().map(User::is_admin).unwrap_or(false)
  }
}

/// Who may fetch a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessGate {
  /// Any signed-in user
  Authenticated,
  /// Signed-in admins only
  AdminOnly,
}

impl AccessGate {
  pub fn allows(&self, authenticated: bool, admin: bool) -> bool {
    match self {
      AccessGate::Authenticated => authenticated,
      AccessGate::AdminOnly => authenticated && admin,
    }
  }
}

/// Evicts cached resources when the session signs out.
///
/// Query bindings register the scopes they populate; on a true → false
/// transition of `is_authenticated` every registered scope is evicted.
#[derive(Debug, Default)]
pub struct SessionListener {
  was_authenticated: bool,
  scopes: BTreeSet<EvictScope>,
}

impl SessionListener {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn register(&mut self, scope: EvictScope) {
    self.scopes.insert(scope);
  }

  pub fn scopes(&self) -> impl Iterator<Item = &EvictScope> {
    self.scopes.iter()
  }

  /// Feed the current session; returns how many entries were evicted.
  pub fn observe(&mut self, session: &SessionState, target: &dyn Evict) -> usize {
    let signed_out = self.was_authenticated && !session.is_authenticated;
    self.was_authenticated = session.is_authenticated;
    if !signed_out {
      return 0;
    }

    let removed: usize = self.scopes.iter().map(|scope| target.evict(scope)).sum();
    info!(removed, scopes = self.scopes.len(), "signed out, cleared cached resources");
    removed
  }
}
