//! Core traits for the caching system.

use std::fmt::Debug;

use crate::api::types::PageMeta;

use super::entry::PaginationState;
use super::key::EvictScope;

/// Parameters a resource is fetched with.
///
/// Two params values that compare unequal describe different requests, so an
/// entry cached under one is stale for the other.
pub trait QueryParams: Clone + PartialEq + Debug + Send + Sync + 'static {
  /// Pagination state to store alongside data fetched with these params.
  /// Single-entity params have none.
  fn pagination(&self, _meta: &PageMeta) -> Option<PaginationState> {
    None
  }
}

/// Anything that can drop cached entries by scope.
///
/// Implementations must be idempotent: evicting an empty scope removes
/// nothing and returns 0.
pub trait Evict {
  /// Remove every entry matching `scope`, returning how many were removed.
  fn evict(&self, scope: &EvictScope) -> usize;
}
