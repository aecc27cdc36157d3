use chrono::{DateTime, Utc};

use crate::api::ErrorInfo;

/// Identifier of one issued fetch. Ids are unique across a store and grow
/// monotonically, so a later fetch for a key always has a larger id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(pub(crate) u64);

impl RequestId {
  pub fn value(&self) -> u64 {
    self.0
  }
}

/// Pagination state of a list entry
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaginationState {
  pub page: u32,
  pub limit: u32,
  pub total: u64,
  pub search: String,
}

impl PaginationState {
  /// Number of pages given `total` and `limit` (at least 1).
  pub fn page_count(&self) -> u32 {
    if self.limit == 0 || self.total == 0 {
      return 1;
    }
    let pages = self.total.div_ceil(u64::from(self.limit));
    u32::try_from(pages).unwrap_or(u32::MAX)
  }

  pub fn has_next(&self) -> bool {
    self.page < self.page_count()
  }

  pub fn has_prev(&self) -> bool {
    self.page > 1
  }
}

/// Cached state of one resource key.
#[derive(Debug, Clone)]
pub struct ResourceEntry<T, P> {
  /// Last successfully fetched (or locally mutated) data
  pub data: Option<T>,
  pub loading: bool,
  pub error: Option<ErrorInfo>,
  /// Set only when a fetch completes successfully
  pub last_fetched_at: Option<DateTime<Utc>>,
  /// Params of the most recently issued fetch
  pub params: P,
  pub pagination: Option<PaginationState>,
  /// Latest issued fetch; completions carrying any other id are dropped
  pub request: Option<RequestId>,
}

impl<T, P> ResourceEntry<T, P> {
  pub fn new(params: P) -> Self {
    Self {
      data: None,
      loading: false,
      error: None,
      last_fetched_at: None,
      params,
      pagination: None,
      request: None,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_page_count() {
    let state = PaginationState {
      page: 1,
      limit: 10,
      total: 21,
      search: String::new(),
    };
    assert_eq!(state.page_count(), 3);
    assert!(state.has_next());
    assert!(!state.has_prev());
  }

  #[test]
  fn test_page_count_empty_list() {
    let state = PaginationState {
      page: 1,
      limit: 10,
      total: 0,
      search: String::new(),
    };
    assert_eq!(state.page_count(), 1);
    assert!(!state.has_next());
  }
}
