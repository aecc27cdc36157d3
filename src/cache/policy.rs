//! Decides whether a cached entry needs a refetch.

use chrono::{DateTime, Duration, Utc};

use super::entry::ResourceEntry;
use super::traits::QueryParams;

/// Freshness rules applied before every fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StalenessPolicy {
  /// How long a successful fetch stays fresh
  freshness: Duration,
}

impl Default for StalenessPolicy {
  fn default() -> Self {
    Self {
      freshness: Duration::minutes(5),
    }
  }
}

impl StalenessPolicy {
  pub fn new(freshness: Duration) -> Self {
    Self { freshness }
  }

  pub fn freshness(&self) -> Duration {
    self.freshness
  }

  /// Whether a fetch with `params` is warranted at `now`.
  ///
  /// - no entry: fetch
  /// - params changed: fetch
  /// - same params already loading: don't (the in-flight fetch covers it)
  /// - never succeeded, or last attempt failed: fetch
  /// - older than the freshness window: fetch
  pub fn should_fetch<T, P: QueryParams>(
    &self,
    entry: Option<&ResourceEntry<T, P>>,
    params: &P,
    now: DateTime<Utc>,
  ) -> bool {
    let Some(entry) = entry else {
      return true;
    };

    if entry.params != *params {
      return true;
    }

    if entry.loading {
      return false;
    }

    if entry.error.is_some() {
      return true;
    }

    match entry.last_fetched_at {
      Some(fetched_at) => now - fetched_at > self.freshness,
      None => true,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::ErrorInfo;
  use crate::cache::params::ListParams;
  use chrono::TimeZone;

  fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
  }

  fn fetched_entry(params: ListParams, age: Duration) -> ResourceEntry<Vec<u32>, ListParams> {
    let mut entry = ResourceEntry::new(params);
    entry.data = Some(vec![1, 2, 3]);
    entry.last_fetched_at = Some(now() - age);
    entry
  }

  #[test]
  fn test_missing_entry_fetches() {
    let policy = StalenessPolicy::default();
    let params = ListParams::default();
    assert!(policy.should_fetch::<Vec<u32>, _>(None, &params, now()));
  }

  #[test]
  fn test_fresh_entry_with_same_params_does_not_fetch() {
    let policy = StalenessPolicy::new(Duration::minutes(5));
    let params = ListParams::default();
    for age in [Duration::zero(), Duration::seconds(30), Duration::minutes(5)] {
      let entry = fetched_entry(params.clone(), age);
      assert!(!policy.should_fetch(Some(&entry), &params, now()), "age {}", age);
    }
  }

  #[test]
  fn test_expired_entry_fetches() {
    let policy = StalenessPolicy::new(Duration::minutes(5));
    let params = ListParams::default();
    let entry = fetched_entry(params.clone(), Duration::minutes(5) + Duration::seconds(1));
    assert!(policy.should_fetch(Some(&entry), &params, now()));
  }

  #[test]
  fn test_any_params_change_fetches_inside_window() {
    let policy = StalenessPolicy::default();
    let base = ListParams::with_limit(10);
    let entry = fetched_entry(base.clone(), Duration::zero());

    let mut next_page = base.clone();
    next_page.page = 2;
    let mut searched = base.clone();
    searched.search = "ada".into();
    let mut filtered = base.clone();
    filtered.filters.insert("tag".into(), "vip".into());
    let mut bigger = base.clone();
    bigger.limit = 20;

    for params in [next_page, searched, filtered, bigger] {
      assert!(policy.should_fetch(Some(&entry), &params, now()), "{:?}", params);
    }
  }

  #[test]
  fn test_loading_with_same_params_is_deduped() {
    let policy = StalenessPolicy::default();
    let params = ListParams::default();
    let mut entry: ResourceEntry<Vec<u32>, _> = ResourceEntry::new(params.clone());
    entry.loading = true;
    assert!(!policy.should_fetch(Some(&entry), &params, now()));

    let mut other = params.clone();
    other.page = 2;
    assert!(policy.should_fetch(Some(&entry), &other, now()));
  }

  #[test]
  fn test_failed_entry_is_eligible_for_retry() {
    let policy = StalenessPolicy::default();
    let params = ListParams::default();
    let mut entry = fetched_entry(params.clone(), Duration::zero());
    entry.error = Some(ErrorInfo::network("connection reset"));
    assert!(policy.should_fetch(Some(&entry), &params, now()));

    let mut never_loaded: ResourceEntry<Vec<u32>, _> = ResourceEntry::new(params.clone());
    never_loaded.loading = false;
    assert!(policy.should_fetch(Some(&never_loaded), &params, now()));
  }
}
