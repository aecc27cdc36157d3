//! In-memory normalized store of resource entries.

use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info};

use crate::api::{ErrorInfo, FetchResult, Fetched};

use super::entry::{RequestId, ResourceEntry};
use super::key::{EvictScope, ResourceKey};
use super::traits::{Evict, QueryParams};

/// Outcome of routing a fetch result into the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
  /// The result became the entry's state
  Applied,
  /// The request was superseded or its entry evicted
  Discarded,
}

/// Store of entries for one resource kind.
///
/// This is a cheap handle: clones share the same entries. All writes go
/// through the action methods below, each of which holds the lock for the
/// duration of a single action.
pub struct Store<T, P> {
  entries: Arc<Mutex<BTreeMap<ResourceKey, ResourceEntry<T, P>>>>,
  next_request: Arc<AtomicU64>,
}

impl<T, P> Clone for Store<T, P> {
  fn clone(&self) -> Self {
    Self {
      entries: Arc::clone(&self.entries),
      next_request: Arc::clone(&self.next_request),
    }
  }
}

impl<T, P> Default for Store<T, P> {
  fn default() -> Self {
    Self {
      entries: Arc::new(Mutex::new(BTreeMap::new())),
      next_request: Arc::new(AtomicU64::new(1)),
    }
  }
}

impl<T, P> Store<T, P>
where
  T: Clone,
  P: QueryParams,
{
  pub fn new() -> Self {
    Self::default()
  }

  fn lock(&self) -> MutexGuard<'_, BTreeMap<ResourceKey, ResourceEntry<T, P>>> {
    // Every action leaves the map consistent, so a poisoned lock is still usable
    self.entries.lock().unwrap_or_else(PoisonError::into_inner)
  }

  /// Mark a fetch as started and return the id its result must carry.
  pub fn begin_fetch(&self, key: &ResourceKey, params: P) -> RequestId {
    let request = RequestId(self.next_request.fetch_add(1, Ordering::Relaxed));
    let mut entries = self.lock();
    let entry = entries
      .entry(key.clone())
      .or_insert_with(|| ResourceEntry::new(params.clone()));
    entry.loading = true;
    entry.error = None;
    entry.params = params;
    entry.request = Some(request);
    debug!(key = %key, request = request.value(), "fetch started");
    request
  }

  pub fn fetch_succeeded(&self, key: &ResourceKey, request: RequestId, fetched: Fetched<T>) -> Completion {
    let mut entries = self.lock();
    let Some(entry) = Self::current_entry(&mut entries, key, request) else {
      return Completion::Discarded;
    };
    // Without meta the old position describes other params
    entry.pagination = fetched
      .page_meta
      .and_then(|meta| entry.params.pagination(&meta));
    entry.data = Some(fetched.data);
    entry.loading = false;
    entry.error = None;
    entry.last_fetched_at = Some(Utc::now());
    debug!(key = %key, request = request.value(), "fetch applied");
    Completion::Applied
  }

  /// Record a failed fetch. Existing data is kept so views can keep showing it.
  pub fn fetch_failed(&self, key: &ResourceKey, request: RequestId, error: ErrorInfo) -> Completion {
    let mut entries = self.lock();
    let Some(entry) = Self::current_entry(&mut entries, key, request) else {
      return Completion::Discarded;
    };
    debug!(key = %key, request = request.value(), error = %error, "fetch failed");
    entry.error = Some(error);
    entry.loading = false;
    Completion::Applied
  }

  /// Route a fetch result to `fetch_succeeded` or `fetch_failed`.
  pub fn complete(&self, key: &ResourceKey, request: RequestId, result: FetchResult<T>) -> Completion {
    match result {
      Ok(fetched) => self.fetch_succeeded(key, request, fetched),
      Err(error) => self.fetch_failed(key, request, error),
    }
  }

  /// The entry for `key` if `request` is still its latest fetch.
  fn current_entry<'a>(
    entries: &'a mut BTreeMap<ResourceKey, ResourceEntry<T, P>>,
    key: &ResourceKey,
    request: RequestId,
  ) -> Option<&'a mut ResourceEntry<T, P>> {
    match entries.get_mut(key) {
      Some(entry) if entry.request == Some(request) => Some(entry),
      Some(entry) => {
        debug!(
          key = %key,
          request = request.value(),
          latest = ?entry.request.map(|r| r.value()),
          "discarding superseded fetch"
        );
        None
      }
      None => {
        debug!(key = %key, request = request.value(), "discarding fetch for evicted entry");
        None
      }
    }
  }

  /// Apply a confirmed domain mutation to cached data without refetching.
  ///
  /// Returns false when there is no data to update.
  pub fn mutate_local<F>(&self, key: &ResourceKey, updater: F) -> bool
  where
    F: FnOnce(&mut T),
  {
    let mut entries = self.lock();
    match entries.get_mut(key).and_then(|entry| entry.data.as_mut()) {
      Some(data) => {
        updater(data);
        true
      }
      None => false,
    }
  }

  /// Adjust the stored list total after a local create/delete.
  pub fn adjust_total(&self, key: &ResourceKey, delta: i64) {
    let mut entries = self.lock();
    if let Some(pagination) = entries.get_mut(key).and_then(|e| e.pagination.as_mut()) {
      pagination.total = pagination.total.saturating_add_signed(delta);
    }
  }

  /// Snapshot of the entry for `key`.
  pub fn get(&self, key: &ResourceKey) -> Option<ResourceEntry<T, P>> {
    self.lock().get(key).cloned()
  }

  /// Read a projection of the entry without cloning all of it.
  pub fn with_entry<R>(&self, key: &ResourceKey, f: impl FnOnce(&ResourceEntry<T, P>) -> R) -> Option<R> {
    self.lock().get(key).map(f)
  }

  pub fn contains(&self, key: &ResourceKey) -> bool {
    self.lock().contains_key(key)
  }

  pub fn len(&self) -> usize {
    self.lock().len()
  }

  pub fn is_empty(&self) -> bool {
    self.lock().is_empty()
  }
}

impl<T, P> Evict for Store<T, P>
where
  T: Clone,
  P: QueryParams,
{
  fn evict(&self, scope: &EvictScope) -> usize {
    let mut entries = self.lock();
    let before = entries.len();
    entries.retain(|key, _| !scope.matches(key));
    let removed = before - entries.len();
    if removed > 0 {
      info!(scope = ?scope, removed, "evicted cache entries");
    }
    removed
  }
}
