//! Fetch-sync bindings between views and the resource stores.
//!
//! Inspired by TanStack Query: a view owns a `Query<T, P>` and calls `sync`
//! with the current session, resource key and params on every tick. The
//! query only acts when one of those changed since the last call. It then
//! applies the access gate and the staleness policy and, if a fetch is due,
//! starts it through the store and spawns the fetcher. The result is routed
//! back into the store, where superseded results are dropped.
//!
//! # Example
//!
//! ```ignore
//! let api = api.clone();
//! let mut query = Query::new(
//!   stores.contacts.clone(),
//!   ResourceKind::Contacts,
//!   AccessGate::Authenticated,
//!   policy,
//!   move |params: ListParams| {
//!     let api = api.clone();
//!     async move { api.fetch_contacts(&params).await }
//!   },
//! );
//!
//! // In tick
//! query.sync(&session, ResourceKey::list(ResourceKind::Contacts), params.clone());
//!
//! // In render
//! let view = query.view();
//! if view.loading { render_spinner() }
//! render_rows(&view.data);
//! ```

mod mutation;
mod pagination;

pub use mutation::{Mutation, MutationState};
pub use pagination::PageChange;

use chrono::{DateTime, Utc};
use futures::future::{BoxFuture, FutureExt};
use std::future::Future;
use tracing::debug;

use crate::api::{ErrorInfo, FetchResult};
use crate::cache::{
  EvictScope, PaginationState, QueryParams, RequestId, ResourceKey, ResourceKind,
  StalenessPolicy, Store,
};
use crate::session::{AccessGate, SessionState};

/// A factory creating the fetch future for a set of params
type FetcherFn<T, P> = Box<dyn Fn(&P) -> BoxFuture<'static, FetchResult<T>> + Send + Sync>;

/// Everything a sync decision depends on
#[derive(Debug, Clone, PartialEq)]
struct Binding<P> {
  authenticated: bool,
  admin: bool,
  key: ResourceKey,
  params: P,
}

/// What a `sync` or `refresh` call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
  /// Inputs are the same as last time; nothing evaluated
  Unchanged,
  /// `refresh` without a prior `sync`
  Unbound,
  /// No session; nothing fetched
  SignedOut,
  /// Session lacks access to the resource; nothing fetched
  Gated,
  /// Cached entry is still fresh (or already loading)
  Fresh,
  /// A fetch was started
  Fetching(RequestId),
}

/// Read projection of a bound resource, ready to render.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryView<T> {
  /// Cached data, or `T::default()` when there is none
  pub data: T,
  pub loading: bool,
  pub error: Option<ErrorInfo>,
  pub pagination: Option<PaginationState>,
  pub fetched_at: Option<DateTime<Utc>>,
}

impl<T: Default> QueryView<T> {
  pub fn empty() -> Self {
    Self {
      data: T::default(),
      loading: false,
      error: None,
      pagination: None,
      fetched_at: None,
    }
  }
}

/// Binding of one view to one resource kind.
pub struct Query<T, P> {
  store: Store<T, P>,
  kind: ResourceKind,
  gate: AccessGate,
  policy: StalenessPolicy,
  fetcher: FetcherFn<T, P>,
  binding: Option<Binding<P>>,
}

impl<T, P> Query<T, P>
where
  T: Clone + Default + Send + 'static,
  P: QueryParams,
{
  pub fn new<F, Fut>(
    store: Store<T, P>,
    kind: ResourceKind,
    gate: AccessGate,
    policy: StalenessPolicy,
    fetcher: F,
  ) -> Self
  where
    F: Fn(P) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = FetchResult<T>> + Send + 'static,
  {
    Self {
      store,
      kind,
      gate,
      policy,
      fetcher: Box::new(move |params: &P| fetcher(params.clone()).boxed()),
      binding: None,
    }
  }

  /// Bind to `key`/`params` under `session`, fetching if needed.
  ///
  /// Cheap to call every tick: it only evaluates when the session's
  /// authentication or admin flag, the key, or the params changed, or when
  /// a permitted binding's entry was evicted from under it.
  pub fn sync(&mut self, session: &SessionState, key: ResourceKey, params: P) -> SyncOutcome {
    let binding = Binding {
      authenticated: session.is_authenticated,
      admin: session.is_admin(),
      key,
      params,
    };
    if self.binding.as_ref() == Some(&binding)
      && (!self.is_permitted() || self.store.contains(&binding.key))
    {
      return SyncOutcome::Unchanged;
    }
    self.binding = Some(binding);
    self.evaluate(false)
  }

  /// Fetch again regardless of staleness. A fetch already in flight for the
  /// key is superseded.
  pub fn refresh(&mut self) -> SyncOutcome {
    self.evaluate(true)
  }

  /// Drop the binding. Fetches already in flight still complete into the store.
  pub fn unbind(&mut self) {
    self.binding = None;
  }

  fn evaluate(&self, force: bool) -> SyncOutcome {
    let Some(binding) = &self.binding else {
      return SyncOutcome::Unbound;
    };
    if !binding.authenticated {
      return SyncOutcome::SignedOut;
    }
    if !self.gate.allows(binding.authenticated, binding.admin) {
      debug!(key = %binding.key, gate = ?self.gate, "fetch gated");
      return SyncOutcome::Gated;
    }

    if !force {
      let now = Utc::now();
      let stale = self
        .store
        .with_entry(&binding.key, |entry| {
          self.policy.should_fetch(Some(entry), &binding.params, now)
        })
        .unwrap_or(true);
      if !stale {
        return SyncOutcome::Fresh;
      }
    }

    SyncOutcome::Fetching(self.start_fetch(&binding.key, &binding.params))
  }

  fn start_fetch(&self, key: &ResourceKey, params: &P) -> RequestId {
    let request = self.store.begin_fetch(key, params.clone());
    let future = (self.fetcher)(params);
    let store = self.store.clone();
    let key = key.clone();

    tokio::spawn(async move {
      let result = future.await;
      store.complete(&key, request, result);
    });

    request
  }

  /// Current state of the bound resource. Empty when unbound, signed out,
  /// or gated.
  pub fn view(&self) -> QueryView<T> {
    let Some(binding) = &self.binding else {
      return QueryView::empty();
    };
    if !self.gate.allows(binding.authenticated, binding.admin) {
      return QueryView::empty();
    }
    self
      .store
      .with_entry(&binding.key, |entry| QueryView {
        data: entry.data.clone().unwrap_or_default(),
        loading: entry.loading,
        error: entry.error.clone(),
        pagination: entry.pagination.clone(),
        fetched_at: entry.last_fetched_at,
      })
      .unwrap_or_else(QueryView::empty)
  }

  /// Whether the current session passes this query's gate.
  pub fn is_permitted(&self) -> bool {
    self
      .binding
      .as_ref()
      .map(|b| self.gate.allows(b.authenticated, b.admin))
      .unwrap_or(false)
  }

  /// Eviction scope covering everything this query caches
  pub fn scope(&self) -> EvictScope {
    EvictScope::kind(self.kind)
  }
}

impl<T, P: std::fmt::Debug> std::fmt::Debug for Query<T, P> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Query")
      .field("kind", &self.kind)
      .field("gate", &self.gate)
      .field("policy", &self.policy)
      .field("binding", &self.binding)
      .finish_non_exhaustive()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::types::User;
  use crate::api::error::ErrorKind;
  use crate::api::Fetched;
  use crate::api::types::PageMeta;
  use crate::cache::{Evict, ListParams};
  use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
  use std::sync::{Arc, Mutex};
  use std::time::Duration;

  fn session(role: &str) -> SessionState {
    SessionState::signed_in(User {
      id: "u1".into(),
      email: "ada@example.com".into(),
      name: "Ada".into(),
      role: role.into(),
      plan: None,
    })
  }

  fn key() -> ResourceKey {
    ResourceKey::list(ResourceKind::AuditLogs)
  }

  fn page(page: u32) -> ListParams {
    ListParams {
      page,
      ..ListParams::with_limit(10)
    }
  }

  /// A list query whose fetcher records params and answers with the page
  /// number after a page-dependent delay.
  fn recording_query(
    store: Store<Vec<String>, ListParams>,
    gate: AccessGate,
    delays: fn(u32) -> u64,
  ) -> (Query<Vec<String>, ListParams>, Arc<Mutex<Vec<ListParams>>>) {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let recorded = calls.clone();
    let query = Query::new(
      store,
      ResourceKind::AuditLogs,
      gate,
      StalenessPolicy::default(),
      move |params: ListParams| {
        recorded.lock().unwrap().push(params.clone());
        let delay = delays(params.page);
        async move {
          tokio::time::sleep(Duration::from_millis(delay)).await;
          let meta = PageMeta {
            page: params.page,
            limit: params.limit,
            total: 25,
            total_pages: None,
          };
          Ok(Fetched::new(vec![format!("page {}", params.page)]).with_page_meta(meta))
        }
      },
    );
    (query, calls)
  }

  fn quick(_page: u32) -> u64 {
    5
  }

  async fn settle() {
    tokio::time::sleep(Duration::from_millis(50)).await;
  }

  #[tokio::test]
  async fn test_admin_only_resource_never_fetches_for_members() {
    let (mut query, calls) = recording_query(Store::new(), AccessGate::AdminOnly, quick);

    assert_eq!(query.sync(&session("member"), key(), page(1)), SyncOutcome::Gated);
    assert_eq!(query.refresh(), SyncOutcome::Gated);
    settle().await;

    assert!(calls.lock().unwrap().is_empty());
    let view = query.view();
    assert!(view.data.is_empty());
    assert!(!view.loading);
    assert!(view.error.is_none());
    assert!(!query.is_permitted());
  }

  #[tokio::test]
  async fn test_page_change_fetches_new_page() {
    let (mut query, calls) = recording_query(Store::new(), AccessGate::AdminOnly, quick);
    let admin = session("admin");

    assert!(matches!(query.sync(&admin, key(), page(1)), SyncOutcome::Fetching(_)));
    assert!(query.view().loading);
    settle().await;
    assert_eq!(query.view().data, vec!["page 1".to_string()]);

    assert!(matches!(query.sync(&admin, key(), page(2)), SyncOutcome::Fetching(_)));
    settle().await;

    let view = query.view();
    assert_eq!(view.data, vec!["page 2".to_string()]);
    assert_eq!(view.pagination.map(|p| p.page), Some(2));
    assert_eq!(*calls.lock().unwrap(), vec![page(1), page(2)]);
  }

  #[tokio::test]
  async fn test_unchanged_inputs_do_nothing() {
    let (mut query, calls) = recording_query(Store::new(), AccessGate::Authenticated, quick);
    let member = session("member");

    query.sync(&member, key(), page(1));
    assert_eq!(query.sync(&member, key(), page(1)), SyncOutcome::Unchanged);
    settle().await;
    assert_eq!(calls.lock().unwrap().len(), 1);
  }

  #[tokio::test]
  async fn test_remount_uses_fresh_cache() {
    let store = Store::new();
    let member = session("member");

    let (mut first, calls) = recording_query(store.clone(), AccessGate::Authenticated, quick);
    first.sync(&member, key(), page(1));
    settle().await;
    first.unbind();

    let (mut second, second_calls) = recording_query(store, AccessGate::Authenticated, quick);
    assert_eq!(second.sync(&member, key(), page(1)), SyncOutcome::Fresh);
    assert_eq!(second.view().data, vec!["page 1".to_string()]);
    assert_eq!(calls.lock().unwrap().len(), 1);
    assert!(second_calls.lock().unwrap().is_empty());
  }

  #[tokio::test]
  async fn test_in_flight_fetch_is_not_duplicated() {
    let store = Store::new();
    let member = session("member");
    let (mut first, calls) = recording_query(store.clone(), AccessGate::Authenticated, |_| 30);
    let (mut second, _) = recording_query(store, AccessGate::Authenticated, |_| 30);

    first.sync(&member, key(), page(1));
    assert_eq!(second.sync(&member, key(), page(1)), SyncOutcome::Fresh);
    assert!(second.view().loading);
    settle().await;
    assert_eq!(calls.lock().unwrap().len(), 1);
  }

  #[tokio::test]
  async fn test_slow_older_fetch_does_not_overwrite_newer() {
    // Page 1 resolves long after page 2
    let (mut query, _) =
      recording_query(Store::new(), AccessGate::Authenticated, |p| if p == 1 { 80 } else { 5 });
    let member = session("member");

    query.sync(&member, key(), page(1));
    query.sync(&member, key(), page(2));
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert_eq!(query.view().data, vec!["page 2".to_string()]);

    tokio::time::sleep(Duration::from_millis(100)).await;
    let view = query.view();
    assert_eq!(view.data, vec!["page 2".to_string()]);
    assert!(!view.loading);
  }

  #[tokio::test]
  async fn test_refresh_forces_fetch() {
    let (mut query, calls) = recording_query(Store::new(), AccessGate::Authenticated, quick);
    query.sync(&session("member"), key(), page(1));
    settle().await;

    assert!(matches!(query.refresh(), SyncOutcome::Fetching(_)));
    settle().await;
    assert_eq!(calls.lock().unwrap().len(), 2);
  }

  #[tokio::test]
  async fn test_failed_fetch_keeps_last_good_data() {
    let fail = Arc::new(AtomicBool::new(false));
    let attempts = Arc::new(AtomicUsize::new(0));
    let (fail_flag, counter) = (fail.clone(), attempts.clone());
    let mut query: Query<Vec<u32>, ListParams> = Query::new(
      Store::new(),
      ResourceKind::Contacts,
      AccessGate::Authenticated,
      StalenessPolicy::default(),
      move |_params: ListParams| {
        counter.fetch_add(1, Ordering::SeqCst);
        let fail = fail_flag.load(Ordering::SeqCst);
        async move {
          if fail {
            Err(ErrorInfo::network("connection reset"))
          } else {
            Ok(Fetched::new(vec![1, 2, 3]))
          }
        }
      },
    );
    let member = session("member");
    let contacts = ResourceKey::list(ResourceKind::Contacts);

    query.sync(&member, contacts.clone(), ListParams::default());
    settle().await;
    fail.store(true, Ordering::SeqCst);
    query.refresh();
    settle().await;

    let view = query.view();
    assert_eq!(view.data, vec![1, 2, 3]);
    assert!(!view.loading);
    assert_eq!(view.error.map(|e| e.kind), Some(ErrorKind::Network));

    // A remount with the same params retries because the last attempt failed
    fail.store(false, Ordering::SeqCst);
    query.unbind();
    assert!(matches!(
      query.sync(&member, contacts, ListParams::default()),
      SyncOutcome::Fetching(_)
    ));
    settle().await;
    assert!(query.view().error.is_none());
    assert_eq!(attempts.load(Ordering::SeqCst), 3);
  }

  #[tokio::test]
  async fn test_signed_out_reads_empty_and_skips_fetch() {
    let store = Store::new();
    let (mut query, calls) = recording_query(store.clone(), AccessGate::Authenticated, quick);

    query.sync(&session("member"), key(), page(1));
    settle().await;
    assert_eq!(query.sync(&SessionState::signed_out(), key(), page(1)), SyncOutcome::SignedOut);
    assert!(query.view().data.is_empty());
    assert_eq!(calls.lock().unwrap().len(), 1);

    // Entry still exists until the session listener evicts it
    assert!(store.contains(&key()));
  }

  #[tokio::test]
  async fn test_evicted_while_bound_refetches() {
    let store = Store::new();
    let (mut query, calls) = recording_query(store.clone(), AccessGate::Authenticated, quick);
    let member = session("member");

    query.sync(&member, key(), page(1));
    settle().await;
    store.evict(&EvictScope::All);

    // Same inputs as before, but the entry is gone
    assert!(matches!(query.sync(&member, key(), page(1)), SyncOutcome::Fetching(_)));
    settle().await;
    assert_eq!(query.view().data, vec!["page 1".to_string()]);
    assert_eq!(calls.lock().unwrap().len(), 2);
    assert_eq!(query.sync(&member, key(), page(1)), SyncOutcome::Unchanged);
  }

  #[tokio::test]
  async fn test_gated_binding_stays_unchanged_without_entry() {
    let (mut query, calls) = recording_query(Store::new(), AccessGate::AdminOnly, quick);
    let member = session("member");

    assert_eq!(query.sync(&member, key(), page(1)), SyncOutcome::Gated);
    assert_eq!(query.sync(&member, key(), page(1)), SyncOutcome::Unchanged);
    assert_eq!(
      query.sync(&SessionState::signed_out(), key(), page(1)),
      SyncOutcome::SignedOut
    );
    assert_eq!(
      query.sync(&SessionState::signed_out(), key(), page(1)),
      SyncOutcome::Unchanged
    );
    settle().await;
    assert!(calls.lock().unwrap().is_empty());
  }

  #[tokio::test]
  async fn test_refresh_without_binding() {
    let (mut query, _) = recording_query(Store::new(), AccessGate::Authenticated, quick);
    assert_eq!(query.refresh(), SyncOutcome::Unbound);
    assert_eq!(query.view(), QueryView::empty());
    assert_eq!(query.scope(), EvictScope::kind(ResourceKind::AuditLogs));
  }
}
