//! In-memory caching of remote resources.
//!
//! This module provides the state side of the fetch pattern:
//! - keys and eviction scopes for each resource kind
//! - entries tracking data, loading, error, params and last fetch time
//! - a pure staleness policy deciding when a refetch is due
//! - stores whose actions are the only way entry state changes
//!
//! Nothing here performs I/O or decides when to fetch; that is `query`'s job.

mod entry;
mod key;
mod params;
mod policy;
mod store;
mod stores;
mod traits;

pub use entry::{PaginationState, RequestId};
pub use key::{EvictScope, ResourceKey, ResourceKind};
pub use params::{EntityParams, ListParams, Sort, DEFAULT_PAGE_SIZE, FILTER_FROM, MAX_PAGE_SIZE};
pub use policy::StalenessPolicy;
pub use store::Store;
pub use stores::Stores;
pub use traits::{Evict, QueryParams};
