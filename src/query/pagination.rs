//! Navigation over paginated list params.

use crate::cache::{ListParams, PaginationState, Sort, MAX_PAGE_SIZE};

/// A user-driven change to list params.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageChange {
  Next,
  Prev,
  Goto(u32),
  Limit(u32),
  Search(String),
  /// Sort by a field; the same field again flips the direction
  Sort(String),
  /// Set (`Some`) or clear (`None`) a named filter
  Filter(String, Option<String>),
}

impl ListParams {
  /// Params after applying `change`.
  ///
  /// `pagination` is the state of the last successful fetch. Without it the
  /// page count is unknown and `Next`/`Goto` are not clamped from above.
  /// Anything that changes which rows match starts again at page 1.
  pub fn apply(&self, change: PageChange, pagination: Option<&PaginationState>) -> ListParams {
    let mut next = self.clone();
    let last_page = pagination.map(PaginationState::page_count);

    match change {
      PageChange::Next => match pagination {
        Some(p) if p.page == self.page && p.has_next() => next.page = self.page.saturating_add(1),
        // On the last page, or a different page is still loading
        Some(_) => {}
        None => next.page = self.page.saturating_add(1),
      },
      PageChange::Prev => next.page = self.page.saturating_sub(1).max(1),
      PageChange::Goto(page) => {
        let page = page.max(1);
        next.page = last_page.map(|last| page.min(last)).unwrap_or(page);
      }
      PageChange::Limit(limit) => {
        next.limit = limit.clamp(1, MAX_PAGE_SIZE);
        if next.limit != self.limit {
          next.page = 1;
        }
      }
      PageChange::Search(search) => {
        let search = search.trim();
        if search != self.search.trim() {
          next.search = search.to_string();
          next.page = 1;
        }
      }
      PageChange::Sort(field) => {
        next.sort = Some(match &self.sort {
          Some(sort) if sort.field == field => Sort {
            field,
            descending: !sort.descending,
          },
          _ => Sort {
            field,
            descending: false,
          },
        });
        next.page = 1;
      }
      PageChange::Filter(name, value) => {
        let changed = match value {
          Some(value) => next.filters.insert(name, value.clone()).as_ref() != Some(&value),
          None => next.filters.remove(&name).is_some(),
        };
        if changed {
          next.page = 1;
        }
      }
    }
    next
  }
}
