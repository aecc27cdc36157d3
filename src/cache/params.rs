//! Request parameters for list and single-entity resources.

use chrono::DateTime;
use std::collections::BTreeMap;

use crate::api::types::PageMeta;
use crate::api::ErrorInfo;

use super::entry::PaginationState;
use super::traits::QueryParams;

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;

/// Filter names holding an RFC 3339 date range
pub const FILTER_FROM: &str = "from";
pub const FILTER_TO: &str = "to";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sort {
  pub field: String,
  pub descending: bool,
}

/// Params of a paginated list request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListParams {
  /// 1-based
  pub page: u32,
  pub limit: u32,
  pub search: String,
  pub sort: Option<Sort>,
  pub filters: BTreeMap<String, String>,
}

impl Default for ListParams {
  fn default() -> Self {
    Self::with_limit(DEFAULT_PAGE_SIZE)
  }
}

impl ListParams {
  pub fn with_limit(limit: u32) -> Self {
    Self {
      page: 1,
      limit,
      search: String::new(),
      sort: None,
      filters: BTreeMap::new(),
    }
  }

  /// Check the params before they are sent anywhere.
  pub fn validate(&self) -> Result<(), ErrorInfo> {
    if self.page == 0 {
      return Err(ErrorInfo::validation("page must start at 1"));
    }
    if self.limit == 0 || self.limit > MAX_PAGE_SIZE {
      return Err(ErrorInfo::validation(format!(
        "limit must be between 1 and {}",
        MAX_PAGE_SIZE
      )));
    }

    let parse = |name: &str| {
      self
        .filters
        .get(name)
        .map(|value| {
          DateTime::parse_from_rfc3339(value)
            .map_err(|_| ErrorInfo::validation(format!("'{}' is not a valid date: {}", name, value)))
        })
        .transpose()
    };
    if let (Some(from), Some(to)) = (parse(FILTER_FROM)?, parse(FILTER_TO)?) {
      if from > to {
        return Err(ErrorInfo::validation("date range starts after it ends"));
      }
    }
    Ok(())
  }

  /// Query string pairs in the order the API documents them.
  pub fn query_pairs(&self) -> Vec<(String, String)> {
    let mut pairs = vec![
      ("page".to_string(), self.page.to_string()),
      ("limit".to_string(), self.limit.to_string()),
    ];
    let search = self.search.trim();
    if !search.is_empty() {
      pairs.push(("search".to_string(), search.to_string()));
    }
    if let Some(sort) = &self.sort {
      pairs.push(("sort".to_string(), sort.field.clone()));
      let order = if sort.descending { "desc" } else { "asc" };
      pairs.push(("order".to_string(), order.to_string()));
    }
    for (name, value) in &self.filters {
      pairs.push((name.clone(), value.clone()));
    }
    pairs
  }
}

impl QueryParams for ListParams {
  fn pagination(&self, meta: &PageMeta) -> Option<PaginationState> {
    Some(PaginationState {
      page: meta.page,
      limit: meta.limit,
      total: meta.total,
      search: self.search.clone(),
    })
  }
}

/// Params of a single-entity request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityParams {
  pub id: String,
}

impl EntityParams {
  pub fn new(id: impl Into<String>) -> Self {
    Self { id: id.into() }
  }

  pub fn validate(&self) -> Result<(), ErrorInfo> {
    let id = self.id.trim();
    if id.is_empty() {
      return Err(ErrorInfo::validation("id must not be empty"));
    }
    // Dot segments would be dropped from the request path
    if id == "." || id == ".." {
      return Err(ErrorInfo::validation(format!("'{}' is not a valid id", id)));
    }
    Ok(())
  }
}

impl QueryParams for EntityParams {}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_default_params_are_valid() {
    assert!(ListParams::default().validate().is_ok());
  }

  #[test]
  fn test_entity_ids() {
    assert!(EntityParams::new("qr-42").validate().is_ok());
    assert!(EntityParams::new("../x").validate().is_ok());
    assert!(EntityParams::new(" ").validate().is_err());
    assert!(EntityParams::new("..").validate().is_err());
    assert!(EntityParams::new(".").validate().is_err());
  }

  #[test]
  fn test_limit_bounds() {
    assert!(ListParams::with_limit(0).validate().is_err());
    assert!(ListParams::with_limit(MAX_PAGE_SIZE + 1).validate().is_err());
    assert!(ListParams::with_limit(MAX_PAGE_SIZE).validate().is_ok());
  }

  #[test]
  fn test_malformed_date_range() {
    let mut params = ListParams::default();
    params.filters.insert(FILTER_FROM.into(), "2024-02-01T00:00:00Z".into());
    params.filters.insert(FILTER_TO.into(), "2024-01-01T00:00:00Z".into());
    assert!(params.validate().is_err());

    params.filters.insert(FILTER_TO.into(), "yesterday".into());
    assert!(params.validate().is_err());

    params.filters.insert(FILTER_TO.into(), "2024-03-01T00:00:00Z".into());
    assert!(params.validate().is_ok());
  }

  #[test]
  fn test_query_pairs() {
    let mut params = ListParams::with_limit(10);
    params.page = 2;
    params.search = " ada ".into();
    params.sort = Some(Sort {
      field: "createdAt".into(),
      descending: true,
    });
    params.filters.insert("action".into(), "contact.deleted".into());

    let pairs = params.query_pairs();
    let flat: Vec<(&str, &str)> = pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
    assert_eq!(
      flat,
      vec![
        ("page", "2"),
        ("limit", "10"),
        ("search", "ada"),
        ("sort", "createdAt"),
        ("order", "desc"),
        ("action", "contact.deleted"),
      ]
    );
  }

  #[test]
  fn test_pagination_from_meta() {
    let mut params = ListParams::with_limit(10);
    params.search = "ada".into();
    let meta = PageMeta {
      page: 3,
      limit: 10,
      total: 42,
      total_pages: None,
    };
    let state = params.pagination(&meta).unwrap();
    assert_eq!(state.page, 3);
    assert_eq!(state.total, 42);
    assert_eq!(state.search, "ada");
    assert!(EntityParams::new("x").pagination(&meta).is_none());
  }
}
