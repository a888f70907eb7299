//! Translation of listing and search parameters into store queries.

use bookshelf_db::{Filter, FindOptions, SortDirection, SortSpec};
use serde::Deserialize;

use super::error::ValidationError;
use super::models::BookId;

/// Page size used when `limit` is absent or not positive.
pub const DEFAULT_PAGE_SIZE: u64 = 10;

/// Fields a listing may be sorted by.
pub const SORTABLE_FIELDS: &[&str] = &["title", "authors", "description", "publicationYear"];

/// Raw query string of `GET /books`. Values stay textual until [`ListParams::plan`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListParams {
    pub offset: Option<String>,
    pub limit: Option<String>,
    pub sort: Option<String>,
    pub order: Option<String>,
}

/// Raw query string of `GET /books/search`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchParams {
    pub query: Option<String>,
}

/// Validated listing query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListPlan {
    pub skip: u64,
    pub limit: u64,
    /// `None` keeps the store's id order.
    pub sort: Option<SortSpec>,
}

impl ListPlan {
    pub fn find_options(&self) -> FindOptions {
        let options = FindOptions::default().skip(self.skip).limit(self.limit);
        match &self.sort {
            Some(spec) => options.sorted(spec.clone()),
            None => options,
        }
    }
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn parse_integer(field: &'static str, value: &str) -> Result<i64, ValidationError> {
    value
        .parse()
        .map_err(|_| ValidationError::InvalidPagination {
            field,
            value: value.to_string(),
        })
}

fn parse_order(value: Option<&str>) -> Result<SortDirection, ValidationError> {
    match value {
        None | Some("1") => Ok(SortDirection::Ascending),
        Some("-1") => Ok(SortDirection::Descending),
        Some(other) => Err(ValidationError::InvalidSortOrder(other.to_string())),
    }
}

impl ListParams {
    /// Validate the parameters. Any invalid value rejects the whole listing.
    pub fn plan(&self) -> Result<ListPlan, ValidationError> {
        let limit = match present(&self.limit) {
            Some(raw) => parse_integer("limit", raw)?,
            None => 0,
        };
        let limit = u64::try_from(limit)
            .ok()
            .filter(|l| *l > 0)
            .unwrap_or(DEFAULT_PAGE_SIZE);

        let offset = match present(&self.offset) {
            Some(raw) => parse_integer("offset", raw)?,
            None => 0,
        };
        let skip = if offset > 1 {
            (offset.unsigned_abs() - 1).saturating_mul(limit)
        } else {
            0
        };

        let direction = parse_order(present(&self.order))?;
        let sort = match present(&self.sort) {
            Some(field) if SORTABLE_FIELDS.contains(&field) => {
                Some(SortSpec::new(field, direction))
            }
            Some(field) => return Err(ValidationError::InvalidSortField(field.to_string())),
            None => None,
        };

        Ok(ListPlan { skip, limit, sort })
    }
}

impl SearchParams {
    /// Text filter for the query. An absent query searches for the empty string.
    pub fn filter(&self) -> Filter {
        Filter::Text(self.query.clone().unwrap_or_default())
    }
}

/// Parse a path id. Ids are non-negative integers; `0` is valid.
pub fn parse_id(raw: &str) -> Result<BookId, ValidationError> {
    raw.trim()
        .parse::<BookId>()
        .ok()
        .filter(|id| *id >= 0)
        .ok_or_else(|| ValidationError::InvalidId(raw.to_string()))
}
