//! List query parameters
//!
//! `ListQuery` is built per request from validated input and never persisted.

use serde::{Deserialize, Serialize};

use crate::error::AppError;

// == Sort ==
/// Sort direction for item listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sort {
    #[default]
    Asc,
    Desc,
}

impl Sort {
    /// Parses a query-string value. Empty input yields the default.
    pub fn from_param(value: &str) -> Option<Self> {
        match value {
            "" | "asc" => Some(Sort::Asc),
            "desc" => Some(Sort::Desc),
            _ => None,
        }
    }

    pub fn is_descending(self) -> bool {
        matches!(self, Sort::Desc)
    }
}

// == Order By ==
/// Sortable item fields.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderBy {
    Name,
    CreatedAt,
    #[default]
    UpdatedAt,
}

impl OrderBy {
    /// Parses a query-string value. Empty input yields the default.
    pub fn from_param(value: &str) -> Option<Self> {
        match value {
            "" => Some(OrderBy::default()),
            "name" => Some(OrderBy::Name),
            "created_at" => Some(OrderBy::CreatedAt),
            "updated_at" => Some(OrderBy::UpdatedAt),
            _ => None,
        }
    }

    /// Column / field name in both stores.
    pub fn field(self) -> &'static str {
        match self {
            OrderBy::Name => "name",
            OrderBy::CreatedAt => "created_at",
            OrderBy::UpdatedAt => "updated_at",
        }
    }
}

// == List Query ==
/// Ordering and pagination for a tenant's item listing.
///
/// A `limit` of 0 means unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ListQuery {
    pub sort: Sort,
    pub order_by: OrderBy,
    pub limit: u32,
}

impl ListQuery {
    pub fn new(sort: Sort, order_by: OrderBy, limit: u32) -> Self {
        Self {
            sort,
            order_by,
            limit,
        }
    }

    /// Returns the limit when one applies.
    pub fn effective_limit(&self) -> Option<u32> {
        (self.limit > 0).then_some(self.limit)
    }
}

// == Raw Query Parameters ==
/// Query string of GET /items, as sent by the client.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListItemsParams {
    #[serde(default)]
    pub sort: Option<String>,
    #[serde(default)]
    pub order_by: Option<String>,
    #[serde(default)]
    pub limit: Option<String>,
}

impl ListItemsParams {
    /// Validates the raw parameters into a `ListQuery`.
    ///
    /// Unknown `sort`/`order_by` values are rejected; an unparsable `limit`
    /// is treated as unbounded.
    pub fn into_query(self) -> Result<ListQuery, AppError> {
        let sort_raw = self.sort.unwrap_or_default();
        let sort = Sort::from_param(&sort_raw).ok_or_else(|| {
            AppError::BadRequest(format!("invalid sort '{}', expected asc or desc", sort_raw))
        })?;

        let order_raw = self.order_by.unwrap_or_default();
        let order_by = OrderBy::from_param(&order_raw).ok_or_else(|| {
            AppError::BadRequest(format!(
                "invalid order_by '{}', expected name, created_at or updated_at",
                order_raw
            ))
        })?;

        let limit = self
            .limit
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(0);

        Ok(ListQuery::new(sort, order_by, limit))
    }
}
