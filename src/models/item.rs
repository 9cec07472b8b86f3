//! Item resource and write inputs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

// == Item ==
/// A named value owned by exactly one tenant.
///
/// `(name, account_id)` is unique. `version` starts at 1 and grows by one on
/// every successful update. `id`, `created_at` and `updated_at` are assigned
/// by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    pub name: String,
    pub value: String,
    pub version: i64,
    pub account_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// == Create Input ==
/// Request body for creating an item (POST /item)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct ItemCreateInput {
    #[validate(length(min = 1, message = "name is required"))]
    pub name: String,
    #[serde(default)]
    pub value: String,
}

impl ItemCreateInput {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

// == Update Input ==
/// Request body for updating an item (PUT /item/:id)
///
/// `id` comes from the path, never from the body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct UpdateItemInput {
    #[serde(skip)]
    pub id: String,
    #[validate(length(min = 1, message = "name is required"))]
    pub name: String,
    #[serde(default)]
    pub value: String,
}

impl UpdateItemInput {
    pub fn new(id: impl Into<String>, name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            value: value.into(),
        }
    }
}
