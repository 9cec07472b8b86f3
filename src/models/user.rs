//! Authenticated caller identity

use serde::{Deserialize, Serialize};

/// A caller resolved by the authentication layer.
///
/// `account_id` is the tenant scope passed to every item operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub account_id: String,
}

impl User {
    /// Creates a user bound to the given tenant.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        account_id: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            account_id: account_id.into(),
        }
    }
}
