//! Repository Module
//!
//! Tenant-scoped persistence for items, polymorphic over backend: relational
//! (MySQL), document (MongoDB) and in-process.
//!
//! Backends translate their own "no rows" and "unique constraint" conditions
//! into [`AppError::NotFound`] and [`AppError::Duplicate`]; every other store
//! failure is reported as [`AppError::Internal`].

mod memory;
mod mongo;
mod mysql;

use std::fmt::Debug;

use async_trait::async_trait;

use crate::error::{AppError, Result};
use crate::models::{Item, ItemCreateInput, ListQuery, UpdateItemInput};

pub use memory::InMemoryItemRepository;
pub use mongo::MongoItemRepository;
pub use mysql::{MySqlItemRepository, CREATE_ITEMS_TABLE};

// == Repository Trait ==
/// Item persistence. Every operation is scoped by `account_id`.
#[async_trait]
pub trait ItemRepository: Send + Sync + Debug {
    /// Looks up an item by name. `NotFound` when the tenant has no such item.
    async fn get_by_name(&self, name: &str, account_id: &str) -> Result<Item>;

    /// Looks up an item by id. `NotFound` when the tenant has no such item.
    async fn get_by_id(&self, id: &str, account_id: &str) -> Result<Item>;

    /// Creates an item at version 1. `Duplicate` when the name is taken.
    async fn save(&self, input: &ItemCreateInput, account_id: &str) -> Result<Item>;

    /// Replaces name and value and bumps the version by one.
    ///
    /// Matches on `(id, account_id)`, so an id owned by another tenant
    /// yields `NotFound`.
    async fn update(&self, input: &UpdateItemInput, account_id: &str) -> Result<Item>;

    /// Lists the tenant's items ordered by `query`, truncated to its limit.
    /// Returns an empty vector when nothing matches.
    async fn list(&self, query: &ListQuery, account_id: &str) -> Result<Vec<Item>>;

    /// Deletes by id. Missing or foreign ids are not an error.
    async fn delete(&self, id: &str, account_id: &str) -> Result<()>;

    /// Lightweight liveness check against the store.
    async fn ping(&self) -> Result<()>;
}

// == Shared Error Constructors ==
pub(crate) fn item_not_found(name: &str) -> AppError {
    AppError::NotFound(format!("item '{}' not found", name))
}

pub(crate) fn item_id_not_found(id: &str) -> AppError {
    AppError::NotFound(format!("item with id {} not found", id))
}

pub(crate) fn item_exists(name: &str) -> AppError {
    AppError::Duplicate(format!("item '{}' already exist", name))
}
