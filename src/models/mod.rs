//! Domain and transport models for the item service
//!
//! Defines the `Item` resource, its write inputs, list query parameters,
//! the authenticated `User`, and the response bodies of the HTTP API.

pub mod item;
pub mod query;
pub mod responses;
pub mod user;

// Re-export commonly used types
pub use item::{Item, ItemCreateInput, UpdateItemInput};
pub use query::{ListItemsParams, ListQuery, OrderBy, Sort};
pub use responses::{ErrorResponse, HealthResponse};
pub use user::User;
