//! API Module
//!
//! HTTP handlers, routing and authentication for the item service.
//!
//! # Endpoints
//! - `GET /item/:name` - Fetch an item by name
//! - `POST /item` - Create an item
//! - `PUT /item/:id` - Update an item
//! - `DELETE /item/:id` - Delete an item
//! - `GET /items` - List items
//! - `GET /health-check` - Readiness of the backing store

pub mod auth;
pub mod handlers;
pub mod routes;

pub use auth::{AuthUser, Authenticator, StaticAuthenticator};
pub use handlers::*;
pub use routes::create_router;
