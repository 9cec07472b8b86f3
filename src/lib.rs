//! Item Service - multi-tenant item API with a cache-aside access layer
//!
//! Items are stored in MySQL, MongoDB or in process, optionally fronted by an
//! in-process or Redis cache. A background monitor publishes store readiness.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod service;
pub mod tasks;

pub use api::{create_router, AppState};
pub use config::Config;
pub use service::{ItemService, ServiceConfig};
