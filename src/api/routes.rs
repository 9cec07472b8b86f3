//! API Routes
//!
//! Configures the Axum router with the item endpoints and readiness probe.

use std::time::Duration;

use axum::{
    body::Body,
    http::Request,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::info_span;
use uuid::Uuid;

use super::handlers::{
    create_item_handler, delete_item_handler, get_item_handler, health_handler,
    list_items_handler, update_item_handler, AppState,
};

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `GET /item/:name` - Fetch an item by name
/// - `POST /item` - Create an item
/// - `PUT /item/:id` - Update an item
/// - `DELETE /item/:id` - Delete an item
/// - `GET /items` - List items
/// - `GET /health-check` - Readiness of the backing store
///
/// `GET`, `PUT` and `DELETE` share the `/item/:key` route; the segment is a
/// name for reads and an id for writes.
///
/// # Middleware
/// - CORS: Allows any origin
/// - Tracing: One span per item request, tagged with a fresh `trace_id`
/// - Timeout: Requests exceeding `request_timeout` are dropped with 408
///
/// The readiness probe sits outside tracing and the timeout.
pub fn create_router(state: AppState, request_timeout: Duration) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let trace = TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
        info_span!(
            "request",
            trace_id = %Uuid::new_v4(),
            method = %request.method(),
            path = %request.uri().path(),
        )
    });

    Router::new()
        .route("/item", post(create_item_handler))
        .route(
            "/item/:key",
            get(get_item_handler)
                .put(update_item_handler)
                .delete(delete_item_handler),
        )
        .route("/items", get(list_items_handler))
        .layer(TimeoutLayer::new(request_timeout))
        .layer(trace)
        .route("/health-check", get(health_handler))
        .layer(cors)
        .with_state(state)
}
