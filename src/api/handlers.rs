//! API Handlers
//!
//! HTTP request handlers for the item endpoints and the readiness probe.

use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Json,
};
use validator::Validate;

use super::auth::{AuthUser, Authenticator};
use crate::error::{AppError, Result};
use crate::models::{HealthResponse, Item, ItemCreateInput, ListItemsParams, UpdateItemInput};
use crate::service::ItemService;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Cache-aside access to items
    pub service: Arc<ItemService>,
    /// Token to tenant resolution
    pub auth: Arc<dyn Authenticator>,
}

impl AppState {
    pub fn new(service: Arc<ItemService>, auth: Arc<dyn Authenticator>) -> Self {
        Self { service, auth }
    }
}

fn validate_input<T: Validate>(input: &T) -> Result<()> {
    input
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))
}

/// Handler for GET /item/:name
pub async fn get_item_handler(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(name): Path<String>,
) -> Result<Json<Item>> {
    let item = state.service.get_by_name(&name, &user.account_id).await?;
    Ok(Json(item))
}

/// Handler for POST /item
///
/// Returns 201 with the stored item.
pub async fn create_item_handler(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    payload: std::result::Result<Json<ItemCreateInput>, JsonRejection>,
) -> Result<(StatusCode, Json<Item>)> {
    let Json(input) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;
    validate_input(&input)?;

    let item = state.service.create(&input, &user.account_id).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

/// Handler for PUT /item/:id
///
/// The id is taken from the path; any id in the body is ignored.
pub async fn update_item_handler(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
    payload: std::result::Result<Json<UpdateItemInput>, JsonRejection>,
) -> Result<Json<Item>> {
    let Json(mut input) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;
    input.id = id;
    validate_input(&input)?;

    let item = state.service.update(&input, &user.account_id).await?;
    Ok(Json(item))
}

/// Handler for GET /items?sort=&order_by=&limit=
pub async fn list_items_handler(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    params: std::result::Result<Query<ListItemsParams>, QueryRejection>,
) -> Result<Json<Vec<Item>>> {
    let Query(params) = params.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let query = params.into_query()?;

    let items = state.service.list(&query, &user.account_id).await?;
    Ok(Json(items))
}

/// Handler for DELETE /item/:id
///
/// Answers 204 whether or not the item existed.
pub async fn delete_item_handler(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    state.service.delete(&id, &user.account_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Handler for GET /health-check
///
/// 200 while the repository answers its probes, 503 otherwise.
pub async fn health_handler(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let up = state.service.health_check();
    let status = if up {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(HealthResponse::from_status(up)))
}
