// handlers/protected/assets/record.rs - Single asset handlers

use axum::{
    extract::{Multipart, Path, State},
    response::Json,
    Extension,
};
use serde_json::{json, Value};

use super::read_asset_form;
use crate::auth::Identity;
use crate::database::models::Asset;
use crate::error::ApiError;
use crate::routes::AppState;

/// POST /api/assets - Create an asset owned by the caller
///
/// Multipart form fields: `name`, `category`, `license_type`, `source_url`
/// (required), `description`, `tags` (comma-separated) and `file`
/// (optional). Nothing is written to disk unless the fields validate.
pub async fn create_post(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    multipart: Multipart,
) -> Result<Json<Asset>, ApiError> {
    let form = read_asset_form(multipart).await?;
    let asset = state.catalogue.create(&identity, form).await?;
    Ok(Json(asset))
}

/// GET /api/assets/:id - Show one of the caller's assets
///
/// Assets that do not exist and assets owned by someone else both answer
/// 403 `FORBIDDEN`.
pub async fn record_get(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<i64>,
) -> Result<Json<Asset>, ApiError> {
    Ok(Json(state.catalogue.get(&identity, id).await?))
}

/// PUT /api/assets/:id - Replace all mutable fields, optionally the file
pub async fn record_put(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<i64>,
    multipart: Multipart,
) -> Result<Json<Asset>, ApiError> {
    let form = read_asset_form(multipart).await?;
    Ok(Json(state.catalogue.update(&identity, id, form).await?))
}

/// DELETE /api/assets/:id - Remove the record and its file
pub async fn record_delete(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    state.catalogue.delete(&identity, id).await?;
    Ok(Json(json!({ "message": "Asset deleted successfully" })))
}
