// handlers/protected/assets/list.rs - GET /api/assets handler

use axum::{
    extract::{Query, State},
    response::Json,
    Extension,
};
use serde::Serialize;

use crate::auth::Identity;
use crate::database::models::Asset;
use crate::error::ApiError;
use crate::filter::ListQuery;
use crate::routes::AppState;

#[derive(Debug, Serialize)]
pub struct AssetList {
    pub assets: Vec<Asset>,
}

/// GET /api/assets?category=&tags= - List the caller's own assets
///
/// `category` must be one of the fixed category names. `tags` is a
/// comma-separated list; an asset matches when it carries any of them.
///
/// Expected Output:
/// ```json
/// {
///   "assets": [
///     {
///       "id": 1,
///       "name": "Sword",
///       "category": "3D Model",
///       "license_type": "Paid",
///       "source_url": "http://x",
///       "description": null,
///       "tags": ["weapon", "medieval"],
///       "file_path": null,
///       "owner_id": 1,
///       "created_at": "2025-01-01T00:00:00Z"
///     }
///   ]
/// }
/// ```
pub async fn list_get(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Query(query): Query<ListQuery>,
) -> Result<Json<AssetList>, ApiError> {
    let assets = state.catalogue.list(&identity, &query).await?;
    Ok(Json(AssetList { assets }))
}
