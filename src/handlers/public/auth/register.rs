// handlers/public/auth/register.rs - POST /api/auth/register handler

use axum::{extract::State, response::Json};
use serde_json::{json, Value};

use super::CredentialsRequest;
use crate::error::ApiError;
use crate::routes::AppState;

/// POST /api/auth/register - Register new user account
///
/// Expected Input:
/// ```json
/// { "username": "alice", "password": "pw1" }
/// ```
///
/// Expected Output:
/// ```json
/// { "message": "User created successfully" }
/// ```
///
/// A taken username (including the configured demo username) answers
/// 400 `DUPLICATE_USERNAME`.
pub async fn register_post(
    State(state): State<AppState>,
    Json(body): Json<CredentialsRequest>,
) -> Result<Json<Value>, ApiError> {
    state.catalogue.register(&body.username, &body.password).await?;

    Ok(Json(json!({ "message": "User created successfully" })))
}
