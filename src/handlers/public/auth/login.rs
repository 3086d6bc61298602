// handlers/public/auth/login.rs - POST /api/auth/login handler

use axum::{extract::State, response::Json};

use super::CredentialsRequest;
use crate::error::ApiError;
use crate::routes::AppState;
use crate::services::LoginOutcome;

/// POST /api/auth/login - Authenticate user and receive a bearer token
///
/// Expected Input:
/// ```json
/// { "username": "alice", "password": "pw1" }
/// ```
///
/// Expected Output:
/// ```json
/// {
///   "access_token": "eyJhbGciOiJIUzI1NiI...",
///   "token_type": "bearer",
///   "is_test_mode": false
/// }
/// ```
///
/// `is_test_mode` is true for the demo identity, whose session also lives
/// longer. Unknown usernames and wrong passwords both answer 401
/// `INVALID_CREDENTIALS`.
pub async fn login_post(
    State(state): State<AppState>,
    Json(body): Json<CredentialsRequest>,
) -> Result<Json<LoginOutcome>, ApiError> {
    let outcome = state.catalogue.login(&body.username, &body.password).await?;
    Ok(Json(outcome))
}
