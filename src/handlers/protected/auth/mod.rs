// handlers/protected/auth/mod.rs - GET /api/auth/me handler

use axum::{extract::State, response::Json, Extension};

use crate::auth::Identity;
use crate::routes::AppState;
use crate::services::SessionInfo;

/// GET /api/auth/me - Identity behind the current token
///
/// Expected Output:
/// ```json
/// { "user_id": 1, "username": "alice", "is_test_mode": false }
/// ```
pub async fn me_get(State(state): State<AppState>, Extension(identity): Extension<Identity>) -> Json<SessionInfo> {
    Json(state.catalogue.whoami(&identity))
}
