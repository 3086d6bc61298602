use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};

use crate::error::ApiError;
use crate::routes::AppState;

/// Resolves the bearer token into an [`Identity`](crate::auth::Identity)
/// and stores it in the request extensions for the handlers.
pub async fn jwt_auth_middleware(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_bearer_token(&headers).map_err(ApiError::unauthorized)?;
    let identity = state.catalogue.authenticate(token)?;

    request.extensions_mut().insert(identity);
    Ok(next.run(request).await)
}

/// Extract the token from an `Authorization: Bearer <token>` header
fn extract_bearer_token(headers: &HeaderMap) -> Result<&str, &'static str> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or("Not authenticated")?
        .to_str()
        .map_err(|_| "Invalid Authorization header format")?;

    let (scheme, token) = value
        .split_once(' ')
        .ok_or("Authorization header must use Bearer token format")?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err("Authorization header must use Bearer token format");
    }

    let token = token.trim();
    if token.is_empty() {
        return Err("Empty bearer token");
    }
    Ok(token)
}
