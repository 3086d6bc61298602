use std::sync::Arc;

use axum::extract::{DefaultBodyLimit, State};
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Json};
use axum::routing::{get, post};
use axum::{middleware, Router};
use serde_json::{json, Value};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::config::AppConfig;
use crate::database::DatabaseManager;
use crate::handlers::{protected, public};
use crate::middleware::jwt_auth_middleware;
use crate::services::CatalogueService;

/// Shared per-process state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: DatabaseManager,
    pub catalogue: CatalogueService,
}

impl AppState {
    pub fn new(config: AppConfig, db: DatabaseManager, catalogue: CatalogueService) -> Self {
        Self {
            config: Arc::new(config),
            db,
            catalogue,
        }
    }
}

pub fn app(state: AppState) -> Router {
    let body_limit = state.config.api.max_request_size_bytes;
    let cors = cors_layer(&state.config.security.cors_origins);

    Router::new()
        // Public
        .route("/", get(root))
        .route("/health", get(health))
        .merge(auth_public_routes())
        // Protected API
        .merge(protected_routes(state.clone()))
        // Global middleware, outermost first
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors)
                .layer(DefaultBodyLimit::max(body_limit)),
        )
        .with_state(state)
}

fn auth_public_routes() -> Router<AppState> {
    use public::auth;

    Router::new()
        .route("/api/auth/register", post(auth::register_post))
        .route("/api/auth/login", post(auth::login_post))
}

fn protected_routes(state: AppState) -> Router<AppState> {
    use protected::{assets, auth};

    Router::new()
        .route("/api/auth/me", get(auth::me_get))
        .route("/api/assets", get(assets::list_get).post(assets::create_post))
        .route(
            "/api/assets/:id",
            get(assets::record_get)
                .put(assets::record_put)
                .delete(assets::record_delete),
        )
        .route("/api/assets/:id/file", get(assets::file_get))
        .route("/api/assets/:id/file-preview", get(assets::file_preview_get))
        .route_layer(middleware::from_fn_with_state(state, jwt_auth_middleware))
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        return CorsLayer::permissive();
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(allowed)
        .allow_methods(Any)
        .allow_headers(Any)
}

async fn root() -> Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    Json(json!({
        "name": "Asset Vault",
        "version": version,
        "description": "Per-user catalogue of game development assets",
        "endpoints": {
            "health": "/health (public)",
            "auth": "/api/auth/register, /api/auth/login (public), /api/auth/me (protected)",
            "assets": "/api/assets[/:id] (protected)",
            "files": "/api/assets/:id/file, /api/assets/:id/file-preview (protected)",
        }
    }))
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    match state.db.health_check().await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({
                "status": "ok",
                "timestamp": now,
                "database": "ok"
            })),
        ),
        Err(e) => {
            warn!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "degraded",
                    "timestamp": now,
                    "database": "unavailable"
                })),
            )
        }
    }
}
