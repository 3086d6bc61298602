#![allow(dead_code)]

use anyhow::{Context, Result};
use axum::body::{to_bytes, Body, Bytes};
use axum::http::{header, HeaderMap, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use asset_vault::config::AppConfig;
use asset_vault::database::DatabaseManager;
use asset_vault::routes::{app, AppState};
use asset_vault::services::CatalogueService;

const BOUNDARY: &str = "asset-vault-test-boundary";

/// The full router over an in-memory store and a temporary upload
/// directory, driven in-process.
pub struct TestApp {
    pub config: AppConfig,
    pub db: DatabaseManager,
    router: Router,
    upload_dir: TempDir,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl TestResponse {
    pub fn json(&self) -> Result<Value> {
        serde_json::from_slice(&self.body)
            .with_context(|| format!("response body is not JSON: {}", String::from_utf8_lossy(&self.body)))
    }

    pub fn header(&self, name: header::HeaderName) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Machine-readable `code` of an error response.
    pub fn error_code(&self) -> Result<String> {
        Ok(self.json()?["code"].as_str().unwrap_or_default().to_string())
    }
}

impl TestApp {
    pub async fn spawn() -> Result<Self> {
        Self::spawn_with(|_| {}).await
    }

    pub async fn spawn_with(configure: impl FnOnce(&mut AppConfig)) -> Result<Self> {
        let upload_dir = tempfile::tempdir()?;
        let mut config = AppConfig::for_tests(upload_dir.path());
        configure(&mut config);

        let db = DatabaseManager::connect(&config.database).await?;
        let catalogue = CatalogueService::from_config(&config, &db)?;
        catalogue.files().init().await?;
        let router = app(AppState::new(config.clone(), db.clone(), catalogue));

        Ok(Self {
            config,
            db,
            router,
            upload_dir,
        })
    }

    pub async fn request(&self, request: Request<Body>) -> Result<TestResponse> {
        let response = self.router.clone().oneshot(request).await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = to_bytes(response.into_body(), usize::MAX).await?;
        Ok(TestResponse { status, headers, body })
    }

    pub async fn get(&self, path: &str, token: Option<&str>) -> Result<TestResponse> {
        self.request(builder(Method::GET, path, token).body(Body::empty())?).await
    }

    pub async fn delete(&self, path: &str, token: Option<&str>) -> Result<TestResponse> {
        self.request(builder(Method::DELETE, path, token).body(Body::empty())?).await
    }

    pub async fn post_json(&self, path: &str, body: Value) -> Result<TestResponse> {
        let request = builder(Method::POST, path, None)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))?;
        self.request(request).await
    }

    pub async fn send_form(&self, method: Method, path: &str, token: &str, form: &MultipartForm) -> Result<TestResponse> {
        let request = builder(method, path, Some(token))
            .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={}", BOUNDARY))
            .body(Body::from(form.encode()))?;
        self.request(request).await
    }

    pub async fn register(&self, username: &str, password: &str) -> Result<TestResponse> {
        self.post_json("/api/auth/register", json!({ "username": username, "password": password }))
            .await
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<TestResponse> {
        self.post_json("/api/auth/login", json!({ "username": username, "password": password }))
            .await
    }

    /// Register `username` with password "pw1" and return a bearer token.
    pub async fn user_token(&self, username: &str) -> Result<String> {
        let registered = self.register(username, "pw1").await?;
        anyhow::ensure!(registered.status == StatusCode::OK, "register failed: {}", registered.status);
        self.token_for(username, "pw1").await
    }

    pub async fn token_for(&self, username: &str, password: &str) -> Result<String> {
        let response = self.login(username, password).await?;
        anyhow::ensure!(response.status == StatusCode::OK, "login failed: {}", response.status);
        Ok(response.json()?["access_token"]
            .as_str()
            .context("missing access_token")?
            .to_string())
    }

    /// Create an asset and return its JSON.
    pub async fn create_asset(&self, token: &str, form: &MultipartForm) -> Result<Value> {
        let response = self.send_form(Method::POST, "/api/assets", token, form).await?;
        anyhow::ensure!(
            response.status == StatusCode::OK,
            "create failed: {} {}",
            response.status,
            String::from_utf8_lossy(&response.body)
        );
        response.json()
    }

    pub async fn list_assets(&self, token: &str, query: &str) -> Result<Vec<Value>> {
        let response = self.get(&format!("/api/assets{}", query), Some(token)).await?;
        anyhow::ensure!(response.status == StatusCode::OK, "list failed: {}", response.status);
        Ok(response.json()?["assets"].as_array().cloned().unwrap_or_default())
    }

    pub fn stored_file_exists(&self, stored: &str) -> bool {
        self.upload_dir.path().join(stored).exists()
    }

    pub fn upload_count(&self) -> usize {
        std::fs::read_dir(self.upload_dir.path()).map(|d| d.count()).unwrap_or(0)
    }
}

fn builder(method: Method, path: &str, token: Option<&str>) -> axum::http::request::Builder {
    let builder = Request::builder().method(method).uri(path);
    match token {
        Some(token) => builder.header(header::AUTHORIZATION, format!("Bearer {}", token)),
        None => builder,
    }
}

/// Hand-encoded `multipart/form-data` body.
#[derive(Default, Clone)]
pub struct MultipartForm {
    fields: Vec<(String, String)>,
    file: Option<(String, Vec<u8>, String)>,
}

impl MultipartForm {
    pub fn new() -> Self {
        Self::default()
    }

    /// A valid create form: name, 3D Model category, license and source.
    pub fn asset(name: &str) -> Self {
        Self::new()
            .text("name", name)
            .text("category", "3D Model")
            .text("license_type", "Paid")
            .text("source_url", "http://x")
    }

    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.fields.retain(|(n, _)| n != name);
        self.fields.push((name.to_string(), value.to_string()));
        self
    }

    pub fn without(mut self, name: &str) -> Self {
        self.fields.retain(|(n, _)| n != name);
        self
    }

    pub fn file(mut self, filename: &str, content: &[u8], content_type: &str) -> Self {
        self.file = Some((filename.to_string(), content.to_vec(), content_type.to_string()));
        self
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut body = Vec::new();
        for (name, value) in &self.fields {
            body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
            body.extend_from_slice(format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name).as_bytes());
            body.extend_from_slice(value.as_bytes());
            body.extend_from_slice(b"\r\n");
        }
        if let Some((filename, content, content_type)) = &self.file {
            body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
            body.extend_from_slice(
                format!(
                    "Content-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                    filename, content_type
                )
                .as_bytes(),
            );
            body.extend_from_slice(content);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
        body
    }
}
