use reqwest::{header, multipart, Method, RequestBuilder, Response};
use serde_json::Value;
use url::Url;

use crate::cli::config::load_environment_config;
use crate::storage::sanitize_filename;

/// Thin HTTP client for the Asset Vault API. Non-2xx answers become errors
/// carrying the server's `code` and `message`.
pub struct ApiClient {
    http: reqwest::Client,
    base: Url,
    token: Option<String>,
}

/// A downloaded file and the name the server suggested for it.
pub struct Download {
    pub filename: Option<String>,
    pub content: Vec<u8>,
}

impl ApiClient {
    pub fn new(server_url: &str, token: Option<String>) -> anyhow::Result<Self> {
        let mut base = Url::parse(server_url).map_err(|e| anyhow::anyhow!("Invalid server URL '{}': {}", server_url, e))?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        Ok(Self {
            http: reqwest::Client::new(),
            base,
            token,
        })
    }

    /// Client for the configured server, without credentials.
    pub fn anonymous() -> anyhow::Result<Self> {
        let env = load_environment_config()?;
        Self::new(env.server_url(), None)
    }

    /// Client for the configured server using the stored token.
    pub fn authenticated() -> anyhow::Result<Self> {
        let env = load_environment_config()?;
        let token = env
            .token
            .ok_or_else(|| anyhow::anyhow!("Not logged in. Run 'vault auth login <username>' first"))?;
        Self::new(env.server_url.as_deref().unwrap_or(crate::cli::config::DEFAULT_SERVER_URL), Some(token))
    }

    pub fn endpoint(&self, path: &str) -> anyhow::Result<Url> {
        Ok(self.base.join(path.trim_start_matches('/'))?)
    }

    fn request(&self, method: Method, path: &str) -> anyhow::Result<RequestBuilder> {
        let builder = self.http.request(method, self.endpoint(path)?);
        Ok(match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        })
    }

    pub async fn get_json(&self, path: &str, query: &[(&str, String)]) -> anyhow::Result<Value> {
        let response = self.request(Method::GET, path)?.query(query).send().await?;
        json_body(response).await
    }

    pub async fn post_json(&self, path: &str, body: &Value) -> anyhow::Result<Value> {
        let response = self.request(Method::POST, path)?.json(body).send().await?;
        json_body(response).await
    }

    pub async fn send_form(&self, method: Method, path: &str, form: multipart::Form) -> anyhow::Result<Value> {
        let response = self.request(method, path)?.multipart(form).send().await?;
        json_body(response).await
    }

    pub async fn delete(&self, path: &str) -> anyhow::Result<Value> {
        let response = self.request(Method::DELETE, path)?.send().await?;
        json_body(response).await
    }

    pub async fn download(&self, path: &str) -> anyhow::Result<Download> {
        let response = check_status(self.request(Method::GET, path)?.send().await?).await?;
        let filename = response
            .headers()
            .get(header::CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok())
            .and_then(disposition_filename);
        let content = response.bytes().await?.to_vec();
        Ok(Download { filename, content })
    }
}

async fn check_status(response: Response) -> anyhow::Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body: Value = response.json().await.unwrap_or(Value::Null);
    let message = body
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("Request failed"));
    match body.get("code").and_then(Value::as_str) {
        Some(code) => Err(anyhow::anyhow!("{} ({}, HTTP {})", message, code, status.as_u16())),
        None => Err(anyhow::anyhow!("{} (HTTP {})", message, status.as_u16())),
    }
}

async fn json_body(response: Response) -> anyhow::Result<Value> {
    Ok(check_status(response).await?.json().await?)
}

/// `filename` parameter of a Content-Disposition header value, reduced to
/// its final path component so it is safe to write in the current directory.
pub fn disposition_filename(value: &str) -> Option<String> {
    value.split(';').map(str::trim).find_map(|part| {
        let name = part.strip_prefix("filename=")?;
        sanitize_filename(name.trim_matches('"'))
    })
}
