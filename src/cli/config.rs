use std::fs;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_SERVER_URL: &str = "http://localhost:8000";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerStatus {
    Up,
    Down,
    Unknown,
}

/// Everything the CLI remembers between invocations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvironmentConfig {
    pub server_url: Option<String>,
    pub server_status: ServerStatus,
    pub last_ping: Option<DateTime<Utc>>,
    pub username: Option<String>,
    pub token: Option<String>,
    #[serde(default)]
    pub is_test_mode: bool,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            server_url: None,
            server_status: ServerStatus::Unknown,
            last_ping: None,
            username: None,
            token: None,
            is_test_mode: false,
        }
    }
}

impl EnvironmentConfig {
    pub fn server_url(&self) -> &str {
        self.server_url.as_deref().unwrap_or(DEFAULT_SERVER_URL)
    }

    pub fn update_ping(&mut self, status: ServerStatus) {
        self.last_ping = Some(Utc::now());
        self.server_status = status;
    }

    pub fn set_session(&mut self, username: &str, token: String, is_test_mode: bool) {
        self.username = Some(username.to_string());
        self.token = Some(token);
        self.is_test_mode = is_test_mode;
    }

    pub fn clear_session(&mut self) {
        self.username = None;
        self.token = None;
        self.is_test_mode = false;
    }
}

pub fn get_config_dir() -> anyhow::Result<PathBuf> {
    let config_dir = if let Ok(custom_dir) = std::env::var("VAULT_CLI_CONFIG_DIR") {
        PathBuf::from(custom_dir)
    } else {
        let home = std::env::var("HOME").map_err(|_| anyhow::anyhow!("HOME environment variable not set"))?;
        PathBuf::from(home).join(".config").join("asset-vault").join("cli")
    };

    if !config_dir.exists() {
        fs::create_dir_all(&config_dir)?;
    }

    Ok(config_dir)
}

pub fn load_environment_config() -> anyhow::Result<EnvironmentConfig> {
    let config_dir = get_config_dir()?;
    let env_file = config_dir.join("env.json");

    if !env_file.exists() {
        return Ok(EnvironmentConfig::default());
    }

    let content = fs::read_to_string(env_file)?;
    let config: EnvironmentConfig = serde_json::from_str(&content)?;
    Ok(config)
}

pub fn save_environment_config(config: &EnvironmentConfig) -> anyhow::Result<()> {
    let config_dir = get_config_dir()?;
    let env_file = config_dir.join("env.json");

    let content = serde_json::to_string_pretty(config)?;
    fs::write(env_file, content)?;
    Ok(())
}

pub async fn ping_server(server_url: &str) -> ServerStatus {
    let client = reqwest::Client::new();
    let url = format!("{}/health", server_url.trim_end_matches('/'));

    match client.get(&url).timeout(std::time::Duration::from_secs(5)).send().await {
        Ok(response) if response.status().is_success() => ServerStatus::Up,
        _ => ServerStatus::Down,
    }
}
