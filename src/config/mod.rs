use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use jsonwebtoken::Algorithm;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Secret used when nothing is configured. Only accepted in development.
const DEVELOPMENT_SECRET: &str = "asset-vault-development-secret-change-me";

/// Upper bound on token lifetimes: one year.
pub const MAX_TOKEN_EXPIRY_MINUTES: i64 = 365 * 24 * 60;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("SECRET_KEY must be set outside development")]
    MissingSecret,

    #[error("Unsupported token algorithm '{0}' (expected HS256, HS384 or HS512)")]
    UnsupportedAlgorithm(String),

    #[error("Invalid value for {name}: {value}")]
    InvalidValue { name: &'static str, value: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub database: DatabaseConfig,
    pub storage: StorageConfig,
    pub api: ApiConfig,
    pub security: SecurityConfig,
    pub demo: DemoConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    /// Seconds to wait for a pooled connection before failing the request
    pub connection_timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub upload_dir: PathBuf,
    pub io_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub port: u16,
    pub max_request_size_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    #[serde(skip_serializing)]
    pub jwt_secret: String,
    pub jwt_algorithm: String,
    pub token_expiry_minutes: i64,
    pub demo_token_expiry_minutes: i64,
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DemoConfig {
    pub enabled: bool,
    pub username: String,
    #[serde(skip_serializing)]
    pub password: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // Database overrides
        if let Ok(v) = env::var("DATABASE_URL") {
            self.database.url = v;
        }
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = v.parse().unwrap_or(self.database.connection_timeout);
        }

        // Storage overrides
        if let Ok(v) = env::var("UPLOAD_DIR") {
            self.storage.upload_dir = PathBuf::from(v);
        }
        if let Ok(v) = env::var("STORAGE_IO_TIMEOUT_SECS") {
            self.storage.io_timeout_secs = v.parse().unwrap_or(self.storage.io_timeout_secs);
        }

        // API overrides
        if let Some(v) = env::var("ASSET_VAULT_PORT").ok().or_else(|| env::var("PORT").ok()) {
            self.api.port = v.parse().unwrap_or(self.api.port);
        }
        if let Ok(v) = env::var("API_MAX_REQUEST_SIZE_BYTES") {
            self.api.max_request_size_bytes = v.parse().unwrap_or(self.api.max_request_size_bytes);
        }

        // Security overrides
        if let Ok(v) = env::var("SECRET_KEY") {
            self.security.jwt_secret = v;
        }
        if let Ok(v) = env::var("ALGORITHM") {
            self.security.jwt_algorithm = v;
        }
        if let Ok(v) = env::var("ACCESS_TOKEN_EXPIRE_MINUTES") {
            self.security.token_expiry_minutes = v.parse().unwrap_or(self.security.token_expiry_minutes);
        }
        if let Ok(v) = env::var("DEMO_TOKEN_EXPIRE_MINUTES") {
            self.security.demo_token_expiry_minutes =
                v.parse().unwrap_or(self.security.demo_token_expiry_minutes);
        }
        if let Ok(v) = env::var("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = v.split(',').map(|s| s.trim().to_string()).collect();
        }

        // Demo identity overrides
        if let Ok(v) = env::var("DEMO_ENABLED") {
            self.demo.enabled = v.parse().unwrap_or(self.demo.enabled);
        }
        if let Ok(v) = env::var("DEMO_USERNAME") {
            self.demo.username = v;
        }
        if let Ok(v) = env::var("DEMO_PASSWORD") {
            self.demo.password = v;
        }

        self
    }

    /// Reject configurations the server must not start with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.security.jwt_secret.is_empty() {
            return Err(ConfigError::MissingSecret);
        }
        if self.environment != Environment::Development && self.security.jwt_secret == DEVELOPMENT_SECRET {
            return Err(ConfigError::MissingSecret);
        }
        self.jwt_algorithm()?;
        check_expiry("ACCESS_TOKEN_EXPIRE_MINUTES", self.security.token_expiry_minutes)?;
        check_expiry("DEMO_TOKEN_EXPIRE_MINUTES", self.security.demo_token_expiry_minutes)?;
        Ok(())
    }

    /// Parsed signing algorithm. Only the HMAC family is supported since the
    /// secret is a shared symmetric key.
    pub fn jwt_algorithm(&self) -> Result<Algorithm, ConfigError> {
        let name = self.security.jwt_algorithm.trim().to_uppercase();
        match Algorithm::from_str(&name) {
            Ok(alg @ (Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512)) => Ok(alg),
            _ => Err(ConfigError::UnsupportedAlgorithm(self.security.jwt_algorithm.clone())),
        }
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            database: DatabaseConfig {
                url: "sqlite://asset_vault.db".to_string(),
                max_connections: 10,
                connection_timeout: 5,
            },
            storage: StorageConfig {
                upload_dir: PathBuf::from("uploads"),
                io_timeout_secs: 5,
            },
            api: ApiConfig {
                port: 8000,
                max_request_size_bytes: 50 * 1024 * 1024, // 50MB
            },
            security: SecurityConfig {
                jwt_secret: DEVELOPMENT_SECRET.to_string(),
                jwt_algorithm: "HS256".to_string(),
                token_expiry_minutes: 30,
                demo_token_expiry_minutes: 60,
                cors_origins: vec!["http://localhost:3000".to_string(), "http://localhost:5173".to_string()],
            },
            demo: DemoConfig {
                enabled: true,
                username: "demo".to_string(),
                password: "demo".to_string(),
            },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            database: DatabaseConfig {
                url: "sqlite://asset_vault.db".to_string(),
                max_connections: 20,
                connection_timeout: 5,
            },
            storage: StorageConfig {
                upload_dir: PathBuf::from("uploads"),
                io_timeout_secs: 5,
            },
            api: ApiConfig {
                port: 8000,
                max_request_size_bytes: 25 * 1024 * 1024, // 25MB
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                jwt_algorithm: "HS256".to_string(),
                token_expiry_minutes: 30,
                demo_token_expiry_minutes: 60,
                cors_origins: vec!["https://staging.example.com".to_string()],
            },
            demo: DemoConfig {
                enabled: true,
                username: "demo".to_string(),
                password: "demo".to_string(),
            },
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            database: DatabaseConfig {
                url: "sqlite:///var/lib/asset-vault/asset_vault.db".to_string(),
                max_connections: 50,
                connection_timeout: 3,
            },
            storage: StorageConfig {
                upload_dir: PathBuf::from("/var/lib/asset-vault/uploads"),
                io_timeout_secs: 3,
            },
            api: ApiConfig {
                port: 8000,
                max_request_size_bytes: 25 * 1024 * 1024, // 25MB
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                jwt_algorithm: "HS256".to_string(),
                token_expiry_minutes: 30,
                demo_token_expiry_minutes: 60,
                cors_origins: vec!["https://app.example.com".to_string()],
            },
            demo: DemoConfig {
                enabled: false,
                username: "demo".to_string(),
                password: "demo".to_string(),
            },
        }
    }

    /// Development defaults pointed at an in-memory store and the given
    /// upload directory.
    pub fn for_tests(upload_dir: impl Into<PathBuf>) -> Self {
        let mut config = Self::development();
        config.database.url = "sqlite::memory:".to_string();
        config.database.max_connections = 1;
        config.storage.upload_dir = upload_dir.into();
        config
    }
}

/// Token lifetimes must be positive and at most a year.
pub fn check_expiry(name: &'static str, minutes: i64) -> Result<(), ConfigError> {
    if minutes <= 0 || minutes > MAX_TOKEN_EXPIRY_MINUTES {
        return Err(ConfigError::InvalidValue {
            name,
            value: minutes.to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_development_config() {
        let config = AppConfig::development();
        assert_eq!(config.security.token_expiry_minutes, 30);
        assert_eq!(config.security.demo_token_expiry_minutes, 60);
        assert!(config.demo.enabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_production_config() {
        let config = AppConfig::production();
        assert!(!config.demo.enabled);
        assert!(matches!(config.validate(), Err(ConfigError::MissingSecret)));
    }

    #[test]
    fn production_rejects_development_secret() {
        let mut config = AppConfig::production();
        config.security.jwt_secret = DEVELOPMENT_SECRET.to_string();
        assert!(matches!(config.validate(), Err(ConfigError::MissingSecret)));

        config.security.jwt_secret = "a-real-secret".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn algorithm_must_be_hmac() {
        let mut config = AppConfig::development();
        config.security.jwt_algorithm = "hs512".to_string();
        assert_eq!(config.jwt_algorithm().unwrap(), Algorithm::HS512);

        config.security.jwt_algorithm = "RS256".to_string();
        assert!(matches!(config.jwt_algorithm(), Err(ConfigError::UnsupportedAlgorithm(_))));

        config.security.jwt_algorithm = "nonsense".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn token_expiry_is_bounded() {
        let mut config = AppConfig::development();
        config.security.token_expiry_minutes = MAX_TOKEN_EXPIRY_MINUTES;
        assert!(config.validate().is_ok());

        config.security.token_expiry_minutes = i64::MAX;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { name: "ACCESS_TOKEN_EXPIRE_MINUTES", .. })
        ));

        config.security.token_expiry_minutes = 30;
        config.security.demo_token_expiry_minutes = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { name: "DEMO_TOKEN_EXPIRE_MINUTES", .. })
        ));
    }
}
