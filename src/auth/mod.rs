pub mod password;

use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{check_expiry, AppConfig, ConfigError};
use crate::database::models::user::DEMO_USER_ID;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Username
    pub sub: String,
    pub user_id: i64,
    pub exp: i64,
    pub iat: i64,
}

/// Caller identity resolved from a verified token.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Identity {
    pub user_id: i64,
    pub username: String,
}

impl Identity {
    pub fn is_demo(&self) -> bool {
        self.user_id == DEMO_USER_ID
    }
}

impl From<Claims> for Identity {
    fn from(claims: Claims) -> Self {
        Self {
            user_id: claims.user_id,
            username: claims.sub,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("Invalid token")]
    InvalidToken,

    #[error("Token has expired")]
    Expired,

    #[error("Token generation failed: {0}")]
    TokenGeneration(String),
}

/// Session lifetime policy, chosen by the identity at login.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionKind {
    Standard,
    Demo,
}

/// Issues and verifies signed identity tokens. Pure function of the token
/// and the signing secret; never touches the store.
#[derive(Clone)]
pub struct TokenService {
    algorithm: Algorithm,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    standard_ttl: Duration,
    demo_ttl: Duration,
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("algorithm", &self.algorithm)
            .field("standard_ttl", &self.standard_ttl)
            .field("demo_ttl", &self.demo_ttl)
            .finish_non_exhaustive()
    }
}

impl TokenService {
    pub fn new(secret: &str, algorithm: Algorithm, standard_ttl: Duration, demo_ttl: Duration) -> Self {
        Self {
            algorithm,
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            standard_ttl,
            demo_ttl,
        }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, ConfigError> {
        if config.security.jwt_secret.is_empty() {
            return Err(ConfigError::MissingSecret);
        }
        check_expiry("ACCESS_TOKEN_EXPIRE_MINUTES", config.security.token_expiry_minutes)?;
        check_expiry("DEMO_TOKEN_EXPIRE_MINUTES", config.security.demo_token_expiry_minutes)?;
        Ok(Self::new(
            &config.security.jwt_secret,
            config.jwt_algorithm()?,
            Duration::minutes(config.security.token_expiry_minutes),
            Duration::minutes(config.security.demo_token_expiry_minutes),
        ))
    }

    pub fn ttl(&self, kind: SessionKind) -> Duration {
        match kind {
            SessionKind::Standard => self.standard_ttl,
            SessionKind::Demo => self.demo_ttl,
        }
    }

    /// Sign a token for `user_id`/`username` valid for the session kind's TTL.
    pub fn issue(&self, user_id: i64, username: &str, kind: SessionKind) -> Result<String, AuthError> {
        self.issue_with_ttl(user_id, username, self.ttl(kind))
    }

    pub fn issue_with_ttl(&self, user_id: i64, username: &str, ttl: Duration) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = Claims {
            sub: username.to_string(),
            user_id,
            exp: (now + ttl).timestamp(),
            iat: now.timestamp(),
        };

        encode(&Header::new(self.algorithm), &claims, &self.encoding_key)
            .map_err(|e| AuthError::TokenGeneration(e.to_string()))
    }

    /// Verify signature and expiry and return the encoded identity.
    pub fn resolve(&self, token: &str) -> Result<Identity, AuthError> {
        let mut validation = Validation::new(self.algorithm);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        let token_data = decode::<Claims>(token, &self.decoding_key, &validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::Expired,
                _ => AuthError::InvalidToken,
            }
        })?;

        if token_data.claims.sub.is_empty() {
            return Err(AuthError::InvalidToken);
        }

        Ok(Identity::from(token_data.claims))
    }
}
