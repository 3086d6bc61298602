// handlers/public/auth/mod.rs - Public authentication handlers

use serde::Deserialize;

pub mod login; // POST /api/auth/login - verify credentials and issue a token
pub mod register; // POST /api/auth/register - create a new account

pub use login::login_post;
pub use register::register_post;

/// Body shared by register and login. Missing fields deserialize as empty
/// strings so they surface as validation or credential errors rather than
/// extractor rejections.
#[derive(Debug, Deserialize)]
pub struct CredentialsRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}
