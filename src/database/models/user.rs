use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

/// Reserved id of the auto-provisioned demo identity.
pub const DEMO_USER_ID: i64 = 0;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn is_demo(&self) -> bool {
        self.id == DEMO_USER_ID
    }
}
