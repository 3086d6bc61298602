use std::sync::Arc;

use chrono::Utc;
use sqlx::SqlitePool;
use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::info;

use crate::auth::password::{self, PasswordError};
use crate::database::manager::DatabaseError;
use crate::database::models::User;

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("Username '{0}' is already taken")]
    DuplicateUsername(String),

    #[error(transparent)]
    Password(#[from] PasswordError),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl From<sqlx::Error> for CredentialError {
    fn from(err: sqlx::Error) -> Self {
        CredentialError::Database(err.into())
    }
}

/// Username to password-hash mapping backed by the `users` table.
#[derive(Clone, Debug)]
pub struct CredentialStore {
    pool: SqlitePool,
    // verified against for unknown usernames
    dummy_hash: Arc<OnceCell<String>>,
}

impl CredentialStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            dummy_hash: Arc::new(OnceCell::new()),
        }
    }

    /// Create a user with a freshly salted hash. Usernames are matched
    /// case-sensitively.
    pub async fn register(&self, username: &str, password: &str) -> Result<i64, CredentialError> {
        if self.find_by_username(username).await?.is_some() {
            return Err(CredentialError::DuplicateUsername(username.to_string()));
        }

        let hash = hash_off_thread(password).await?;
        let result = sqlx::query("INSERT INTO users (username, password_hash, created_at) VALUES (?, ?, ?)")
            .bind(username)
            .bind(&hash)
            .bind(Utc::now())
            .execute(&self.pool)
            .await;

        match result {
            Ok(done) => {
                let id = done.last_insert_rowid();
                info!("Registered user '{}' (id {})", username, id);
                Ok(id)
            }
            // Lost a race with a concurrent registration of the same name
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Err(CredentialError::DuplicateUsername(username.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Returns the user id when the password matches. An unknown username
    /// and a wrong password are indistinguishable, including in timing.
    pub async fn verify(&self, username: &str, password: &str) -> Result<Option<i64>, CredentialError> {
        let user = self.find_by_username(username).await?;
        let (hash, id) = match user {
            Some(user) => (user.password_hash, Some(user.id)),
            None => (self.dummy_hash().await?, None),
        };

        let matched = verify_off_thread(hash, password).await?;
        Ok(if matched { id } else { None })
    }

    async fn dummy_hash(&self) -> Result<String, CredentialError> {
        self.dummy_hash
            .get_or_try_init(|| hash_off_thread("asset-vault-timing-equalizer"))
            .await
            .cloned()
    }

    pub async fn find_by_username(&self, username: &str) -> Result<Option<User>, CredentialError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, username, password_hash, created_at FROM users WHERE username = ?",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    /// Create a user under a fixed id unless one already exists there. An
    /// existing row whose hash no longer matches `password` is re-hashed, so
    /// a changed configured password takes effect. Returns true when the row
    /// was inserted by this call.
    pub async fn ensure_reserved(&self, id: i64, username: &str, password: &str) -> Result<bool, CredentialError> {
        let existing: Option<(String,)> = sqlx::query_as("SELECT password_hash FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        if let Some((stored,)) = existing {
            if !verify_off_thread(stored, password).await? {
                let hash = hash_off_thread(password).await?;
                sqlx::query("UPDATE users SET password_hash = ? WHERE id = ?")
                    .bind(&hash)
                    .bind(id)
                    .execute(&self.pool)
                    .await?;
                info!("Refreshed password of reserved user '{}' (id {})", username, id);
            }
            return Ok(false);
        }

        let hash = hash_off_thread(password).await?;
        let done = sqlx::query(
            "INSERT OR IGNORE INTO users (id, username, password_hash, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(id)
        .bind(username)
        .bind(&hash)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        let created = done.rows_affected() == 1;
        if created {
            info!("Provisioned reserved user '{}' (id {})", username, id);
        }
        Ok(created)
    }
}

/// argon2 hashing is CPU-bound; run it on the blocking pool.
async fn hash_off_thread(password: &str) -> Result<String, CredentialError> {
    let password = password.to_string();
    let hash = tokio::task::spawn_blocking(move || password::hash_password(&password))
        .await
        .map_err(|e| PasswordError::Hash(e.to_string()))??;
    Ok(hash)
}

async fn verify_off_thread(hash: String, password: &str) -> Result<bool, CredentialError> {
    let password = password.to_string();
    let matched = tokio::task::spawn_blocking(move || password::verify_password(&hash, &password))
        .await
        .map_err(|e| PasswordError::Hash(e.to_string()))?;
    Ok(matched)
}
