use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::info;

use crate::config::DatabaseConfig;

/// Errors from the persistent store
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Invalid database URL: {0}")]
    InvalidDatabaseUrl(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Corrupt record: {0}")]
    Corrupt(String),

    #[error("Migration error: {0}")]
    MigrationError(String),

    #[error("Database temporarily unavailable")]
    ConnectionError(#[source] sqlx::Error),

    #[error(transparent)]
    Sqlx(sqlx::Error),
}

impl From<sqlx::Error> for DatabaseError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                DatabaseError::ConnectionError(err)
            }
            other => DatabaseError::Sqlx(other),
        }
    }
}

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id            INTEGER PRIMARY KEY AUTOINCREMENT,
        username      TEXT    NOT NULL UNIQUE,
        password_hash TEXT    NOT NULL,
        created_at    TEXT    NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS assets (
        id           INTEGER PRIMARY KEY AUTOINCREMENT,
        name         TEXT    NOT NULL,
        category     TEXT    NOT NULL,
        license_type TEXT    NOT NULL,
        source_url   TEXT    NOT NULL,
        description  TEXT,
        tags         TEXT    NOT NULL DEFAULT '',
        file_path    TEXT,
        owner_id     INTEGER NOT NULL,
        created_at   TEXT    NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_assets_owner ON assets (owner_id)",
];

/// Explicitly owned handle to the relational store.
///
/// Opened once at process start and handed to the components that need it;
/// `close` releases every pooled connection on shutdown.
#[derive(Clone, Debug)]
pub struct DatabaseManager {
    pool: SqlitePool,
}

impl DatabaseManager {
    /// Open the pool described by `config` and ensure the schema exists.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, DatabaseError> {
        if !config.url.starts_with("sqlite:") {
            return Err(DatabaseError::InvalidDatabaseUrl(config.url.clone()));
        }
        let options = SqliteConnectOptions::from_str(&config.url)
            .map_err(|_| DatabaseError::InvalidDatabaseUrl(config.url.clone()))?
            .create_if_missing(true)
            .busy_timeout(Duration::from_secs(config.connection_timeout.max(1)));

        let in_memory = Self::is_in_memory(&config.url);
        let options = if in_memory {
            options
        } else {
            options.journal_mode(SqliteJournalMode::Wal)
        };

        // Every connection to `sqlite::memory:` is a separate database, so the
        // pool is pinned to a single long-lived connection.
        let max_connections = if in_memory { 1 } else { config.max_connections.max(1) };
        let mut pool_options = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout.max(1)));
        if in_memory {
            pool_options = pool_options
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None);
        }

        let pool = pool_options.connect_with(options).await?;

        let manager = Self { pool };
        manager.migrate().await?;
        info!("Opened database (max_connections={})", max_connections);
        Ok(manager)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn migrate(&self) -> Result<(), DatabaseError> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|e| DatabaseError::MigrationError(e.to_string()))?;
        }
        Ok(())
    }

    /// Pings the pool to ensure connectivity
    pub async fn health_check(&self) -> Result<(), DatabaseError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
        info!("Closed database pool");
    }

    fn is_in_memory(url: &str) -> bool {
        url.contains(":memory:") || url.contains("mode=memory")
    }
}
