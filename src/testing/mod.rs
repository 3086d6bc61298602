use tempfile::TempDir;

use crate::config::AppConfig;
use crate::database::DatabaseManager;
use crate::routes::AppState;
use crate::services::CatalogueService;

/// Self-contained service stack for unit tests: an in-memory store and a
/// throwaway upload directory, both dropped with the context.
pub struct TestContext {
    pub config: AppConfig,
    pub db: DatabaseManager,
    pub catalogue: CatalogueService,
    upload_dir: TempDir,
}

impl TestContext {
    pub async fn new() -> anyhow::Result<Self> {
        let upload_dir = tempfile::tempdir()?;
        let config = AppConfig::for_tests(upload_dir.path());

        let db = DatabaseManager::connect(&config.database).await?;
        let catalogue = CatalogueService::from_config(&config, &db)?;
        catalogue.files().init().await?;

        Ok(Self {
            config,
            db,
            catalogue,
            upload_dir,
        })
    }

    /// Number of files currently in the upload directory.
    pub fn upload_count(&self) -> usize {
        std::fs::read_dir(self.upload_dir.path())
            .map(|entries| entries.count())
            .unwrap_or(0)
    }

    pub fn state(&self) -> AppState {
        AppState::new(self.config.clone(), self.db.clone(), self.catalogue.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn contexts_are_isolated() {
        let a = TestContext::new().await.unwrap();
        let b = TestContext::new().await.unwrap();

        a.catalogue.register("alice", "pw1").await.unwrap();
        b.catalogue.register("alice", "pw1").await.unwrap();
        assert_eq!(a.upload_count(), 0);
        assert_ne!(a.config.storage.upload_dir, b.config.storage.upload_dir);
    }
}
