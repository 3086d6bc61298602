use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::auth::password::PasswordError;
use crate::auth::{AuthError, Identity, SessionKind, TokenService};
use crate::config::{AppConfig, ConfigError};
use crate::database::models::user::DEMO_USER_ID;
use crate::database::models::{Asset, AssetFields, Category, Tags};
use crate::database::{AssetRepository, CredentialError, CredentialStore, DatabaseError, DatabaseManager};
use crate::filter::{AssetFilter, FilterError, ListQuery};
use crate::services::provisioning::{DemoSeeder, IdentityProvisioner, NoProvisioning};
use crate::storage::{sanitize_filename, FileStore, FileStoreError, StoredFile};

#[derive(Debug, Error)]
pub enum CatalogueError {
    #[error("Username '{0}' is already taken")]
    DuplicateUsername(String),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Could not validate credentials: {0}")]
    Unauthenticated(AuthError),

    #[error("Not authorized to access this asset")]
    Forbidden,

    #[error("{0}")]
    NotFound(String),

    #[error("Invalid category '{0}'")]
    InvalidCategory(String),

    #[error("{message}")]
    Validation { field: &'static str, message: String },

    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error(transparent)]
    Files(#[from] FileStoreError),

    #[error("{0}")]
    Internal(String),
}

impl CatalogueError {
    fn required(field: &'static str) -> Self {
        CatalogueError::Validation {
            field,
            message: format!("{} is required", field),
        }
    }
}

impl From<CredentialError> for CatalogueError {
    fn from(err: CredentialError) -> Self {
        match err {
            CredentialError::DuplicateUsername(name) => CatalogueError::DuplicateUsername(name),
            CredentialError::Database(e) => CatalogueError::Database(e),
            CredentialError::Password(e) => CatalogueError::from(e),
        }
    }
}

impl From<PasswordError> for CatalogueError {
    fn from(err: PasswordError) -> Self {
        CatalogueError::Internal(err.to_string())
    }
}

impl From<AuthError> for CatalogueError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::TokenGeneration(msg) => CatalogueError::Internal(msg),
            other => CatalogueError::Unauthenticated(other),
        }
    }
}

impl From<FilterError> for CatalogueError {
    fn from(err: FilterError) -> Self {
        match err {
            FilterError::InvalidCategory(value) => CatalogueError::InvalidCategory(value),
        }
    }
}

/// A file attached to a create or update request.
#[derive(Debug, Clone, Default)]
pub struct Upload {
    pub filename: String,
    pub content: Vec<u8>,
}

impl Upload {
    pub fn new(filename: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            filename: filename.into(),
            content: content.into(),
        }
    }

    /// An upload with no usable filename or no bytes counts as absent.
    pub fn is_usable(&self) -> bool {
        !self.content.is_empty() && sanitize_filename(&self.filename).is_some()
    }
}

/// Raw create/update input as submitted by a client, before validation.
#[derive(Debug, Clone, Default)]
pub struct AssetForm {
    pub name: Option<String>,
    pub category: Option<String>,
    pub license_type: Option<String>,
    pub source_url: Option<String>,
    pub description: Option<String>,
    pub tags: Option<String>,
    pub file: Option<Upload>,
}

impl AssetForm {
    /// Check required fields and the category, and normalize tags.
    pub fn fields(&self) -> Result<AssetFields, CatalogueError> {
        let name = required(&self.name, "name")?;
        let category = required(&self.category, "category")?;
        let license_type = required(&self.license_type, "license_type")?;
        let source_url = required(&self.source_url, "source_url")?;

        let category = category
            .parse::<Category>()
            .map_err(|e| CatalogueError::InvalidCategory(e.0))?;

        let description = self
            .description
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(str::to_string);

        Ok(AssetFields {
            name,
            category,
            license_type,
            source_url,
            description,
            tags: Tags::parse(self.tags.as_deref().unwrap_or_default()),
        })
    }

    fn usable_upload(&self) -> Option<&Upload> {
        self.file.as_ref().filter(|u| u.is_usable())
    }
}

fn required(value: &Option<String>, field: &'static str) -> Result<String, CatalogueError> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(CatalogueError::required(field)),
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginOutcome {
    pub access_token: String,
    pub token_type: &'static str,
    pub is_test_mode: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionInfo {
    pub user_id: i64,
    pub username: String,
    pub is_test_mode: bool,
}

#[derive(Debug, Clone)]
pub struct DemoAccount {
    pub username: String,
    pub password: String,
}

/// Runs every request through authentication, ownership checks and the
/// record/file lifecycle. Holds no per-request state.
#[derive(Clone)]
pub struct CatalogueService {
    credentials: CredentialStore,
    tokens: TokenService,
    assets: AssetRepository,
    files: FileStore,
    provisioner: Arc<dyn IdentityProvisioner>,
    demo: Option<DemoAccount>,
}

impl CatalogueService {
    pub fn new(db: &DatabaseManager, tokens: TokenService, files: FileStore) -> Self {
        Self {
            credentials: CredentialStore::new(db.pool().clone()),
            tokens,
            assets: AssetRepository::new(db.pool().clone()),
            files,
            provisioner: Arc::new(NoProvisioning),
            demo: None,
        }
    }

    /// Build the service from configuration. Enables the demo account and
    /// its seeding policy when configured.
    pub fn from_config(config: &AppConfig, db: &DatabaseManager) -> Result<Self, ConfigError> {
        let tokens = TokenService::from_config(config)?;
        let files = FileStore::from_config(&config.storage);
        let service = Self::new(db, tokens, files);

        Ok(if config.demo.enabled {
            service.with_demo(DemoAccount {
                username: config.demo.username.clone(),
                password: config.demo.password.clone(),
            })
        } else {
            service
        })
    }

    pub fn with_demo(mut self, account: DemoAccount) -> Self {
        self.demo = Some(account);
        self.provisioner = Arc::new(DemoSeeder::new());
        self
    }

    pub fn with_provisioner(mut self, provisioner: Arc<dyn IdentityProvisioner>) -> Self {
        self.provisioner = provisioner;
        self
    }

    pub fn files(&self) -> &FileStore {
        &self.files
    }

    fn is_demo_username(&self, username: &str) -> bool {
        self.demo.as_ref().is_some_and(|d| d.username == username)
    }

    pub async fn register(&self, username: &str, password: &str) -> Result<i64, CatalogueError> {
        let username = username.trim();
        if username.is_empty() {
            return Err(CatalogueError::required("username"));
        }
        if password.is_empty() {
            return Err(CatalogueError::required("password"));
        }
        if self.is_demo_username(username) {
            return Err(CatalogueError::DuplicateUsername(username.to_string()));
        }

        Ok(self.credentials.register(username, password).await?)
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<LoginOutcome, CatalogueError> {
        if let Some(demo) = self.demo.as_ref().filter(|d| d.username == username) {
            self.credentials
                .ensure_reserved(DEMO_USER_ID, &demo.username, &demo.password)
                .await?;
        }

        let Some(user_id) = self.credentials.verify(username, password).await? else {
            warn!("Failed login for '{}'", username);
            return Err(CatalogueError::InvalidCredentials);
        };

        let kind = if user_id == DEMO_USER_ID { SessionKind::Demo } else { SessionKind::Standard };
        let access_token = self.tokens.issue(user_id, username, kind)?;
        info!("User '{}' logged in", username);

        Ok(LoginOutcome {
            access_token,
            token_type: "bearer",
            is_test_mode: kind == SessionKind::Demo,
        })
    }

    pub fn authenticate(&self, token: &str) -> Result<Identity, CatalogueError> {
        self.tokens.resolve(token).map_err(|e| {
            warn!("Rejected bearer token: {}", e);
            CatalogueError::from(e)
        })
    }

    pub fn whoami(&self, identity: &Identity) -> SessionInfo {
        SessionInfo {
            user_id: identity.user_id,
            username: identity.username.clone(),
            is_test_mode: identity.is_demo(),
        }
    }

    /// The caller's own assets matching the query, after the provisioning
    /// policy has had its turn.
    pub async fn list(&self, identity: &Identity, query: &ListQuery) -> Result<Vec<Asset>, CatalogueError> {
        let filter = AssetFilter::from_query(query)?;
        self.provisioner.provision(identity, &self.assets).await?;
        Ok(self.assets.list(identity.user_id, &filter).await?)
    }

    pub async fn get(&self, identity: &Identity, asset_id: i64) -> Result<Asset, CatalogueError> {
        self.authorize(identity, asset_id).await
    }

    pub async fn create(&self, identity: &Identity, form: AssetForm) -> Result<Asset, CatalogueError> {
        let fields = form.fields()?;
        let asset = self.assets.create(identity.user_id, &fields).await?;

        let asset = match form.usable_upload() {
            Some(upload) => self.attach(asset, upload).await?,
            None => asset,
        };
        info!("User {} created asset {} ('{}')", identity.user_id, asset.id, asset.name);
        Ok(asset)
    }

    pub async fn update(&self, identity: &Identity, asset_id: i64, form: AssetForm) -> Result<Asset, CatalogueError> {
        let fields = form.fields()?;
        let existing = self.authorize(identity, asset_id).await?;
        let mut asset = self.assets.update(asset_id, &fields).await?;

        if let Some(upload) = form.usable_upload() {
            if let Some(old) = &existing.file_path {
                self.files.remove(old).await?;
            }
            let stored = self.files.save(asset_id, &upload.filename, &upload.content).await?;
            asset = self.assets.set_file_path(asset_id, stored.as_deref()).await?;
        }

        info!("User {} updated asset {}", identity.user_id, asset_id);
        Ok(asset)
    }

    pub async fn delete(&self, identity: &Identity, asset_id: i64) -> Result<(), CatalogueError> {
        let asset = self.authorize(identity, asset_id).await?;
        if let Some(stored) = &asset.file_path {
            self.files.remove(stored).await?;
        }
        self.assets.delete(asset_id).await?;
        info!("User {} deleted asset {}", identity.user_id, asset_id);
        Ok(())
    }

    /// Open the asset's file for download or preview.
    pub async fn file(&self, identity: &Identity, asset_id: i64) -> Result<StoredFile, CatalogueError> {
        let asset = self.authorize(identity, asset_id).await?;
        let stored = asset
            .file_path
            .ok_or_else(|| CatalogueError::NotFound("File not found".to_string()))?;

        match self.files.read(&stored).await {
            Ok(file) => Ok(file),
            Err(FileStoreError::NotFound(_)) => {
                warn!("Asset {} references missing file {}", asset_id, stored);
                Err(CatalogueError::NotFound("File not found".to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Missing and foreign assets are indistinguishable to the caller.
    async fn authorize(&self, identity: &Identity, asset_id: i64) -> Result<Asset, CatalogueError> {
        match self.assets.get(asset_id).await? {
            Some(asset) if asset.is_owned_by(identity.user_id) => Ok(asset),
            _ => {
                warn!("User {} denied access to asset {}", identity.user_id, asset_id);
                Err(CatalogueError::Forbidden)
            }
        }
    }

    /// Store the upload under the new record's id. A record whose file could
    /// not be written is removed again.
    async fn attach(&self, asset: Asset, upload: &Upload) -> Result<Asset, CatalogueError> {
        let stored = match self.files.save(asset.id, &upload.filename, &upload.content).await {
            Ok(Some(stored)) => stored,
            Ok(None) => return Ok(asset),
            Err(e) => {
                self.discard(asset.id, None).await;
                return Err(e.into());
            }
        };

        match self.assets.set_file_path(asset.id, Some(&stored)).await {
            Ok(asset) => Ok(asset),
            Err(e) => {
                self.discard(asset.id, Some(&stored)).await;
                Err(e.into())
            }
        }
    }

    async fn discard(&self, asset_id: i64, stored: Option<&str>) {
        if let Some(stored) = stored {
            if let Err(e) = self.files.remove(stored).await {
                error!("Failed to remove file {} for discarded asset {}: {}", stored, asset_id, e);
            }
        }
        if let Err(e) = self.assets.delete(asset_id).await {
            error!("Failed to discard asset {} after file failure: {}", asset_id, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestContext;

    fn sword_form() -> AssetForm {
        AssetForm {
            name: Some("Sword".to_string()),
            category: Some("3D Model".to_string()),
            license_type: Some("Paid".to_string()),
            source_url: Some("http://x".to_string()),
            description: None,
            tags: Some("weapon,medieval".to_string()),
            file: None,
        }
    }

    async fn login(ctx: &TestContext, username: &str) -> Identity {
        ctx.catalogue.register(username, "pw1").await.unwrap();
        let outcome = ctx.catalogue.login(username, "pw1").await.unwrap();
        ctx.catalogue.authenticate(&outcome.access_token).unwrap()
    }

    #[tokio::test]
    async fn register_login_and_create() {
        let ctx = TestContext::new().await.unwrap();
        let alice = login(&ctx, "alice").await;

        let asset = ctx.catalogue.create(&alice, sword_form()).await.unwrap();
        assert_eq!(asset.id, 1);
        assert_eq!(asset.owner_id, alice.user_id);
        assert_eq!(asset.tags.as_slice(), ["weapon", "medieval"]);
    }

    #[tokio::test]
    async fn login_outcome_is_bearer() {
        let ctx = TestContext::new().await.unwrap();
        ctx.catalogue.register("alice", "pw1").await.unwrap();

        let outcome = ctx.catalogue.login("alice", "pw1").await.unwrap();
        assert_eq!(outcome.token_type, "bearer");
        assert!(!outcome.is_test_mode);

        assert!(matches!(
            ctx.catalogue.login("alice", "wrong").await,
            Err(CatalogueError::InvalidCredentials)
        ));
        assert!(matches!(
            ctx.catalogue.login("nobody", "pw1").await,
            Err(CatalogueError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn register_rejects_duplicates_and_blank_input() {
        let ctx = TestContext::new().await.unwrap();
        ctx.catalogue.register("alice", "pw1").await.unwrap();

        assert!(matches!(
            ctx.catalogue.register("alice", "pw2").await,
            Err(CatalogueError::DuplicateUsername(_))
        ));
        assert!(matches!(
            ctx.catalogue.register("demo", "x").await,
            Err(CatalogueError::DuplicateUsername(_))
        ));
        assert!(matches!(
            ctx.catalogue.register("  ", "x").await,
            Err(CatalogueError::Validation { field: "username", .. })
        ));
    }

    #[tokio::test]
    async fn other_users_assets_are_forbidden() {
        let ctx = TestContext::new().await.unwrap();
        let alice = login(&ctx, "alice").await;
        let bob = login(&ctx, "bob").await;

        let asset = ctx.catalogue.create(&alice, sword_form()).await.unwrap();

        assert!(ctx.catalogue.list(&bob, &ListQuery::default()).await.unwrap().is_empty());
        assert!(matches!(ctx.catalogue.get(&bob, asset.id).await, Err(CatalogueError::Forbidden)));
        assert!(matches!(
            ctx.catalogue.update(&bob, asset.id, sword_form()).await,
            Err(CatalogueError::Forbidden)
        ));
        assert!(matches!(ctx.catalogue.delete(&bob, asset.id).await, Err(CatalogueError::Forbidden)));
        assert!(matches!(ctx.catalogue.file(&bob, asset.id).await, Err(CatalogueError::Forbidden)));

        // unknown ids look the same as foreign ones
        assert!(matches!(ctx.catalogue.get(&alice, 999).await, Err(CatalogueError::Forbidden)));

        assert_eq!(ctx.catalogue.get(&alice, asset.id).await.unwrap().name, "Sword");
    }

    #[tokio::test]
    async fn invalid_category_writes_no_file() {
        let ctx = TestContext::new().await.unwrap();
        let alice = login(&ctx, "alice").await;

        let mut form = sword_form();
        form.category = Some("Spaceship".to_string());
        form.file = Some(Upload::new("img.png", b"png".to_vec()));

        assert!(matches!(
            ctx.catalogue.create(&alice, form).await,
            Err(CatalogueError::InvalidCategory(c)) if c == "Spaceship"
        ));
        assert_eq!(ctx.upload_count(), 0);
        assert!(ctx.catalogue.list(&alice, &ListQuery::default()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_required_field_is_validation_error() {
        let ctx = TestContext::new().await.unwrap();
        let alice = login(&ctx, "alice").await;

        let mut form = sword_form();
        form.source_url = None;
        assert!(matches!(
            ctx.catalogue.create(&alice, form).await,
            Err(CatalogueError::Validation { field: "source_url", .. })
        ));
    }

    #[tokio::test]
    async fn update_replaces_fields_and_file() {
        let ctx = TestContext::new().await.unwrap();
        let alice = login(&ctx, "alice").await;

        let mut form = sword_form();
        form.file = Some(Upload::new("old.png", b"old".to_vec()));
        let created = ctx.catalogue.create(&alice, form).await.unwrap();
        assert_eq!(created.file_path.as_deref(), Some("1_old.png"));

        let mut replacement = sword_form();
        replacement.name = Some("Axe".to_string());
        replacement.tags = Some(" weapon , , axe ".to_string());
        replacement.file = Some(Upload::new("new.png", b"new".to_vec()));
        let updated = ctx.catalogue.update(&alice, created.id, replacement).await.unwrap();

        assert_eq!(updated.id, created.id);
        assert_eq!(updated.owner_id, alice.user_id);
        assert_eq!(updated.name, "Axe");
        assert_eq!(updated.tags.as_slice(), ["weapon", "axe"]);
        assert_eq!(updated.file_path.as_deref(), Some("1_new.png"));
        assert!(!ctx.catalogue.files().exists("1_old.png").await);
        assert!(ctx.catalogue.files().exists("1_new.png").await);
    }

    #[tokio::test]
    async fn update_without_file_keeps_existing_file() {
        let ctx = TestContext::new().await.unwrap();
        let alice = login(&ctx, "alice").await;

        let mut form = sword_form();
        form.file = Some(Upload::new("img.png", b"data".to_vec()));
        let created = ctx.catalogue.create(&alice, form).await.unwrap();

        let mut replacement = sword_form();
        replacement.file = Some(Upload::new("", Vec::new()));
        let updated = ctx.catalogue.update(&alice, created.id, replacement).await.unwrap();
        assert_eq!(updated.file_path, created.file_path);
        assert!(ctx.catalogue.files().exists("1_img.png").await);
    }

    #[tokio::test]
    async fn delete_removes_record_and_file() {
        let ctx = TestContext::new().await.unwrap();
        let alice = login(&ctx, "alice").await;

        let mut form = sword_form();
        form.file = Some(Upload::new("img.png", b"data".to_vec()));
        let asset = ctx.catalogue.create(&alice, form).await.unwrap();
        assert!(ctx.catalogue.file(&alice, asset.id).await.is_ok());

        ctx.catalogue.delete(&alice, asset.id).await.unwrap();
        assert!(!ctx.catalogue.files().exists("1_img.png").await);
        assert!(matches!(ctx.catalogue.file(&alice, asset.id).await, Err(CatalogueError::Forbidden)));
    }

    #[tokio::test]
    async fn asset_without_file_is_not_found() {
        let ctx = TestContext::new().await.unwrap();
        let alice = login(&ctx, "alice").await;
        let asset = ctx.catalogue.create(&alice, sword_form()).await.unwrap();

        assert!(matches!(ctx.catalogue.file(&alice, asset.id).await, Err(CatalogueError::NotFound(_))));
    }

    #[tokio::test]
    async fn file_missing_on_disk_is_not_found() {
        let ctx = TestContext::new().await.unwrap();
        let alice = login(&ctx, "alice").await;

        let mut form = sword_form();
        form.file = Some(Upload::new("img.png", b"data".to_vec()));
        let asset = ctx.catalogue.create(&alice, form).await.unwrap();
        ctx.catalogue.files().remove("1_img.png").await.unwrap();

        assert!(matches!(ctx.catalogue.file(&alice, asset.id).await, Err(CatalogueError::NotFound(_))));
    }

    #[tokio::test]
    async fn list_filters_by_category_and_tags() {
        let ctx = TestContext::new().await.unwrap();
        let alice = login(&ctx, "alice").await;
        ctx.catalogue.create(&alice, sword_form()).await.unwrap();

        let mut music = sword_form();
        music.name = Some("Theme".to_string());
        music.category = Some("Music".to_string());
        music.tags = Some("loop".to_string());
        ctx.catalogue.create(&alice, music).await.unwrap();

        let query = ListQuery { category: Some("Music".to_string()), tags: None };
        let found = ctx.catalogue.list(&alice, &query).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Theme");

        let query = ListQuery { category: None, tags: Some("medieval, loop".to_string()) };
        assert_eq!(ctx.catalogue.list(&alice, &query).await.unwrap().len(), 2);

        let query = ListQuery { category: Some("Vehicles".to_string()), tags: None };
        assert!(matches!(
            ctx.catalogue.list(&alice, &query).await,
            Err(CatalogueError::InvalidCategory(_))
        ));
    }

    #[tokio::test]
    async fn demo_login_seeds_once() {
        let ctx = TestContext::new().await.unwrap();

        let outcome = ctx.catalogue.login("demo", "demo").await.unwrap();
        assert!(outcome.is_test_mode);
        let demo = ctx.catalogue.authenticate(&outcome.access_token).unwrap();
        assert_eq!(demo.user_id, DEMO_USER_ID);
        assert!(ctx.catalogue.whoami(&demo).is_test_mode);

        let first = ctx.catalogue.list(&demo, &ListQuery::default()).await.unwrap();
        let second = ctx.catalogue.list(&demo, &ListQuery::default()).await.unwrap();
        assert_eq!(first.len(), crate::services::provisioning::demo_assets().len());
        assert_eq!(first, second);

        // logging in again does not recreate the demo user
        ctx.catalogue.login("demo", "demo").await.unwrap();
        let alice = login(&ctx, "alice").await;
        assert!(ctx.catalogue.list(&alice, &ListQuery::default()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn garbage_token_is_unauthenticated() {
        let ctx = TestContext::new().await.unwrap();
        assert!(matches!(
            ctx.catalogue.authenticate("not-a-token"),
            Err(CatalogueError::Unauthenticated(AuthError::InvalidToken))
        ));
    }
}
