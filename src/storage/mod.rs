//! On-disk storage for uploaded asset files.
//!
//! Files live flat under the upload root as `{asset_id}_{original_filename}`,
//! so two assets can upload the same filename without colliding. The stored
//! name (not an absolute path) is what the asset record keeps.

use std::future::Future;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;
use tracing::{debug, info};

use crate::config::StorageConfig;

#[derive(Debug, Error)]
pub enum FileStoreError {
    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Invalid stored file path: {0}")]
    InvalidPath(String),

    #[error("File operation timed out after {0:?}")]
    Timeout(Duration),

    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Readable file handed back to the HTTP layer.
pub struct StoredFile {
    pub stream: ReaderStream<fs::File>,
    pub len: u64,
    pub original_name: String,
}

#[derive(Clone, Debug)]
pub struct FileStore {
    root: PathBuf,
    io_timeout: Duration,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>, io_timeout: Duration) -> Self {
        Self {
            root: root.into(),
            io_timeout,
        }
    }

    pub fn from_config(config: &StorageConfig) -> Self {
        Self::new(&config.upload_dir, Duration::from_secs(config.io_timeout_secs.max(1)))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the upload root if it does not exist yet.
    pub async fn init(&self) -> Result<(), FileStoreError> {
        self.bounded(fs::create_dir_all(&self.root)).await?;
        info!("Upload directory ready at {}", self.root.display());
        Ok(())
    }

    /// Persist `content` for `asset_id`. Returns `None` without touching the
    /// disk when no usable filename or no content was supplied.
    pub async fn save(
        &self,
        asset_id: i64,
        original_filename: &str,
        content: &[u8],
    ) -> Result<Option<String>, FileStoreError> {
        let Some(filename) = sanitize_filename(original_filename) else {
            return Ok(None);
        };
        if content.is_empty() {
            return Ok(None);
        }

        let stored = stored_name(asset_id, &filename);
        let path = self.root.join(&stored);
        let temp_path = self.root.join(format!(".{}.tmp", stored));

        let written = self
            .bounded(async {
                fs::create_dir_all(&self.root).await?;
                let mut file = fs::File::create(&temp_path).await?;
                file.write_all(content).await?;
                file.sync_all().await?;
                fs::rename(&temp_path, &path).await
            })
            .await;
        if let Err(e) = written {
            // best effort; the temp file is invisible to readers either way
            let _ = fs::remove_file(&temp_path).await;
            return Err(e);
        }

        debug!("Stored {} bytes for asset {} as {}", content.len(), asset_id, stored);
        Ok(Some(stored))
    }

    /// Delete a stored file. Removing a file that is already gone succeeds.
    pub async fn remove(&self, stored: &str) -> Result<(), FileStoreError> {
        let path = self.resolve(stored)?;
        match self.bounded(fs::remove_file(&path)).await {
            Ok(()) => {
                debug!("Removed stored file {}", stored);
                Ok(())
            }
            Err(FileStoreError::Io(e)) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Open a stored file for streaming.
    pub async fn read(&self, stored: &str) -> Result<StoredFile, FileStoreError> {
        let path = self.resolve(stored)?;
        let file = match self.bounded(fs::File::open(&path)).await {
            Ok(file) => file,
            Err(FileStoreError::Io(e)) if e.kind() == io::ErrorKind::NotFound => {
                return Err(FileStoreError::NotFound(stored.to_string()))
            }
            Err(e) => return Err(e),
        };
        let len = self.bounded(file.metadata()).await?.len();

        Ok(StoredFile {
            stream: ReaderStream::new(file),
            len,
            original_name: original_name(stored),
        })
    }

    pub async fn exists(&self, stored: &str) -> bool {
        match self.resolve(stored) {
            Ok(path) => fs::try_exists(path).await.unwrap_or(false),
            Err(_) => false,
        }
    }

    /// Stored names are single path components; anything else is refused so
    /// a tampered record cannot reach outside the upload root.
    fn resolve(&self, stored: &str) -> Result<PathBuf, FileStoreError> {
        let mut components = Path::new(stored).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) => Ok(self.root.join(stored)),
            _ => Err(FileStoreError::InvalidPath(stored.to_string())),
        }
    }

    async fn bounded<T, F>(&self, op: F) -> Result<T, FileStoreError>
    where
        F: Future<Output = io::Result<T>>,
    {
        tokio::time::timeout(self.io_timeout, op)
            .await
            .map_err(|_| FileStoreError::Timeout(self.io_timeout))?
            .map_err(FileStoreError::from)
    }
}

/// Reduce an uploader-supplied name to its final path component. Returns
/// `None` when nothing usable is left.
pub fn sanitize_filename(raw: &str) -> Option<String> {
    let last = raw.rsplit(['/', '\\']).next().unwrap_or("").trim();
    if last.is_empty() || last == "." || last == ".." {
        return None;
    }
    Some(last.to_string())
}

pub fn stored_name(asset_id: i64, filename: &str) -> String {
    format!("{}_{}", asset_id, filename)
}

/// Recover the uploader's filename by stripping the `{asset_id}_` prefix.
pub fn original_name(stored: &str) -> String {
    let name = Path::new(stored)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(stored);

    match name.split_once('_') {
        Some((prefix, rest)) if !prefix.is_empty() && prefix.bytes().all(|b| b.is_ascii_digit()) && !rest.is_empty() => {
            rest.to_string()
        }
        _ => name.to_string(),
    }
}
