use chrono::Utc;
use sqlx::SqlitePool;

use crate::database::manager::DatabaseError;
use crate::database::models::{Asset, AssetFields, AssetRow};
use crate::filter::AssetFilter;

const ASSET_COLUMNS: &str =
    "id, name, category, license_type, source_url, description, tags, file_path, owner_id, created_at";

/// Storage-only access to asset records. No ownership rules are applied
/// here; callers decide who may see what.
#[derive(Clone, Debug)]
pub struct AssetRepository {
    pool: SqlitePool,
}

impl AssetRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a record owned by `owner_id`. Ids are never reused, even after
    /// deletions.
    pub async fn create(&self, owner_id: i64, fields: &AssetFields) -> Result<Asset, DatabaseError> {
        let done = sqlx::query(
            "INSERT INTO assets (name, category, license_type, source_url, description, tags, owner_id, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&fields.name)
        .bind(fields.category.as_str())
        .bind(&fields.license_type)
        .bind(&fields.source_url)
        .bind(&fields.description)
        .bind(fields.tags.encode())
        .bind(owner_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        self.get_404(done.last_insert_rowid()).await
    }

    pub async fn get(&self, asset_id: i64) -> Result<Option<Asset>, DatabaseError> {
        let row = sqlx::query_as::<_, AssetRow>(&format!("SELECT {} FROM assets WHERE id = ?", ASSET_COLUMNS))
            .bind(asset_id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(into_asset).transpose()
    }

    async fn get_404(&self, asset_id: i64) -> Result<Asset, DatabaseError> {
        self.get(asset_id)
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("asset {}", asset_id)))
    }

    /// All of `owner_id`'s assets that pass `filter`, oldest first.
    pub async fn list(&self, owner_id: i64, filter: &AssetFilter) -> Result<Vec<Asset>, DatabaseError> {
        let rows = match filter.category {
            Some(category) => {
                sqlx::query_as::<_, AssetRow>(&format!(
                    "SELECT {} FROM assets WHERE owner_id = ? AND category = ? ORDER BY id",
                    ASSET_COLUMNS
                ))
                .bind(owner_id)
                .bind(category.as_str())
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, AssetRow>(&format!(
                    "SELECT {} FROM assets WHERE owner_id = ? ORDER BY id",
                    ASSET_COLUMNS
                ))
                .bind(owner_id)
                .fetch_all(&self.pool)
                .await?
            }
        };

        // Tag intersection runs on decoded tags so partial-word matches
        // against the stored string never count.
        let mut assets = Vec::with_capacity(rows.len());
        for row in rows {
            let asset = into_asset(row)?;
            if filter.matches(&asset) {
                assets.push(asset);
            }
        }
        Ok(assets)
    }

    pub async fn count_for_owner(&self, owner_id: i64) -> Result<i64, DatabaseError> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM assets WHERE owner_id = ?")
            .bind(owner_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count.0)
    }

    /// Full replace of the mutable fields. `id`, `owner_id`, `created_at`
    /// and `file_path` are left untouched.
    pub async fn update(&self, asset_id: i64, fields: &AssetFields) -> Result<Asset, DatabaseError> {
        let done = sqlx::query(
            "UPDATE assets
             SET name = ?, category = ?, license_type = ?, source_url = ?, description = ?, tags = ?
             WHERE id = ?",
        )
        .bind(&fields.name)
        .bind(fields.category.as_str())
        .bind(&fields.license_type)
        .bind(&fields.source_url)
        .bind(&fields.description)
        .bind(fields.tags.encode())
        .bind(asset_id)
        .execute(&self.pool)
        .await?;

        if done.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!("asset {}", asset_id)));
        }
        self.get_404(asset_id).await
    }

    pub async fn set_file_path(&self, asset_id: i64, file_path: Option<&str>) -> Result<Asset, DatabaseError> {
        let done = sqlx::query("UPDATE assets SET file_path = ? WHERE id = ?")
            .bind(file_path)
            .bind(asset_id)
            .execute(&self.pool)
            .await?;

        if done.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!("asset {}", asset_id)));
        }
        self.get_404(asset_id).await
    }

    /// Remove the record. File cleanup is the caller's job. Returns false if
    /// nothing was deleted.
    pub async fn delete(&self, asset_id: i64) -> Result<bool, DatabaseError> {
        let done = sqlx::query("DELETE FROM assets WHERE id = ?")
            .bind(asset_id)
            .execute(&self.pool)
            .await?;
        Ok(done.rows_affected() > 0)
    }
}

fn into_asset(row: AssetRow) -> Result<Asset, DatabaseError> {
    let id = row.id;
    Asset::try_from(row).map_err(|e| DatabaseError::Corrupt(format!("asset {}: {}", id, e)))
}
