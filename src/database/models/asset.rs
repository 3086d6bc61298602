use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use thiserror::Error;

/// Closed set of asset categories. Serialized with the display names the
/// API accepts and returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "3D Model")]
    Model3D,
    #[serde(rename = "2D Sprite")]
    Sprite2D,
    #[serde(rename = "Tilemap")]
    Tilemap,
    #[serde(rename = "Texture")]
    Texture,
    #[serde(rename = "Music")]
    Music,
    #[serde(rename = "Sound Effect")]
    SoundEffect,
    #[serde(rename = "Script")]
    Script,
    #[serde(rename = "Other")]
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid category '{0}'")]
pub struct UnknownCategory(pub String);

impl Category {
    pub const ALL: [Category; 8] = [
        Category::Model3D,
        Category::Sprite2D,
        Category::Tilemap,
        Category::Texture,
        Category::Music,
        Category::SoundEffect,
        Category::Script,
        Category::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Model3D => "3D Model",
            Category::Sprite2D => "2D Sprite",
            Category::Tilemap => "Tilemap",
            Category::Texture => "Texture",
            Category::Music => "Music",
            Category::SoundEffect => "Sound Effect",
            Category::Script => "Script",
            Category::Other => "Other",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = UnknownCategory;

    /// Exact match against the display names.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| UnknownCategory(s.to_string()))
    }
}

/// Ordered tag list. Stored as a comma-joined string; the API sees a list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tags(Vec<String>);

impl Tags {
    pub const DELIMITER: char = ',';

    /// Split a comma-separated input, trimming entries and dropping empties.
    /// Order is preserved and duplicates are kept as supplied.
    pub fn parse(raw: &str) -> Self {
        Tags(
            raw.split(Self::DELIMITER)
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string)
                .collect(),
        )
    }

    pub fn encode(&self) -> String {
        self.0.join(",")
    }

    pub fn decode(stored: &str) -> Self {
        Self::parse(stored)
    }

    /// True when any requested tag is present (logical OR).
    pub fn intersects(&self, wanted: &[String]) -> bool {
        wanted.iter().any(|w| self.0.iter().any(|t| t == w))
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<String>> for Tags {
    fn from(tags: Vec<String>) -> Self {
        Tags(tags)
    }
}

/// Owner-mutable fields of an asset, already validated.
#[derive(Debug, Clone, PartialEq)]
pub struct AssetFields {
    pub name: String,
    pub category: Category,
    pub license_type: String,
    pub source_url: String,
    pub description: Option<String>,
    pub tags: Tags,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Asset {
    pub id: i64,
    pub name: String,
    pub category: Category,
    pub license_type: String,
    pub source_url: String,
    pub description: Option<String>,
    pub tags: Tags,
    pub file_path: Option<String>,
    pub owner_id: i64,
    pub created_at: DateTime<Utc>,
}

impl Asset {
    pub fn is_owned_by(&self, user_id: i64) -> bool {
        self.owner_id == user_id
    }
}

/// Raw `assets` row; category and tags are still in their stored form.
#[derive(Debug, FromRow)]
pub struct AssetRow {
    pub id: i64,
    pub name: String,
    pub category: String,
    pub license_type: String,
    pub source_url: String,
    pub description: Option<String>,
    pub tags: String,
    pub file_path: Option<String>,
    pub owner_id: i64,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<AssetRow> for Asset {
    type Error = UnknownCategory;

    fn try_from(row: AssetRow) -> Result<Self, Self::Error> {
        Ok(Asset {
            id: row.id,
            name: row.name,
            category: row.category.parse()?,
            license_type: row.license_type,
            source_url: row.source_url,
            description: row.description,
            tags: Tags::decode(&row.tags),
            file_path: row.file_path,
            owner_id: row.owner_id,
            created_at: row.created_at,
        })
    }
}
