pub mod error;

use serde::Deserialize;

use crate::database::models::{Asset, Category, Tags};

pub use error::FilterError;

/// Raw `?category=&tags=` query string of the listing endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListQuery {
    pub category: Option<String>,
    /// Comma-separated; an asset matches if it carries any of them.
    pub tags: Option<String>,
}

/// Narrowing applied to an owner's assets. Empty fields do not filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssetFilter {
    pub category: Option<Category>,
    pub tags: Vec<String>,
}

impl AssetFilter {
    pub fn from_query(query: &ListQuery) -> Result<Self, FilterError> {
        let category = match query.category.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(raw.parse::<Category>()?),
        };

        let tags = query
            .tags
            .as_deref()
            .map(|raw| Tags::parse(raw).as_slice().to_vec())
            .unwrap_or_default();

        Ok(Self { category, tags })
    }

    pub fn with_category(mut self, category: Category) -> Self {
        self.category = Some(category);
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn is_empty(&self) -> bool {
        self.category.is_none() && self.tags.is_empty()
    }

    /// Exact category match, then tag intersection (logical OR).
    pub fn matches(&self, asset: &Asset) -> bool {
        if let Some(category) = self.category {
            if asset.category != category {
                return false;
            }
        }
        self.tags.is_empty() || asset.tags.intersects(&self.tags)
    }
}
