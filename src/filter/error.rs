use thiserror::Error;

use crate::database::models::asset::UnknownCategory;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum FilterError {
    #[error("Invalid category filter: {0}")]
    InvalidCategory(String),
}

impl From<UnknownCategory> for FilterError {
    fn from(err: UnknownCategory) -> Self {
        FilterError::InvalidCategory(err.0)
    }
}
