pub mod asset;
pub mod user;

pub use asset::{Asset, AssetFields, AssetRow, Category, Tags};
pub use user::User;
