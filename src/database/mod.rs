pub mod credentials;
pub mod manager;
pub mod models;
pub mod repository;

pub use credentials::{CredentialError, CredentialStore};
pub use manager::{DatabaseError, DatabaseManager};
pub use repository::AssetRepository;
