pub mod catalogue;
pub mod provisioning;

pub use catalogue::{AssetForm, CatalogueError, CatalogueService, LoginOutcome, SessionInfo, Upload};
pub use provisioning::{DemoSeeder, IdentityProvisioner, NoProvisioning};
