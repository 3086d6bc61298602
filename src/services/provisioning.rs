use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::info;

use crate::auth::Identity;
use crate::database::manager::DatabaseError;
use crate::database::models::user::DEMO_USER_ID;
use crate::database::models::{AssetFields, Category, Tags};
use crate::database::AssetRepository;

/// Hook run for every authenticated listing, before the listing itself.
/// Implementations decide which identities they act on.
#[async_trait]
pub trait IdentityProvisioner: Send + Sync {
    async fn provision(&self, identity: &Identity, assets: &AssetRepository) -> Result<(), DatabaseError>;
}

/// Provisioning policy that never does anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProvisioning;

#[async_trait]
impl IdentityProvisioner for NoProvisioning {
    async fn provision(&self, _identity: &Identity, _assets: &AssetRepository) -> Result<(), DatabaseError> {
        Ok(())
    }
}

/// Seeds the sample catalogue for the demo identity whenever it owns no
/// assets. Other identities pass through untouched.
pub struct DemoSeeder {
    user_id: i64,
    samples: Vec<AssetFields>,
    // serializes check-then-insert so concurrent first listings seed once
    seeding: Mutex<()>,
}

impl DemoSeeder {
    pub fn new() -> Self {
        Self::with_samples(DEMO_USER_ID, demo_assets())
    }

    pub fn with_samples(user_id: i64, samples: Vec<AssetFields>) -> Self {
        Self {
            user_id,
            samples,
            seeding: Mutex::new(()),
        }
    }
}

impl Default for DemoSeeder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IdentityProvisioner for DemoSeeder {
    async fn provision(&self, identity: &Identity, assets: &AssetRepository) -> Result<(), DatabaseError> {
        if identity.user_id != self.user_id {
            return Ok(());
        }

        let _guard = self.seeding.lock().await;
        if assets.count_for_owner(self.user_id).await? > 0 {
            return Ok(());
        }

        for sample in &self.samples {
            assets.create(self.user_id, sample).await?;
        }
        info!("Seeded {} demo assets for '{}'", self.samples.len(), identity.username);
        Ok(())
    }
}

fn sample(
    name: &str,
    category: Category,
    license_type: &str,
    source_url: &str,
    description: &str,
    tags: &str,
) -> AssetFields {
    AssetFields {
        name: name.to_string(),
        category,
        license_type: license_type.to_string(),
        source_url: source_url.to_string(),
        description: Some(description.to_string()),
        tags: Tags::parse(tags),
    }
}

/// The fixed sample set shown to the demo identity.
pub fn demo_assets() -> Vec<AssetFields> {
    vec![
        sample(
            "Medieval Sword",
            Category::Model3D,
            "Paid",
            "http://example.com/sword",
            "A high-poly medieval sword model.",
            "weapon,medieval,fantasy",
        ),
        sample(
            "Forest Texture Pack",
            Category::Texture,
            "Free",
            "http://example.com/forest-textures",
            "A collection of seamless forest textures.",
            "nature,forest,seamless",
        ),
        sample(
            "Pixel Hero Sprite Sheet",
            Category::Sprite2D,
            "CC0",
            "http://example.com/pixel-hero",
            "Idle, run and jump animations for a 32x32 hero.",
            "pixel art,character,platformer",
        ),
        sample(
            "Dungeon Tileset",
            Category::Tilemap,
            "CC-BY 4.0",
            "http://example.com/dungeon-tiles",
            "Walls, floors and props for top-down dungeon maps.",
            "dungeon,top-down,fantasy",
        ),
        sample(
            "Battle Theme Loop",
            Category::Music,
            "CC-BY 4.0",
            "http://example.com/battle-theme",
            "Seamlessly looping orchestral battle track.",
            "orchestral,loop,combat",
        ),
        sample(
            "Footstep Sounds",
            Category::SoundEffect,
            "CC0",
            "http://example.com/footsteps",
            "Footsteps on grass, stone, wood and gravel.",
            "footsteps,foley",
        ),
        sample(
            "Player Controller",
            Category::Script,
            "MIT",
            "http://example.com/player-controller",
            "Character controller with coyote time and jump buffering.",
            "movement,platformer,controller",
        ),
    ]
}
