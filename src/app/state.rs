//! Application state shared across routes

use std::sync::Arc;

use dashmap::DashMap;
use glam::DVec3;
use parking_lot::Mutex;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::info;
use uuid::Uuid;

use crate::config::Config;
use crate::game::{
    require_block, AreaEffectCloud, Block, CloudSettings, Entity, EntityId, GameWorld, InitError,
    Lightning, Potion, StaticCatalog,
};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub world: Arc<GameWorld>,
    /// Connected sessions and the player entity each controls
    pub sessions: Arc<DashMap<Uuid, EntityId>>,
    fire: Block,
    rng: Arc<Mutex<ChaCha8Rng>>,
}

impl AppState {
    /// Build the state; fails when the block catalog lacks a block the
    /// simulation needs
    pub fn new(config: Config) -> Result<Self, InitError> {
        let fire = require_block(&StaticCatalog, "minecraft:fire")?;
        let world = Arc::new(GameWorld::new(config.difficulty));
        let rng = ChaCha8Rng::seed_from_u64(config.world_seed);

        Ok(Self {
            config: Arc::new(config),
            world,
            sessions: Arc::new(DashMap::new()),
            fire,
            rng: Arc::new(Mutex::new(rng)),
        })
    }

    /// Independent random source for a new entity, derived from the world seed
    fn entity_rng(&self) -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(self.rng.lock().gen())
    }

    pub fn spawn_lightning(&self, pos: DVec3) -> EntityId {
        let bolt = Arc::new(Lightning::new(pos, self.fire, self.entity_rng()));
        let id = bolt.id();
        info!(entity_id = %id, ?pos, "Lightning spawned");
        self.world.add_entity(bolt);
        id
    }

    pub fn spawn_cloud(&self, pos: DVec3, potion: Potion, settings: CloudSettings) -> EntityId {
        let cloud = Arc::new(AreaEffectCloud::with_settings(pos, potion, settings));
        let id = cloud.id();
        info!(entity_id = %id, ?pos, potion = potion.id(), "Area effect cloud spawned");
        self.world.add_entity(cloud);
        id
    }
}
