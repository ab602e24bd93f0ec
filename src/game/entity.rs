//! The tickable entity contract and the capabilities entities may expose

use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use glam::DVec3;
use serde::{Deserialize, Serialize};

use super::effect::Effect;
use super::math::BBox;
use super::persist::{EntityData, PersistError};
use super::world::World;

/// Runtime identity of an entity within this server process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub u64);

static NEXT_ENTITY_ID: AtomicU64 = AtomicU64::new(1);

impl EntityId {
    /// Allocate a fresh, process-unique id
    pub fn next() -> Self {
        Self(NEXT_ENTITY_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Shared handle to an entity registered in a world
pub type EntityHandle = Arc<dyn Entity>;

/// A simulated actor advanced once per tick by the driver.
///
/// Implementations guard their mutable state internally; every method takes
/// `&self` so the tick path and observers can hold the same handle.
pub trait Entity: Send + Sync + 'static {
    fn id(&self) -> EntityId;

    fn position(&self) -> DVec3;

    /// Immutable per-kind metadata
    fn entity_type(&self) -> &'static dyn EntityType;

    /// Advance one step. Side effects are the only output.
    fn tick(&self, world: &dyn World, current_tick: u64);

    /// Remove the entity from `world`. Calling this more than once is a no-op.
    fn close(&self, world: &dyn World);

    fn as_any(&self) -> &dyn Any;

    fn as_living(&self) -> Option<&dyn Living> {
        None
    }

    fn as_flammable(&self) -> Option<&dyn Flammable> {
        None
    }
}

/// Per-kind metadata used by spatial indexing and the persistence layer
pub trait EntityType: Send + Sync {
    /// Network/persistence identifier, e.g. `minecraft:lightning_bolt`
    fn encode_entity(&self) -> &'static str;

    /// Bounding box relative to the entity position
    fn bbox(&self, entity: &dyn Entity) -> BBox;

    fn encode(&self, entity: &dyn Entity) -> Result<EntityData, PersistError>;

    fn decode(&self, data: &EntityData) -> Result<EntityHandle, PersistError>;
}

/// Cause of damage dealt to a living entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DamageSource {
    Lightning,
    Fire,
    Effect,
}

/// Entities with health and status effects
pub trait Living {
    fn health(&self) -> f64;

    fn hurt(&self, damage: f64, source: DamageSource);

    fn add_effect(&self, effect: Effect);
}

/// Entities that can be set on fire
pub trait Flammable {
    /// Remaining fire time in ticks
    fn on_fire_ticks(&self) -> i64;

    fn set_on_fire(&self, ticks: i64);
}

/// Bounding box of `entity` translated to its current position
pub fn world_bbox(entity: &dyn Entity) -> BBox {
    entity
        .entity_type()
        .bbox(entity)
        .translate(entity.position())
}
