//! The world collaborator consumed by entities, and its in-memory implementation

use std::str::FromStr;
use std::sync::Arc;

use dashmap::DashMap;
use glam::DVec3;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, trace};
use uuid::Uuid;

use super::block::Block;
use super::entity::{world_bbox, Entity, EntityHandle, EntityId};
use super::math::{BBox, BlockPos, Face};

/// World difficulty
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Peaceful,
    Easy,
    Normal,
    Hard,
}

impl Difficulty {
    /// How aggressively fire spreads; lightning only ignites blocks at 10 or more
    pub fn fire_spread_increase(self) -> i32 {
        match self {
            Difficulty::Peaceful => 0,
            Difficulty::Easy => 7,
            Difficulty::Normal => 14,
            Difficulty::Hard => 21,
        }
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "peaceful" => Ok(Difficulty::Peaceful),
            "easy" => Ok(Difficulty::Easy),
            "normal" => Ok(Difficulty::Normal),
            "hard" => Ok(Difficulty::Hard),
            other => Err(format!("unknown difficulty {other:?}")),
        }
    }
}

/// Sounds played at a position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "sound", rename_all = "snake_case")]
pub enum Sound {
    Thunder,
    Explosion,
    BlockBreak { block: String },
}

/// Particles spawned at a position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "particle", rename_all = "snake_case")]
pub enum Particle {
    PunchBlock { block: String, face: Face },
    BlockBreak { block: String },
}

/// Presentation events fanned out to connected sessions
#[derive(Debug, Clone, PartialEq)]
pub enum WorldEvent {
    Sound { pos: DVec3, sound: Sound },
    Particle { pos: DVec3, particle: Particle },
}

/// Observer notified when an entity's visible state changes
pub trait Viewer: Send + Sync {
    fn view_entity_state(&self, entity: &dyn Entity);
}

/// World services available to entities while they tick.
///
/// Every call is synchronous and must be made without holding an entity's
/// private lock.
pub trait World: Send + Sync {
    fn viewers(&self, pos: DVec3) -> Vec<Arc<dyn Viewer>>;

    /// Entities whose bounding box intersects `bbox` and for which `keep` is true
    fn entities_within(&self, bbox: BBox, keep: &dyn Fn(&dyn Entity) -> bool) -> Vec<EntityHandle>;

    fn block(&self, pos: BlockPos) -> Block;

    fn set_block(&self, pos: BlockPos, block: Block);

    fn play_sound(&self, pos: DVec3, sound: Sound);

    fn add_particle(&self, pos: DVec3, particle: Particle);

    /// Unregister an entity; returns false when it was not registered
    fn remove_entity(&self, id: EntityId) -> bool;

    fn difficulty(&self) -> Difficulty;
}

/// In-memory world: entity register, sparse block map and viewer register.
///
/// Unset blocks read as air.
pub struct GameWorld {
    entities: DashMap<EntityId, EntityHandle>,
    blocks: DashMap<BlockPos, Block>,
    viewers: DashMap<Uuid, Arc<dyn Viewer>>,
    difficulty: Difficulty,
    events_tx: broadcast::Sender<WorldEvent>,
}

impl GameWorld {
    pub fn new(difficulty: Difficulty) -> Self {
        let (events_tx, _) = broadcast::channel(256);
        Self {
            entities: DashMap::new(),
            blocks: DashMap::new(),
            viewers: DashMap::new(),
            difficulty,
            events_tx,
        }
    }

    pub fn add_entity(&self, entity: EntityHandle) {
        debug!(
            entity_id = %entity.id(),
            kind = entity.entity_type().encode_entity(),
            "Entity added"
        );
        self.entities.insert(entity.id(), entity);
    }

    pub fn entity(&self, id: EntityId) -> Option<EntityHandle> {
        self.entities.get(&id).map(|e| e.value().clone())
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Handles to every registered entity, taken without holding any register
    /// guard afterwards
    pub fn snapshot_entities(&self) -> Vec<EntityHandle> {
        self.entities.iter().map(|e| e.value().clone()).collect()
    }

    /// Tick every entity that is still registered when its turn comes
    pub fn tick_entities(&self, current_tick: u64) {
        for entity in self.snapshot_entities() {
            if !self.entities.contains_key(&entity.id()) {
                continue;
            }
            entity.tick(self, current_tick);
        }
    }

    pub fn add_viewer(&self, id: Uuid, viewer: Arc<dyn Viewer>) {
        self.viewers.insert(id, viewer);
    }

    pub fn remove_viewer(&self, id: &Uuid) {
        self.viewers.remove(id);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<WorldEvent> {
        self.events_tx.subscribe()
    }

    fn emit(&self, event: WorldEvent) {
        // No subscribers is fine: nobody is watching
        let _ = self.events_tx.send(event);
    }
}

impl World for GameWorld {
    fn viewers(&self, _pos: DVec3) -> Vec<Arc<dyn Viewer>> {
        self.viewers.iter().map(|v| v.value().clone()).collect()
    }

    fn entities_within(&self, bbox: BBox, keep: &dyn Fn(&dyn Entity) -> bool) -> Vec<EntityHandle> {
        self.snapshot_entities()
            .into_iter()
            .filter(|e| keep(e.as_ref()) && world_bbox(e.as_ref()).intersects(&bbox))
            .collect()
    }

    fn block(&self, pos: BlockPos) -> Block {
        self.blocks
            .get(&pos)
            .map(|b| *b.value())
            .unwrap_or_else(Block::air)
    }

    fn set_block(&self, pos: BlockPos, block: Block) {
        trace!(pos = ?pos.0, block = block.name(), "Block set");
        if block.is_air() {
            self.blocks.remove(&pos);
        } else {
            self.blocks.insert(pos, block);
        }
    }

    fn play_sound(&self, pos: DVec3, sound: Sound) {
        trace!(?pos, ?sound, "Sound played");
        self.emit(WorldEvent::Sound { pos, sound });
    }

    fn add_particle(&self, pos: DVec3, particle: Particle) {
        trace!(?pos, ?particle, "Particle added");
        self.emit(WorldEvent::Particle { pos, particle });
    }

    fn remove_entity(&self, id: EntityId) -> bool {
        let removed = self.entities.remove(&id).is_some();
        if removed {
            debug!(entity_id = %id, "Entity removed");
        }
        removed
    }

    fn difficulty(&self) -> Difficulty {
        self.difficulty
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::testing::Dummy;

    #[test]
    fn difficulty_parses_case_insensitively() {
        assert_eq!("Hard".parse::<Difficulty>(), Ok(Difficulty::Hard));
        assert!("nightmare".parse::<Difficulty>().is_err());
        assert!(Difficulty::Normal.fire_spread_increase() >= 10);
        assert!(Difficulty::Easy.fire_spread_increase() < 10);
    }

    #[test]
    fn unset_blocks_read_as_air() {
        let world = GameWorld::new(Difficulty::Normal);
        assert!(world.block(BlockPos::new(1, 2, 3)).is_air());
    }

    #[test]
    fn entities_within_filters_by_box_and_predicate() {
        let world = GameWorld::new(Difficulty::Normal);
        let near = Dummy::spawn(&world, DVec3::new(1.0, 0.0, 1.0));
        let far = Dummy::spawn(&world, DVec3::new(50.0, 0.0, 50.0));
        let excluded = Dummy::spawn(&world, DVec3::new(0.0, 0.0, 0.0));

        let bbox = BBox::new(-2.0, -1.0, -2.0, 2.0, 1.0, 2.0);
        let found = world.entities_within(bbox, &|e: &dyn Entity| e.id() != excluded.id());
        let ids: Vec<_> = found.iter().map(|e| e.id()).collect();

        assert_eq!(ids, vec![near.id()]);
        assert!(!ids.contains(&far.id()));
    }

    #[test]
    fn removal_is_idempotent() {
        let world = GameWorld::new(Difficulty::Normal);
        let dummy = Dummy::spawn(&world, DVec3::ZERO);
        assert!(world.remove_entity(dummy.id()));
        assert!(!world.remove_entity(dummy.id()));
        assert_eq!(world.entity_count(), 0);
    }

    #[test]
    fn sounds_reach_subscribers() {
        let world = GameWorld::new(Difficulty::Normal);
        let mut rx = world.subscribe();
        world.play_sound(DVec3::ONE, Sound::Thunder);
        assert_eq!(
            rx.try_recv().ok(),
            Some(WorldEvent::Sound {
                pos: DVec3::ONE,
                sound: Sound::Thunder
            })
        );
    }
}
