//! Player entity: the living body a connected session controls

use std::any::Any;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use glam::DVec3;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::util::time::TICKS_PER_SECOND;

use super::block::Block;
use super::control::{Breaker, Controllable, GameMode};
use super::effect::{Effect, EffectType};
use super::entity::{
    DamageSource, Entity, EntityHandle, EntityId, EntityType, Flammable, Living,
};
use super::math::{BBox, BlockPos, Face};
use super::persist::{to_data, EntityData, PersistError};
use super::world::{Particle, Sound, World};

pub const MAX_HEALTH: f64 = 20.0;

#[derive(Debug, Clone, Copy, PartialEq)]
struct BreakProgress {
    pos: BlockPos,
    face: Face,
    punches: u32,
}

#[derive(Debug)]
struct PlayerState {
    health: f64,
    effects: HashMap<EffectType, Effect>,
    fire_ticks: i64,
    game_mode: GameMode,
    breaking: Option<BreakProgress>,
}

impl PlayerState {
    fn damage(&mut self, damage: f64, source: DamageSource) -> bool {
        if source == DamageSource::Fire && self.effects.contains_key(&EffectType::FireResistance) {
            return false;
        }
        self.health = (self.health - damage).max(0.0);
        true
    }
}

pub struct Player {
    id: EntityId,
    name: String,
    pos: DVec3,
    world: Weak<dyn World>,
    state: Mutex<PlayerState>,
    closed: AtomicBool,
}

impl Player {
    pub fn new(name: impl Into<String>, pos: DVec3, world: &Arc<dyn World>) -> Self {
        Self {
            id: EntityId::next(),
            name: name.into(),
            pos,
            world: Arc::downgrade(world),
            state: Mutex::new(PlayerState {
                health: MAX_HEALTH,
                effects: HashMap::new(),
                fire_ticks: 0,
                game_mode: GameMode::default(),
                breaking: None,
            }),
            closed: AtomicBool::new(false),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_game_mode(&self, mode: GameMode) {
        self.state.lock().game_mode = mode;
    }

    pub fn effects(&self) -> Vec<Effect> {
        self.state.lock().effects.values().copied().collect()
    }

    /// Block currently being broken, if any
    pub fn breaking_pos(&self) -> Option<BlockPos> {
        self.state.lock().breaking.map(|b| b.pos)
    }

    fn break_block(&self, world: &dyn World, pos: BlockPos, block: Block) {
        debug!(entity_id = %self.id, pos = ?pos.0, block = block.name(), "Block broken");
        world.set_block(pos, Block::air());
        world.play_sound(
            pos.centre(),
            Sound::BlockBreak {
                block: block.name().to_string(),
            },
        );
        world.add_particle(
            pos.centre(),
            Particle::BlockBreak {
                block: block.name().to_string(),
            },
        );
    }
}

impl Entity for Player {
    fn id(&self) -> EntityId {
        self.id
    }

    fn position(&self) -> DVec3 {
        self.pos
    }

    fn entity_type(&self) -> &'static dyn EntityType {
        &PlayerType
    }

    fn tick(&self, _world: &dyn World, _current_tick: u64) {
        let mut s = self.state.lock();
        s.effects.retain(|_, e| {
            e.duration -= 1;
            e.duration > 0
        });
        if s.fire_ticks > 0 {
            s.fire_ticks -= 1;
            if s.fire_ticks % TICKS_PER_SECOND == 0 && s.damage(1.0, DamageSource::Fire) {
                trace!(entity_id = %self.id, health = s.health, "Burning");
            }
        }
    }

    fn close(&self, world: &dyn World) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            debug!(entity_id = %self.id, name = %self.name, "Player closed");
            world.remove_entity(self.id);
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_living(&self) -> Option<&dyn Living> {
        Some(self)
    }

    fn as_flammable(&self) -> Option<&dyn Flammable> {
        Some(self)
    }
}

impl Living for Player {
    fn health(&self) -> f64 {
        self.state.lock().health
    }

    fn hurt(&self, damage: f64, source: DamageSource) {
        let mut s = self.state.lock();
        if s.damage(damage, source) {
            debug!(entity_id = %self.id, damage, ?source, health = s.health, "Player hurt");
        }
    }

    fn add_effect(&self, effect: Effect) {
        let mut s = self.state.lock();
        let level = i32::try_from(effect.level.max(1) - 1).unwrap_or(0).min(8);
        match effect.kind {
            EffectType::InstantHealth => {
                s.health = (s.health + f64::from(4 << level)).min(MAX_HEALTH);
            }
            EffectType::InstantDamage => {
                s.damage(f64::from(6 << level), DamageSource::Effect);
            }
            kind => {
                let replace = s.effects.get(&kind).map_or(true, |current| {
                    effect.level > current.level
                        || (effect.level == current.level && effect.duration > current.duration)
                });
                if replace {
                    s.effects.insert(kind, effect);
                }
            }
        }
    }
}

impl Flammable for Player {
    fn on_fire_ticks(&self) -> i64 {
        self.state.lock().fire_ticks
    }

    fn set_on_fire(&self, ticks: i64) {
        self.state.lock().fire_ticks = ticks.max(0);
    }
}

impl Breaker for Player {
    fn start_breaking(&self, pos: BlockPos, face: Face) {
        let Some(world) = self.world.upgrade() else {
            return;
        };
        let block = world.block(pos);
        if block.is_air() {
            trace!(entity_id = %self.id, pos = ?pos.0, "Start breaking air ignored");
            return;
        }

        let mut s = self.state.lock();
        if !s.game_mode.allows_editing() {
            return;
        }
        if s.game_mode.instant_break() {
            s.breaking = None;
            drop(s);
            self.break_block(world.as_ref(), pos, block);
            return;
        }
        s.breaking = Some(BreakProgress {
            pos,
            face,
            punches: 0,
        });
        drop(s);

        world.add_particle(
            pos.centre(),
            Particle::PunchBlock {
                block: block.name().to_string(),
                face,
            },
        );
    }

    fn continue_breaking(&self, face: Face) {
        let Some(world) = self.world.upgrade() else {
            return;
        };
        let pos = {
            let mut s = self.state.lock();
            let Some(progress) = s.breaking.as_mut() else {
                return;
            };
            progress.face = face;
            progress.punches += 1;
            progress.pos
        };
        let block = world.block(pos);
        world.add_particle(
            pos.centre(),
            Particle::PunchBlock {
                block: block.name().to_string(),
                face,
            },
        );
    }

    fn abort_breaking(&self) {
        self.state.lock().breaking = None;
    }

    fn finish_breaking(&self) {
        let Some(world) = self.world.upgrade() else {
            return;
        };
        let progress = {
            let mut s = self.state.lock();
            if !s.game_mode.allows_editing() {
                s.breaking = None;
                return;
            }
            s.breaking.take()
        };
        let Some(progress) = progress else {
            return;
        };
        let block = world.block(progress.pos);
        if block.is_air() {
            return;
        }
        trace!(
            entity_id = %self.id,
            face = ?progress.face,
            punches = progress.punches,
            "Finish breaking"
        );
        self.break_block(world.as_ref(), progress.pos, block);
    }
}

impl Controllable for Player {
    fn game_mode(&self) -> GameMode {
        self.state.lock().game_mode
    }
}

/// Visible player fields, as shown to viewers
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct PlayerRecord {
    pos: [f64; 3],
    name: String,
    health: f64,
    fire_ticks: i64,
    game_mode: GameMode,
}

pub struct PlayerType;

impl EntityType for PlayerType {
    fn encode_entity(&self) -> &'static str {
        "minecraft:player"
    }

    fn bbox(&self, _entity: &dyn Entity) -> BBox {
        BBox::new(-0.3, 0.0, -0.3, 0.3, 1.8, 0.3)
    }

    fn encode(&self, entity: &dyn Entity) -> Result<EntityData, PersistError> {
        let player = entity
            .as_any()
            .downcast_ref::<Player>()
            .ok_or(PersistError::WrongType("player"))?;
        let s = player.state.lock();
        to_data(&PlayerRecord {
            pos: player.pos.to_array(),
            name: player.name.clone(),
            health: s.health,
            fire_ticks: s.fire_ticks,
            game_mode: s.game_mode,
        })
    }

    /// Players are restored by their session, never from entity data
    fn decode(&self, _data: &EntityData) -> Result<EntityHandle, PersistError> {
        Err(PersistError::NotPersistent("minecraft:player"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::block::{require_block, StaticCatalog};
    use crate::game::world::{GameWorld, WorldEvent};
    use crate::game::Difficulty;

    fn setup() -> (Arc<GameWorld>, Arc<Player>) {
        let world = Arc::new(GameWorld::new(Difficulty::Normal));
        let dyn_world: Arc<dyn World> = world.clone();
        let player = Arc::new(Player::new("steve", DVec3::new(0.0, 64.0, 0.0), &dyn_world));
        world.add_entity(player.clone());
        (world, player)
    }

    fn stone() -> Block {
        require_block(&StaticCatalog, "stone").expect("stone")
    }

    #[test]
    fn instant_effects_resolve_immediately() {
        let (_world, player) = setup();
        player.add_effect(Effect::new(EffectType::InstantDamage, 1, 0));
        assert_eq!(player.health(), 14.0);
        player.add_effect(Effect::new(EffectType::InstantHealth, 2, 0));
        assert_eq!(player.health(), 20.0);
        assert!(player.effects().is_empty());
    }

    #[test]
    fn stronger_or_longer_effects_replace_weaker_ones() {
        let (_world, player) = setup();
        player.add_effect(Effect::new(EffectType::Poison, 1, 100));
        player.add_effect(Effect::new(EffectType::Poison, 1, 50));
        assert_eq!(player.effects()[0].duration, 100);
        player.add_effect(Effect::new(EffectType::Poison, 2, 10));
        assert_eq!(player.effects()[0].level, 2);
    }

    #[test]
    fn effects_expire_and_fire_burns() {
        let (world, player) = setup();
        player.add_effect(Effect::new(EffectType::Speed, 1, 3));
        player.set_on_fire(40);
        for t in 0..40 {
            player.tick(world.as_ref(), t);
        }
        assert!(player.effects().is_empty());
        assert_eq!(player.on_fire_ticks(), 0);
        assert_eq!(player.health(), 18.0);
    }

    #[test]
    fn fire_resistance_blocks_burn_damage() {
        let (world, player) = setup();
        player.add_effect(Effect::new(EffectType::FireResistance, 1, 1000));
        player.set_on_fire(40);
        for t in 0..40 {
            player.tick(world.as_ref(), t);
        }
        assert_eq!(player.health(), MAX_HEALTH);
    }

    #[test]
    fn survival_break_cycle_removes_block() {
        let (world, player) = setup();
        let pos = BlockPos::new(1, 63, 0);
        world.set_block(pos, stone());
        let mut events = world.subscribe();

        player.start_breaking(pos, Face::Up);
        assert_eq!(player.breaking_pos(), Some(pos));
        player.continue_breaking(Face::Up);
        player.finish_breaking();

        assert!(world.block(pos).is_air());
        assert_eq!(player.breaking_pos(), None);
        let sounds = std::iter::from_fn(|| events.try_recv().ok())
            .filter(|e| matches!(e, WorldEvent::Sound { .. }))
            .count();
        assert_eq!(sounds, 1);
    }

    #[test]
    fn abort_keeps_the_block() {
        let (world, player) = setup();
        let pos = BlockPos::new(1, 63, 0);
        world.set_block(pos, stone());
        player.start_breaking(pos, Face::North);
        player.abort_breaking();
        player.finish_breaking();
        assert_eq!(world.block(pos), stone());
    }

    #[test]
    fn creative_breaks_instantly_and_adventure_never() {
        let (world, player) = setup();
        let pos = BlockPos::new(2, 63, 0);
        world.set_block(pos, stone());

        player.set_game_mode(GameMode::Adventure);
        player.start_breaking(pos, Face::Up);
        player.finish_breaking();
        assert_eq!(world.block(pos), stone());

        player.set_game_mode(GameMode::Creative);
        player.start_breaking(pos, Face::Up);
        assert!(world.block(pos).is_air());
    }

    #[test]
    fn encodes_visible_fields() {
        let (_world, player) = setup();
        let data = PlayerType.encode(player.as_ref()).expect("encode");
        assert_eq!(data["Name"], "steve");
        assert_eq!(data["Health"], 20.0);
        assert_eq!(data["GameMode"], "survival");
    }
}
