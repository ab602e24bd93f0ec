//! Lightning bolt: one impact tick followed by a randomised number of
//! flickering restrikes.

use std::any::Any;
use std::sync::atomic::{AtomicBool, Ordering};

use glam::DVec3;
use parking_lot::Mutex;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use tracing::debug;

use crate::util::time::ticks_from_secs;

use super::block::{start_fire, Block};
use super::entity::{DamageSource, Entity, EntityHandle, EntityId, EntityType};
use super::math::{BBox, BlockPos};
use super::persist::{EntityData, PersistError};
use super::world::{Sound, World};

/// Countdown value on the impact tick
const IMPACT_STATE: i32 = 2;
/// Minimum fire-spread factor for a bolt to ignite the ground
const BLOCK_FIRE_SPREAD_THRESHOLD: i32 = 10;

struct LightningState {
    state: i32,
    live_time: i32,
    rng: ChaCha8Rng,
}

pub struct Lightning {
    id: EntityId,
    pos: DVec3,
    fire: Block,
    damage: f64,
    block_fire: bool,
    entity_fire: bool,
    state: Mutex<LightningState>,
    closed: AtomicBool,
}

impl Lightning {
    /// Bolt dealing 5 damage that ignites entities and blocks. `fire` is the
    /// block placed on ignition; `rng` drives the restrike count.
    pub fn new(pos: DVec3, fire: Block, mut rng: ChaCha8Rng) -> Self {
        let live_time = rng.gen_range(0..3) + 1;
        Self {
            id: EntityId::next(),
            pos,
            fire,
            damage: 5.0,
            block_fire: true,
            entity_fire: true,
            state: Mutex::new(LightningState {
                state: IMPACT_STATE,
                live_time,
                rng,
            }),
            closed: AtomicBool::new(false),
        }
    }

    /// Override damage and whether blocks and entities are set on fire
    pub fn with_damage(mut self, damage: f64, block_fire: bool, entity_fire: bool) -> Self {
        self.damage = damage;
        self.block_fire = block_fire;
        self.entity_fire = entity_fire;
        self
    }

    /// Override the number of restrikes; negative counts mean none
    pub fn with_live_time(mut self, live_time: i32) -> Self {
        self.state.get_mut().live_time = live_time.max(0);
        self
    }

    pub fn live_time(&self) -> i32 {
        self.state.lock().live_time
    }

    fn ignite_ground(&self, world: &dyn World) {
        if self.block_fire && world.difficulty().fire_spread_increase() >= BLOCK_FIRE_SPREAD_THRESHOLD {
            start_fire(world, BlockPos::from_vec3(self.pos), self.fire);
        }
    }

    fn strike(&self, world: &dyn World) {
        world.play_sound(self.pos, Sound::Thunder);
        world.play_sound(self.pos, Sound::Explosion);

        let burn = ticks_from_secs(8);
        let bbox = self
            .entity_type()
            .bbox(self)
            .grow(DVec3::new(3.0, 6.0, 3.0))
            .translate(self.pos + DVec3::new(0.0, 3.0, 0.0));
        for e in world.entities_within(bbox, &|_: &dyn Entity| true) {
            // Only entities that weren't already dead
            let Some(living) = e.as_living() else {
                continue;
            };
            if living.health() <= 0.0 {
                continue;
            }
            if self.damage > 0.0 {
                living.hurt(self.damage, DamageSource::Lightning);
            }
            if self.entity_fire {
                if let Some(flammable) = e.as_flammable() {
                    if flammable.on_fire_ticks() < burn {
                        flammable.set_on_fire(burn);
                    }
                }
            }
        }
        self.ignite_ground(world);
    }
}

impl Entity for Lightning {
    fn id(&self) -> EntityId {
        self.id
    }

    fn position(&self) -> DVec3 {
        self.pos
    }

    fn entity_type(&self) -> &'static dyn EntityType {
        &LightningType
    }

    fn tick(&self, world: &dyn World, _current_tick: u64) {
        let impact = self.state.lock().state == IMPACT_STATE;
        if impact {
            self.strike(world);
        }

        let mut s = self.state.lock();
        s.state -= 1;
        if s.state >= 0 {
            return;
        }
        if s.live_time == 0 {
            drop(s);
            self.close(world);
            return;
        }
        let threshold = s.rng.gen_range(0..10_i32);
        if s.state < -threshold {
            s.live_time -= 1;
            s.state = 1;
            drop(s);
            self.ignite_ground(world);
        }
    }

    fn close(&self, world: &dyn World) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            debug!(entity_id = %self.id, "Lightning closed");
            world.remove_entity(self.id);
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

pub struct LightningType;

impl EntityType for LightningType {
    fn encode_entity(&self) -> &'static str {
        "minecraft:lightning_bolt"
    }

    fn bbox(&self, _entity: &dyn Entity) -> BBox {
        BBox::default()
    }

    fn encode(&self, _entity: &dyn Entity) -> Result<EntityData, PersistError> {
        Ok(EntityData::new())
    }

    fn decode(&self, _data: &EntityData) -> Result<EntityHandle, PersistError> {
        Err(PersistError::NotPersistent("minecraft:lightning_bolt"))
    }
}
