//! Area effect cloud: a timed, growing or shrinking area that applies a
//! potion's effects to living entities standing inside it.

use std::any::Any;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use glam::DVec3;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::util::time::ticks_from_secs;

use super::effect::{Effect, Potion};
use super::entity::{Entity, EntityHandle, EntityId, EntityType};
use super::math::BBox;
use super::persist::{from_data, to_data, EntityData, PersistError};
use super::world::World;

/// Ticks after spawning before the cloud grows or applies anything
const WARMUP_TICKS: i64 = 10;
/// Targets are processed every this many ticks
const APPLY_INTERVAL: i64 = 5;
/// The cloud closes once its radius drops below this
const MIN_RADIUS: f64 = 0.5;

/// Timing and radius parameters for a new cloud
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CloudSettings {
    /// Lifetime in ticks, not counting the warm-up
    pub duration: i64,
    /// Ticks before the same entity can be affected again
    pub reapplication_delay: i64,
    /// Change to `duration` each time an entity is affected
    pub duration_on_use: i64,
    pub radius: f64,
    /// Change to `radius` each time an entity is affected
    pub radius_on_use: f64,
    /// Change to `radius` every tick after the warm-up
    pub radius_growth: f64,
}

impl Default for CloudSettings {
    fn default() -> Self {
        Self {
            duration: ticks_from_secs(30),
            reapplication_delay: ticks_from_secs(2),
            duration_on_use: 0,
            radius: 3.0,
            radius_on_use: -0.5,
            radius_growth: -0.005,
        }
    }
}

#[derive(Debug)]
struct CloudState {
    duration: i64,
    reapplication_delay: i64,
    duration_on_use: i64,
    radius: f64,
    radius_on_use: f64,
    radius_growth: f64,
    age: i64,
    /// Entity to the age at which it may be affected again
    targets: HashMap<EntityId, i64>,
    closing: bool,
}

impl CloudState {
    /// Apply `duration_on_use`. Returns whether anything changed.
    fn use_duration(&mut self) -> bool {
        if self.duration_on_use == 0 {
            return false;
        }
        self.duration = self.duration.saturating_add(self.duration_on_use);
        if self.duration <= 0 {
            self.closing = true;
        }
        true
    }

    /// Apply `radius_on_use`. Returns whether anything changed.
    fn use_radius(&mut self) -> bool {
        if self.radius_on_use == 0.0 {
            return false;
        }
        self.radius += self.radius_on_use;
        if self.radius <= MIN_RADIUS {
            self.closing = true;
        }
        true
    }
}

pub struct AreaEffectCloud {
    id: EntityId,
    pos: DVec3,
    potion: Potion,
    state: Mutex<CloudState>,
    closed: AtomicBool,
}

impl AreaEffectCloud {
    /// Cloud with the default lingering-potion parameters
    pub fn new(pos: DVec3, potion: Potion) -> Self {
        Self::with_settings(pos, potion, CloudSettings::default())
    }

    pub fn with_settings(pos: DVec3, potion: Potion, settings: CloudSettings) -> Self {
        Self {
            id: EntityId::next(),
            pos,
            potion,
            state: Mutex::new(CloudState {
                duration: settings.duration,
                reapplication_delay: settings.reapplication_delay,
                duration_on_use: settings.duration_on_use,
                radius: settings.radius,
                radius_on_use: settings.radius_on_use,
                radius_growth: settings.radius_growth,
                age: 0,
                targets: HashMap::new(),
                closing: false,
            }),
            closed: AtomicBool::new(false),
        }
    }

    /// Remaining lifetime in ticks
    pub fn duration(&self) -> i64 {
        self.state.lock().duration
    }

    /// Current radius, change on use and change per tick
    pub fn radius(&self) -> (f64, f64, f64) {
        let s = self.state.lock();
        (s.radius, s.radius_on_use, s.radius_growth)
    }

    pub fn age(&self) -> i64 {
        self.state.lock().age
    }

    pub fn is_closing(&self) -> bool {
        self.state.lock().closing
    }

    pub fn effects(&self) -> Vec<Effect> {
        self.potion.effects()
    }

    pub fn potion(&self) -> Potion {
        self.potion
    }

    fn settings(&self) -> CloudSettings {
        let s = self.state.lock();
        CloudSettings {
            duration: s.duration,
            reapplication_delay: s.reapplication_delay,
            duration_on_use: s.duration_on_use,
            radius: s.radius,
            radius_on_use: s.radius_on_use,
            radius_growth: s.radius_growth,
        }
    }

    fn broadcast_state(&self, world: &dyn World) {
        for viewer in world.viewers(self.pos) {
            viewer.view_entity_state(self);
        }
    }

    /// Effect as applied by a cloud: lasting effects only get a quarter of
    /// their duration, since they are reapplied while the entity stays inside.
    pub(crate) fn diluted(effect: Effect) -> Effect {
        if effect.kind.is_lasting() {
            Effect::new(effect.kind, effect.level, effect.duration / 4)
        } else {
            effect
        }
    }
}

impl Entity for AreaEffectCloud {
    fn id(&self) -> EntityId {
        self.id
    }

    fn position(&self) -> DVec3 {
        self.pos
    }

    fn entity_type(&self) -> &'static dyn EntityType {
        &AreaEffectCloudType
    }

    fn tick(&self, world: &dyn World, _current_tick: u64) {
        let mut state = self.state.lock();
        if state.closing {
            drop(state);
            self.close(world);
            return;
        }

        state.age += 1;
        if state.age < WARMUP_TICKS {
            return;
        }

        if state.age - WARMUP_TICKS >= state.duration {
            trace!(entity_id = %self.id, "Cloud expired");
            state.closing = true;
            return;
        }

        if state.radius_growth != 0.0 {
            state.radius += state.radius_growth;
            if state.radius < MIN_RADIUS {
                trace!(entity_id = %self.id, "Cloud shrank away");
                state.closing = true;
                return;
            }
            drop(state);
            self.broadcast_state(world);
            state = self.state.lock();
        }

        if state.age % APPLY_INTERVAL != 0 {
            return;
        }

        let age = state.age;
        state.targets.retain(|_, expiry| age < *expiry);
        let cooling: HashSet<EntityId> = state.targets.keys().copied().collect();
        let bbox = BBox::new(-state.radius, 0.0, -state.radius, state.radius, 0.5, state.radius)
            .translate(self.pos);
        drop(state);

        let candidates = world.entities_within(bbox, &|e: &dyn Entity| {
            e.id() != self.id && !cooling.contains(&e.id()) && e.as_living().is_some()
        });

        let effects = self.potion.effects();
        let mut state = self.state.lock();
        let mut update = false;
        for candidate in candidates {
            let mut delta = candidate.position() - self.pos;
            delta.y = 0.0;
            if delta.length() > state.radius {
                continue;
            }
            let Some(living) = candidate.as_living() else {
                continue;
            };
            for effect in &effects {
                living.add_effect(Self::diluted(*effect));
            }

            let next = state.age.saturating_add(state.reapplication_delay);
            state.targets.insert(candidate.id(), next);
            let radius_changed = state.use_radius();
            let duration_changed = state.use_duration();
            update |= radius_changed || duration_changed;
        }
        drop(state);

        if update {
            self.broadcast_state(world);
        }
    }

    fn close(&self, world: &dyn World) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            debug!(entity_id = %self.id, "Area effect cloud closed");
            world.remove_entity(self.id);
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Persisted cloud fields. Names are shared with the persistence store.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CloudRecord {
    pos: [f64; 3],
    potion_id: i32,
    duration: i32,
    reapplication_delay: i32,
    duration_on_use: i32,
    radius: f64,
    radius_on_use: f64,
    radius_per_tick: f64,
}

/// Tick counts are stored as 32-bit fields
fn ticks_field(name: &'static str, ticks: i64) -> Result<i32, PersistError> {
    i32::try_from(ticks).map_err(|_| PersistError::OutOfRange(name))
}

pub struct AreaEffectCloudType;

impl EntityType for AreaEffectCloudType {
    fn encode_entity(&self) -> &'static str {
        "minecraft:area_effect_cloud"
    }

    fn bbox(&self, entity: &dyn Entity) -> BBox {
        match entity.as_any().downcast_ref::<AreaEffectCloud>() {
            Some(cloud) => {
                let (r, _, _) = cloud.radius();
                BBox::new(-r, 0.0, -r, r, 0.5, r)
            }
            None => BBox::default(),
        }
    }

    fn encode(&self, entity: &dyn Entity) -> Result<EntityData, PersistError> {
        let cloud = entity
            .as_any()
            .downcast_ref::<AreaEffectCloud>()
            .ok_or(PersistError::WrongType("area effect cloud"))?;
        let s = cloud.settings();
        to_data(&CloudRecord {
            pos: cloud.pos.to_array(),
            potion_id: i32::from(cloud.potion.id()),
            duration: ticks_field("Duration", s.duration)?,
            reapplication_delay: ticks_field("ReapplicationDelay", s.reapplication_delay)?,
            duration_on_use: ticks_field("DurationOnUse", s.duration_on_use)?,
            radius: s.radius,
            radius_on_use: s.radius_on_use,
            radius_per_tick: s.radius_growth,
        })
    }

    fn decode(&self, data: &EntityData) -> Result<EntityHandle, PersistError> {
        let r: CloudRecord = from_data(data)?;
        let settings = CloudSettings {
            duration: i64::from(r.duration),
            reapplication_delay: i64::from(r.reapplication_delay),
            duration_on_use: i64::from(r.duration_on_use),
            radius: r.radius,
            radius_on_use: r.radius_on_use,
            radius_growth: r.radius_per_tick,
        };
        Ok(Arc::new(AreaEffectCloud::with_settings(
            DVec3::from_array(r.pos),
            Potion(u8::try_from(r.potion_id).map_err(|_| PersistError::OutOfRange("PotionId"))?),
            settings,
        )))
    }
}
