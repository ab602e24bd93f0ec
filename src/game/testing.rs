//! Test doubles shared by the simulation tests

use std::any::Any;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use glam::DVec3;
use parking_lot::Mutex;
use uuid::Uuid;

use super::effect::Effect;
use super::entity::{DamageSource, Entity, EntityHandle, EntityId, EntityType, Flammable, Living};
use super::math::BBox;
use super::persist::{encode_entity, EntityData, PersistError};
use super::world::{GameWorld, Viewer, World};

#[derive(Default)]
struct DummyState {
    health: f64,
    effects: Vec<Effect>,
    hurts: Vec<(f64, DamageSource)>,
    fire_ticks: i64,
    ignitions: usize,
}

/// Living, flammable entity that records everything done to it
pub struct Dummy {
    id: EntityId,
    pos: DVec3,
    state: Mutex<DummyState>,
}

impl Dummy {
    pub fn spawn(world: &GameWorld, pos: DVec3) -> Arc<Dummy> {
        Self::spawn_with_health(world, pos, 20.0)
    }

    pub fn spawn_with_health(world: &GameWorld, pos: DVec3, health: f64) -> Arc<Dummy> {
        let dummy = Arc::new(Dummy {
            id: EntityId::next(),
            pos,
            state: Mutex::new(DummyState {
                health,
                ..DummyState::default()
            }),
        });
        world.add_entity(dummy.clone());
        dummy
    }

    pub fn effects(&self) -> Vec<Effect> {
        self.state.lock().effects.clone()
    }

    pub fn hurts(&self) -> Vec<(f64, DamageSource)> {
        self.state.lock().hurts.clone()
    }

    pub fn ignitions(&self) -> usize {
        self.state.lock().ignitions
    }
}

impl Entity for Dummy {
    fn id(&self) -> EntityId {
        self.id
    }

    fn position(&self) -> DVec3 {
        self.pos
    }

    fn entity_type(&self) -> &'static dyn EntityType {
        &DummyType
    }

    fn tick(&self, _world: &dyn World, _current_tick: u64) {}

    fn close(&self, world: &dyn World) {
        world.remove_entity(self.id);
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

impl Living for Dummy {
    fn health(&self) -> f64 {
        self.state.lock().health
    }

    fn hurt(&self, damage: f64, source: DamageSource) {
        let mut s = self.state.lock();
        s.health = (s.health - damage).max(0.0);
        s.hurts.push((damage, source));
    }

    fn add_effect(&self, effect: Effect) {
        self.state.lock().effects.push(effect);
    }
}

impl Flammable for Dummy {
    fn on_fire_ticks(&self) -> i64 {
        self.state.lock().fire_ticks
    }

    fn set_on_fire(&self, ticks: i64) {
        let mut s = self.state.lock();
        s.fire_ticks = ticks;
        s.ignitions += 1;
    }
}

struct DummyType;

impl EntityType for DummyType {
    fn encode_entity(&self) -> &'static str {
        "test:dummy"
    }

    fn bbox(&self, _entity: &dyn Entity) -> BBox {
        BBox::new(-0.3, 0.0, -0.3, 0.3, 1.8, 0.3)
    }

    fn encode(&self, _entity: &dyn Entity) -> Result<EntityData, PersistError> {
        Err(PersistError::NotPersistent("test:dummy"))
    }

    fn decode(&self, _data: &EntityData) -> Result<EntityHandle, PersistError> {
        Err(PersistError::NotPersistent("test:dummy"))
    }
}

/// Viewer that counts state notifications
#[derive(Default)]
pub struct RecordingViewer {
    views: AtomicUsize,
}

impl RecordingViewer {
    pub fn attach(world: &GameWorld) -> Arc<RecordingViewer> {
        let viewer = Arc::new(RecordingViewer::default());
        world.add_viewer(Uuid::new_v4(), viewer.clone());
        viewer
    }

    pub fn count(&self) -> usize {
        self.views.load(Ordering::SeqCst)
    }
}

impl Viewer for RecordingViewer {
    fn view_entity_state(&self, _entity: &dyn Entity) {
        self.views.fetch_add(1, Ordering::SeqCst);
    }
}

/// Viewer that encodes every entity it is shown, locking the entity's state
/// the same way a connected session does
#[derive(Default)]
pub struct EncodingViewer {
    snapshots: Mutex<Vec<EntityData>>,
}

impl EncodingViewer {
    pub fn attach(world: &GameWorld) -> Arc<EncodingViewer> {
        let viewer = Arc::new(EncodingViewer::default());
        world.add_viewer(Uuid::new_v4(), viewer.clone());
        viewer
    }

    pub fn snapshots(&self) -> Vec<EntityData> {
        self.snapshots.lock().clone()
    }
}

impl Viewer for EncodingViewer {
    fn view_entity_state(&self, entity: &dyn Entity) {
        if let Ok(data) = encode_entity(entity) {
            self.snapshots.lock().push(data);
        }
    }
}
