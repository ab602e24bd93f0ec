//! World simulation: entities, the world they tick in, and the tick driver

pub mod block;
pub mod cloud;
pub mod control;
pub mod driver;
pub mod effect;
pub mod entity;
pub mod lightning;
pub mod math;
pub mod persist;
pub mod player;
pub mod world;

#[cfg(test)]
mod testing;

pub use block::{require_block, Block, InitError, StaticCatalog};
pub use cloud::{AreaEffectCloud, CloudSettings};
pub use driver::TickDriver;
pub use effect::Potion;
pub use entity::{Entity, EntityId};
pub use lightning::Lightning;
pub use math::BlockPos;
pub use player::Player;
pub use world::{Difficulty, GameWorld, World};
