//! Block handles, the block catalog and fire placement

use std::fmt;

use thiserror::Error;

use super::math::{BlockPos, Face};
use super::world::World;

/// Static description of a block kind
#[derive(Debug, PartialEq, Eq)]
pub struct BlockInfo {
    pub name: &'static str,
    /// Full cube that supports things placed on top of it
    pub solid: bool,
    /// Can catch fire from a neighbouring fire
    pub flammable: bool,
    /// Can be overwritten by placement without breaking it first
    pub replaceable: bool,
}

/// Cheap handle to a catalog entry
#[derive(Clone, Copy)]
pub struct Block(&'static BlockInfo);

impl Block {
    pub fn air() -> Self {
        Self(&AIR)
    }

    pub fn name(&self) -> &'static str {
        self.0.name
    }

    pub fn is_air(&self) -> bool {
        self.0.name == AIR.name
    }

    pub fn is_solid(&self) -> bool {
        self.0.solid
    }

    pub fn is_flammable(&self) -> bool {
        self.0.flammable
    }

    pub fn is_replaceable(&self) -> bool {
        self.0.replaceable
    }
}

impl PartialEq for Block {
    fn eq(&self, other: &Self) -> bool {
        self.0.name == other.0.name
    }
}

impl Eq for Block {}

impl fmt::Debug for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Block({})", self.0.name)
    }
}

/// Lookup of blocks by their encoded name
pub trait BlockCatalog: Send + Sync {
    fn block_by_name(&self, name: &str) -> Option<Block>;
}

/// Startup failures that prevent the server from running at all
#[derive(Debug, Error)]
pub enum InitError {
    #[error("block catalog has no entry for {0}")]
    MissingBlock(&'static str),
}

/// Resolve a block once at startup; a missing entry is fatal
pub fn require_block(catalog: &dyn BlockCatalog, name: &'static str) -> Result<Block, InitError> {
    catalog
        .block_by_name(name)
        .ok_or(InitError::MissingBlock(name))
}

macro_rules! block_info {
    ($ident:ident, $name:literal, solid: $solid:literal, flammable: $flammable:literal, replaceable: $replaceable:literal) => {
        static $ident: BlockInfo = BlockInfo {
            name: $name,
            solid: $solid,
            flammable: $flammable,
            replaceable: $replaceable,
        };
    };
}

block_info!(AIR, "minecraft:air", solid: false, flammable: false, replaceable: true);
block_info!(STONE, "minecraft:stone", solid: true, flammable: false, replaceable: false);
block_info!(DIRT, "minecraft:dirt", solid: true, flammable: false, replaceable: false);
block_info!(GRASS, "minecraft:grass", solid: true, flammable: false, replaceable: false);
block_info!(SAND, "minecraft:sand", solid: true, flammable: false, replaceable: false);
block_info!(BLUE_ICE, "minecraft:blue_ice", solid: true, flammable: false, replaceable: false);
block_info!(PLANKS, "minecraft:planks", solid: true, flammable: true, replaceable: false);
block_info!(LOG, "minecraft:log", solid: true, flammable: true, replaceable: false);
block_info!(LEAVES, "minecraft:leaves", solid: false, flammable: true, replaceable: false);
block_info!(TALL_GRASS, "minecraft:tallgrass", solid: false, flammable: true, replaceable: true);
block_info!(FIRE, "minecraft:fire", solid: false, flammable: false, replaceable: true);

static ENTRIES: [&BlockInfo; 11] = [
    &AIR,
    &STONE,
    &DIRT,
    &GRASS,
    &SAND,
    &BLUE_ICE,
    &PLANKS,
    &LOG,
    &LEAVES,
    &TALL_GRASS,
    &FIRE,
];

/// Built-in catalog covering the blocks the simulation core refers to
pub struct StaticCatalog;

impl BlockCatalog for StaticCatalog {
    fn block_by_name(&self, name: &str) -> Option<Block> {
        let full = if name.contains(':') {
            name.to_string()
        } else {
            format!("minecraft:{name}")
        };
        ENTRIES
            .iter()
            .find(|info| info.name == full)
            .map(|info| Block(*info))
    }
}

/// Place `fire` at `pos` if the spot can burn.
///
/// The target must be air or a replaceable plant, and either the block below
/// is solid or one of the neighbours is flammable.
pub fn start_fire(world: &dyn World, pos: BlockPos, fire: Block) {
    let current = world.block(pos);
    if !current.is_air() && !current.is_replaceable() {
        return;
    }
    let below = world.block(pos.side(Face::Down));
    let flammable_neighbour = Face::ALL
        .iter()
        .any(|face| world.block(pos.side(*face)).is_flammable());
    if below.is_solid() || flammable_neighbour {
        world.set_block(pos, fire);
    }
}
