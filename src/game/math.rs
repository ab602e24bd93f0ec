//! Positions, block coordinates, faces and bounding boxes

use glam::{DVec3, IVec3};
use serde::{Deserialize, Serialize};

/// Integer block coordinate in the world grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct BlockPos(pub IVec3);

impl BlockPos {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self(IVec3::new(x, y, z))
    }

    /// Block containing the given world position
    pub fn from_vec3(v: DVec3) -> Self {
        let f = v.floor();
        Self::new(f.x as i32, f.y as i32, f.z as i32)
    }

    /// Neighbouring block on the given face
    pub fn side(self, face: Face) -> Self {
        Self(self.0 + face.offset())
    }

    /// Centre of the block in world coordinates
    pub fn centre(self) -> DVec3 {
        self.0.as_dvec3() + DVec3::splat(0.5)
    }
}

impl From<[i32; 3]> for BlockPos {
    fn from(v: [i32; 3]) -> Self {
        Self::new(v[0], v[1], v[2])
    }
}

/// Face of a block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Face {
    Down,
    Up,
    North,
    South,
    West,
    East,
}

impl Face {
    pub const ALL: [Face; 6] = [
        Face::Down,
        Face::Up,
        Face::North,
        Face::South,
        Face::West,
        Face::East,
    ];

    /// Decode a face from its wire value
    pub fn from_raw(raw: i32) -> Option<Self> {
        usize::try_from(raw).ok().and_then(|i| Self::ALL.get(i).copied())
    }

    pub fn offset(self) -> IVec3 {
        match self {
            Face::Down => IVec3::NEG_Y,
            Face::Up => IVec3::Y,
            Face::North => IVec3::NEG_Z,
            Face::South => IVec3::Z,
            Face::West => IVec3::NEG_X,
            Face::East => IVec3::X,
        }
    }
}

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BBox {
    pub min: DVec3,
    pub max: DVec3,
}

impl BBox {
    /// Box spanning the two corners, in any order
    pub fn new(x0: f64, y0: f64, z0: f64, x1: f64, y1: f64, z1: f64) -> Self {
        let a = DVec3::new(x0, y0, z0);
        let b = DVec3::new(x1, y1, z1);
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    /// Grow the box by `v` in both directions along every axis
    pub fn grow(self, v: DVec3) -> Self {
        Self {
            min: self.min - v,
            max: self.max + v,
        }
    }

    pub fn translate(self, v: DVec3) -> Self {
        Self {
            min: self.min + v,
            max: self.max + v,
        }
    }

    /// Inclusive overlap test
    pub fn intersects(&self, other: &BBox) -> bool {
        self.min.cmple(other.max).all() && other.min.cmple(self.max).all()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn face_decoding_rejects_out_of_range() {
        assert_eq!(Face::from_raw(1), Some(Face::Up));
        assert_eq!(Face::from_raw(5), Some(Face::East));
        assert_eq!(Face::from_raw(6), None);
        assert_eq!(Face::from_raw(-1), None);
    }

    #[test]
    fn block_pos_floors_negative_coordinates() {
        let p = BlockPos::from_vec3(DVec3::new(-0.5, 64.9, 3.2));
        assert_eq!(p, BlockPos::new(-1, 64, 3));
        assert_eq!(p.side(Face::Down), BlockPos::new(-1, 63, 3));
    }

    #[test]
    fn empty_box_grown_and_shifted() {
        let bb = BBox::default()
            .grow(DVec3::new(3.0, 6.0, 3.0))
            .translate(DVec3::new(10.0, 3.0, 0.0));
        assert_eq!(bb.min, DVec3::new(7.0, -3.0, -3.0));
        assert_eq!(bb.max, DVec3::new(13.0, 9.0, 3.0));
    }

    #[test]
    fn touching_boxes_intersect() {
        let a = BBox::new(0.0, 0.0, 0.0, 1.0, 1.0, 1.0);
        let b = BBox::new(1.0, 0.0, 0.0, 2.0, 1.0, 1.0);
        let c = BBox::new(1.5, 0.0, 0.0, 2.0, 1.0, 1.0);
        assert!(a.intersects(&b));
        assert!(!a.intersects(&c));
    }
}
