//! Axis-aligned bounding box

use crate::core::types::{UVec3, Vec3};

/// Axis-aligned bounding box defined by min and max corners
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    /// Create AABB from min and max corners
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Create AABB from center and half-extents
    pub fn from_center_half_extent(center: Vec3, half_extent: Vec3) -> Self {
        Self {
            min: center - half_extent,
            max: center + half_extent,
        }
    }

    /// Box of the given size centred on the origin
    pub fn centered(size: Vec3) -> Self {
        Self::from_center_half_extent(Vec3::ZERO, size * 0.5)
    }

    /// Get size (max - min)
    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    /// Map a world position to `[0, 1]^3` box-relative coordinates
    pub fn normalize(&self, p: Vec3) -> Vec3 {
        (p - self.min) / self.size()
    }

    /// World-space centre of grid cell `cell` when the box is divided into `dims` cells
    pub fn cell_center(&self, cell: UVec3, dims: UVec3) -> Vec3 {
        let t = (cell.as_vec3() + 0.5) / dims.as_vec3();
        self.min + t * self.size()
    }
}
