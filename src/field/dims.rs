//! Grid dimensions and aspect-preserving resolution derivation.

use serde::{Deserialize, Serialize};

use crate::core::{Error, Result, UVec3, Vec3};

/// Cell counts along each axis of a 3D field
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridDims {
    pub x: u32,
    pub y: u32,
    pub z: u32,
}

impl GridDims {
    /// Create dimensions, rejecting empty axes
    pub fn new(x: u32, y: u32, z: u32) -> Result<Self> {
        if x == 0 || y == 0 || z == 0 {
            return Err(Error::config(format!("grid dimensions must be non-zero, got {}x{}x{}", x, y, z)));
        }
        Ok(Self { x, y, z })
    }

    /// Equal resolution on every axis
    pub fn cubic(size: u32) -> Result<Self> {
        Self::new(size, size, size)
    }

    /// Derive per-axis resolution so the voxel aspect matches `fit_size`.
    ///
    /// `dim[a] = ceil(tex_size * fit_size[a] / max(fit_size))`
    pub fn from_fit_size(fit_size: Vec3, tex_size: u32) -> Result<Self> {
        if tex_size == 0 {
            return Err(Error::config("texture size must be non-zero"));
        }
        if !fit_size.is_finite() {
            return Err(Error::config(format!("fit size must be finite, got {}", fit_size)));
        }
        let max_extent = fit_size.max_element();
        if max_extent <= 0.0 {
            return Err(Error::config(format!("fit size must have a positive extent, got {}", fit_size)));
        }

        let axis = |extent: f32| -> Result<u32> {
            if extent <= 0.0 {
                return Err(Error::config(format!("fit size components must be positive, got {}", fit_size)));
            }
            let cells = (tex_size as f32 * extent / max_extent).ceil();
            Ok(cells as u32)
        };

        Self::new(axis(fit_size.x)?, axis(fit_size.y)?, axis(fit_size.z)?)
    }

    /// Build from the `int[3]` form used by kernel bindings
    pub fn from_ints(size: [i32; 3]) -> Result<Self> {
        let axis = |v: i32| {
            u32::try_from(v).map_err(|_| Error::config(format!("negative texture size {:?}", size)))
        };
        Self::new(axis(size[0])?, axis(size[1])?, axis(size[2])?)
    }

    pub fn to_ints(self) -> [i32; 3] {
        [self.x as i32, self.y as i32, self.z as i32]
    }

    pub fn as_uvec3(self) -> UVec3 {
        UVec3::new(self.x, self.y, self.z)
    }

    pub fn cell_count(self) -> usize {
        self.x as usize * self.y as usize * self.z as usize
    }

    /// Whether `cell` lies inside the grid
    pub fn contains(self, cell: UVec3) -> bool {
        cell.x < self.x && cell.y < self.y && cell.z < self.z
    }

    /// Linear index, x fastest
    #[inline]
    pub fn index(self, cell: UVec3) -> usize {
        (cell.z as usize * self.y as usize + cell.y as usize) * self.x as usize + cell.x as usize
    }

    /// Inverse of [`index`](Self::index)
    pub fn cell(self, index: usize) -> UVec3 {
        let x = self.x as usize;
        let y = self.y as usize;
        UVec3::new((index % x) as u32, ((index / x) % y) as u32, (index / (x * y)) as u32)
    }
}

impl std::fmt::Display for GridDims {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}x{}", self.x, self.y, self.z)
    }
}
