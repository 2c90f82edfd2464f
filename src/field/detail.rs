//! Single-channel 8-bit detail volume.

use super::GridDims;
use crate::core::{Result, UVec3, Vec3};
use crate::math::Aabb;

/// Default resolution of the detail volume on each axis
pub const DEFAULT_DETAIL_SIZE: u32 = 128;

/// Cubic R8 unorm volume generated from its own layer stack.
///
/// Noise values are saturated to `[0, 1]` and quantised on write. How the
/// detail volume is combined with the base density is up to the consumer.
#[derive(Clone, Debug, PartialEq)]
pub struct DetailField {
    dims: GridDims,
    texels: Vec<u8>,
}

impl DetailField {
    pub fn new(size: u32) -> Result<Self> {
        let dims = GridDims::cubic(size)?;
        Ok(Self {
            dims,
            texels: vec![0; dims.cell_count()],
        })
    }

    pub fn dims(&self) -> GridDims {
        self.dims
    }

    /// Detail noise is sampled over the unit cube centred on the origin
    pub fn bounds(&self) -> Aabb {
        Aabb::centered(Vec3::ONE)
    }

    pub fn texels(&self) -> &[u8] {
        &self.texels
    }

    pub fn texel(&self, cell: UVec3) -> u8 {
        self.texels[self.dims.index(cell)]
    }

    /// Normalised value of a texel
    pub fn value(&self, cell: UVec3) -> f32 {
        self.texel(cell) as f32 / 255.0
    }

    /// Quantise and store `(linear index, value)` pairs
    pub fn write(&mut self, values: impl IntoIterator<Item = (usize, f32)>) {
        for (index, value) in values {
            self.texels[index] = quantize_unorm8(value);
        }
    }
}

/// Float to R8 unorm, saturating
pub fn quantize_unorm8(value: f32) -> u8 {
    if value.is_nan() {
        return 0;
    }
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}
