//! Volumetric fields produced by the generation pipeline.

pub mod density;
pub mod detail;
pub mod dims;
pub mod dither;
pub mod scratch;

pub use density::{DensityField, DENSITY_CHANNEL, LIGHT_CHANNEL};
pub use detail::{DetailField, DEFAULT_DETAIL_SIZE};
pub use dims::GridDims;
pub use dither::{DitherTexture, DITHER_SIZE};
pub use scratch::ScratchBuffer;

use crate::core::Result;
use crate::math::Aabb;

/// Fields handed to the consumer as one unit: base density/light plus the
/// optional detail volume.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldSet {
    pub density: DensityField,
    pub detail: Option<DetailField>,
}

impl FieldSet {
    pub fn new(dims: GridDims, bounds: Aabb, detail_size: Option<u32>) -> Result<Self> {
        Ok(Self {
            density: DensityField::new(dims, bounds),
            detail: detail_size.map(DetailField::new).transpose()?,
        })
    }
}
