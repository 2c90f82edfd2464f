//! Two-channel density/light field.

use super::GridDims;
use crate::core::{UVec3, Vec3};
use crate::math::Aabb;

/// Channel holding noise density
pub const DENSITY_CHANNEL: usize = 0;
/// Channel holding light transmittance
pub const LIGHT_CHANNEL: usize = 1;

/// 3D grid of `[density, light]` cells laid out like an RG32 float volume.
#[derive(Clone, Debug, PartialEq)]
pub struct DensityField {
    dims: GridDims,
    bounds: Aabb,
    cells: Vec<[f32; 2]>,
}

impl DensityField {
    /// Zero-filled field covering `bounds`
    pub fn new(dims: GridDims, bounds: Aabb) -> Self {
        Self {
            dims,
            bounds,
            cells: vec![[0.0; 2]; dims.cell_count()],
        }
    }

    pub fn dims(&self) -> GridDims {
        self.dims
    }

    /// World-space region the grid covers
    pub fn bounds(&self) -> Aabb {
        self.bounds
    }

    pub fn cells(&self) -> &[[f32; 2]] {
        &self.cells
    }

    pub fn density(&self, cell: UVec3) -> f32 {
        self.cells[self.dims.index(cell)][DENSITY_CHANNEL]
    }

    pub fn light(&self, cell: UVec3) -> f32 {
        self.cells[self.dims.index(cell)][LIGHT_CHANNEL]
    }

    /// Overwrite one channel from `(linear index, value)` pairs
    pub fn write_channel(&mut self, channel: usize, values: impl IntoIterator<Item = (usize, f32)>) {
        for (index, value) in values {
            self.cells[index][channel] = value;
        }
    }

    /// Fill the density channel with a constant
    pub fn fill_density(&mut self, value: f32) {
        for cell in &mut self.cells {
            cell[DENSITY_CHANNEL] = value;
        }
    }

    /// Trilinear density lookup at box-relative coordinates `uvw` in `[0, 1]^3`.
    ///
    /// Texel centres sit at `(i + 0.5) / dim`; lookups outside are clamped to
    /// the edge texels.
    pub fn sample_density(&self, uvw: Vec3) -> f32 {
        let size = self.dims.as_uvec3();
        let max_index = size - UVec3::ONE;
        let g = (uvw * size.as_vec3() - 0.5).clamp(Vec3::ZERO, max_index.as_vec3());
        let base = g.floor();
        let f = g - base;
        let i0 = base.as_uvec3();
        let i1 = (i0 + UVec3::ONE).min(max_index);

        let d = |x: u32, y: u32, z: u32| self.density(UVec3::new(x, y, z));

        let c00 = lerp(d(i0.x, i0.y, i0.z), d(i1.x, i0.y, i0.z), f.x);
        let c10 = lerp(d(i0.x, i1.y, i0.z), d(i1.x, i1.y, i0.z), f.x);
        let c01 = lerp(d(i0.x, i0.y, i1.z), d(i1.x, i0.y, i1.z), f.x);
        let c11 = lerp(d(i0.x, i1.y, i1.z), d(i1.x, i1.y, i1.z), f.x);

        lerp(lerp(c00, c10, f.y), lerp(c01, c11, f.y), f.z)
    }

    /// Trilinear density lookup at a world position
    pub fn sample_density_world(&self, p: Vec3) -> f32 {
        self.sample_density(self.bounds.normalize(p))
    }

    /// `(min, max)` of the density channel
    pub fn density_range(&self) -> (f32, f32) {
        channel_range(&self.cells, DENSITY_CHANNEL)
    }

    /// `(min, max)` of the light channel
    pub fn light_range(&self) -> (f32, f32) {
        channel_range(&self.cells, LIGHT_CHANNEL)
    }
}

#[inline]
fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

fn channel_range(cells: &[[f32; 2]], channel: usize) -> (f32, f32) {
    cells.iter().fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), c| {
        (lo.min(c[channel]), hi.max(c[channel]))
    })
}
