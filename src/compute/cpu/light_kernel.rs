//! `LightMarch` and `CopyLightIntensity`.

use crate::compute::bindings::{ensure_dims, names, BindingSet, TextureBinding};
use crate::compute::dispatch::{ensure_covered, run_blocks, DispatchSize, DispatchStats};
use crate::core::{Error, Result, Vec3};
use crate::field::{DensityField, GridDims, LIGHT_CHANNEL};
use crate::math::{Aabb, Ray};

/// Absorption parameters for one light march
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MarchParams {
    pub step_size: f32,
    pub base_intensity: f32,
    pub absorption_coefficient: f32,
    pub min_density: f32,
    pub max_density: f32,
    pub opacity: f32,
}

impl MarchParams {
    fn from_bindings(bindings: &BindingSet<'_>) -> Result<Self> {
        let params = Self {
            step_size: bindings.float(names::LIGHT_MARCH_STEP_SIZE)?,
            base_intensity: bindings.float(names::LIGHT_BASE_INTENSITY)?,
            absorption_coefficient: bindings.float(names::LIGHT_ABSORPTION_COEFFICIENT)?,
            min_density: bindings.float(names::MIN_DENSITY)?,
            max_density: bindings.float(names::MAX_DENSITY)?,
            opacity: bindings.float(names::OPACITY)?,
        };
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.step_size.is_finite() && self.step_size > 0.0) {
            return Err(Error::config(format!("light march step size must be positive, got {}", self.step_size)));
        }
        if !(self.min_density.is_finite() && self.max_density.is_finite()) || self.min_density > self.max_density {
            return Err(Error::config(format!(
                "density range [{}, {}] is invalid",
                self.min_density, self.max_density
            )));
        }
        if !self.absorption_coefficient.is_finite() || !self.opacity.is_finite() || !self.base_intensity.is_finite() {
            return Err(Error::config("light parameters must be finite"));
        }
        Ok(())
    }

    /// Final stored light value for a transmittance
    pub fn intensity(&self, transmittance: f32) -> f32 {
        self.base_intensity + (1.0 - self.base_intensity) * transmittance
    }
}

/// Fraction of light reaching `origin` from direction `towards_light`.
///
/// Steps from the origin toward the light at `step_size` until the ray leaves
/// `bounds`, attenuating by `exp(-density * absorption * step)` per sample.
pub fn transmittance(
    field: &DensityField,
    bounds: &Aabb,
    origin: Vec3,
    towards_light: Vec3,
    params: &MarchParams,
) -> f32 {
    let ray = Ray::new(origin, towards_light);
    let steps = (ray.exit_distance(bounds) / params.step_size).floor() as u32;

    let mut t = 1.0f32;
    for i in 1..=steps {
        let p = ray.at(i as f32 * params.step_size);
        let density = field
            .sample_density(bounds.normalize(p))
            .clamp(params.min_density, params.max_density)
            * params.opacity;
        t *= (-density * params.absorption_coefficient * params.step_size).exp();
    }
    t
}

pub(super) fn march(bindings: &mut BindingSet<'_>, groups: DispatchSize) -> Result<DispatchStats> {
    let dims = GridDims::from_ints(bindings.ints(names::LIGHT_TEX_SIZE)?)?;
    let bounds = Aabb::new(bindings.vector(names::BOUND_MIN)?, bindings.vector(names::BOUND_MAX)?);
    if !(bounds.size().min_element() > 0.0) {
        return Err(Error::config(format!("light march bounds {:?} are empty", bounds)));
    }
    let towards_light = -bindings.vector(names::LIGHT_DIRECTION)?.normalize_or_zero();
    if towards_light == Vec3::ZERO {
        return Err(Error::config("light direction must be non-zero"));
    }
    let params = MarchParams::from_bindings(bindings)?;

    let source = bindings
        .take_texture(names::CLOUD_DATA)?
        .into_density_ref()
        .ok_or_else(|| Error::config(format!("`{}` must be a density texture", names::CLOUD_DATA)))?;
    let target = match bindings.take_texture(names::COPY_TEX)? {
        TextureBinding::Scratch(scratch) => scratch,
        other => {
            return Err(Error::config(format!(
                "`{}` cannot be written through a {} binding",
                names::COPY_TEX,
                other.kind()
            )))
        }
    };
    ensure_dims(names::CLOUD_DATA, source.dims(), dims)?;
    ensure_dims(names::COPY_TEX, target.dims(), dims)?;
    ensure_covered(groups, dims)?;

    let size = dims.as_uvec3();
    let (values, stats) = run_blocks(groups, dims, |cell| {
        let origin = bounds.cell_center(cell, size);
        params.intensity(transmittance(source, &bounds, origin, towards_light, &params))
    });
    target.write(values);
    Ok(stats)
}

pub(super) fn copy(bindings: &mut BindingSet<'_>, groups: DispatchSize) -> Result<DispatchStats> {
    let dims = GridDims::from_ints(bindings.ints(names::LIGHT_TEX_SIZE)?)?;

    let source = bindings
        .take_texture(names::COPY_SOURCE)?
        .into_scratch_ref()
        .ok_or_else(|| Error::config(format!("`{}` must be a scratch texture", names::COPY_SOURCE)))?;
    let target = match bindings.take_texture(names::COPY_CLOUD_DATA)? {
        TextureBinding::Density(field) => field,
        other => {
            return Err(Error::config(format!(
                "`{}` cannot be written through a {} binding",
                names::COPY_CLOUD_DATA,
                other.kind()
            )))
        }
    };
    ensure_dims(names::COPY_SOURCE, source.dims(), dims)?;
    ensure_dims(names::COPY_CLOUD_DATA, target.dims(), dims)?;
    ensure_covered(groups, dims)?;

    let (values, stats) = run_blocks(groups, dims, |cell| source.get_index(dims.index(cell)));
    target.write_channel(LIGHT_CHANNEL, values);
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::DispatchRounding;
    use crate::core::UVec3;
    use crate::field::ScratchBuffer;

    fn params() -> MarchParams {
        MarchParams {
            step_size: 0.25,
            base_intensity: 0.2,
            absorption_coefficient: 1.0,
            min_density: 0.0,
            max_density: 1.0,
            opacity: 1.0,
        }
    }

    fn uniform_field(n: u32, density: f32) -> DensityField {
        let mut field = DensityField::new(GridDims::cubic(n).unwrap(), Aabb::centered(Vec3::splat(n as f32)));
        field.fill_density(density);
        field
    }

    fn bind_march<'a>(b: &mut BindingSet<'a>, field: &'a DensityField, scratch: &'a mut ScratchBuffer, light: Vec3, p: &MarchParams) {
        let bounds = field.bounds();
        b.set_texture(names::CLOUD_DATA, TextureBinding::DensityRead(field))
            .set_texture(names::COPY_TEX, TextureBinding::Scratch(scratch))
            .set_vector(names::BOUND_MIN, bounds.min)
            .set_vector(names::BOUND_MAX, bounds.max)
            .set_ints(names::LIGHT_TEX_SIZE, field.dims().to_ints())
            .set_vector(names::LIGHT_DIRECTION, light)
            .set_float(names::LIGHT_MARCH_STEP_SIZE, p.step_size)
            .set_float(names::LIGHT_BASE_INTENSITY, p.base_intensity)
            .set_float(names::LIGHT_ABSORPTION_COEFFICIENT, p.absorption_coefficient)
            .set_float(names::MIN_DENSITY, p.min_density)
            .set_float(names::MAX_DENSITY, p.max_density)
            .set_float(names::OPACITY, p.opacity);
    }

    #[test]
    fn test_empty_field_is_fully_lit() {
        let field = uniform_field(4, 0.0);
        let t = transmittance(&field, &field.bounds(), Vec3::ZERO, Vec3::Y, &params());
        assert_eq!(t, 1.0);
        assert_eq!(params().intensity(t), 1.0);
    }

    #[test]
    fn test_matches_beer_lambert_for_uniform_density() {
        let field = uniform_field(8, 0.5);
        let p = params();
        // origin 2 units from the +y face; 8 samples of 0.25
        let t = transmittance(&field, &field.bounds(), Vec3::new(0.0, 2.0, 0.0), Vec3::Y, &p);
        let expected = (-0.5f32 * 1.0 * 0.25).exp().powi(8);
        assert!((t - expected).abs() < 1e-5, "{} vs {}", t, expected);
    }

    #[test]
    fn test_density_is_clamped_to_range() {
        let field = uniform_field(4, 5.0);
        let clamped = MarchParams { max_density: 0.5, ..params() };
        let reference = uniform_field(4, 0.5);
        let origin = Vec3::new(0.5, 0.5, 0.5);
        let a = transmittance(&field, &field.bounds(), origin, Vec3::X, &clamped);
        let b = transmittance(&reference, &reference.bounds(), origin, Vec3::X, &params());
        assert!((a - b).abs() < 1e-6);
    }

    #[test]
    fn test_transmittance_decreases_away_from_light() {
        let n = 8;
        let field = uniform_field(n, 0.5);
        let mut scratch = ScratchBuffer::new(field.dims());
        {
            let mut b = BindingSet::new();
            // light travels along -x, so cells toward +x are closer to it
            bind_march(&mut b, &field, &mut scratch, Vec3::NEG_X, &params());
            let groups = DispatchSize::for_dims(field.dims(), DispatchRounding::Legacy);
            march(&mut b, groups).unwrap();
        }

        for z in 0..n {
            for y in 0..n {
                for x in 0..n - 1 {
                    let here = scratch.get(UVec3::new(x, y, z));
                    let nearer = scratch.get(UVec3::new(x + 1, y, z));
                    assert!(here <= nearer, "({}, {}, {}): {} > {}", x, y, z, here, nearer);
                }
            }
        }
        let deepest = scratch.get(UVec3::new(0, 3, 3));
        let shallowest = scratch.get(UVec3::new(n - 1, 3, 3));
        assert!(deepest < shallowest);
    }

    #[test]
    fn test_march_overwrites_every_scratch_cell() {
        let field = uniform_field(5, 1.0);
        let mut scratch = ScratchBuffer::new(field.dims());
        let p = params();
        let stats = {
            let mut b = BindingSet::new();
            bind_march(&mut b, &field, &mut scratch, Vec3::new(0.3, -1.0, 0.2), &p);
            march(&mut b, DispatchSize::for_dims(field.dims(), DispatchRounding::Legacy)).unwrap()
        };
        assert_eq!(stats.cells_written, 125);
        // every value is at least the base intensity, so none was left at zero
        assert!(scratch.texels().iter().all(|t| t.to_f32() >= p.base_intensity - 1e-3));
        assert!(scratch.texels().iter().all(|t| t.to_f32() <= 1.0));
    }

    #[test]
    fn test_zero_light_direction_rejected() {
        let field = uniform_field(4, 0.0);
        let mut scratch = ScratchBuffer::new(field.dims());
        let mut b = BindingSet::new();
        bind_march(&mut b, &field, &mut scratch, Vec3::ZERO, &params());
        let result = march(&mut b, DispatchSize::for_dims(field.dims(), DispatchRounding::Legacy));
        assert!(matches!(result, Err(Error::Configuration(_))));
    }

    #[test]
    fn test_invalid_step_rejected() {
        let bad = MarchParams { step_size: 0.0, ..params() };
        assert!(bad.validate().is_err());
        let inverted = MarchParams { min_density: 0.8, max_density: 0.2, ..params() };
        assert!(inverted.validate().is_err());
    }

    #[test]
    fn test_copy_folds_into_light_channel() {
        let mut field = uniform_field(4, 0.25);
        let mut scratch = ScratchBuffer::new(field.dims());
        scratch.write((0..64).map(|i| (i, i as f32 / 64.0)));

        {
            let mut b = BindingSet::new();
            b.set_texture(names::COPY_CLOUD_DATA, TextureBinding::Density(&mut field))
                .set_texture(names::COPY_SOURCE, TextureBinding::ScratchRead(&scratch))
                .set_ints(names::LIGHT_TEX_SIZE, [4, 4, 4]);
            copy(&mut b, DispatchSize::for_dims(GridDims::cubic(4).unwrap(), DispatchRounding::Legacy)).unwrap();
        }

        for (i, cell) in field.cells().iter().enumerate() {
            assert_eq!(cell[0], 0.25);
            assert_eq!(cell[1], scratch.get_index(i));
        }
    }
}
