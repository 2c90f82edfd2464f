//! Light phase: `LightMarch` into a scratch buffer, then
//! `CopyLightIntensity` into the light channel of the density field.

use super::PhaseOutcome;
use crate::compute::cpu::MarchParams;
use crate::compute::{
    names, BindingSet, ComputeBackend, DispatchRounding, DispatchSize, DispatchStats, Kernel, TextureBinding,
};
use crate::core::{Error, Result, Vec3};
use crate::field::{DensityField, ScratchBuffer};

/// Directional light and absorption settings for the light phase.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LightParams {
    /// Direction the light travels.
    pub direction: Vec3,
    pub march_step_size: f32,
    pub base_intensity: f32,
    pub absorption_coefficient: f32,
    pub min_density: f32,
    pub max_density: f32,
    pub opacity: f32,
}

impl Default for LightParams {
    fn default() -> Self {
        Self {
            direction: Vec3::NEG_Y,
            march_step_size: 2.0,
            base_intensity: 0.2,
            absorption_coefficient: 0.01,
            min_density: 0.0,
            max_density: 1.0,
            opacity: 1.0,
        }
    }
}

impl LightParams {
    pub fn march_params(&self) -> MarchParams {
        MarchParams {
            step_size: self.march_step_size,
            base_intensity: self.base_intensity,
            absorption_coefficient: self.absorption_coefficient,
            min_density: self.min_density,
            max_density: self.max_density,
            opacity: self.opacity,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct LightFieldGenerator {
    params: LightParams,
    rounding: DispatchRounding,
}

impl LightFieldGenerator {
    pub fn new(params: LightParams, rounding: DispatchRounding) -> Self {
        Self { params, rounding }
    }

    pub fn params(&self) -> &LightParams {
        &self.params
    }

    pub fn set_params(&mut self, params: LightParams) {
        self.params = params;
    }

    pub fn set_direction(&mut self, direction: Vec3) -> Result<()> {
        if !direction.is_finite() || direction.length_squared() == 0.0 {
            return Err(Error::config(format!("light direction must be non-zero, got {}", direction)));
        }
        self.params.direction = direction;
        Ok(())
    }

    /// Run both light phases against `field`.
    ///
    /// A fresh scratch buffer is allocated for the march and dropped before
    /// returning. The copy never runs unless the march ran in the same call.
    pub fn generate<B: ComputeBackend + ?Sized>(&self, backend: &B, field: &mut DensityField) -> Result<PhaseOutcome> {
        let Some((scratch, march_stats)) = self.march(backend, field)? else {
            return Ok(PhaseOutcome::Skipped { kernel: Kernel::LightMarch.name() });
        };

        let Some(copy) = find(backend, Kernel::CopyLightIntensity) else {
            return Ok(PhaseOutcome::Skipped { kernel: Kernel::CopyLightIntensity.name() });
        };

        let groups = DispatchSize::for_dims(field.dims(), self.rounding);
        let dims = field.dims().to_ints();
        let mut bindings = BindingSet::new();
        bindings
            .set_texture(names::COPY_CLOUD_DATA, TextureBinding::Density(field))
            .set_texture(names::COPY_SOURCE, TextureBinding::ScratchRead(&scratch))
            .set_ints(names::LIGHT_TEX_SIZE, dims);
        let copy_stats = backend.dispatch(copy, bindings, groups)?;

        Ok(PhaseOutcome::Completed(march_stats.merged(copy_stats)))
    }

    /// First phase only: march every cell into a new scratch buffer.
    /// `None` when the backend has no `LightMarch` kernel.
    pub fn march<B: ComputeBackend + ?Sized>(
        &self,
        backend: &B,
        field: &DensityField,
    ) -> Result<Option<(ScratchBuffer, DispatchStats)>> {
        let Some(kernel) = find(backend, Kernel::LightMarch) else {
            return Ok(None);
        };

        let p = &self.params;
        let bounds = field.bounds();
        let mut scratch = ScratchBuffer::new(field.dims());

        let mut bindings = BindingSet::new();
        bindings
            .set_texture(names::CLOUD_DATA, TextureBinding::DensityRead(field))
            .set_texture(names::COPY_TEX, TextureBinding::Scratch(&mut scratch))
            .set_vector(names::BOUND_MIN, bounds.min)
            .set_vector(names::BOUND_MAX, bounds.max)
            .set_ints(names::LIGHT_TEX_SIZE, field.dims().to_ints())
            .set_vector(names::LIGHT_DIRECTION, p.direction)
            .set_float(names::LIGHT_MARCH_STEP_SIZE, p.march_step_size)
            .set_float(names::LIGHT_BASE_INTENSITY, p.base_intensity)
            .set_float(names::LIGHT_ABSORPTION_COEFFICIENT, p.absorption_coefficient)
            .set_float(names::MIN_DENSITY, p.min_density)
            .set_float(names::MAX_DENSITY, p.max_density)
            .set_float(names::OPACITY, p.opacity);

        let stats = backend.dispatch(kernel, bindings, DispatchSize::for_dims(field.dims(), self.rounding))?;
        Ok(Some((scratch, stats)))
    }
}

fn find<B: ComputeBackend + ?Sized>(backend: &B, kernel: Kernel) -> Option<Kernel> {
    let found = backend.find_kernel(kernel.name());
    if found.is_none() {
        log::warn!("{}: kernel `{}` not found, skipping light generation", backend.name(), kernel.name());
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::CpuBackend;
    use crate::field::GridDims;
    use crate::math::Aabb;
    use glam::UVec3;

    fn field(n: u32, density: f32) -> DensityField {
        let mut field = DensityField::new(GridDims::cubic(n).unwrap(), Aabb::centered(Vec3::splat(n as f32)));
        field.fill_density(density);
        field
    }

    fn generator() -> LightFieldGenerator {
        LightFieldGenerator::new(
            LightParams { march_step_size: 0.5, absorption_coefficient: 0.8, ..Default::default() },
            DispatchRounding::Legacy,
        )
    }

    #[test]
    fn test_light_channel_written_everywhere() {
        let backend = CpuBackend::new(0);
        let mut f = field(8, 0.6);
        let outcome = generator().generate(&backend, &mut f).unwrap();

        assert!(outcome.is_completed());
        // march + copy, 512 cells each
        assert_eq!(outcome.stats().unwrap().cells_written, 1024);
        let (lo, hi) = f.light_range();
        assert!(lo >= 0.2 - 1e-3 && hi <= 1.0 + 1e-3, "light range {}..{}", lo, hi);
        // density channel untouched
        assert!(f.cells().iter().all(|c| c[0] == 0.6));
    }

    #[test]
    fn test_light_falls_off_away_from_light() {
        let backend = CpuBackend::new(0);
        let mut f = field(8, 1.0);
        generator().generate(&backend, &mut f).unwrap();

        // light travels down, so the top row is brightest
        let top = f.light(UVec3::new(4, 7, 4));
        let bottom = f.light(UVec3::new(4, 0, 4));
        assert!(top > bottom, "top {} bottom {}", top, bottom);
    }

    #[test]
    fn test_march_scratch_is_fresh_each_call() {
        let backend = CpuBackend::new(0);
        let light_gen = generator();
        let dense = field(4, 1.0);
        let empty = field(4, 0.0);

        let (first, _) = light_gen.march(&backend, &dense).unwrap().unwrap();
        let (second, _) = light_gen.march(&backend, &empty).unwrap().unwrap();

        assert!(first.texels().iter().any(|t| t.to_f32() < 0.99));
        // nothing left over from the dense march
        assert!(second.texels().iter().all(|t| t.to_f32() == 1.0));
    }

    #[test]
    fn test_missing_march_skips_both_phases() {
        let backend = CpuBackend::with_kernels(0, &[Kernel::NoiseGenerator, Kernel::CopyLightIntensity]);
        let mut f = field(4, 1.0);

        let outcome = generator().generate(&backend, &mut f).unwrap();
        assert_eq!(outcome, PhaseOutcome::Skipped { kernel: "LightMarch" });
        assert!(f.cells().iter().all(|c| c[1] == 0.0));
    }

    #[test]
    fn test_missing_copy_leaves_light_channel() {
        let backend = CpuBackend::with_kernels(0, &[Kernel::NoiseGenerator, Kernel::LightMarch]);
        let mut f = field(4, 1.0);

        let outcome = generator().generate(&backend, &mut f).unwrap();
        assert_eq!(outcome, PhaseOutcome::Skipped { kernel: "CopyLightIntensity" });
        assert!(f.cells().iter().all(|c| c[1] == 0.0));
    }

    #[test]
    fn test_zero_direction_rejected() {
        let mut light_gen = generator();
        assert!(light_gen.set_direction(Vec3::ZERO).is_err());
        light_gen.set_direction(Vec3::X).unwrap();
        assert_eq!(light_gen.params().direction, Vec3::X);
    }
}
