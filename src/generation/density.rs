//! Density phase: runs `NoiseGenerator` over the base and detail volumes.

use super::PhaseOutcome;
use crate::compute::{
    names, BindingSet, BufferBinding, ComputeBackend, DispatchRounding, DispatchSize, Kernel, TextureBinding,
};
use crate::core::{Result, Vec3};
use crate::field::{DensityField, DetailField};
use crate::layer::LayerStack;

#[derive(Clone, Copy, Debug, Default)]
pub struct DensityFieldGenerator {
    rounding: DispatchRounding,
}

impl DensityFieldGenerator {
    pub fn new(rounding: DispatchRounding) -> Self {
        Self { rounding }
    }

    pub fn rounding(&self) -> DispatchRounding {
        self.rounding
    }

    /// Overwrite the density channel of `field` with the layer sum sampled
    /// at `sampling_offset`.
    pub fn generate<B: ComputeBackend + ?Sized>(
        &self,
        backend: &B,
        stack: &LayerStack,
        sampling_offset: Vec3,
        field: &mut DensityField,
    ) -> Result<PhaseOutcome> {
        self.run(backend, stack, sampling_offset, TextureBinding::Density(field))
    }

    /// Same as [`generate`](Self::generate) for the detail volume.
    pub fn generate_detail<B: ComputeBackend + ?Sized>(
        &self,
        backend: &B,
        stack: &LayerStack,
        sampling_offset: Vec3,
        field: &mut DetailField,
    ) -> Result<PhaseOutcome> {
        self.run(backend, stack, sampling_offset, TextureBinding::Detail(field))
    }

    fn run<B: ComputeBackend + ?Sized>(
        &self,
        backend: &B,
        stack: &LayerStack,
        sampling_offset: Vec3,
        target: TextureBinding<'_>,
    ) -> Result<PhaseOutcome> {
        let Some(kernel) = backend.find_kernel(Kernel::NoiseGenerator.name()) else {
            log::warn!(
                "{}: kernel `{}` not found, skipping density generation",
                backend.name(),
                Kernel::NoiseGenerator.name()
            );
            return Ok(PhaseOutcome::Skipped { kernel: Kernel::NoiseGenerator.name() });
        };

        let dims = target.dims();
        let packed = stack.to_gpu_layers(sampling_offset);

        let mut bindings = BindingSet::new();
        bindings
            .set_texture(names::VOLUME_TEX, target)
            .set_buffer(names::NOISE_LAYERS, BufferBinding::noise_layers(&packed))
            .set_int(names::LAYER_COUNT, stack.len() as i32)
            .set_ints(names::TEX_SIZE, dims.to_ints());

        let stats = backend.dispatch(kernel, bindings, DispatchSize::for_dims(dims, self.rounding))?;
        Ok(PhaseOutcome::Completed(stats))
    }
}
