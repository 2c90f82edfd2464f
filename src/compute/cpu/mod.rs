//! Rayon-backed compute backend.

mod light_kernel;
mod noise_kernel;

pub use light_kernel::{transmittance, MarchParams};

use std::time::Instant;

use super::{BindingSet, ComputeBackend, DispatchSize, DispatchStats, Kernel};
use crate::core::{Error, Result};
use crate::layer::NoiseBank;

/// Runs kernels on the CPU, one rayon task per 4x4x4 block.
#[derive(Debug)]
pub struct CpuBackend {
    noise: NoiseBank,
    kernels: Vec<Kernel>,
}

impl CpuBackend {
    /// Backend exposing every kernel, with noise seeded by `seed`
    pub fn new(seed: u32) -> Self {
        Self::with_kernels(seed, &Kernel::ALL)
    }

    /// Backend exposing only `kernels`; the rest fail to resolve
    pub fn with_kernels(seed: u32, kernels: &[Kernel]) -> Self {
        Self {
            noise: NoiseBank::new(seed),
            kernels: kernels.to_vec(),
        }
    }

    pub fn noise(&self) -> &NoiseBank {
        &self.noise
    }
}

impl ComputeBackend for CpuBackend {
    fn name(&self) -> &'static str {
        "cpu"
    }

    fn find_kernel(&self, name: &str) -> Option<Kernel> {
        Kernel::from_name(name).filter(|k| self.kernels.contains(k))
    }

    fn dispatch(
        &self,
        kernel: Kernel,
        mut bindings: BindingSet<'_>,
        groups: DispatchSize,
    ) -> Result<DispatchStats> {
        if !self.kernels.contains(&kernel) {
            return Err(Error::config(format!("kernel `{}` is not available", kernel.name())));
        }

        let start = Instant::now();
        let stats = match kernel {
            Kernel::NoiseGenerator => noise_kernel::run(&self.noise, &mut bindings, groups)?,
            Kernel::LightMarch => light_kernel::march(&mut bindings, groups)?,
            Kernel::CopyLightIntensity => light_kernel::copy(&mut bindings, groups)?,
        };

        log::debug!(
            "{}: {}x{}x{} blocks, {} cells ({} skipped) in {:.2}ms",
            kernel.name(),
            groups.x,
            groups.y,
            groups.z,
            stats.cells_written,
            stats.cells_skipped,
            start.elapsed().as_secs_f64() * 1000.0
        );

        Ok(stats)
    }
}
