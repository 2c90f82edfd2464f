//! Compute backend abstraction.
//!
//! Generators talk to a [`ComputeBackend`] through named kernels and named
//! bindings, mirroring the entry points and parameter names the external
//! shading programs expect:
//!
//! | Kernel               | Bindings                                                   |
//! |----------------------|------------------------------------------------------------|
//! | `NoiseGenerator`     | `VolumeTex`, `noiseLayers`, `layerCount`, `texSize`        |
//! | `LightMarch`         | `CloudData`, `CopyTex`, `_BoundMin`, `_BoundMax`, ...      |
//! | `CopyLightIntensity` | `_CloudData`, `_CopyTex`, `_TexSize`                       |
//!
//! Each dispatch is a barrier: every cell of it is computed before any result
//! becomes visible to a later dispatch.

pub mod bindings;
pub mod cpu;
pub mod dispatch;

pub use bindings::{names, BindingSet, BufferBinding, ScalarValue, TextureBinding};
pub use cpu::CpuBackend;
pub use dispatch::{DispatchRounding, DispatchSize, DispatchStats, BLOCK_SIZE};

use crate::core::Result;

/// Compute entry points known to the pipeline
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Kernel {
    NoiseGenerator,
    LightMarch,
    CopyLightIntensity,
}

impl Kernel {
    pub const ALL: [Kernel; 3] = [Self::NoiseGenerator, Self::LightMarch, Self::CopyLightIntensity];

    /// Entry point name as exposed by the shading programs
    pub fn name(self) -> &'static str {
        match self {
            Self::NoiseGenerator => "NoiseGenerator",
            Self::LightMarch => "LightMarch",
            Self::CopyLightIntensity => "CopyLightIntensity",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.name() == name)
    }
}

/// Capability set a field generator needs from an execution backend:
/// resolve kernels by name and dispatch them with named bindings.
pub trait ComputeBackend: Send + Sync {
    /// Short backend identifier for logs
    fn name(&self) -> &'static str;

    /// Resolve a kernel entry point. `None` means the backend can't run it.
    fn find_kernel(&self, name: &str) -> Option<Kernel>;

    /// Run `kernel` over `groups` blocks. Returns once every cell is written.
    fn dispatch(
        &self,
        kernel: Kernel,
        bindings: BindingSet<'_>,
        groups: DispatchSize,
    ) -> Result<DispatchStats>;
}
