//! Noise layer descriptors and the fixed-capacity layer stack.
//!
//! A [`LayerStack`] is the ordered set of weighted noise descriptors that the
//! density generator composites into one scalar field. Opacity is clamped on
//! insertion so stored layers are always valid.

pub mod gpu;
pub mod sampler;

pub use gpu::{GpuNoiseLayer, LayerSchema};
pub use sampler::NoiseBank;

use bytemuck::Zeroable;
use serde::{Deserialize, Serialize};

use crate::core::{Error, Result, Vec3};

/// Maximum number of layers a stack (and the packed layer buffer) can hold.
pub const MAX_LAYERS: usize = 20;

/// Closed set of noise functions a layer can sample.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoiseType {
    #[default]
    Value,
    Simplex,
    Perlin,
    /// Fractal Brownian motion over Perlin
    Fbm,
}

impl NoiseType {
    pub const ALL: [NoiseType; 4] = [Self::Value, Self::Simplex, Self::Perlin, Self::Fbm];

    /// Integer selector used in packed layer buffers
    pub fn index(self) -> u32 {
        match self {
            Self::Value => 0,
            Self::Simplex => 1,
            Self::Perlin => 2,
            Self::Fbm => 3,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Value => "value",
            Self::Simplex => "simplex",
            Self::Perlin => "perlin",
            Self::Fbm => "fbm",
        }
    }
}

impl TryFrom<u32> for NoiseType {
    type Error = Error;

    fn try_from(index: u32) -> Result<Self> {
        Self::ALL
            .get(index as usize)
            .copied()
            .ok_or_else(|| Error::config(format!("unknown noise type selector {}", index)))
    }
}

/// One weighted noise layer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NoiseLayer {
    pub offset: Vec3,
    pub scale: f32,
    /// Signed weight in `[-1, 1]`
    pub opacity: f32,
    pub noise_type: NoiseType,
}

impl NoiseLayer {
    /// Create a layer, clamping opacity to `[-1, 1]`.
    pub fn new(offset: Vec3, scale: f32, opacity: f32, noise_type: NoiseType) -> Self {
        Self {
            offset,
            scale,
            opacity: clamp_opacity(opacity),
            noise_type,
        }
    }
}

impl Default for NoiseLayer {
    fn default() -> Self {
        Self::new(Vec3::ZERO, 1.0, 1.0, NoiseType::Value)
    }
}

fn clamp_opacity(opacity: f32) -> f32 {
    if opacity.is_nan() {
        0.0
    } else {
        opacity.clamp(-1.0, 1.0)
    }
}

/// Ordered, fixed-capacity collection of noise layers.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LayerStack {
    layers: Vec<NoiseLayer>,
}

impl LayerStack {
    /// Create an empty stack
    pub fn new() -> Self {
        Self { layers: Vec::with_capacity(MAX_LAYERS) }
    }

    /// Build a stack from a sequence of layers, failing if it exceeds capacity.
    pub fn from_layers(layers: impl IntoIterator<Item = NoiseLayer>) -> Result<Self> {
        let mut stack = Self::new();
        for layer in layers {
            stack.add_layer(layer)?;
        }
        Ok(stack)
    }

    /// Append a layer. Opacity is re-clamped so a hand-built layer can't
    /// smuggle an out-of-range weight into the stack.
    pub fn add_layer(&mut self, layer: NoiseLayer) -> Result<()> {
        if self.layers.len() >= MAX_LAYERS {
            return Err(Error::CapacityExceeded { capacity: MAX_LAYERS });
        }
        self.layers.push(NoiseLayer {
            opacity: clamp_opacity(layer.opacity),
            ..layer
        });
        Ok(())
    }

    /// Layers in insertion order
    pub fn layers(&self) -> &[NoiseLayer] {
        &self.layers
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn clear(&mut self) {
        self.layers.clear();
    }

    /// Pack into a full-capacity GPU layer buffer with `sampling_offset`
    /// added to every layer's offset. Unused slots are zeroed.
    pub fn to_gpu_layers(&self, sampling_offset: Vec3) -> [GpuNoiseLayer; MAX_LAYERS] {
        let mut packed = [GpuNoiseLayer::zeroed(); MAX_LAYERS];
        for (slot, layer) in packed.iter_mut().zip(&self.layers) {
            *slot = GpuNoiseLayer::from_layer(&NoiseLayer {
                offset: layer.offset + sampling_offset,
                ..*layer
            });
        }
        packed
    }
}
