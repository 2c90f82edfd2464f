//! Packed layer buffer layout shared with the compute kernels.

use bytemuck::{Pod, Zeroable};

use super::{NoiseLayer, NoiseType, MAX_LAYERS};
use crate::core::{Error, Result, Vec3};

/// Packed layer entry as laid out in the `noiseLayers` buffer
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct GpuNoiseLayer {
    pub offset: [f32; 3],
    pub scale: f32,
    pub opacity: f32,
    pub noise_type: u32,
}

/// Layer buffer schema versions
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LayerSchema {
    /// offset, scale, opacity; every layer samples value noise
    V1,
    /// offset, scale, opacity, noise type selector
    V2,
}

impl LayerSchema {
    /// Stride in 32-bit words
    pub fn stride(self) -> usize {
        match self {
            Self::V1 => 5,
            Self::V2 => 6,
        }
    }
}

impl GpuNoiseLayer {
    pub fn from_layer(layer: &NoiseLayer) -> Self {
        Self {
            offset: layer.offset.to_array(),
            scale: layer.scale,
            opacity: layer.opacity,
            noise_type: layer.noise_type.index(),
        }
    }

    /// Decode back into a layer, rejecting unknown noise selectors.
    pub fn to_layer(&self) -> Result<NoiseLayer> {
        Ok(NoiseLayer::new(
            Vec3::from_array(self.offset),
            self.scale,
            self.opacity,
            NoiseType::try_from(self.noise_type)?,
        ))
    }

    /// Decode a raw word buffer written with the given schema.
    pub fn unpack(words: &[u32], schema: LayerSchema) -> Result<Vec<GpuNoiseLayer>> {
        let stride = schema.stride();
        if words.len() % stride != 0 {
            return Err(Error::config(format!(
                "layer buffer length {} is not a multiple of stride {}",
                words.len(),
                stride
            )));
        }
        if words.len() / stride > MAX_LAYERS {
            return Err(Error::CapacityExceeded { capacity: MAX_LAYERS });
        }

        Ok(words
            .chunks_exact(stride)
            .map(|w| GpuNoiseLayer {
                offset: [f32::from_bits(w[0]), f32::from_bits(w[1]), f32::from_bits(w[2])],
                scale: f32::from_bits(w[3]),
                opacity: f32::from_bits(w[4]),
                noise_type: match schema {
                    LayerSchema::V1 => NoiseType::Value.index(),
                    LayerSchema::V2 => w[5],
                },
            })
            .collect())
    }
}
