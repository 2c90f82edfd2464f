//! Deterministic noise sampling backed by the `noise` crate.

use noise::{Fbm, MultiFractal, NoiseFn, Perlin, Simplex, Value};

use super::{NoiseLayer, NoiseType};
use crate::core::Vec3;

/// Octaves used by [`NoiseType::Fbm`]
const FBM_OCTAVES: usize = 4;

/// One seeded instance of every noise function a layer can select.
///
/// Each function is a pure function of its coordinate, so sampling the same
/// point twice always yields the same bits.
pub struct NoiseBank {
    seed: u32,
    value: Value,
    simplex: Simplex,
    perlin: Perlin,
    fbm: Fbm<Perlin>,
}

impl NoiseBank {
    pub fn new(seed: u32) -> Self {
        Self {
            seed,
            value: Value::new(seed),
            simplex: Simplex::new(seed),
            perlin: Perlin::new(seed),
            fbm: Fbm::<Perlin>::new(seed)
                .set_octaves(FBM_OCTAVES)
                .set_persistence(0.5)
                .set_lacunarity(2.0),
        }
    }

    pub fn seed(&self) -> u32 {
        self.seed
    }

    /// Sample a single noise function at `p`
    pub fn sample(&self, noise_type: NoiseType, p: Vec3) -> f32 {
        let point = [p.x as f64, p.y as f64, p.z as f64];
        let v = match noise_type {
            NoiseType::Value => self.value.get(point),
            NoiseType::Simplex => self.simplex.get(point),
            NoiseType::Perlin => self.perlin.get(point),
            NoiseType::Fbm => self.fbm.get(point),
        };
        v as f32
    }

    /// Weighted sum of all layers at `p`
    pub fn accumulate(&self, layers: &[NoiseLayer], p: Vec3) -> f32 {
        layers
            .iter()
            .map(|layer| layer.opacity * self.sample(layer.noise_type, p * layer.scale + layer.offset))
            .sum()
    }
}

impl std::fmt::Debug for NoiseBank {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NoiseBank").field("seed", &self.seed).finish()
    }
}
