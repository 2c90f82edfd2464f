//! Cloud generation configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::light::LightParams;
use super::state::UpdateMode;
use crate::compute::DispatchRounding;
use crate::core::{Error, Result, Vec3};
use crate::field::{GridDims, DEFAULT_DETAIL_SIZE};
use crate::layer::{LayerStack, NoiseLayer, NoiseType, MAX_LAYERS};
use crate::math::Aabb;

/// One noise layer as written in a config file. The selector stays a raw
/// integer here so unknown values surface as configuration errors.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LayerConfig {
    pub offset: [f32; 3],
    pub scale: f32,
    pub opacity: f32,
    pub noise_type: u32,
}

impl LayerConfig {
    pub fn new(offset: [f32; 3], scale: f32, opacity: f32, noise_type: NoiseType) -> Self {
        Self { offset, scale, opacity, noise_type: noise_type.index() }
    }

    pub fn to_layer(&self) -> Result<NoiseLayer> {
        Ok(NoiseLayer::new(
            Vec3::from_array(self.offset),
            self.scale,
            self.opacity,
            NoiseType::try_from(self.noise_type)?,
        ))
    }
}

/// Optional fine-resolution detail volume
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetailConfig {
    /// Cells per axis (cubic)
    pub size: u32,
    pub layers: Vec<LayerConfig>,
}

impl Default for DetailConfig {
    fn default() -> Self {
        Self {
            size: DEFAULT_DETAIL_SIZE,
            layers: vec![
                LayerConfig::new([0.0; 3], 8.0, 0.6, NoiseType::Perlin),
                LayerConfig::new([3.1, 0.0, 1.7], 16.0, 0.4, NoiseType::Value),
            ],
        }
    }
}

/// Full configuration of the cloud pipeline.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CloudConfig {
    /// Seed for every noise function.
    pub seed: u32,
    /// Extent of the drawn volume (consumer `_BoundMin`/`_BoundMax`).
    pub cloud_size: [f32; 3],
    /// Extent the density texture is fitted to; sets the grid aspect.
    pub texture_fit_size: [f32; 3],
    /// Resolution along the longest fit axis.
    pub tex_size: u32,
    /// Base density layers, at most 20.
    pub layers: Vec<LayerConfig>,
    /// Detail volume, disabled when absent.
    pub detail: Option<DetailConfig>,
    pub update_mode: UpdateMode,

    // -- Animation ---------------------------------------------------------

    pub animate: bool,
    /// Units per second added to the sampling offset.
    pub animation_speed: [f32; 3],
    /// Initial sampling offset.
    pub texture_offset: [f32; 3],

    // -- Lighting ----------------------------------------------------------

    /// Direction the light travels (not the direction toward the light).
    pub light_direction: [f32; 3],
    pub light_march_step_size: f32,
    /// Floor of the light channel, in `[0, 1]`.
    pub light_base_intensity: f32,
    pub light_absorption_coefficient: f32,
    pub min_density: f32,
    pub max_density: f32,

    // -- Consumer shading --------------------------------------------------

    pub step_size: f32,
    pub opacity: f32,
    pub opacity_threshold: f32,
    pub exposure: f32,

    pub dispatch_rounding: DispatchRounding,
    /// Dither texture seed; drawn at startup when absent.
    pub dither_seed: Option<u64>,
}

impl Default for CloudConfig {
    fn default() -> Self {
        Self {
            seed: 12345,
            cloud_size: [100.0, 50.0, 100.0],
            texture_fit_size: [100.0, 50.0, 100.0],
            tex_size: 256,
            layers: vec![
                LayerConfig::new([0.0; 3], 0.02, 0.8, NoiseType::Fbm),
                LayerConfig::new([17.0, 0.0, -4.0], 0.05, 0.3, NoiseType::Perlin),
                LayerConfig::new([0.0, 9.0, 0.0], 0.12, -0.2, NoiseType::Value),
            ],
            detail: None,
            update_mode: UpdateMode::Continuous,
            animate: false,
            animation_speed: [1.0, 0.0, 0.5],
            texture_offset: [0.0; 3],
            light_direction: [0.0, -1.0, 0.0],
            light_march_step_size: 2.0,
            light_base_intensity: 0.2,
            light_absorption_coefficient: 0.01,
            min_density: 0.0,
            max_density: 1.0,
            step_size: 1.0,
            opacity: 1.0,
            opacity_threshold: 1.0,
            exposure: 2.0,
            dispatch_rounding: DispatchRounding::Legacy,
            dither_seed: None,
        }
    }
}

impl CloudConfig {
    /// Load and validate a JSON config
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&json)?;
        config.validate()?;
        Ok(config)
    }

    /// Save as pretty-printed JSON
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Check every parameter the pipeline depends on
    pub fn validate(&self) -> Result<()> {
        self.grid_dims()?;

        let cloud = Vec3::from_array(self.cloud_size);
        if !cloud.is_finite() || cloud.min_element() <= 0.0 {
            return Err(Error::config(format!("cloud size must be positive, got {:?}", self.cloud_size)));
        }
        if self.layers.len() > MAX_LAYERS {
            return Err(Error::CapacityExceeded { capacity: MAX_LAYERS });
        }
        self.base_stack()?;
        if let Some(detail) = &self.detail {
            if detail.size == 0 {
                return Err(Error::config("detail size must be non-zero"));
            }
            self.detail_stack()?;
        }

        unit_range("min_density", self.min_density)?;
        unit_range("max_density", self.max_density)?;
        if self.min_density > self.max_density {
            return Err(Error::config(format!(
                "min_density {} exceeds max_density {}",
                self.min_density, self.max_density
            )));
        }
        unit_range("opacity", self.opacity)?;
        unit_range("opacity_threshold", self.opacity_threshold)?;
        unit_range("light_base_intensity", self.light_base_intensity)?;
        positive("step_size", self.step_size)?;
        positive("light_march_step_size", self.light_march_step_size)?;
        if !(self.light_absorption_coefficient.is_finite() && self.light_absorption_coefficient >= 0.0) {
            return Err(Error::config("light_absorption_coefficient must be non-negative"));
        }
        if Vec3::from_array(self.light_direction).length_squared() == 0.0 {
            return Err(Error::config("light_direction must be non-zero"));
        }
        Ok(())
    }

    /// Base density grid resolution
    pub fn grid_dims(&self) -> Result<GridDims> {
        GridDims::from_fit_size(Vec3::from_array(self.texture_fit_size), self.tex_size)
    }

    /// World region the density grid covers
    pub fn fit_bounds(&self) -> Aabb {
        Aabb::centered(Vec3::from_array(self.texture_fit_size))
    }

    /// World region of the drawn volume
    pub fn cloud_bounds(&self) -> Aabb {
        Aabb::centered(Vec3::from_array(self.cloud_size))
    }

    pub fn base_stack(&self) -> Result<LayerStack> {
        build_stack(&self.layers)
    }

    pub fn detail_stack(&self) -> Result<Option<LayerStack>> {
        self.detail.as_ref().map(|d| build_stack(&d.layers)).transpose()
    }

    pub fn detail_size(&self) -> Option<u32> {
        self.detail.as_ref().map(|d| d.size)
    }

    pub fn light_params(&self) -> LightParams {
        LightParams {
            direction: Vec3::from_array(self.light_direction),
            march_step_size: self.light_march_step_size,
            base_intensity: self.light_base_intensity,
            absorption_coefficient: self.light_absorption_coefficient,
            min_density: self.min_density,
            max_density: self.max_density,
            opacity: self.opacity,
        }
    }
}

fn build_stack(layers: &[LayerConfig]) -> Result<LayerStack> {
    let layers = layers.iter().map(LayerConfig::to_layer).collect::<Result<Vec<_>>>()?;
    LayerStack::from_layers(layers)
}

fn unit_range(name: &str, value: f32) -> Result<()> {
    if !(0.0..=1.0).contains(&value) {
        return Err(Error::config(format!("{} must be in [0, 1], got {}", name, value)));
    }
    Ok(())
}

fn positive(name: &str, value: f32) -> Result<()> {
    if !(value.is_finite() && value > 0.0) {
        return Err(Error::config(format!("{} must be positive, got {}", name, value)));
    }
    Ok(())
}
