//! Parameter block handed to the volume ray-march consumer.

use bytemuck::{Pod, Zeroable};

use crate::core::Vec3;
use crate::generation::CloudConfig;

/// Consumer-side parameter names
pub mod names {
    pub const DENSITY_TEX: &str = "_DensityTex";
    pub const DETAIL_TEX: &str = "_DetailTex";
    pub const NOISE_TEX: &str = "_NoiseTex";
    pub const STEP_SIZE: &str = "_StepSize";
    pub const OPACITY: &str = "_Opacity";
    pub const OPACITY_THRESHOLD: &str = "_OpacityThreshold";
    pub const LIGHT_DIR: &str = "_LightDir";
    pub const LIGHT_DIRECTION: &str = "_LightDirection";
    pub const MIN_DENSITY: &str = "_MinDensity";
    pub const MAX_DENSITY: &str = "_MaxDensity";
    pub const BOUND_MIN: &str = "_BoundMin";
    pub const BOUND_MAX: &str = "_BoundMax";
    pub const TEXTURE_FIT_SIZE: &str = "_TextureFitSize";
    pub const TEXTURE_OFFSET: &str = "_TextureOffset";
    pub const LIGHT_MARCH_STEP_SIZE: &str = "_LightMarchStepSize";
    pub const LIGHT_BASE_INTENSITY: &str = "_LightBaseIntensity";
    pub const LIGHT_ABSORPTION_COEFFICIENT: &str = "_LightAbsorptionCoefficient";
    pub const EXPOSURE: &str = "_Exposure";
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum MaterialValue {
    Float(f32),
    Vector(Vec3),
}

/// Everything the consumer needs besides the textures themselves.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MaterialParams {
    pub step_size: f32,
    pub opacity: f32,
    pub opacity_threshold: f32,
    /// Direction the light travels; bound as both `_LightDir` and `_LightDirection`.
    pub light_direction: Vec3,
    pub min_density: f32,
    pub max_density: f32,
    /// Drawn volume, `-cloud_size / 2`
    pub bound_min: Vec3,
    pub bound_max: Vec3,
    pub texture_fit_size: Vec3,
    pub texture_offset: Vec3,
    pub light_march_step_size: f32,
    pub light_base_intensity: f32,
    pub light_absorption_coefficient: f32,
    pub exposure: f32,
    pub detail_enabled: bool,
}

impl MaterialParams {
    pub fn from_config(config: &CloudConfig, texture_offset: Vec3) -> Self {
        let bounds = config.cloud_bounds();
        Self {
            step_size: config.step_size,
            opacity: config.opacity,
            opacity_threshold: config.opacity_threshold,
            light_direction: Vec3::from_array(config.light_direction),
            min_density: config.min_density,
            max_density: config.max_density,
            bound_min: bounds.min,
            bound_max: bounds.max,
            texture_fit_size: Vec3::from_array(config.texture_fit_size),
            texture_offset,
            light_march_step_size: config.light_march_step_size,
            light_base_intensity: config.light_base_intensity,
            light_absorption_coefficient: config.light_absorption_coefficient,
            exposure: config.exposure,
            detail_enabled: config.detail.is_some(),
        }
    }

    /// Texture slots the consumer binds
    pub fn textures(&self) -> Vec<&'static str> {
        let mut slots = vec![names::DENSITY_TEX];
        if self.detail_enabled {
            slots.push(names::DETAIL_TEX);
        }
        slots.push(names::NOISE_TEX);
        slots
    }

    /// Named scalar and vector parameters
    pub fn values(&self) -> Vec<(&'static str, MaterialValue)> {
        use MaterialValue::{Float, Vector};
        vec![
            (names::STEP_SIZE, Float(self.step_size)),
            (names::OPACITY, Float(self.opacity)),
            (names::OPACITY_THRESHOLD, Float(self.opacity_threshold)),
            (names::LIGHT_DIR, Vector(self.light_direction)),
            (names::MIN_DENSITY, Float(self.min_density)),
            (names::MAX_DENSITY, Float(self.max_density)),
            (names::BOUND_MIN, Vector(self.bound_min)),
            (names::BOUND_MAX, Vector(self.bound_max)),
            (names::TEXTURE_FIT_SIZE, Vector(self.texture_fit_size)),
            (names::TEXTURE_OFFSET, Vector(self.texture_offset)),
            (names::LIGHT_DIRECTION, Vector(self.light_direction)),
            (names::LIGHT_MARCH_STEP_SIZE, Float(self.light_march_step_size)),
            (names::LIGHT_BASE_INTENSITY, Float(self.light_base_intensity)),
            (names::LIGHT_ABSORPTION_COEFFICIENT, Float(self.light_absorption_coefficient)),
            (names::EXPOSURE, Float(self.exposure)),
        ]
    }

    pub fn to_uniform(&self) -> MaterialUniform {
        MaterialUniform {
            bound_min: self.bound_min.to_array(),
            step_size: self.step_size,
            bound_max: self.bound_max.to_array(),
            opacity: self.opacity,
            light_direction: self.light_direction.to_array(),
            opacity_threshold: self.opacity_threshold,
            texture_fit_size: self.texture_fit_size.to_array(),
            min_density: self.min_density,
            texture_offset: self.texture_offset.to_array(),
            max_density: self.max_density,
            light_march_step_size: self.light_march_step_size,
            light_base_intensity: self.light_base_intensity,
            light_absorption_coefficient: self.light_absorption_coefficient,
            exposure: self.exposure,
            detail_enabled: self.detail_enabled as u32,
            _pad: [0; 3],
        }
    }
}

/// std140-friendly packing of [`MaterialParams`]
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct MaterialUniform {
    pub bound_min: [f32; 3],
    pub step_size: f32,

    pub bound_max: [f32; 3],
    pub opacity: f32,

    pub light_direction: [f32; 3],
    pub opacity_threshold: f32,

    pub texture_fit_size: [f32; 3],
    pub min_density: f32,

    pub texture_offset: [f32; 3],
    pub max_density: f32,

    // Light march
    pub light_march_step_size: f32,
    pub light_base_intensity: f32,
    pub light_absorption_coefficient: f32,
    pub exposure: f32,

    pub detail_enabled: u32,
    pub _pad: [u32; 3],
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::DetailConfig;

    #[test]
    fn test_uniform_is_16_byte_aligned() {
        assert_eq!(std::mem::size_of::<MaterialUniform>() % 16, 0);
        assert_eq!(std::mem::size_of::<MaterialUniform>(), 112);
    }

    #[test]
    fn test_bounds_follow_cloud_size() {
        let config = CloudConfig {
            cloud_size: [10.0, 4.0, 6.0],
            texture_fit_size: [20.0, 20.0, 20.0],
            ..Default::default()
        };
        let params = MaterialParams::from_config(&config, Vec3::new(1.0, 2.0, 3.0));

        assert_eq!(params.bound_min, Vec3::new(-5.0, -2.0, -3.0));
        assert_eq!(params.bound_max, Vec3::new(5.0, 2.0, 3.0));
        assert_eq!(params.texture_fit_size, Vec3::splat(20.0));
        assert_eq!(params.to_uniform().texture_offset, [1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_every_parameter_named() {
        let params = MaterialParams::from_config(&CloudConfig::default(), Vec3::ZERO);
        let values = params.values();
        assert_eq!(values.len(), 15);

        let find = |name: &str| values.iter().find(|(n, _)| *n == name).map(|(_, v)| *v);
        assert_eq!(find(names::LIGHT_DIR), find(names::LIGHT_DIRECTION));
        assert_eq!(find(names::EXPOSURE), Some(MaterialValue::Float(2.0)));
        assert_eq!(find(names::LIGHT_BASE_INTENSITY), Some(MaterialValue::Float(0.2)));
    }

    #[test]
    fn test_detail_slot_only_when_enabled() {
        let plain = MaterialParams::from_config(&CloudConfig::default(), Vec3::ZERO);
        assert_eq!(plain.textures(), vec![names::DENSITY_TEX, names::NOISE_TEX]);

        let config = CloudConfig { detail: Some(DetailConfig::default()), ..Default::default() };
        let detailed = MaterialParams::from_config(&config, Vec3::ZERO);
        assert_eq!(detailed.textures(), vec![names::DENSITY_TEX, names::DETAIL_TEX, names::NOISE_TEX]);
        assert_eq!(detailed.to_uniform().detail_enabled, 1);
    }
}
