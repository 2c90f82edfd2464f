//! Named resource bindings for kernel dispatches.

use std::collections::HashMap;

use crate::core::{Error, Result, Vec3};
use crate::field::{DensityField, DetailField, GridDims, ScratchBuffer};
use crate::layer::{GpuNoiseLayer, LayerSchema};

/// Binding names shared with the external shading programs
pub mod names {
    // NoiseGenerator
    pub const VOLUME_TEX: &str = "VolumeTex";
    pub const NOISE_LAYERS: &str = "noiseLayers";
    pub const LAYER_COUNT: &str = "layerCount";
    pub const TEX_SIZE: &str = "texSize";

    // LightMarch
    pub const CLOUD_DATA: &str = "CloudData";
    pub const COPY_TEX: &str = "CopyTex";
    pub const BOUND_MIN: &str = "_BoundMin";
    pub const BOUND_MAX: &str = "_BoundMax";
    pub const LIGHT_TEX_SIZE: &str = "_TexSize";
    pub const LIGHT_DIRECTION: &str = "_LightDirection";
    pub const LIGHT_MARCH_STEP_SIZE: &str = "_LightMarchStepSize";
    pub const LIGHT_BASE_INTENSITY: &str = "_LightBaseIntensity";
    pub const LIGHT_ABSORPTION_COEFFICIENT: &str = "_LightAbsorptionCoefficient";
    pub const MIN_DENSITY: &str = "_MinDensity";
    pub const MAX_DENSITY: &str = "_MaxDensity";
    pub const OPACITY: &str = "_Opacity";

    // CopyLightIntensity
    pub const COPY_CLOUD_DATA: &str = "_CloudData";
    pub const COPY_SOURCE: &str = "_CopyTex";
}

/// A texture bound to a kernel slot. Write access is a unique borrow, so a
/// field can't be bound for writing while anything else reads it.
#[derive(Debug)]
pub enum TextureBinding<'a> {
    Density(&'a mut DensityField),
    DensityRead(&'a DensityField),
    Detail(&'a mut DetailField),
    Scratch(&'a mut ScratchBuffer),
    ScratchRead(&'a ScratchBuffer),
}

impl<'a> TextureBinding<'a> {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Density(_) => "density (rw)",
            Self::DensityRead(_) => "density (read)",
            Self::Detail(_) => "detail (rw)",
            Self::Scratch(_) => "scratch (rw)",
            Self::ScratchRead(_) => "scratch (read)",
        }
    }

    pub fn dims(&self) -> GridDims {
        match self {
            Self::Density(f) => f.dims(),
            Self::DensityRead(f) => f.dims(),
            Self::Detail(f) => f.dims(),
            Self::Scratch(s) => s.dims(),
            Self::ScratchRead(s) => s.dims(),
        }
    }

    /// Read view of a density binding
    pub fn into_density_ref(self) -> Option<&'a DensityField> {
        match self {
            Self::Density(f) => Some(&*f),
            Self::DensityRead(f) => Some(f),
            _ => None,
        }
    }

    /// Read view of a scratch binding
    pub fn into_scratch_ref(self) -> Option<&'a ScratchBuffer> {
        match self {
            Self::Scratch(s) => Some(&*s),
            Self::ScratchRead(s) => Some(s),
            _ => None,
        }
    }
}

/// A buffer bound to a kernel slot
#[derive(Clone, Copy, Debug)]
pub enum BufferBinding<'a> {
    /// Raw layer words; the stride comes from `schema`.
    NoiseLayers { words: &'a [u32], schema: LayerSchema },
}

impl<'a> BufferBinding<'a> {
    /// Bind packed v2 layers as raw words
    pub fn noise_layers(layers: &'a [GpuNoiseLayer]) -> Self {
        Self::NoiseLayers {
            words: bytemuck::cast_slice(layers),
            schema: LayerSchema::V2,
        }
    }
}

/// Scalar or vector uniform value
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ScalarValue {
    Int(i32),
    Ints([i32; 3]),
    Float(f32),
    Vector(Vec3),
}

/// Named textures, buffers and uniforms for one dispatch
#[derive(Debug, Default)]
pub struct BindingSet<'a> {
    textures: HashMap<&'static str, TextureBinding<'a>>,
    buffers: HashMap<&'static str, BufferBinding<'a>>,
    scalars: HashMap<&'static str, ScalarValue>,
}

impl<'a> BindingSet<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_texture(&mut self, name: &'static str, texture: TextureBinding<'a>) -> &mut Self {
        self.textures.insert(name, texture);
        self
    }

    pub fn set_buffer(&mut self, name: &'static str, buffer: BufferBinding<'a>) -> &mut Self {
        self.buffers.insert(name, buffer);
        self
    }

    pub fn set_int(&mut self, name: &'static str, value: i32) -> &mut Self {
        self.scalars.insert(name, ScalarValue::Int(value));
        self
    }

    pub fn set_ints(&mut self, name: &'static str, value: [i32; 3]) -> &mut Self {
        self.scalars.insert(name, ScalarValue::Ints(value));
        self
    }

    pub fn set_float(&mut self, name: &'static str, value: f32) -> &mut Self {
        self.scalars.insert(name, ScalarValue::Float(value));
        self
    }

    pub fn set_vector(&mut self, name: &'static str, value: Vec3) -> &mut Self {
        self.scalars.insert(name, ScalarValue::Vector(value));
        self
    }

    /// Remove a texture binding so the kernel can hold its borrow
    pub fn take_texture(&mut self, name: &str) -> Result<TextureBinding<'a>> {
        self.textures.remove(name).ok_or_else(|| unbound("texture", name))
    }

    /// Decode the layer buffer bound at `name`
    pub fn noise_layers(&self, name: &str) -> Result<Vec<GpuNoiseLayer>> {
        match self.buffers.get(name) {
            Some(BufferBinding::NoiseLayers { words, schema }) => GpuNoiseLayer::unpack(words, *schema),
            None => Err(unbound("buffer", name)),
        }
    }

    pub fn scalar(&self, name: &str) -> Result<ScalarValue> {
        self.scalars.get(name).copied().ok_or_else(|| unbound("scalar", name))
    }

    pub fn int(&self, name: &str) -> Result<i32> {
        match self.scalar(name)? {
            ScalarValue::Int(v) => Ok(v),
            other => Err(mismatch(name, "int", other)),
        }
    }

    pub fn ints(&self, name: &str) -> Result<[i32; 3]> {
        match self.scalar(name)? {
            ScalarValue::Ints(v) => Ok(v),
            other => Err(mismatch(name, "int[3]", other)),
        }
    }

    pub fn float(&self, name: &str) -> Result<f32> {
        match self.scalar(name)? {
            ScalarValue::Float(v) => Ok(v),
            other => Err(mismatch(name, "float", other)),
        }
    }

    pub fn vector(&self, name: &str) -> Result<Vec3> {
        match self.scalar(name)? {
            ScalarValue::Vector(v) => Ok(v),
            other => Err(mismatch(name, "vector", other)),
        }
    }
}

fn unbound(kind: &str, name: &str) -> Error {
    Error::config(format!("{} binding `{}` is not bound", kind, name))
}

fn mismatch(name: &str, expected: &str, found: ScalarValue) -> Error {
    Error::config(format!("binding `{}` expected {}, found {:?}", name, expected, found))
}

/// Reject a bound texture whose size disagrees with the dispatch's size uniform
pub fn ensure_dims(binding: &str, actual: GridDims, expected: GridDims) -> Result<()> {
    if actual != expected {
        return Err(Error::config(format!(
            "texture `{}` is {} but the kernel was told {}",
            binding, actual, expected
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Aabb;

    #[test]
    fn test_scalars() {
        let mut b = BindingSet::new();
        b.set_int(names::LAYER_COUNT, 3)
            .set_ints(names::TEX_SIZE, [4, 5, 6])
            .set_float(names::OPACITY, 0.5)
            .set_vector(names::BOUND_MIN, Vec3::NEG_ONE);

        assert_eq!(b.int(names::LAYER_COUNT).unwrap(), 3);
        assert_eq!(b.ints(names::TEX_SIZE).unwrap(), [4, 5, 6]);
        assert_eq!(b.float(names::OPACITY).unwrap(), 0.5);
        assert_eq!(b.vector(names::BOUND_MIN).unwrap(), Vec3::NEG_ONE);
    }

    #[test]
    fn test_missing_and_mistyped() {
        let mut b = BindingSet::new();
        b.set_float(names::LAYER_COUNT, 1.0);
        assert!(matches!(b.int(names::LAYER_COUNT), Err(Error::Configuration(_))));
        assert!(matches!(b.float(names::OPACITY), Err(Error::Configuration(_))));
        assert!(b.take_texture(names::VOLUME_TEX).is_err());
        assert!(b.noise_layers(names::NOISE_LAYERS).is_err());
    }

    #[test]
    fn test_take_texture_removes_binding() {
        let mut field = DensityField::new(GridDims::cubic(2).unwrap(), Aabb::centered(Vec3::ONE));
        let mut b = BindingSet::new();
        b.set_texture(names::CLOUD_DATA, TextureBinding::Density(&mut field));

        let tex = b.take_texture(names::CLOUD_DATA).unwrap();
        assert_eq!(tex.kind(), "density (rw)");
        assert_eq!(tex.dims(), GridDims::cubic(2).unwrap());
        assert!(tex.into_density_ref().is_some());
        assert!(b.take_texture(names::CLOUD_DATA).is_err());
    }

    #[test]
    fn test_ensure_dims() {
        let a = GridDims::cubic(4).unwrap();
        let b = GridDims::new(4, 4, 5).unwrap();
        assert!(ensure_dims("x", a, a).is_ok());
        assert!(ensure_dims("x", a, b).is_err());
    }
}
