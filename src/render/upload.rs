//! Field to texture upload.
//!
//! Density goes up as `Rg32Float` 3D (density, light), detail as `R8Unorm`
//! 3D and the dither as a 32x32 `R8Unorm` 2D texture.

use crate::core::{Error, Result};
use crate::field::{DensityField, DetailField, DitherTexture, FieldSet, GridDims, DITHER_SIZE};

use super::material::{MaterialParams, MaterialUniform};

pub const DENSITY_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rg32Float;
pub const DETAIL_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::R8Unorm;
pub const DITHER_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::R8Unorm;

const DENSITY_TEXEL_BYTES: u32 = 8;

pub fn extent(dims: GridDims) -> wgpu::Extent3d {
    wgpu::Extent3d {
        width: dims.x,
        height: dims.y,
        depth_or_array_layers: dims.z,
    }
}

/// Raw RG32 bytes of the density field, x-fastest
pub fn density_bytes(field: &DensityField) -> &[u8] {
    bytemuck::cast_slice(field.cells())
}

/// GPU copies of the published fields plus the material uniform.
pub struct FieldTextures {
    pub density: wgpu::Texture,
    pub detail: Option<wgpu::Texture>,
    pub dither: wgpu::Texture,
    pub material: wgpu::Buffer,
    dims: GridDims,
    detail_dims: Option<GridDims>,
}

impl FieldTextures {
    pub fn new(device: &wgpu::Device, dims: GridDims, detail_dims: Option<GridDims>) -> Self {
        let density = create_texture(device, "cloud_density", extent(dims), wgpu::TextureDimension::D3, DENSITY_FORMAT);
        let detail = detail_dims.map(|d| {
            create_texture(device, "cloud_detail", extent(d), wgpu::TextureDimension::D3, DETAIL_FORMAT)
        });
        let dither = create_texture(
            device,
            "cloud_dither",
            wgpu::Extent3d { width: DITHER_SIZE, height: DITHER_SIZE, depth_or_array_layers: 1 },
            wgpu::TextureDimension::D2,
            DITHER_FORMAT,
        );
        let material = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("cloud_material"),
            size: std::mem::size_of::<MaterialUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Self { density, detail, dither, material, dims, detail_dims }
    }

    /// Textures sized for `fields`
    pub fn for_fields(device: &wgpu::Device, fields: &FieldSet) -> Self {
        Self::new(device, fields.density.dims(), fields.detail.as_ref().map(DetailField::dims))
    }

    pub fn matches(&self, fields: &FieldSet) -> bool {
        fields.density.dims() == self.dims && fields.detail.as_ref().map(DetailField::dims) == self.detail_dims
    }

    /// Copy a published field set into the textures.
    pub fn upload(&self, queue: &wgpu::Queue, fields: &FieldSet) -> Result<()> {
        if !self.matches(fields) {
            return Err(Error::Gpu(format!(
                "field set {} does not match textures of {}",
                fields.density.dims(),
                self.dims
            )));
        }

        write_texture(queue, &self.density, density_bytes(&fields.density), DENSITY_TEXEL_BYTES, extent(self.dims));
        if let (Some(texture), Some(detail)) = (&self.detail, &fields.detail) {
            write_texture(queue, texture, detail.texels(), 1, extent(detail.dims()));
        }
        Ok(())
    }

    pub fn upload_dither(&self, queue: &wgpu::Queue, dither: &DitherTexture) {
        let size = wgpu::Extent3d { width: DITHER_SIZE, height: DITHER_SIZE, depth_or_array_layers: 1 };
        write_texture(queue, &self.dither, dither.texels(), 1, size);
    }

    pub fn upload_material(&self, queue: &wgpu::Queue, params: &MaterialParams) {
        queue.write_buffer(&self.material, 0, bytemuck::bytes_of(&params.to_uniform()));
    }
}

fn create_texture(
    device: &wgpu::Device,
    label: &str,
    size: wgpu::Extent3d,
    dimension: wgpu::TextureDimension,
    format: wgpu::TextureFormat,
) -> wgpu::Texture {
    device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size,
        mip_level_count: 1,
        sample_count: 1,
        dimension,
        format,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    })
}

fn write_texture(queue: &wgpu::Queue, texture: &wgpu::Texture, bytes: &[u8], texel_bytes: u32, size: wgpu::Extent3d) {
    queue.write_texture(
        wgpu::TexelCopyTextureInfo {
            texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        bytes,
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(texel_bytes * size.width),
            rows_per_image: Some(size.height),
        },
        size,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Vec3;
    use crate::math::Aabb;

    #[test]
    fn test_density_bytes_layout() {
        let dims = GridDims::new(4, 2, 3).unwrap();
        let mut field = DensityField::new(dims, Aabb::centered(Vec3::ONE));
        field.fill_density(1.0);

        let bytes = density_bytes(&field);
        assert_eq!(bytes.len(), 4 * 2 * 3 * DENSITY_TEXEL_BYTES as usize);
        // density first, light second
        assert_eq!(&bytes[0..4], &1.0f32.to_ne_bytes());
        assert_eq!(&bytes[4..8], &0.0f32.to_ne_bytes());
    }

    #[test]
    fn test_extent_matches_dims() {
        let e = extent(GridDims::new(256, 128, 64).unwrap());
        assert_eq!((e.width, e.height, e.depth_or_array_layers), (256, 128, 64));
    }

    #[test]
    fn test_texel_sizes() {
        assert_eq!(DENSITY_FORMAT.block_copy_size(None), Some(DENSITY_TEXEL_BYTES));
        assert_eq!(DETAIL_FORMAT.block_copy_size(None), Some(1));
    }
}
