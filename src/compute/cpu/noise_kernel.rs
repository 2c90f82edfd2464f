//! `NoiseGenerator`: weighted layer sum per cell.

use crate::compute::bindings::{ensure_dims, names, BindingSet, TextureBinding};
use crate::compute::dispatch::{ensure_covered, run_blocks, DispatchSize, DispatchStats};
use crate::core::{Error, Result};
use crate::field::{GridDims, DENSITY_CHANNEL};
use crate::layer::{GpuNoiseLayer, NoiseBank, NoiseLayer};

pub(super) fn run(noise: &NoiseBank, bindings: &mut BindingSet<'_>, groups: DispatchSize) -> Result<DispatchStats> {
    let dims = GridDims::from_ints(bindings.ints(names::TEX_SIZE)?)?;
    let packed = bindings.noise_layers(names::NOISE_LAYERS)?;
    let layer_count = bindings.int(names::LAYER_COUNT)?;

    let count = usize::try_from(layer_count)
        .ok()
        .filter(|&n| n <= packed.len())
        .ok_or_else(|| {
            Error::config(format!(
                "layerCount {} does not fit the bound layer buffer of {}",
                layer_count,
                packed.len()
            ))
        })?;
    let layers = packed[..count]
        .iter()
        .map(GpuNoiseLayer::to_layer)
        .collect::<Result<Vec<NoiseLayer>>>()?;

    ensure_covered(groups, dims)?;
    let size = dims.as_uvec3();

    match bindings.take_texture(names::VOLUME_TEX)? {
        TextureBinding::Density(field) => {
            ensure_dims(names::VOLUME_TEX, field.dims(), dims)?;
            let bounds = field.bounds();
            let (values, stats) = run_blocks(groups, dims, |cell| {
                noise.accumulate(&layers, bounds.cell_center(cell, size))
            });
            field.write_channel(DENSITY_CHANNEL, values);
            Ok(stats)
        }
        TextureBinding::Detail(field) => {
            ensure_dims(names::VOLUME_TEX, field.dims(), dims)?;
            let bounds = field.bounds();
            let (values, stats) = run_blocks(groups, dims, |cell| {
                noise.accumulate(&layers, bounds.cell_center(cell, size))
            });
            field.write(values);
            Ok(stats)
        }
        other => Err(Error::config(format!(
            "`{}` cannot be written through a {} binding",
            names::VOLUME_TEX,
            other.kind()
        ))),
    }
}
