//! Block dispatch geometry and the parallel block runner.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::core::{Error, Result, UVec3};
use crate::field::GridDims;

/// Cells per block edge
pub const BLOCK_SIZE: u32 = 4;
/// Cells per 4x4x4 block
pub const CELLS_PER_BLOCK: usize = (BLOCK_SIZE * BLOCK_SIZE * BLOCK_SIZE) as usize;

/// How many blocks to dispatch per axis for a given dimension
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchRounding {
    /// `dim / 4 + 1`: one spare block whenever `dim` is a multiple of 4
    #[default]
    Legacy,
    /// `ceil(dim / 4)`
    Exact,
}

impl DispatchRounding {
    pub fn block_count(self, dim: u32) -> u32 {
        match self {
            Self::Legacy => dim / BLOCK_SIZE + 1,
            Self::Exact => dim.div_ceil(BLOCK_SIZE),
        }
    }
}

/// Number of blocks per axis in one dispatch
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DispatchSize {
    pub x: u32,
    pub y: u32,
    pub z: u32,
}

impl DispatchSize {
    pub fn new(x: u32, y: u32, z: u32) -> Self {
        Self { x, y, z }
    }

    pub fn for_dims(dims: GridDims, rounding: DispatchRounding) -> Self {
        Self {
            x: rounding.block_count(dims.x),
            y: rounding.block_count(dims.y),
            z: rounding.block_count(dims.z),
        }
    }

    pub fn block_count(&self) -> u64 {
        self.x as u64 * self.y as u64 * self.z as u64
    }

    /// Whether every cell of `dims` falls in some dispatched block
    pub fn covers(&self, dims: GridDims) -> bool {
        self.x * BLOCK_SIZE >= dims.x && self.y * BLOCK_SIZE >= dims.y && self.z * BLOCK_SIZE >= dims.z
    }

    /// Block coordinates, x fastest
    pub fn blocks(&self) -> impl Iterator<Item = UVec3> + '_ {
        (0..self.z).flat_map(move |z| {
            (0..self.y).flat_map(move |y| (0..self.x).map(move |x| UVec3::new(x, y, z)))
        })
    }
}

/// Per-dispatch counters
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DispatchStats {
    pub blocks: u64,
    pub cells_written: u64,
    /// Dispatched cells that fell outside the grid
    pub cells_skipped: u64,
}

impl DispatchStats {
    pub fn merged(self, other: DispatchStats) -> Self {
        Self {
            blocks: self.blocks + other.blocks,
            cells_written: self.cells_written + other.cells_written,
            cells_skipped: self.cells_skipped + other.cells_skipped,
        }
    }
}

/// Fail if the dispatch would leave cells of `dims` unwritten.
pub fn ensure_covered(groups: DispatchSize, dims: GridDims) -> Result<()> {
    if !groups.covers(dims) {
        return Err(Error::config(format!(
            "dispatch of {}x{}x{} blocks does not cover a {} grid",
            groups.x, groups.y, groups.z, dims
        )));
    }
    Ok(())
}

/// Evaluate `kernel` for every in-range cell of every dispatched block.
///
/// Blocks run in parallel. All values are computed before the caller writes
/// any of them back, so a kernel never observes another cell's output from
/// the same dispatch. Out-of-range cells inside edge blocks are skipped.
pub fn run_blocks<T, F>(groups: DispatchSize, dims: GridDims, kernel: F) -> (Vec<(usize, T)>, DispatchStats)
where
    T: Send,
    F: Fn(UVec3) -> T + Sync,
{
    let blocks: Vec<UVec3> = groups.blocks().collect();

    let per_block: Vec<Vec<(usize, T)>> = blocks
        .par_iter()
        .map(|&block| {
            let origin = block * BLOCK_SIZE;
            let mut out = Vec::with_capacity(CELLS_PER_BLOCK);
            for z in 0..BLOCK_SIZE {
                for y in 0..BLOCK_SIZE {
                    for x in 0..BLOCK_SIZE {
                        let cell = origin + UVec3::new(x, y, z);
                        if dims.contains(cell) {
                            out.push((dims.index(cell), kernel(cell)));
                        }
                    }
                }
            }
            out
        })
        .collect();

    let values: Vec<(usize, T)> = per_block.into_iter().flatten().collect();
    let dispatched = groups.block_count() * CELLS_PER_BLOCK as u64;
    let written = values.len() as u64;

    let stats = DispatchStats {
        blocks: groups.block_count(),
        cells_written: written,
        cells_skipped: dispatched - written,
    };
    (values, stats)
}
