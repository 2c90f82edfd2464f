//! Ephemeral half-precision buffer for the light march.

use half::f16;

use super::GridDims;
use crate::core::UVec3;

/// Single-channel f16 grid the light march writes into, so no cell of the
/// density field is written while neighbouring cells are still reading it.
///
/// Created zeroed at the start of a light pass and dropped at its end.
#[derive(Debug)]
pub struct ScratchBuffer {
    dims: GridDims,
    texels: Vec<f16>,
}

impl ScratchBuffer {
    pub fn new(dims: GridDims) -> Self {
        Self {
            dims,
            texels: vec![f16::ZERO; dims.cell_count()],
        }
    }

    pub fn dims(&self) -> GridDims {
        self.dims
    }

    pub fn texels(&self) -> &[f16] {
        &self.texels
    }

    pub fn get(&self, cell: UVec3) -> f32 {
        self.texels[self.dims.index(cell)].to_f32()
    }

    pub fn get_index(&self, index: usize) -> f32 {
        self.texels[index].to_f32()
    }

    /// Store `(linear index, value)` pairs, rounding to half precision
    pub fn write(&mut self, values: impl IntoIterator<Item = (usize, f32)>) {
        for (index, value) in values {
            self.texels[index] = f16::from_f32(value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_is_zeroed() {
        let scratch = ScratchBuffer::new(GridDims::cubic(3).unwrap());
        assert_eq!(scratch.texels().len(), 27);
        assert!(scratch.texels().iter().all(|t| t.to_f32() == 0.0));
    }

    #[test]
    fn test_write_rounds_to_half() {
        let mut scratch = ScratchBuffer::new(GridDims::cubic(2).unwrap());
        scratch.write([(0, 0.2), (7, 1.0)]);
        assert!((scratch.get_index(0) - 0.2).abs() < 1e-3);
        assert_eq!(scratch.get(UVec3::ONE), 1.0);
    }
}
