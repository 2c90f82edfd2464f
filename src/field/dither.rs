//! Dither texture used by the consumer to jitter ray start positions.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Edge length of the dither texture
pub const DITHER_SIZE: u32 = 32;

/// 32x32 R8 texture of uniform random values
#[derive(Clone, Debug, PartialEq)]
pub struct DitherTexture {
    seed: u64,
    texels: Vec<u8>,
}

impl DitherTexture {
    /// Fill from a seeded uniform source
    pub fn new(seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let texels = (0..DITHER_SIZE * DITHER_SIZE)
            .map(|_| rng.random::<u8>())
            .collect();
        Self { seed, texels }
    }

    /// Fill with a freshly drawn seed
    pub fn from_entropy() -> Self {
        Self::new(rand::random())
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn texels(&self) -> &[u8] {
        &self.texels
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size() {
        let tex = DitherTexture::new(1);
        assert_eq!(tex.texels().len(), 32 * 32);
    }

    #[test]
    fn test_seeded_is_reproducible() {
        assert_eq!(DitherTexture::new(99), DitherTexture::new(99));
        assert_ne!(DitherTexture::new(1).texels(), DitherTexture::new(2).texels());
    }

    #[test]
    fn test_values_spread() {
        let tex = DitherTexture::new(5);
        let distinct: std::collections::HashSet<_> = tex.texels().iter().collect();
        assert!(distinct.len() > 100);
    }
}
