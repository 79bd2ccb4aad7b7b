//! # Grid Seeds
//!
//! Every grid owns a PRNG seeded from a [`GridSeed`]. Seeds for sibling grids
//! are derived from one master seed so a whole map replays from a single
//! number.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Seed for deterministic grid generation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GridSeed(u64);

impl GridSeed {
    /// Creates a new grid seed.
    #[inline]
    #[must_use]
    pub const fn new(seed: u64) -> Self {
        Self(seed)
    }

    /// Returns the raw seed value.
    #[inline]
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }

    /// Derives an independent sub-seed for a specific purpose.
    #[inline]
    #[must_use]
    pub const fn derive(self, purpose: u64) -> Self {
        let mut hash = self.0;
        hash ^= purpose;
        hash = hash.wrapping_mul(0x517c_c1b7_2722_0a95);
        hash ^= hash >> 32;
        Self(hash)
    }

    /// Derives a sub-seed from a name (e.g. a grid's debug name).
    #[must_use]
    pub fn derive_named(self, name: &str) -> Self {
        // FNV-1a over the name bytes, then the usual mixing step
        let purpose = name.bytes().fold(0xcbf2_9ce4_8422_2325_u64, |acc, b| {
            (acc ^ u64::from(b)).wrapping_mul(0x0100_0000_01b3)
        });
        self.derive(purpose)
    }

    /// Builds the PRNG a grid carries.
    #[must_use]
    pub fn rng(self) -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(self.0)
    }
}

impl Default for GridSeed {
    fn default() -> Self {
        Self(0x7E55_E4A0_5EED_0001)
    }
}

impl From<u64> for GridSeed {
    fn from(value: u64) -> Self {
        Self(value)
    }
}
