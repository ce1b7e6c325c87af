//! Deterministic random source for test-case generation.

use std::fmt;

use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// A single opaque token drawn from the random source.
///
/// Atoms are the only randomness a generator ever observes. Once a rose node
/// has drawn its atom, the value is cached there for the lifetime of the
/// node, so regenerating a value never re-rolls choices that were already
/// made.
pub type Atom = u64;

/// Golden-gamma constant used to spread case indices over the seed space.
const GOLDEN_GAMMA: u64 = 0x9e3779b97f4a7c15;

/// A deterministic stream of atoms, seeded once per test case.
///
/// Reseeding between cases is the driver's responsibility; the engine only
/// ever asks for the next atom.
pub struct RandomSource {
    rng: ChaCha8Rng,
    seed: u64,
}

impl RandomSource {
    /// Create a source producing the stream determined by `seed`.
    pub fn new(seed: u64) -> Self {
        RandomSource {
            rng: ChaCha8Rng::seed_from_u64(seed),
            seed,
        }
    }

    /// Draw the next atom from the stream.
    pub fn next_atom(&mut self) -> Atom {
        self.rng.next_u64()
    }

    /// The seed this source was created with.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// A fresh seed from OS entropy, for runs without a configured seed.
    pub fn entropy_seed() -> u64 {
        rand::thread_rng().gen()
    }

    /// Derive the seed for one test case from the run's base seed.
    pub fn case_seed(base: u64, case: usize) -> u64 {
        base ^ (case as u64).wrapping_mul(GOLDEN_GAMMA)
    }
}

impl fmt::Debug for RandomSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RandomSource").field("seed", &self.seed).finish()
    }
}
