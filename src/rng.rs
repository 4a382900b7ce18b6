//! Seeded 64-bit linear congruential generator.
//!
//! Every measurement reseeds it from its (spot count, trial) pair, so the shuffle a given
//! configuration sees is the same on every run.

const MULTIPLIER: u64 = 2862933555777941757;
const INCREMENT: u64 = 3037000493;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Lcg {
    state: u64,
}

impl Lcg {
    pub fn new(seed: u64) -> Self {
        Lcg { state: seed }
    }

    pub fn reseed(&mut self, seed: u64) {
        self.state = seed;
    }

    /// Advance the state and return it
    pub fn next(&mut self) -> u64 {
        self.state = self.state.wrapping_mul(MULTIPLIER).wrapping_add(INCREMENT);
        self.state
    }
}
