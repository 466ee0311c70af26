//! Injectable randomness for driver assignment, distance and order
//! reference generation.

use std::sync::Mutex;

use rand::{Rng, SeedableRng, rngs::StdRng};

/// Source of uniformly distributed integers.
pub trait RandomSource: Send + Sync {
    /// Returns a value in `low..=high`.
    fn next_in_range(&self, low: u32, high: u32) -> u32;
}

/// Thread-local generator seeded from the OS.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn next_in_range(&self, low: u32, high: u32) -> u32 {
        rand::rng().random_range(low..=high)
    }
}

/// Deterministic generator for reproducible runs.
#[derive(Debug)]
pub struct SeededRandom {
    rng: Mutex<StdRng>,
}

impl SeededRandom {
    /// Creates a generator from a fixed seed.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl RandomSource for SeededRandom {
    fn next_in_range(&self, low: u32, high: u32) -> u32 {
        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        rng.random_range(low..=high)
    }
}

/// Always yields the same value, clamped into the requested range.
#[derive(Debug, Clone, Copy)]
pub struct FixedRandom(pub u32);

impl RandomSource for FixedRandom {
    fn next_in_range(&self, low: u32, high: u32) -> u32 {
        self.0.clamp(low, high)
    }
}
