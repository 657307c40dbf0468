use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Source of the non-deterministic parts of scoring: ranking jitter and the
/// auditory/reading pick in style detection.
pub trait RandomSource: Send + Sync {
    /// Uniform draw from `[low, high]`.
    fn uniform(&self, low: f64, high: f64) -> f64;

    fn coin(&self) -> bool;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn uniform(&self, low: f64, high: f64) -> f64 {
        rand::rng().random_range(low..=high)
    }

    fn coin(&self) -> bool {
        rand::rng().random_bool(0.5)
    }
}

/// Reproducible source for tests and `JITTER_SEED` deployments.
#[derive(Debug)]
pub struct SeededRandom {
    rng: Mutex<StdRng>,
}

impl SeededRandom {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl RandomSource for SeededRandom {
    fn uniform(&self, low: f64, high: f64) -> f64 {
        self.rng.lock().random_range(low..=high)
    }

    fn coin(&self) -> bool {
        self.rng.lock().random_bool(0.5)
    }
}

/// Always returns `value` clamped into the requested range, and a fixed coin.
#[derive(Debug, Clone, Copy)]
pub struct FixedRandom {
    pub value: f64,
    pub heads: bool,
}

impl FixedRandom {
    /// Neutral jitter: every multiplier is exactly 1.0.
    pub fn neutral() -> Self {
        Self {
            value: 1.0,
            heads: true,
        }
    }
}

impl RandomSource for FixedRandom {
    fn uniform(&self, low: f64, high: f64) -> f64 {
        self.value.clamp(low, high)
    }

    fn coin(&self) -> bool {
        self.heads
    }
}
