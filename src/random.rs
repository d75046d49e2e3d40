//! Randomness providers for the upload simulation
//!
//! Progress steps, tick delays and store latency are all drawn through a
//! [`RandomSource`] handed to the component that needs it, so tests can pin
//! the sequence instead of relying on a process-wide generator.

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Duration;

/// Capability for drawing uniformly distributed samples.
pub trait RandomSource: Send + Sync {
    /// Sample uniformly from `[low, high]`. Returns `low` when the range is empty.
    fn uniform(&self, low: f64, high: f64) -> f64;

    /// Sample a duration uniformly from `[min, max]`.
    fn duration_between(&self, min: Duration, max: Duration) -> Duration {
        let secs = self.uniform(min.as_secs_f64(), max.as_secs_f64());
        Duration::from_secs_f64(secs.max(0.0))
    }
}

/// Thread-local generator, used outside of tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn uniform(&self, low: f64, high: f64) -> f64 {
        if high <= low {
            return low;
        }
        rand::thread_rng().gen_range(low..=high)
    }
}

/// Seeded generator producing a replayable sequence.
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
        if high <= low {
            return low;
        }
        self.rng.lock().gen_range(low..=high)
    }
}

/// Always returns the same relative position inside the requested range.
///
/// `FixedRandom::new(0.5)` yields the midpoint of every range, so a 15 point
/// maximum step becomes a constant 7.5 point step.
#[derive(Debug, Clone, Copy)]
pub struct FixedRandom {
    fraction: f64,
}

impl FixedRandom {
    pub fn new(fraction: f64) -> Self {
        Self {
            fraction: fraction.clamp(0.0, 1.0),
        }
    }

    /// Upper bound of every range.
    pub fn max() -> Self {
        Self::new(1.0)
    }
}

impl RandomSource for FixedRandom {
    fn uniform(&self, low: f64, high: f64) -> f64 {
        if high <= low {
            return low;
        }
        low + (high - low) * self.fraction
    }
}
