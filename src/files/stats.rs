use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy)]
struct Sample {
    at: Instant,
    bytes: u64,
}

/// Upload speed estimated from progress ticks.
///
/// Each file is sampled at most once per interval; the most recent sample
/// from any file becomes the reported speed.
#[derive(Debug)]
pub struct SpeedMeter {
    interval: Duration,
    samples: DashMap<String, Sample>,
    current: AtomicU64,
}

impl Default for SpeedMeter {
    fn default() -> Self {
        Self::new(Duration::from_secs(1))
    }
}

impl SpeedMeter {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            samples: DashMap::new(),
            current: AtomicU64::new(0f64.to_bits()),
        }
    }

    /// Observe `bytes` uploaded so far for `file_id`.
    pub fn observe(&self, file_id: &str, bytes: u64) -> Option<f64> {
        self.observe_at(file_id, bytes, Instant::now())
    }

    /// Returns the new speed in bytes per second when a sample was taken.
    pub fn observe_at(&self, file_id: &str, bytes: u64, now: Instant) -> Option<f64> {
        let mut entry = self
            .samples
            .entry(file_id.to_string())
            .or_insert(Sample { at: now, bytes });

        let elapsed = now.saturating_duration_since(entry.at);
        if elapsed < self.interval || elapsed.is_zero() {
            return None;
        }

        let speed = bytes.saturating_sub(entry.bytes) as f64 / elapsed.as_secs_f64();
        *entry = Sample { at: now, bytes };
        self.current.store(speed.to_bits(), Ordering::Relaxed);
        Some(speed)
    }

    /// Latest sampled speed in bytes per second.
    pub fn current(&self) -> f64 {
        f64::from_bits(self.current.load(Ordering::Relaxed))
    }

    pub fn forget(&self, file_id: &str) {
        self.samples.remove(file_id);
    }

    pub fn reset(&self) {
        self.samples.clear();
        self.current.store(0f64.to_bits(), Ordering::Relaxed);
    }
}
