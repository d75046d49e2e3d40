use crate::store::FileRecord;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Shape of the simulated progress ramp.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferTiming {
    /// Upper bound of a single progress increment, in percentage points
    pub max_step: f64,
    /// Shortest pause between two ticks
    pub min_delay: Duration,
    /// Longest pause between two ticks
    pub max_delay: Duration,
}

impl Default for TransferTiming {
    fn default() -> Self {
        Self {
            max_step: 15.0,
            min_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(300),
        }
    }
}

impl TransferTiming {
    /// Millisecond ticks for tests and demos.
    pub fn fast() -> Self {
        Self {
            min_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(3),
            ..Default::default()
        }
    }

    pub fn with_delay(mut self, min: Duration, max: Duration) -> Self {
        self.min_delay = min.min(max);
        self.max_delay = max;
        self
    }

    pub fn with_max_step(mut self, max_step: f64) -> Self {
        self.max_step = max_step.clamp(0.0, 100.0);
        self
    }
}

/// Why an attempt was asked to stop. Later, stronger requests override
/// weaker ones (a cancel issued after a pause wins).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum StopReason {
    Pause,
    Cancel,
    Delete,
}

impl StopReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            StopReason::Pause => "paused",
            StopReason::Cancel => "cancelled",
            StopReason::Delete => "removed",
        }
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a transfer attempt ended when it did not fail.
#[derive(Debug, Clone, PartialEq)]
pub enum TransferOutcome {
    Completed(FileRecord),
    Stopped { file_id: String, reason: StopReason },
}

impl TransferOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, TransferOutcome::Completed(_))
    }

    pub fn record(&self) -> Option<&FileRecord> {
        match self {
            TransferOutcome::Completed(record) => Some(record),
            TransferOutcome::Stopped { .. } => None,
        }
    }

    pub fn stop_reason(&self) -> Option<StopReason> {
        match self {
            TransferOutcome::Completed(_) => None,
            TransferOutcome::Stopped { reason, .. } => Some(*reason),
        }
    }
}
