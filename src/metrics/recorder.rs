//! Metrics recorder for upload operations
//!
//! Thin wrappers over the `metrics` facade. Without an installed recorder
//! every call is a no-op.

use crate::transfer::StopReason;
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

static METRICS_INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Initialize metric descriptions (call once at startup)
pub fn init_metrics() {
    if METRICS_INITIALIZED.swap(true, Ordering::SeqCst) {
        return;
    }

    describe_counter!(
        "uploadflow_uploads_started_total",
        "Total number of upload attempts started"
    );
    describe_counter!(
        "uploadflow_uploads_completed_total",
        "Total number of uploads that reached completed"
    );
    describe_counter!(
        "uploadflow_uploads_failed_total",
        "Total number of upload attempts recorded as error"
    );
    describe_counter!(
        "uploadflow_uploads_cancelled_total",
        "Total number of upload attempts cancelled by the operator"
    );
    describe_counter!(
        "uploadflow_uploads_paused_total",
        "Total number of upload attempts paused by the operator"
    );
    describe_counter!(
        "uploadflow_files_rejected_total",
        "Total number of selected files rejected by validation"
    );
    describe_counter!(
        "uploadflow_bytes_uploaded_total",
        "Total bytes covered by completed uploads"
    );

    describe_gauge!(
        "uploadflow_active_uploads",
        "Number of upload attempts currently in flight"
    );
    describe_gauge!("uploadflow_queue_files", "Number of file records in the store");

    describe_histogram!(
        "uploadflow_upload_duration_seconds",
        "Duration of upload attempts"
    );
    describe_histogram!("uploadflow_upload_size_bytes", "Size of uploaded files");
}

pub fn record_upload_started(file_size: u64) {
    counter!("uploadflow_uploads_started_total").increment(1);
    gauge!("uploadflow_active_uploads").increment(1.0);
    histogram!("uploadflow_upload_size_bytes").record(file_size as f64);
}

pub fn record_upload_completed(duration: Duration, bytes: u64) {
    counter!("uploadflow_uploads_completed_total").increment(1);
    counter!("uploadflow_bytes_uploaded_total").increment(bytes);
    gauge!("uploadflow_active_uploads").decrement(1.0);
    histogram!("uploadflow_upload_duration_seconds", "outcome" => "completed")
        .record(duration.as_secs_f64());
}

pub fn record_upload_failed(duration: Duration) {
    counter!("uploadflow_uploads_failed_total").increment(1);
    gauge!("uploadflow_active_uploads").decrement(1.0);
    histogram!("uploadflow_upload_duration_seconds", "outcome" => "failed")
        .record(duration.as_secs_f64());
}

/// Record an attempt stopped by pause, cancel or removal
pub fn record_upload_stopped(reason: StopReason, duration: Duration) {
    match reason {
        StopReason::Pause => counter!("uploadflow_uploads_paused_total").increment(1),
        StopReason::Cancel | StopReason::Delete => {
            counter!("uploadflow_uploads_cancelled_total", "reason" => reason.as_str())
                .increment(1)
        }
    }
    gauge!("uploadflow_active_uploads").decrement(1.0);
    histogram!("uploadflow_upload_duration_seconds", "outcome" => reason.as_str())
        .record(duration.as_secs_f64());
}

pub fn record_file_rejected(reason: &'static str) {
    counter!("uploadflow_files_rejected_total", "reason" => reason).increment(1);
}

pub fn set_queue_files(count: usize) {
    gauge!("uploadflow_queue_files").set(count as f64);
}

/// Times one upload attempt and records how it ended
pub struct UploadTimer {
    start_time: Instant,
}

impl UploadTimer {
    pub fn start(file_size: u64) -> Self {
        record_upload_started(file_size);
        Self {
            start_time: Instant::now(),
        }
    }

    pub fn complete(self, bytes: u64) {
        record_upload_completed(self.start_time.elapsed(), bytes);
    }

    pub fn fail(self) {
        record_upload_failed(self.start_time.elapsed());
    }

    pub fn stop(self, reason: StopReason) {
        record_upload_stopped(reason, self.start_time.elapsed());
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_metrics() {
        // Should not panic when called multiple times
        init_metrics();
        init_metrics();
    }

    #[test]
    fn test_upload_timer() {
        let timer = UploadTimer::start(1000);
        std::thread::sleep(Duration::from_millis(10));
        assert!(timer.elapsed() >= Duration::from_millis(10));
        timer.complete(1000);
    }

    #[test]
    fn test_record_without_recorder() {
        UploadTimer::start(10).stop(StopReason::Cancel);
        UploadTimer::start(10).fail();
        record_file_rejected("too_large");
        set_queue_files(3);
    }
}
