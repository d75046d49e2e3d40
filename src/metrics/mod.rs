//! Metrics and observability module
//!
//! Provides Prometheus-compatible metrics for the upload queue.
//!
//! Key metrics exposed:
//! - Upload attempts by outcome (completed, failed, cancelled, paused)
//! - Attempt duration and file size distributions
//! - Active attempts and queue length
//! - Validation rejections

pub mod exporter;
pub mod recorder;

pub use exporter::{metrics_route, render_metrics, start_metrics_server, MetricsConfig, MetricsError};
pub use recorder::{init_metrics, record_file_rejected, set_queue_files, UploadTimer};
