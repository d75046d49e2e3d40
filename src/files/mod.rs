//! File record service
//!
//! Record queries and per-file transfer control (start, pause, resume,
//! cancel, delete) over the shared store.

mod service;
mod stats;

pub use service::FileService;
pub use stats::SpeedMeter;
