//! Upload queue coordination
//!
//! Ties validation, thumbnails, sessions and per-file transfers together
//! behind the operations the outer surface calls.

mod coordinator;
mod error;
mod types;

pub use coordinator::UploadCoordinator;
pub use error::{CoordinatorError, CoordinatorResult};
pub use types::{AddFilesReport, FileProgress, QueueStats};
