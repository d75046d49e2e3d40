//! Upload session tracking
//!
//! A session groups the files selected together and counts how many of
//! them have completed. At most one session is current at a time.

pub mod error;
pub mod service;
pub mod types;

pub use error::{SessionError, SessionResult};
pub use service::SessionService;
pub use types::SessionStats;
