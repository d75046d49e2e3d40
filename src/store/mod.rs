//! In-memory mock data store
//!
//! Holds the file and session collections that stand in for a remote upload
//! endpoint. Every operation waits out an artificial latency before touching
//! the data.

pub mod collection;
pub mod error;
pub mod mock;
pub mod types;

pub use collection::{Collection, Latency, Record};
pub use error::{StoreError, StoreResult};
pub use mock::MockStore;
pub use types::{
    FilePatch, FileRecord, FileStatus, NewFile, NewSession, SessionPatch, SessionStatus,
    UploadSession,
};
