//! Simulated file upload queue.
//!
//! Files are validated, recorded in an in-memory store and "uploaded" by a
//! cancellable progress simulation. Uploads can be paused, resumed,
//! cancelled and removed while in flight; sessions count the files selected
//! together and how many of them finished.

pub mod api;
pub mod config;
pub mod coordinator;
pub mod files;
pub mod metrics;
pub mod random;
pub mod session;
pub mod store;
pub mod thumbnail;
pub mod transfer;
pub mod validation;
