mod error;
mod registry;
mod simulator;
mod types;

pub use error::{CallbackError, TransferError, TransferResult};
pub use registry::{ActiveTransfers, AttemptGuard, AttemptHandle};
pub use simulator::TransferSimulator;
pub use types::{StopReason, TransferOutcome, TransferTiming};
