use thiserror::Error;

#[derive(Error, Debug)]
pub enum TransferError {
    #[error("Upload already in progress: {0}")]
    AlreadyInProgress(String),

    #[error("Store error: {0}")]
    Store(#[from] crate::store::StoreError),

    #[error("Progress callback failed: {0}")]
    Callback(#[from] CallbackError),
}

impl TransferError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, TransferError::Store(e) if e.is_not_found())
    }
}

/// Returned by a progress callback to abort the attempt as a failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct CallbackError(pub String);

impl CallbackError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

pub type TransferResult<T> = Result<T, TransferError>;
