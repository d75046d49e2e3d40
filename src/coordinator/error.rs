use crate::session::SessionError;
use crate::store::StoreError;
use crate::transfer::TransferError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoordinatorError {
    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Upload already in progress: {0}")]
    AlreadyInProgress(String),

    #[error("Transfer error: {0}")]
    Transfer(#[source] TransferError),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl From<TransferError> for CoordinatorError {
    fn from(err: TransferError) -> Self {
        match err {
            TransferError::AlreadyInProgress(id) => CoordinatorError::AlreadyInProgress(id),
            TransferError::Store(StoreError::NotFound { id, .. }) => CoordinatorError::FileNotFound(id),
            other => CoordinatorError::Transfer(other),
        }
    }
}

impl CoordinatorError {
    pub fn is_not_found(&self) -> bool {
        match self {
            CoordinatorError::FileNotFound(_) => true,
            CoordinatorError::Session(e) => e.is_not_found(),
            CoordinatorError::Store(e) => e.is_not_found(),
            _ => false,
        }
    }
}

pub type CoordinatorResult<T> = Result<T, CoordinatorError>;
