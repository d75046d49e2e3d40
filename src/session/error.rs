use crate::store::StoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl SessionError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, SessionError::Store(e) if e.is_not_found())
    }
}

pub type SessionResult<T> = Result<T, SessionError>;
