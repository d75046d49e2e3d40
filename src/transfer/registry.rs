use crate::transfer::error::{TransferError, TransferResult};
use crate::transfer::types::StopReason;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};
use uuid::Uuid;

/// Handle on one in-flight attempt, shared between the running loop and
/// whoever wants to stop it.
#[derive(Debug, Clone)]
pub struct AttemptHandle {
    attempt_id: Uuid,
    stop: CancellationToken,
    stopped: CancellationToken,
    reason: Arc<Mutex<Option<StopReason>>>,
}

impl AttemptHandle {
    fn new() -> Self {
        Self {
            attempt_id: Uuid::new_v4(),
            stop: CancellationToken::new(),
            stopped: CancellationToken::new(),
            reason: Arc::new(Mutex::new(None)),
        }
    }

    pub fn attempt_id(&self) -> Uuid {
        self.attempt_id
    }

    /// Ask the attempt to stop at its next tick.
    pub fn request_stop(&self, reason: StopReason) {
        {
            let mut current = self.reason.lock();
            *current = Some(current.map_or(reason, |existing| existing.max(reason)));
        }
        self.stop.cancel();
    }

    /// The stop request observed by the loop, if any.
    pub fn stop_reason(&self) -> Option<StopReason> {
        if !self.stop.is_cancelled() {
            return None;
        }
        *self.reason.lock()
    }

    /// Resolves as soon as a stop is requested.
    pub fn stop_requested(&self) -> WaitForCancellationFuture<'_> {
        self.stop.cancelled()
    }

    /// Resolves once the attempt has ended and released its registration.
    pub async fn stopped(&self) {
        self.stopped.cancelled().await
    }

    pub fn is_finished(&self) -> bool {
        self.stopped.is_cancelled()
    }
}

/// Registry of in-flight attempts, one per file id.
#[derive(Debug, Clone, Default)]
pub struct ActiveTransfers {
    attempts: Arc<DashMap<String, AttemptHandle>>,
}

impl ActiveTransfers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new attempt for `file_id`.
    ///
    /// Fails if an attempt is already registered; the existing attempt keeps running.
    pub fn register(&self, file_id: &str) -> TransferResult<AttemptGuard> {
        match self.attempts.entry(file_id.to_string()) {
            Entry::Occupied(_) => Err(TransferError::AlreadyInProgress(file_id.to_string())),
            Entry::Vacant(slot) => {
                let handle = AttemptHandle::new();
                slot.insert(handle.clone());
                Ok(AttemptGuard {
                    file_id: file_id.to_string(),
                    handle,
                    attempts: self.attempts.clone(),
                })
            }
        }
    }

    pub fn get(&self, file_id: &str) -> Option<AttemptHandle> {
        self.attempts.get(file_id).map(|entry| entry.value().clone())
    }

    pub fn contains(&self, file_id: &str) -> bool {
        self.attempts.contains_key(file_id)
    }

    pub fn ids(&self) -> Vec<String> {
        self.attempts.iter().map(|e| e.key().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.attempts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attempts.is_empty()
    }

    /// Stop the attempt for `file_id` and wait until it has wound down.
    ///
    /// Returns `false` when nothing was in flight. Must not be awaited from
    /// inside the attempt's own progress callback.
    pub async fn stop(&self, file_id: &str, reason: StopReason) -> bool {
        let Some(handle) = self.get(file_id) else {
            return false;
        };
        handle.request_stop(reason);
        handle.stopped().await;
        true
    }
}

/// Keeps an attempt registered for as long as it lives.
///
/// Dropping the guard removes the registration (only if it still belongs to
/// this attempt) and wakes everyone waiting in [`AttemptHandle::stopped`].
#[derive(Debug)]
pub struct AttemptGuard {
    file_id: String,
    handle: AttemptHandle,
    attempts: Arc<DashMap<String, AttemptHandle>>,
}

impl AttemptGuard {
    pub fn handle(&self) -> &AttemptHandle {
        &self.handle
    }

    pub fn file_id(&self) -> &str {
        &self.file_id
    }
}

impl Drop for AttemptGuard {
    fn drop(&mut self) {
        let attempt_id = self.handle.attempt_id;
        self.attempts
            .remove_if(&self.file_id, |_, h| h.attempt_id == attempt_id);
        self.handle.stopped.cancel();
    }
}
