use crate::metrics::UploadTimer;
use crate::random::RandomSource;
use crate::store::{FilePatch, FileRecord, FileStatus, MockStore, StoreError};
use crate::transfer::error::{CallbackError, TransferError, TransferResult};
use crate::transfer::registry::{ActiveTransfers, AttemptGuard, AttemptHandle};
use crate::transfer::types::{StopReason, TransferOutcome, TransferTiming};
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Why the ramp loop returned early.
enum Interrupt {
    Stopped(StopReason),
    Failed(TransferError),
}

impl From<StoreError> for Interrupt {
    fn from(err: StoreError) -> Self {
        Interrupt::Failed(err.into())
    }
}

impl From<CallbackError> for Interrupt {
    fn from(err: CallbackError) -> Self {
        Interrupt::Failed(err.into())
    }
}

/// Runs simulated upload attempts against the store.
///
/// The simulator never holds a record itself: every change goes through
/// the store's update operation, and the only per-attempt state kept here
/// is the stop handle in [`ActiveTransfers`].
#[derive(Clone)]
pub struct TransferSimulator {
    store: Arc<MockStore>,
    random: Arc<dyn RandomSource>,
    timing: TransferTiming,
    active: ActiveTransfers,
}

impl TransferSimulator {
    pub fn new(store: Arc<MockStore>, random: Arc<dyn RandomSource>, timing: TransferTiming) -> Self {
        Self {
            store,
            random,
            timing,
            active: ActiveTransfers::new(),
        }
    }

    pub fn active(&self) -> &ActiveTransfers {
        &self.active
    }

    pub fn timing(&self) -> &TransferTiming {
        &self.timing
    }

    /// Run one attempt for `file_id` to completion, stop or failure.
    ///
    /// A record stored as `paused` continues from its stored progress; any
    /// other status starts over from 0. `on_progress` receives every
    /// persisted progress value; returning an error aborts the attempt and
    /// records it as failed.
    pub async fn run<F>(&self, file_id: &str, on_progress: F) -> TransferResult<TransferOutcome>
    where
        F: FnMut(u8) -> Result<(), CallbackError> + Send,
    {
        let guard = self.active.register(file_id)?;
        self.run_registered(guard, on_progress).await
    }

    /// Run an attempt that was registered up front with
    /// [`ActiveTransfers::register`], so a caller can reject duplicates
    /// before spawning.
    pub async fn run_registered<F>(
        &self,
        guard: AttemptGuard,
        mut on_progress: F,
    ) -> TransferResult<TransferOutcome>
    where
        F: FnMut(u8) -> Result<(), CallbackError> + Send,
    {
        let file_id = guard.file_id().to_string();
        let file_id = file_id.as_str();

        let record = match self.store.files().get_by_id(file_id).await {
            Some(record) => record,
            None => return Err(StoreError::not_found("File", file_id).into()),
        };

        let timer = UploadTimer::start(record.size);
        info!(file_id, size = record.size, from = %record.status, "Upload attempt started");

        let result = self.ramp(&record, guard.handle(), &mut on_progress).await;

        let outcome = match result {
            Ok(done) => {
                timer.complete(done.size);
                info!(file_id, "Upload completed");
                if let Err(e) = on_progress(100) {
                    warn!(file_id, error = %e, "Progress callback failed after completion");
                }
                Ok(TransferOutcome::Completed(done))
            }
            Err(Interrupt::Stopped(reason)) => {
                if reason == StopReason::Cancel {
                    if let Err(e) = self.store.files().update(file_id, FilePatch::cancelled()).await {
                        warn!(file_id, error = %e, "Could not record cancelled status");
                    }
                }
                timer.stop(reason);
                info!(file_id, %reason, "Upload stopped");
                Ok(TransferOutcome::Stopped {
                    file_id: file_id.to_string(),
                    reason,
                })
            }
            Err(Interrupt::Failed(err)) => {
                warn!(file_id, error = %err, "Upload failed");
                if let Err(e) = self.store.files().update(file_id, FilePatch::failed()).await {
                    warn!(file_id, error = %e, "Could not record failed status");
                }
                timer.fail();
                Err(err)
            }
        };

        drop(guard);
        outcome
    }

    async fn ramp<F>(
        &self,
        record: &FileRecord,
        handle: &AttemptHandle,
        on_progress: &mut F,
    ) -> Result<FileRecord, Interrupt>
    where
        F: FnMut(u8) -> Result<(), CallbackError> + Send,
    {
        let file_id = record.id.as_str();
        let mut progress = if record.status == FileStatus::Paused {
            f64::from(record.progress)
        } else {
            0.0
        };

        self.store
            .files()
            .update(file_id, FilePatch::uploading(progress as u8))
            .await?;

        loop {
            if let Some(reason) = handle.stop_reason() {
                return Err(Interrupt::Stopped(reason));
            }

            progress = (progress + self.random.uniform(0.0, self.timing.max_step)).clamp(0.0, 100.0);
            if progress >= 100.0 {
                break;
            }

            // 100 is reserved for the completed state
            let current = (progress.round() as u8).min(99);
            self.store
                .files()
                .update(file_id, FilePatch::progress(current))
                .await?;
            on_progress(current)?;
            debug!(file_id, progress = current, "Upload progress");

            let delay = self
                .random
                .duration_between(self.timing.min_delay, self.timing.max_delay);
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = handle.stop_requested() => {}
            }
        }

        Ok(self
            .store
            .files()
            .update(file_id, FilePatch::completed(Utc::now()))
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::{FixedRandom, SeededRandom};
    use crate::store::NewFile;
    use parking_lot::Mutex;
    use std::time::Duration;

    fn simulator_with(random: Arc<dyn RandomSource>) -> (Arc<MockStore>, TransferSimulator) {
        let store = Arc::new(MockStore::in_memory());
        let simulator = TransferSimulator::new(store.clone(), random, TransferTiming::fast());
        (store, simulator)
    }

    /// Constant steps of exactly 10 points.
    fn ten_point_steps() -> (Arc<MockStore>, TransferSimulator) {
        let store = Arc::new(MockStore::in_memory());
        let timing = TransferTiming::fast().with_max_step(10.0);
        let simulator = TransferSimulator::new(store.clone(), Arc::new(FixedRandom::max()), timing);
        (store, simulator)
    }

    async fn add_file(store: &MockStore, size: u64) -> FileRecord {
        store
            .files()
            .create(NewFile {
                name: "clip.mp4".to_string(),
                size,
                mime_type: "video/mp4".to_string(),
                thumbnail_url: None,
            })
            .await
    }

    #[tokio::test]
    async fn test_run_to_completion() {
        let (store, simulator) = ten_point_steps();
        let record = add_file(&store, 1_000).await;

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let started = Utc::now();

        let outcome = simulator
            .run(&record.id, move |p| {
                sink.lock().push(p);
                Ok(())
            })
            .await
            .unwrap();

        let done = outcome.record().unwrap();
        assert_eq!(done.status, FileStatus::Completed);
        assert_eq!(done.progress, 100);
        assert!(done.uploaded_at.unwrap() >= started);

        let seen = seen.lock().clone();
        assert_eq!(seen, vec![10, 20, 30, 40, 50, 60, 70, 80, 90, 100]);
        assert!(simulator.active().is_empty());
    }

    #[tokio::test]
    async fn test_progress_monotonic_with_seeded_random() {
        let (store, simulator) = simulator_with(Arc::new(SeededRandom::new(7)));
        let record = add_file(&store, 1_000).await;

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        simulator
            .run(&record.id, move |p| {
                sink.lock().push(p);
                Ok(())
            })
            .await
            .unwrap();

        let seen = seen.lock().clone();
        assert!(seen.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(*seen.last().unwrap(), 100);
        assert!(seen[..seen.len() - 1].iter().all(|p| *p < 100));
    }

    #[tokio::test]
    async fn test_missing_file() {
        let (_store, simulator) = simulator_with(Arc::new(FixedRandom::max()));
        let err = simulator.run("missing", |_| Ok(())).await.unwrap_err();
        assert!(err.is_not_found());
        assert!(simulator.active().is_empty());
    }

    #[tokio::test]
    async fn test_callback_failure_marks_error() {
        let (store, simulator) = simulator_with(Arc::new(FixedRandom::new(0.5)));
        let record = add_file(&store, 1_000).await;

        let err = simulator
            .run(&record.id, |p| {
                if p >= 30 {
                    Err(CallbackError::new("renderer gone"))
                } else {
                    Ok(())
                }
            })
            .await
            .unwrap_err();
        assert!(matches!(err, TransferError::Callback(_)));

        let stored = store.files().find(&record.id).unwrap();
        assert_eq!(stored.status, FileStatus::Error);
        assert_eq!(stored.progress, 0);
    }

    #[tokio::test]
    async fn test_cancel_resets_progress() {
        let store = Arc::new(MockStore::in_memory());
        let timing = TransferTiming::default()
            .with_delay(Duration::from_millis(20), Duration::from_millis(20));
        let simulator = TransferSimulator::new(store.clone(), Arc::new(FixedRandom::new(0.2)), timing);
        let record = add_file(&store, 1_000).await;

        let runner = simulator.clone();
        let id = record.id.clone();
        let task = tokio::spawn(async move { runner.run(&id, |_| Ok(())).await });

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(simulator.active().stop(&record.id, StopReason::Cancel).await);

        let outcome = task.await.unwrap().unwrap();
        assert_eq!(outcome.stop_reason(), Some(StopReason::Cancel));

        let stored = store.files().find(&record.id).unwrap();
        assert_eq!(stored.status, FileStatus::Cancelled);
        assert_eq!(stored.progress, 0);
    }

    #[tokio::test]
    async fn test_pause_leaves_progress_untouched() {
        let store = Arc::new(MockStore::in_memory());
        let timing = TransferTiming::default()
            .with_delay(Duration::from_millis(20), Duration::from_millis(20));
        let simulator = TransferSimulator::new(store.clone(), Arc::new(FixedRandom::new(0.2)), timing);
        let record = add_file(&store, 1_000).await;

        let runner = simulator.clone();
        let id = record.id.clone();
        let task = tokio::spawn(async move { runner.run(&id, |_| Ok(())).await });

        tokio::time::sleep(Duration::from_millis(50)).await;
        simulator.active().stop(&record.id, StopReason::Pause).await;
        let outcome = task.await.unwrap().unwrap();
        assert_eq!(outcome.stop_reason(), Some(StopReason::Pause));

        // The loop leaves persisting `paused` to the caller
        let stored = store.files().find(&record.id).unwrap();
        assert_eq!(stored.status, FileStatus::Uploading);
        assert!(stored.progress > 0 && stored.progress < 100);
    }

    #[tokio::test]
    async fn test_second_attempt_rejected_while_active() {
        let store = Arc::new(MockStore::in_memory());
        let timing = TransferTiming::default()
            .with_delay(Duration::from_millis(20), Duration::from_millis(20));
        let simulator = TransferSimulator::new(store.clone(), Arc::new(FixedRandom::new(0.2)), timing);
        let record = add_file(&store, 1_000).await;

        let runner = simulator.clone();
        let id = record.id.clone();
        let task = tokio::spawn(async move { runner.run(&id, |_| Ok(())).await });
        tokio::time::sleep(Duration::from_millis(10)).await;

        let err = simulator.run(&record.id, |_| Ok(())).await.unwrap_err();
        assert!(matches!(err, TransferError::AlreadyInProgress(_)));

        // The first attempt is unaffected
        simulator.active().stop(&record.id, StopReason::Cancel).await;
        assert!(task.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_resume_continues_from_paused_progress() {
        let (store, simulator) = ten_point_steps();
        let record = add_file(&store, 1_000).await;
        store
            .files()
            .update(&record.id, FilePatch::status(FileStatus::Paused).with_progress(50))
            .await
            .unwrap();

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        simulator
            .run(&record.id, move |p| {
                sink.lock().push(p);
                Ok(())
            })
            .await
            .unwrap();

        assert_eq!(seen.lock().clone(), vec![60, 70, 80, 90, 100]);
    }

    #[tokio::test]
    async fn test_fresh_attempt_starts_from_zero() {
        let (store, simulator) = ten_point_steps();
        let record = add_file(&store, 1_000).await;
        store
            .files()
            .update(&record.id, FilePatch::failed())
            .await
            .unwrap();

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        simulator
            .run(&record.id, move |p| {
                sink.lock().push(p);
                Ok(())
            })
            .await
            .unwrap();

        assert_eq!(seen.lock().first().copied(), Some(10));
    }
}
