use crate::random::RandomSource;
use crate::store::{FilePatch, FileRecord, FileStatus, MockStore, NewFile};
use crate::transfer::{
    CallbackError, StopReason, TransferOutcome, TransferResult, TransferSimulator, TransferTiming,
};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::info;

/// File record operations plus transfer control for each record.
#[derive(Clone)]
pub struct FileService {
    store: Arc<MockStore>,
    simulator: TransferSimulator,
}

impl FileService {
    pub fn new(store: Arc<MockStore>, random: Arc<dyn RandomSource>, timing: TransferTiming) -> Self {
        let simulator = TransferSimulator::new(store.clone(), random, timing);
        Self { store, simulator }
    }

    pub fn store(&self) -> &Arc<MockStore> {
        &self.store
    }

    pub fn simulator(&self) -> &TransferSimulator {
        &self.simulator
    }

    pub async fn get_all(&self) -> Vec<FileRecord> {
        self.store.files().get_all().await
    }

    pub async fn get_by_id(&self, id: &str) -> Option<FileRecord> {
        self.store.files().get_by_id(id).await
    }

    pub async fn create(&self, file: NewFile) -> FileRecord {
        self.store.files().create(file).await
    }

    pub async fn update(&self, id: &str, patch: FilePatch) -> TransferResult<FileRecord> {
        Ok(self.store.files().update(id, patch).await?)
    }

    /// Remove a record, stopping its transfer first.
    ///
    /// Once this returns no further writes for `id` happen.
    pub async fn delete(&self, id: &str) -> TransferResult<FileRecord> {
        if self.simulator.active().stop(id, StopReason::Delete).await {
            info!(file_id = id, "Stopped active upload before removal");
        }
        Ok(self.store.files().delete(id).await?)
    }

    /// Run an upload attempt for `id` on the current task.
    pub async fn upload_file<F>(&self, id: &str, on_progress: F) -> TransferResult<TransferOutcome>
    where
        F: FnMut(u8) -> Result<(), CallbackError> + Send,
    {
        self.simulator.run(id, on_progress).await
    }

    /// Continue a paused upload. A record that is not paused starts over.
    pub async fn resume_upload<F>(&self, id: &str, on_progress: F) -> TransferResult<TransferOutcome>
    where
        F: FnMut(u8) -> Result<(), CallbackError> + Send,
    {
        self.upload_file(id, on_progress).await
    }

    /// Spawn an upload attempt for `id` in the background.
    ///
    /// The attempt is registered before the task is spawned, so a second
    /// start for the same id fails here with `AlreadyInProgress`.
    pub fn start_upload(&self, id: &str) -> TransferResult<JoinHandle<TransferResult<TransferOutcome>>> {
        self.start_upload_with(id, |_| Ok(()))
    }

    pub fn start_upload_with<F>(
        &self,
        id: &str,
        on_progress: F,
    ) -> TransferResult<JoinHandle<TransferResult<TransferOutcome>>>
    where
        F: FnMut(u8) -> Result<(), CallbackError> + Send + 'static,
    {
        let guard = self.simulator.active().register(id)?;
        let simulator = self.simulator.clone();
        Ok(tokio::spawn(async move {
            simulator.run_registered(guard, on_progress).await
        }))
    }

    /// Pause the in-flight upload for `id`.
    ///
    /// Returns `None` when nothing was in flight or the attempt finished
    /// before it observed the request.
    pub async fn pause_upload(&self, id: &str) -> TransferResult<Option<FileRecord>> {
        if !self.simulator.active().stop(id, StopReason::Pause).await {
            return Ok(None);
        }

        match self.store.files().find(id) {
            Some(record) if record.status == FileStatus::Uploading => {
                let paused = self
                    .store
                    .files()
                    .update(id, FilePatch::status(FileStatus::Paused))
                    .await?;
                info!(file_id = id, progress = paused.progress, "Upload paused");
                Ok(Some(paused))
            }
            _ => Ok(None),
        }
    }

    /// Cancel the upload for `id`, whether or not it is in flight.
    pub async fn cancel_upload(&self, id: &str) -> TransferResult<FileRecord> {
        self.simulator.active().stop(id, StopReason::Cancel).await;
        let record = self.store.files().update(id, FilePatch::cancelled()).await?;
        info!(file_id = id, "Upload cancelled");
        Ok(record)
    }

    pub async fn files_by_status(&self, status: FileStatus) -> Vec<FileRecord> {
        self.get_all()
            .await
            .into_iter()
            .filter(|f| f.status == status)
            .collect()
    }

    pub async fn completed_files(&self) -> Vec<FileRecord> {
        self.files_by_status(FileStatus::Completed).await
    }

    /// Sum of file sizes, optionally restricted to `ids`. Unknown ids are ignored.
    pub async fn total_size(&self, ids: Option<&[String]>) -> u64 {
        self.get_all()
            .await
            .iter()
            .filter(|f| ids.map_or(true, |ids| ids.contains(&f.id)))
            .map(|f| f.size)
            .sum()
    }

    /// Remove every completed record. Returns how many records remain.
    pub async fn clear_completed(&self) -> usize {
        self.store.files().latency().wait().await;
        let remaining = self
            .store
            .files()
            .retain(|f| f.status != FileStatus::Completed);
        info!(remaining, "Cleared completed uploads");
        remaining
    }

    pub fn is_active(&self, id: &str) -> bool {
        self.simulator.active().contains(id)
    }

    pub fn active_ids(&self) -> Vec<String> {
        self.simulator.active().ids()
    }
}
