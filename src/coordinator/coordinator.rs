use crate::config::UploadConfig;
use crate::coordinator::error::{CoordinatorError, CoordinatorResult};
use crate::coordinator::types::{AddFilesReport, FileProgress, QueueStats};
use crate::files::{FileService, SpeedMeter};
use crate::metrics::{record_file_rejected, set_queue_files};
use crate::random::RandomSource;
use crate::session::SessionService;
use crate::store::{FileRecord, FileStatus, Latency, MockStore, NewFile};
use crate::thumbnail::{ImageThumbnailer, NoThumbnails, ThumbnailGenerator};
use crate::transfer::{AttemptGuard, TransferOutcome};
use crate::validation::{FileValidator, SelectedFile};
use dashmap::DashMap;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

pub struct UploadCoordinator {
    files: FileService,
    sessions: SessionService,
    validator: FileValidator,
    thumbnails: Arc<dyn ThumbnailGenerator>,
    speed: Arc<SpeedMeter>,

    // Session each file was added under
    file_sessions: Arc<DashMap<String, String>>,
}

impl UploadCoordinator {
    pub fn new(store: Arc<MockStore>, config: &UploadConfig, random: Arc<dyn RandomSource>) -> Self {
        let thumbnails: Arc<dyn ThumbnailGenerator> = if config.thumbnails {
            Arc::new(ImageThumbnailer::default())
        } else {
            Arc::new(NoThumbnails)
        };

        Self {
            files: FileService::new(store.clone(), random, config.timing.clone()),
            sessions: SessionService::new(store),
            validator: config.validator(),
            thumbnails,
            speed: Arc::new(SpeedMeter::default()),
            file_sessions: Arc::new(DashMap::new()),
        }
    }

    /// Build the store described by `config` and a coordinator over it.
    pub fn from_config(
        config: &UploadConfig,
        random: Arc<dyn RandomSource>,
        seed_fixtures: bool,
    ) -> CoordinatorResult<Self> {
        let (min, max) = config.store_latency;
        let latency = Latency::between(min, max, random.clone());
        let store = if seed_fixtures {
            MockStore::new(latency)?
        } else {
            MockStore::empty(latency)
        };
        Ok(Self::new(Arc::new(store), config, random))
    }

    pub fn with_thumbnailer(mut self, thumbnails: Arc<dyn ThumbnailGenerator>) -> Self {
        self.thumbnails = thumbnails;
        self
    }

    pub fn files(&self) -> &FileService {
        &self.files
    }

    pub fn sessions(&self) -> &SessionService {
        &self.sessions
    }

    /// Validate a selection, queue the accepted files and start their uploads.
    pub async fn add_files(&self, selection: Vec<SelectedFile>) -> CoordinatorResult<AddFilesReport> {
        let (accepted, rejected) = self.validator.validate_batch(selection);
        for error in &rejected {
            record_file_rejected(error.kind());
            warn!(name = error.file_name(), error = %error, "File rejected");
        }

        if accepted.is_empty() {
            return Ok(AddFilesReport {
                added: Vec::new(),
                rejected,
                session: None,
            });
        }

        let count = u32::try_from(accepted.len()).unwrap_or(u32::MAX);
        let bytes = accepted.iter().map(|f| f.size).sum();
        let session = self.sessions.add_files(count, bytes).await?;

        let mut added = Vec::with_capacity(accepted.len());
        for file in accepted {
            let thumbnail_url = self.thumbnail_for(&file).await;
            let record = self
                .files
                .create(NewFile {
                    name: file.name,
                    size: file.size,
                    mime_type: file.mime_type,
                    thumbnail_url,
                })
                .await;

            self.file_sessions
                .insert(record.id.clone(), session.id.clone());
            if let Err(e) = self.spawn_upload(&record) {
                warn!(file_id = %record.id, error = %e, "Could not start upload");
            }
            added.push(record);
        }

        info!(
            added = added.len(),
            rejected = rejected.len(),
            session_id = %session.id,
            "Files queued"
        );
        set_queue_files(self.files.store().files().len());

        Ok(AddFilesReport {
            added,
            rejected,
            session: Some(session),
        })
    }

    /// Start an upload attempt for `id` in the background.
    pub async fn start_upload(
        &self,
        id: &str,
    ) -> CoordinatorResult<JoinHandle<CoordinatorResult<TransferOutcome>>> {
        let record = self
            .files
            .get_by_id(id)
            .await
            .ok_or_else(|| CoordinatorError::FileNotFound(id.to_string()))?;
        self.spawn_upload(&record)
    }

    /// Start every pending file. Returns the ids started.
    pub async fn start_all(&self) -> Vec<String> {
        let pending = self.files.files_by_status(FileStatus::Pending).await;
        let mut started = Vec::new();
        for record in pending {
            if self.spawn_upload(&record).is_ok() {
                started.push(record.id);
            }
        }
        info!(count = started.len(), "Started pending uploads");
        started
    }

    pub async fn pause(&self, id: &str) -> CoordinatorResult<Option<FileRecord>> {
        Ok(self.files.pause_upload(id).await?)
    }

    /// Continue a paused file from its stored progress.
    pub async fn resume(
        &self,
        id: &str,
    ) -> CoordinatorResult<JoinHandle<CoordinatorResult<TransferOutcome>>> {
        self.start_upload(id).await
    }

    pub async fn cancel(&self, id: &str) -> CoordinatorResult<FileRecord> {
        let record = self.files.cancel_upload(id).await?;
        self.speed.forget(id);
        Ok(record)
    }

    /// Remove a file, stopping its upload first.
    pub async fn remove(&self, id: &str) -> CoordinatorResult<FileRecord> {
        let record = self.files.delete(id).await?;
        self.file_sessions.remove(id);
        self.speed.forget(id);
        set_queue_files(self.files.store().files().len());
        Ok(record)
    }

    /// Drop completed files from the queue. Returns how many remain.
    pub async fn clear_completed(&self) -> usize {
        let remaining = self.files.clear_completed().await;
        let store = self.files.store().files();
        self.file_sessions.retain(|id, _| store.find(id).is_some());
        set_queue_files(remaining);
        remaining
    }

    pub async fn stats(&self) -> QueueStats {
        let records = self.files.get_all().await;
        QueueStats {
            total_files: records.len(),
            completed_files: records
                .iter()
                .filter(|f| f.status == FileStatus::Completed)
                .count(),
            total_size: records.iter().map(|f| f.size).sum(),
            upload_speed: self.speed.current(),
            active_uploads: self.files.active_ids().len(),
        }
    }

    /// Progress of every file currently uploading.
    pub fn progress_snapshot(&self) -> Vec<FileProgress> {
        self.files
            .store()
            .files()
            .filter(|f| f.status == FileStatus::Uploading)
            .iter()
            .map(FileProgress::from)
            .collect()
    }

    async fn thumbnail_for(&self, file: &SelectedFile) -> Option<String> {
        let thumbnails = self.thumbnails.clone();
        let source = file.clone();
        match tokio::task::spawn_blocking(move || thumbnails.generate(&source)).await {
            Ok(url) => url,
            Err(e) => {
                warn!(name = %file.name, error = %e, "Thumbnail task failed");
                None
            }
        }
    }

    /// Register the attempt now and run it in the background. Fails with
    /// `AlreadyInProgress` while another attempt holds the id.
    fn spawn_upload(
        &self,
        record: &FileRecord,
    ) -> CoordinatorResult<JoinHandle<CoordinatorResult<TransferOutcome>>> {
        let guard = self.files.simulator().active().register(&record.id)?;
        let coordinator = self.clone();
        let size = record.size;
        Ok(tokio::spawn(async move {
            coordinator.run_upload(guard, size).await
        }))
    }

    async fn run_upload(&self, guard: AttemptGuard, size: u64) -> CoordinatorResult<TransferOutcome> {
        let id = guard.file_id().to_string();
        let id = id.as_str();
        let speed = self.speed.clone();
        let key = id.to_string();
        let result = self
            .files
            .simulator()
            .run_registered(guard, move |progress| {
                speed.observe(&key, size * u64::from(progress) / 100);
                Ok(())
            })
            .await;
        self.speed.forget(id);

        let outcome = match result {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(file_id = id, error = %e, "Background upload failed");
                return Err(e.into());
            }
        };

        if outcome.is_completed() {
            // A file counts towards its session once
            let session_id = self.file_sessions.remove(id).map(|(_, session_id)| session_id);
            if let Some(session_id) = session_id {
                if let Err(e) = self.sessions.record_completed(&session_id).await {
                    warn!(file_id = id, %session_id, error = %e, "Could not count completed file");
                }
            }
        }
        Ok(outcome)
    }
}

impl Clone for UploadCoordinator {
    fn clone(&self) -> Self {
        Self {
            files: self.files.clone(),
            sessions: self.sessions.clone(),
            validator: self.validator.clone(),
            thumbnails: self.thumbnails.clone(),
            speed: self.speed.clone(),
            file_sessions: self.file_sessions.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::FixedRandom;
    use crate::transfer::{StopReason, TransferTiming};
    use std::time::Duration;

    fn coordinator(timing: TransferTiming) -> UploadCoordinator {
        let config = UploadConfig::fast().with_timing(timing);
        UploadCoordinator::new(
            Arc::new(MockStore::in_memory()),
            &config,
            Arc::new(FixedRandom::new(0.5)),
        )
    }

    async fn wait_for_completed_files(coordinator: &UploadCoordinator, expected: usize) {
        for _ in 0..1000 {
            if coordinator.stats().await.completed_files >= expected {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("uploads did not finish");
    }

    #[tokio::test]
    async fn test_add_files_rejects_everything_invalid() {
        let coordinator = coordinator(TransferTiming::fast());
        let report = coordinator
            .add_files(vec![SelectedFile::described("a.exe", 10, "application/x-msdownload")])
            .await
            .unwrap();

        assert!(report.is_empty());
        assert_eq!(report.rejected.len(), 1);
        assert!(report.session.is_none());
        assert!(coordinator.sessions().current_session().is_none());
    }

    #[tokio::test]
    async fn test_add_files_counts_session_completion() {
        let coordinator = coordinator(TransferTiming::fast());
        let report = coordinator
            .add_files(vec![
                SelectedFile::described("a.mp4", 1_000_000, "video/mp4"),
                SelectedFile::described("b.mp4", 2_000_000, "video/mp4"),
                SelectedFile::described("c.exe", 5, "application/x-msdownload"),
            ])
            .await
            .unwrap();

        assert_eq!(report.added.len(), 2);
        assert_eq!(report.rejected.len(), 1);
        let session = report.session.unwrap();
        assert_eq!(session.total_files, 2);
        assert_eq!(session.total_size, 3_000_000);

        wait_for_completed_files(&coordinator, 2).await;
        let mut stats = None;
        for _ in 0..100 {
            let current = coordinator
                .sessions()
                .get_session_stats(&session.id)
                .await
                .unwrap();
            if current.session.completed_files == 2 {
                stats = Some(current);
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        let stats = stats.expect("session should count both files");
        assert_eq!(stats.completion_rate, 100.0);

        let queue = coordinator.stats().await;
        assert_eq!(queue.total_files, 2);
        assert_eq!(queue.completed_files, 2);
        assert_eq!(queue.total_size, 3_000_000);
        assert_eq!(queue.active_uploads, 0);
    }

    #[tokio::test]
    async fn test_start_upload_checks() {
        let coordinator =
            coordinator(TransferTiming::default().with_delay(Duration::from_millis(20), Duration::from_millis(20)));
        let err = coordinator.start_upload("missing").await.unwrap_err();
        assert!(err.is_not_found());

        let record = coordinator
            .files()
            .create(NewFile {
                name: "a.txt".to_string(),
                size: 10,
                mime_type: "text/plain".to_string(),
                thumbnail_url: None,
            })
            .await;
        let handle = coordinator.start_upload(&record.id).await.unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;

        let err = coordinator.start_upload(&record.id).await.unwrap_err();
        assert!(matches!(err, CoordinatorError::AlreadyInProgress(_)));

        coordinator.cancel(&record.id).await.unwrap();
        let outcome = handle.await.unwrap().unwrap();
        assert_eq!(outcome.stop_reason(), Some(StopReason::Cancel));
    }

    #[tokio::test]
    async fn test_add_files_attaches_thumbnail() {
        let coordinator = coordinator(TransferTiming::fast())
            .with_thumbnailer(Arc::new(ImageThumbnailer::default()));

        let pixels = image::RgbaImage::from_pixel(8, 8, image::Rgba([0, 0, 255, 255]));
        let mut png = std::io::Cursor::new(Vec::new());
        image::DynamicImage::ImageRgba8(pixels)
            .write_to(&mut png, image::ImageFormat::Png)
            .unwrap();

        let report = coordinator
            .add_files(vec![
                SelectedFile::new("pic.png", "image/png", png.into_inner()),
                SelectedFile::described("notes.txt", 10, "text/plain"),
            ])
            .await
            .unwrap();

        let url = report.added[0].thumbnail_url.as_deref().unwrap();
        assert!(url.starts_with("data:image/png;base64,"));
        assert!(report.added[1].thumbnail_url.is_none());
    }

    #[tokio::test]
    async fn test_concurrent_starts_admit_one() {
        let coordinator =
            coordinator(TransferTiming::default().with_delay(Duration::from_millis(20), Duration::from_millis(20)));
        let record = coordinator
            .files()
            .create(NewFile {
                name: "a.txt".to_string(),
                size: 10,
                mime_type: "text/plain".to_string(),
                thumbnail_url: None,
            })
            .await;

        let (first, second) = tokio::join!(
            coordinator.start_upload(&record.id),
            coordinator.start_upload(&record.id)
        );
        let (handle, err) = match (first, second) {
            (Ok(handle), Err(err)) | (Err(err), Ok(handle)) => (handle, err),
            _ => panic!("exactly one start should be admitted"),
        };
        assert!(matches!(err, CoordinatorError::AlreadyInProgress(_)));

        coordinator.cancel(&record.id).await.unwrap();
        let outcome = handle.await.unwrap().unwrap();
        assert_eq!(outcome.stop_reason(), Some(StopReason::Cancel));
    }

    #[tokio::test]
    async fn test_reupload_does_not_recount_session() {
        let coordinator = coordinator(TransferTiming::fast());
        let report = coordinator
            .add_files(vec![SelectedFile::described("a.mp4", 1_000, "video/mp4")])
            .await
            .unwrap();
        let id = report.added[0].id.clone();
        let session = report.session.unwrap();

        for _ in 0..1000 {
            let current = coordinator.sessions().get_by_id(&session.id).await.unwrap();
            if current.completed_files == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        // Leave room in the session so a second count would show
        coordinator
            .sessions()
            .update_session(&session.id, crate::store::SessionPatch::totals(2, 2_000))
            .await
            .unwrap();

        let outcome = coordinator.start_upload(&id).await.unwrap().await.unwrap().unwrap();
        assert!(outcome.is_completed());

        let stats = coordinator
            .sessions()
            .get_session_stats(&session.id)
            .await
            .unwrap();
        assert_eq!(stats.session.completed_files, 1);
        assert_eq!(stats.completion_rate, 50.0);
    }

    #[tokio::test]
    async fn test_start_all_only_pending() {
        let coordinator = coordinator(TransferTiming::fast());
        for name in ["a.txt", "b.txt"] {
            coordinator
                .files()
                .create(NewFile {
                    name: name.to_string(),
                    size: 10,
                    mime_type: "text/plain".to_string(),
                    thumbnail_url: None,
                })
                .await;
        }
        let cancelled = coordinator.files().get_all().await[1].clone();
        coordinator.cancel(&cancelled.id).await.unwrap();

        let started = coordinator.start_all().await;
        assert_eq!(started.len(), 1);
        wait_for_completed_files(&coordinator, 1).await;

        let stats = coordinator.stats().await;
        assert_eq!(stats.completed_files, 1);
        assert_eq!(coordinator.clear_completed().await, 1);
    }

    #[tokio::test]
    async fn test_remove_in_flight() {
        let coordinator =
            coordinator(TransferTiming::default().with_delay(Duration::from_millis(20), Duration::from_millis(20)));
        let report = coordinator
            .add_files(vec![SelectedFile::described("a.txt", 100, "text/plain")])
            .await
            .unwrap();
        let id = report.added[0].id.clone();
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(coordinator.progress_snapshot().len(), 1);

        coordinator.remove(&id).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(coordinator.files().get_by_id(&id).await.is_none());
        assert!(coordinator.progress_snapshot().is_empty());
    }
}
