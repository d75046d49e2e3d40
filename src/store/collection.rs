use crate::random::{RandomSource, ThreadRandom};
use crate::store::error::{StoreError, StoreResult};
use crate::store::types::{
    FilePatch, FileRecord, FileStatus, NewFile, NewSession, SessionPatch, SessionStatus,
    UploadSession,
};
use chrono::Utc;
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// A record type that can live in a [`Collection`].
pub trait Record: Clone + Send + Sync + 'static {
    type Draft: Send;
    type Patch: Send;

    /// Name used in NotFound errors.
    const KIND: &'static str;

    fn id(&self) -> &str;

    fn from_draft(id: String, draft: Self::Draft) -> Self;

    fn apply(&mut self, patch: Self::Patch);
}

impl Record for FileRecord {
    type Draft = NewFile;
    type Patch = FilePatch;

    const KIND: &'static str = "File";

    fn id(&self) -> &str {
        &self.id
    }

    fn from_draft(id: String, draft: NewFile) -> Self {
        Self {
            id,
            name: draft.name,
            size: draft.size,
            mime_type: draft.mime_type,
            status: FileStatus::Pending,
            progress: 0,
            uploaded_at: None,
            thumbnail_url: draft.thumbnail_url,
        }
    }

    fn apply(&mut self, patch: FilePatch) {
        patch.apply(self);
    }
}

impl Record for UploadSession {
    type Draft = NewSession;
    type Patch = SessionPatch;

    const KIND: &'static str = "Session";

    fn id(&self) -> &str {
        &self.id
    }

    fn from_draft(id: String, draft: NewSession) -> Self {
        Self {
            id,
            total_files: draft.total_files,
            total_size: draft.total_size,
            completed_files: 0,
            start_time: Utc::now(),
            end_time: None,
            status: SessionStatus::Active,
        }
    }

    fn apply(&mut self, patch: SessionPatch) {
        patch.apply(self);
    }
}

/// Artificial round-trip delay applied before each async store operation.
#[derive(Clone)]
pub struct Latency {
    min: Duration,
    max: Duration,
    random: Arc<dyn RandomSource>,
}

impl Latency {
    pub fn none() -> Self {
        Self {
            min: Duration::ZERO,
            max: Duration::ZERO,
            random: Arc::new(ThreadRandom),
        }
    }

    pub fn between(min: Duration, max: Duration, random: Arc<dyn RandomSource>) -> Self {
        Self {
            min: min.min(max),
            max,
            random,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.max.is_zero()
    }

    pub async fn wait(&self) {
        if self.is_zero() {
            return;
        }
        let delay = self.random.duration_between(self.min, self.max);
        tokio::time::sleep(delay).await;
    }
}

impl Default for Latency {
    fn default() -> Self {
        Self::between(
            Duration::from_millis(100),
            Duration::from_millis(300),
            Arc::new(ThreadRandom),
        )
    }
}

impl fmt::Debug for Latency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Latency")
            .field("min", &self.min)
            .field("max", &self.max)
            .finish()
    }
}

/// Insertion-ordered collection of records keyed by id.
///
/// The lock is never held across an await point: the latency is waited out
/// first, then the mutation runs synchronously.
pub struct Collection<R: Record> {
    items: RwLock<Vec<R>>,
    latency: Latency,
}

impl<R: Record> Collection<R> {
    pub fn new(items: Vec<R>, latency: Latency) -> Self {
        Self {
            items: RwLock::new(items),
            latency,
        }
    }

    pub fn latency(&self) -> &Latency {
        &self.latency
    }

    pub async fn get_all(&self) -> Vec<R> {
        self.latency.wait().await;
        self.snapshot()
    }

    pub async fn get_by_id(&self, id: &str) -> Option<R> {
        self.latency.wait().await;
        self.find(id)
    }

    /// Append a new record with a freshly assigned id.
    pub async fn create(&self, draft: R::Draft) -> R {
        self.latency.wait().await;
        let record = R::from_draft(uuid::Uuid::new_v4().to_string(), draft);
        self.items.write().push(record.clone());
        record
    }

    pub async fn update(&self, id: &str, patch: R::Patch) -> StoreResult<R> {
        self.latency.wait().await;
        let mut items = self.items.write();
        let record = items
            .iter_mut()
            .find(|r| r.id() == id)
            .ok_or_else(|| StoreError::not_found(R::KIND, id))?;
        record.apply(patch);
        Ok(record.clone())
    }

    pub async fn delete(&self, id: &str) -> StoreResult<R> {
        self.latency.wait().await;
        let mut items = self.items.write();
        let index = items
            .iter()
            .position(|r| r.id() == id)
            .ok_or_else(|| StoreError::not_found(R::KIND, id))?;
        Ok(items.remove(index))
    }

    pub fn snapshot(&self) -> Vec<R> {
        self.items.read().clone()
    }

    pub fn find(&self, id: &str) -> Option<R> {
        self.items.read().iter().find(|r| r.id() == id).cloned()
    }

    pub fn filter(&self, predicate: impl Fn(&R) -> bool) -> Vec<R> {
        self.items
            .read()
            .iter()
            .filter(|r| predicate(r))
            .cloned()
            .collect()
    }

    /// Keep only the records matching `predicate`. Returns the remaining count.
    pub fn retain(&self, predicate: impl Fn(&R) -> bool) -> usize {
        let mut items = self.items.write();
        items.retain(|r| predicate(r));
        items.len()
    }

    pub fn replace_all(&self, records: Vec<R>) {
        *self.items.write() = records;
    }

    pub fn len(&self) -> usize {
        self.items.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.read().is_empty()
    }
}
