use crate::store::collection::{Collection, Latency};
use crate::store::error::StoreResult;
use crate::store::types::{FileRecord, UploadSession};

const FILE_FIXTURES: &str = include_str!("../../fixtures/files.json");
const SESSION_FIXTURES: &str = include_str!("../../fixtures/sessions.json");

/// Process-wide record store, constructed once and shared behind an `Arc`.
pub struct MockStore {
    files: Collection<FileRecord>,
    sessions: Collection<UploadSession>,
}

impl MockStore {
    /// Create a store seeded with the bundled fixtures
    pub fn new(latency: Latency) -> StoreResult<Self> {
        let (files, sessions) = Self::load_fixtures()?;
        Ok(Self {
            files: Collection::new(files, latency.clone()),
            sessions: Collection::new(sessions, latency),
        })
    }

    /// Create a store without any fixture data
    pub fn empty(latency: Latency) -> Self {
        Self {
            files: Collection::new(Vec::new(), latency.clone()),
            sessions: Collection::new(Vec::new(), latency),
        }
    }

    /// Create an empty store with no latency (for testing)
    pub fn in_memory() -> Self {
        Self::empty(Latency::none())
    }

    pub fn files(&self) -> &Collection<FileRecord> {
        &self.files
    }

    pub fn sessions(&self) -> &Collection<UploadSession> {
        &self.sessions
    }

    /// Restore the fixture contents, discarding every change made since.
    pub fn reset(&self) -> StoreResult<()> {
        let (files, sessions) = Self::load_fixtures()?;
        self.files.replace_all(files);
        self.sessions.replace_all(sessions);
        Ok(())
    }

    /// Drop every record.
    pub fn clear(&self) {
        self.files.replace_all(Vec::new());
        self.sessions.replace_all(Vec::new());
    }

    fn load_fixtures() -> StoreResult<(Vec<FileRecord>, Vec<UploadSession>)> {
        let files: Vec<FileRecord> = serde_json::from_str(FILE_FIXTURES)?;
        let sessions: Vec<UploadSession> = serde_json::from_str(SESSION_FIXTURES)?;
        Ok((files, sessions))
    }
}
