use crate::store::{FileRecord, FileStatus, UploadSession};
use crate::validation::ValidationError;
use serde::{Deserialize, Serialize};

/// Result of adding a selection to the queue.
#[derive(Debug, Clone)]
pub struct AddFilesReport {
    /// Records created for the accepted files, in selection order
    pub added: Vec<FileRecord>,
    pub rejected: Vec<ValidationError>,
    /// The session the accepted files were counted in
    pub session: Option<UploadSession>,
}

impl AddFilesReport {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty()
    }
}

/// Aggregate figures for the whole queue.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QueueStats {
    pub total_files: usize,
    pub completed_files: usize,
    pub total_size: u64,
    /// Bytes per second from the latest speed sample
    pub upload_speed: f64,
    pub active_uploads: usize,
}

/// Progress of one file, as pushed to live subscribers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FileProgress {
    pub id: String,
    pub name: String,
    pub status: FileStatus,
    pub progress: u8,
    pub bytes_uploaded: u64,
    pub size: u64,
}

impl From<&FileRecord> for FileProgress {
    fn from(record: &FileRecord) -> Self {
        Self {
            id: record.id.clone(),
            name: record.name.clone(),
            status: record.status,
            progress: record.progress,
            bytes_uploaded: record.bytes_uploaded(),
            size: record.size,
        }
    }
}
