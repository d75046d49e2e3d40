use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Pending,
    Uploading,
    Paused,
    Completed,
    Error,
    Cancelled,
}

impl FileStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileStatus::Pending => "pending",
            FileStatus::Uploading => "uploading",
            FileStatus::Paused => "paused",
            FileStatus::Completed => "completed",
            FileStatus::Error => "error",
            FileStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, FileStatus::Uploading)
    }

    pub fn is_paused(&self) -> bool {
        matches!(self, FileStatus::Paused)
    }

    /// Terminal for the current attempt. A new attempt may still be started.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            FileStatus::Completed | FileStatus::Error | FileStatus::Cancelled
        )
    }
}

impl fmt::Display for FileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    pub id: String,
    pub name: String,
    pub size: u64,
    #[serde(rename = "type")]
    pub mime_type: String,
    pub status: FileStatus,
    pub progress: u8,
    #[serde(default)]
    pub uploaded_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
}

impl FileRecord {
    /// Bytes covered by the current progress value.
    pub fn bytes_uploaded(&self) -> u64 {
        self.size * u64::from(self.progress) / 100
    }
}

/// Fields supplied by the caller when registering a file.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewFile {
    pub name: String,
    pub size: u64,
    #[serde(rename = "type")]
    pub mime_type: String,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
}

/// Partial update merged into a [`FileRecord`]. Absent fields are left alone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilePatch {
    pub status: Option<FileStatus>,
    pub progress: Option<u8>,
    pub uploaded_at: Option<Option<DateTime<Utc>>>,
}

impl FilePatch {
    pub fn status(status: FileStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn progress(progress: u8) -> Self {
        Self {
            progress: Some(progress),
            ..Default::default()
        }
    }

    pub fn with_progress(mut self, progress: u8) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Start of an attempt. Clears any completion stamp left by an earlier attempt.
    pub fn uploading(progress: u8) -> Self {
        Self {
            status: Some(FileStatus::Uploading),
            progress: Some(progress),
            uploaded_at: Some(None),
        }
    }

    pub fn completed(at: DateTime<Utc>) -> Self {
        Self {
            status: Some(FileStatus::Completed),
            progress: Some(100),
            uploaded_at: Some(Some(at)),
        }
    }

    pub fn cancelled() -> Self {
        Self::status(FileStatus::Cancelled).with_progress(0)
    }

    pub fn failed() -> Self {
        Self::status(FileStatus::Error).with_progress(0)
    }

    pub(crate) fn apply(self, record: &mut FileRecord) {
        if let Some(status) = self.status {
            record.status = status;
        }
        if let Some(progress) = self.progress {
            record.progress = progress.min(100);
        }
        if let Some(uploaded_at) = self.uploaded_at {
            record.uploaded_at = uploaded_at;
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Active,
    Completed,
    Cancelled,
}

impl SessionStatus {
    pub fn is_active(&self) -> bool {
        matches!(self, SessionStatus::Active)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UploadSession {
    pub id: String,
    pub total_files: u32,
    pub total_size: u64,
    pub completed_files: u32,
    pub start_time: DateTime<Utc>,
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
    pub status: SessionStatus,
}

/// Seed values for a new session.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NewSession {
    #[serde(default)]
    pub total_files: u32,
    #[serde(default)]
    pub total_size: u64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionPatch {
    pub total_files: Option<u32>,
    pub total_size: Option<u64>,
    pub completed_files: Option<u32>,
    pub end_time: Option<DateTime<Utc>>,
    pub status: Option<SessionStatus>,
}

impl SessionPatch {
    pub fn totals(total_files: u32, total_size: u64) -> Self {
        Self {
            total_files: Some(total_files),
            total_size: Some(total_size),
            ..Default::default()
        }
    }

    pub fn completed_files(completed_files: u32) -> Self {
        Self {
            completed_files: Some(completed_files),
            ..Default::default()
        }
    }

    pub fn closed(status: SessionStatus, at: DateTime<Utc>) -> Self {
        Self {
            status: Some(status),
            end_time: Some(at),
            ..Default::default()
        }
    }

    pub(crate) fn apply(self, session: &mut UploadSession) {
        if let Some(total_files) = self.total_files {
            session.total_files = total_files;
        }
        if let Some(total_size) = self.total_size {
            session.total_size = total_size;
        }
        if let Some(completed_files) = self.completed_files {
            session.completed_files = completed_files;
        }
        if let Some(end_time) = self.end_time {
            session.end_time = Some(end_time);
        }
        if let Some(status) = self.status {
            session.status = status;
        }
        // completed_files never exceeds total_files
        session.completed_files = session.completed_files.min(session.total_files);
    }
}
