use crate::coordinator::{FileProgress, QueueStats};
use crate::store::{FileRecord, UploadSession};
use crate::validation::ValidationError;
use serde::{Deserialize, Serialize};

/// One file in an add-files request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileDescriptor {
    pub name: String,
    pub size: u64,
    #[serde(rename = "type")]
    pub mime_type: String,
    /// Base64 file content, used for thumbnails
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddFilesRequest {
    pub files: Vec<FileDescriptor>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RejectedFile {
    pub name: String,
    pub error: String,
}

impl From<&ValidationError> for RejectedFile {
    fn from(err: &ValidationError) -> Self {
        Self {
            name: err.file_name().to_string(),
            error: err.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddFilesResponse {
    pub added: Vec<FileRecord>,
    pub rejected: Vec<RejectedFile>,
    pub session: Option<UploadSession>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartUploadResponse {
    pub file_id: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartAllResponse {
    pub started: Vec<String>,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PauseResponse {
    pub paused: bool,
    pub file: Option<FileRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClearCompletedResponse {
    pub remaining: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum WebSocketMessage {
    Progress(Vec<FileProgress>),
    Stats(QueueStats),
    Error(ErrorResponse),
}
