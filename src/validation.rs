//! Admission checks for selected files

use bytes::Bytes;
use thiserror::Error;

pub const DEFAULT_MAX_FILE_SIZE: u64 = 100 * 1024 * 1024;

pub const DEFAULT_ALLOWED_TYPES: &[&str] = &[
    "image/",
    "video/",
    "audio/",
    "application/pdf",
    "application/msword",
    "application/vnd.openxmlformats",
    "text/",
    "application/zip",
    "application/x-rar",
];

/// A file handed over by the selection source.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectedFile {
    pub name: String,
    pub size: u64,
    pub mime_type: String,
    pub content: Bytes,
}

impl SelectedFile {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, content: impl Into<Bytes>) -> Self {
        let content = content.into();
        Self {
            name: name.into(),
            size: content.len() as u64,
            mime_type: mime_type.into(),
            content,
        }
    }

    /// A file known only by its metadata.
    pub fn described(name: impl Into<String>, size: u64, mime_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            size,
            mime_type: mime_type.into(),
            content: Bytes::new(),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("File \"{name}\" is too large. Maximum size is {limit_mb}MB.")]
    FileTooLarge { name: String, size: u64, limit_mb: u64 },

    #[error("File type \"{mime_type}\" of \"{name}\" is not supported.")]
    UnsupportedType { name: String, mime_type: String },
}

impl ValidationError {
    pub fn file_name(&self) -> &str {
        match self {
            ValidationError::FileTooLarge { name, .. } => name,
            ValidationError::UnsupportedType { name, .. } => name,
        }
    }

    /// Short label used for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            ValidationError::FileTooLarge { .. } => "too_large",
            ValidationError::UnsupportedType { .. } => "unsupported_type",
        }
    }
}

/// Size and MIME-prefix check applied before a record is created.
#[derive(Debug, Clone)]
pub struct FileValidator {
    max_file_size: u64,
    allowed_types: Vec<String>,
}

impl Default for FileValidator {
    fn default() -> Self {
        Self::new(
            DEFAULT_MAX_FILE_SIZE,
            DEFAULT_ALLOWED_TYPES.iter().map(|t| t.to_string()).collect(),
        )
    }
}

impl FileValidator {
    pub fn new(max_file_size: u64, allowed_types: Vec<String>) -> Self {
        Self {
            max_file_size,
            allowed_types,
        }
    }

    pub fn max_file_size(&self) -> u64 {
        self.max_file_size
    }

    pub fn validate(&self, file: &SelectedFile) -> Result<(), ValidationError> {
        if file.size > self.max_file_size {
            return Err(ValidationError::FileTooLarge {
                name: file.name.clone(),
                size: file.size,
                limit_mb: self.max_file_size / (1024 * 1024),
            });
        }

        if !self
            .allowed_types
            .iter()
            .any(|prefix| file.mime_type.starts_with(prefix.as_str()))
        {
            return Err(ValidationError::UnsupportedType {
                name: file.name.clone(),
                mime_type: file.mime_type.clone(),
            });
        }

        Ok(())
    }

    /// Split a selection into accepted files and per-file rejections.
    pub fn validate_batch(
        &self,
        files: Vec<SelectedFile>,
    ) -> (Vec<SelectedFile>, Vec<ValidationError>) {
        let mut accepted = Vec::with_capacity(files.len());
        let mut rejected = Vec::new();
        for file in files {
            match self.validate(&file) {
                Ok(()) => accepted.push(file),
                Err(e) => rejected.push(e),
            }
        }
        (accepted, rejected)
    }
}
