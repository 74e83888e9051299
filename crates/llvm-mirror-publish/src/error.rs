use std::io;
use std::path::PathBuf;

/// Local temporary-storage failures while staging an entry.
#[derive(Debug, thiserror::Error)]
pub enum StagingError {
    #[error("failed to create staging area in '{path}': {source}")]
    Create { path: PathBuf, source: io::Error },

    /// The entry stream itself failed; usually a truncated or corrupt archive.
    #[error("failed to read entry content: {source}")]
    Read { source: io::Error },

    #[error("failed to write staged file '{path}': {source}")]
    Write { path: PathBuf, source: io::Error },
}

/// Failure reported by a destination for one upload attempt.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("asset already exists at destination")]
    AlreadyExists,

    #[error("transient upload failure: {message}")]
    Transient { message: String },

    #[error("upload rejected: {message}")]
    Rejected { message: String },

    #[error("staged file unreadable: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl UploadError {
    /// Whether another attempt may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }
}

#[derive(Debug, thiserror::Error)]
#[error("failed to publish '{name}' after {attempts} attempt(s): {source}")]
pub struct PublishError {
    pub name: String,
    pub attempts: u32,
    #[source]
    pub source: UploadError,
}
