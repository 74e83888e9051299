use std::io;
use std::path::PathBuf;

use llvm_mirror_publish::{PublishError, StagingError};

use crate::github::GithubError;

/// Asset-level failure. Each variant abandons the asset it names.
#[derive(Debug, thiserror::Error)]
pub enum MirrorError {
    #[error("{asset}: unsupported archive format")]
    UnsupportedFormat { asset: String },

    #[error("{asset}: archive is corrupted: {source}")]
    CorruptArchive {
        asset: String,
        entry: Option<PathBuf>,
        #[source]
        source: io::Error,
    },

    #[error("{asset}: failed to stage '{}': {source}", .entry.display())]
    Staging {
        asset: String,
        entry: PathBuf,
        #[source]
        source: StagingError,
    },

    #[error("{asset}: entry '{}': {source}", .entry.display())]
    Publish {
        asset: String,
        entry: PathBuf,
        #[source]
        source: PublishError,
    },

    #[error("{asset}: download failed: {source}")]
    Download {
        asset: String,
        #[source]
        source: GithubError,
    },

    #[error("{asset}: failed to open archive: {source}")]
    Open {
        asset: String,
        #[source]
        source: io::Error,
    },

    #[error("{asset}: worker failed: {message}")]
    Worker { asset: String, message: String },
}

impl MirrorError {
    pub fn asset(&self) -> &str {
        match self {
            Self::UnsupportedFormat { asset }
            | Self::CorruptArchive { asset, .. }
            | Self::Staging { asset, .. }
            | Self::Publish { asset, .. }
            | Self::Download { asset, .. }
            | Self::Open { asset, .. }
            | Self::Worker { asset, .. } => asset,
        }
    }

    pub(crate) fn from_archive(asset: &str, error: llvm_mirror_archive::Error) -> Self {
        match error {
            llvm_mirror_archive::Error::UnsupportedFormat { .. } => Self::UnsupportedFormat {
                asset: asset.to_string(),
            },
            llvm_mirror_archive::Error::CorruptArchive { source } => Self::CorruptArchive {
                asset: asset.to_string(),
                entry: None,
                source,
            },
        }
    }

    /// A read failure while staging is the archive stream breaking, not local storage.
    pub(crate) fn from_staging(asset: &str, entry: PathBuf, error: StagingError) -> Self {
        match error {
            StagingError::Read { source } => Self::CorruptArchive {
                asset: asset.to_string(),
                entry: Some(entry),
                source,
            },
            other => Self::Staging {
                asset: asset.to_string(),
                entry,
                source: other,
            },
        }
    }
}
