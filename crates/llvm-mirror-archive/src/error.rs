use std::io;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("unsupported archive format: '{name}'")]
    UnsupportedFormat { name: String },

    #[error("archive is corrupted: {source}")]
    CorruptArchive {
        #[source]
        source: io::Error,
    },
}

impl Error {
    pub(crate) fn corrupt(source: io::Error) -> Self {
        Self::CorruptArchive { source }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
