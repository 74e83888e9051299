use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::UploadError;

/// Destination that accepts named byte streams.
///
/// Implementations must report an existing asset of the same name as
/// [`UploadError::AlreadyExists`] and must not leave partial assets behind on failure.
pub trait AssetSink: Send + Sync {
    /// Upload `size` bytes read from `content` under `name`.
    fn upload(&self, name: &str, size: u64, content: File) -> Result<(), UploadError>;
}

impl<T: AssetSink + ?Sized> AssetSink for &T {
    fn upload(&self, name: &str, size: u64, content: File) -> Result<(), UploadError> {
        (**self).upload(name, size, content)
    }
}

impl<T: AssetSink + ?Sized> AssetSink for std::sync::Arc<T> {
    fn upload(&self, name: &str, size: u64, content: File) -> Result<(), UploadError> {
        (**self).upload(name, size, content)
    }
}

/// Publishes into a local directory without ever overwriting.
#[derive(Clone, Debug)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }
}

impl AssetSink for DirectorySink {
    fn upload(&self, name: &str, _size: u64, mut content: File) -> Result<(), UploadError> {
        if name.is_empty() || name.contains(['/', '\\']) || name == "." || name == ".." {
            return Err(UploadError::Rejected {
                message: format!("invalid asset name '{name}'"),
            });
        }

        let target = self.dir.join(name);
        if target.exists() {
            return Err(UploadError::AlreadyExists);
        }

        let mut tmp = tempfile::Builder::new()
            .prefix(".upload-")
            .tempfile_in(&self.dir)?;
        io::copy(&mut content, &mut tmp)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tmp.as_file()
                .set_permissions(std::fs::Permissions::from_mode(0o755))?;
        }

        tmp.persist_noclobber(&target).map_err(|e| {
            if e.error.kind() == io::ErrorKind::AlreadyExists {
                UploadError::AlreadyExists
            } else {
                UploadError::Io { source: e.error }
            }
        })?;
        Ok(())
    }
}
