use std::fs::File;
use std::io::{self, Read, Write};
use std::path::Path;

use tempfile::{NamedTempFile, TempDir};

use crate::error::StagingError;

const COPY_BUFFER: usize = 64 * 1024;

/// Per-archive staging area.
///
/// Every staged file lives in a private temporary directory that is removed together
/// with the `Stager`, so concurrent pipelines never share a namespace.
#[derive(Debug)]
pub struct Stager {
    dir: TempDir,
}

impl Stager {
    /// Create a staging area under the system temp directory.
    pub fn new() -> Result<Self, StagingError> {
        Self::new_in(std::env::temp_dir())
    }

    /// Create a staging area under `root`, which must exist.
    pub fn new_in(root: impl AsRef<Path>) -> Result<Self, StagingError> {
        let root = root.as_ref();
        let dir = tempfile::Builder::new()
            .prefix("llvm-mirror-")
            .tempdir_in(root)
            .map_err(|source| StagingError::Create {
                path: root.to_path_buf(),
                source,
            })?;
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Copy `reader` to completion into a new uniquely named file.
    ///
    /// The returned file is deleted when dropped.
    pub fn stage<R: Read>(
        &self,
        reader: &mut R,
        name: impl Into<String>,
    ) -> Result<StagedFile, StagingError> {
        let mut file = tempfile::Builder::new()
            .prefix(".staged-")
            .tempfile_in(self.dir.path())
            .map_err(|source| StagingError::Create {
                path: self.dir.path().to_path_buf(),
                source,
            })?;

        let size = copy_entry(reader, &mut file)?;
        file.as_file().sync_data().map_err(|source| StagingError::Write {
            path: file.path().to_path_buf(),
            source,
        })?;

        let name = name.into();
        tracing::debug!(name = %name, size, path = %file.path().display(), "staged");
        Ok(StagedFile { file, name, size })
    }
}

/// Entry content copied to local storage under its republished name.
#[derive(Debug)]
pub struct StagedFile {
    file: NamedTempFile,
    name: String,
    size: u64,
}

impl StagedFile {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Fresh read handle positioned at the start of the content.
    pub fn open(&self) -> io::Result<File> {
        self.file.reopen()
    }
}

fn copy_entry<R: Read>(reader: &mut R, file: &mut NamedTempFile) -> Result<u64, StagingError> {
    let mut buffer = vec![0u8; COPY_BUFFER];
    let mut total = 0u64;
    loop {
        let n = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(source) => return Err(StagingError::Read { source }),
        };
        file.write_all(&buffer[..n])
            .map_err(|source| StagingError::Write {
                path: file.path().to_path_buf(),
                source,
            })?;
        total += n as u64;
    }
    Ok(total)
}
