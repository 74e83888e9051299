use std::io::{self, Read};
use std::path::{Component, Path, PathBuf};

use crate::entry::{EntryKind, EntryMeta};
use crate::error::{Error, Result};

/// Forward-only walk over a decompressed tar stream.
///
/// Only entries whose path lies under one of the configured prefixes are surfaced; the
/// rest are skipped in stream order. The walk is single-pass: [`TarWalker::entries`] can
/// be taken once, and an entry's content is readable only until the next entry is pulled.
pub struct TarWalker<R: Read> {
    archive: tar::Archive<R>,
    prefixes: Vec<PathBuf>,
}

impl<R: Read> TarWalker<R> {
    pub fn new<I, P>(reader: R, prefixes: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            archive: tar::Archive::new(reader),
            prefixes: prefixes.into_iter().map(|p| normalize(&p.into())).collect(),
        }
    }

    pub fn entries(&mut self) -> Result<TarEntries<'_, R>> {
        let Self { archive, prefixes } = self;
        let entries = archive.entries().map_err(Error::corrupt)?;
        Ok(TarEntries {
            entries,
            prefixes,
            skipped: 0,
            done: false,
        })
    }
}

/// Lazy sequence of entries under the walker's prefixes.
///
/// Yields `Err(CorruptArchive)` at most once, after which the sequence ends.
pub struct TarEntries<'a, R: 'a + Read> {
    entries: tar::Entries<'a, R>,
    prefixes: &'a [PathBuf],
    skipped: u64,
    done: bool,
}

impl<'a, R: Read> TarEntries<'a, R> {
    /// Number of entries passed over because they lie outside every prefix.
    pub fn skipped(&self) -> u64 {
        self.skipped
    }

    fn is_selected(&self, path: &Path) -> bool {
        self.prefixes.iter().any(|prefix| path.starts_with(prefix))
    }

    fn fail(&mut self, source: io::Error) -> Option<Result<TarEntry<'a, R>>> {
        self.done = true;
        Some(Err(Error::corrupt(source)))
    }
}

impl<'a, R: Read> Iterator for TarEntries<'a, R> {
    type Item = Result<TarEntry<'a, R>>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.done {
            let entry = match self.entries.next()? {
                Ok(entry) => entry,
                Err(e) => return self.fail(e),
            };

            let path = match entry.path() {
                Ok(path) => normalize(&path),
                Err(e) => return self.fail(e),
            };

            if !self.is_selected(&path) {
                self.skipped += 1;
                tracing::trace!(entry = %path.display(), "outside selected prefixes");
                continue;
            }

            let kind = EntryKind::from_tar(entry.header().entry_type());
            let size = entry.size();
            return Some(Ok(TarEntry {
                meta: EntryMeta::new(path, kind, size),
                remaining: size,
                inner: entry,
            }));
        }
        None
    }
}

/// One surfaced tar entry; reading it yields the entry's content.
///
/// A stream that ends before the header's size is reached fails with `UnexpectedEof`
/// instead of yielding a short file.
pub struct TarEntry<'a, R: 'a + Read> {
    meta: EntryMeta,
    remaining: u64,
    inner: tar::Entry<'a, R>,
}

impl<'a, R: Read> TarEntry<'a, R> {
    pub fn meta(&self) -> &EntryMeta {
        &self.meta
    }

    pub fn path(&self) -> &Path {
        &self.meta.path
    }
}

impl<'a, R: Read> Read for TarEntry<'a, R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        if n == 0 && self.remaining > 0 && !buf.is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("entry ended {} bytes early", self.remaining),
            ));
        }
        self.remaining = self.remaining.saturating_sub(n as u64);
        Ok(n)
    }
}

fn normalize(path: &Path) -> PathBuf {
    path.components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn append_file(builder: &mut tar::Builder<Vec<u8>>, path: &str, content: &[u8]) {
        let mut header = tar::Header::new_gnu();
        header.set_size(content.len() as u64);
        header.set_mode(0o755);
        header.set_entry_type(tar::EntryType::Regular);
        header.set_cksum();
        builder.append_data(&mut header, path, content).unwrap();
    }

    fn append_dir(builder: &mut tar::Builder<Vec<u8>>, path: &str) {
        let mut header = tar::Header::new_gnu();
        header.set_size(0);
        header.set_mode(0o755);
        header.set_entry_type(tar::EntryType::Directory);
        header.set_cksum();
        builder.append_data(&mut header, path, io::empty()).unwrap();
    }

    fn append_symlink(builder: &mut tar::Builder<Vec<u8>>, path: &str, target: &str) {
        let mut header = tar::Header::new_gnu();
        header.set_size(0);
        header.set_entry_type(tar::EntryType::Symlink);
        builder.append_link(&mut header, path, target).unwrap();
    }

    fn sample() -> Vec<u8> {
        let mut builder = tar::Builder::new(Vec::new());
        append_dir(&mut builder, "top/");
        append_dir(&mut builder, "top/bin/");
        append_file(&mut builder, "top/bin/clang", b"clang-binary");
        append_symlink(&mut builder, "top/bin/clang++", "clang");
        append_file(&mut builder, "top/lib/libLLVM.so", b"library");
        append_file(&mut builder, "top/binutils/ld", b"not bin");
        append_file(&mut builder, "top/bin/llvm-ar", b"ar");
        builder.into_inner().unwrap()
    }

    #[test]
    fn surfaces_only_prefixed_entries() {
        let mut walker = TarWalker::new(Cursor::new(sample()), ["top/bin"]);
        let mut entries = walker.entries().unwrap();
        let mut seen = Vec::new();
        for entry in entries.by_ref() {
            let entry = entry.unwrap();
            seen.push((entry.path().to_path_buf(), entry.meta().kind));
        }
        assert_eq!(
            seen,
            vec![
                (PathBuf::from("top/bin"), EntryKind::Directory),
                (PathBuf::from("top/bin/clang"), EntryKind::Regular),
                (PathBuf::from("top/bin/clang++"), EntryKind::Symlink),
                (PathBuf::from("top/bin/llvm-ar"), EntryKind::Regular),
            ]
        );
        assert_eq!(entries.skipped(), 3);
    }

    #[test]
    fn entry_content_is_readable_in_order() {
        let mut walker = TarWalker::new(Cursor::new(sample()), ["top/bin"]);
        let mut contents = Vec::new();
        for entry in walker.entries().unwrap() {
            let mut entry = entry.unwrap();
            if entry.meta().kind != EntryKind::Regular {
                continue;
            }
            let mut buf = String::new();
            entry.read_to_string(&mut buf).unwrap();
            contents.push(buf);
        }
        assert_eq!(contents, vec!["clang-binary", "ar"]);
    }

    #[test]
    fn leading_dot_components_are_ignored() {
        let mut builder = tar::Builder::new(Vec::new());
        append_file(&mut builder, "./top/bin/clang", b"x");
        let data = builder.into_inner().unwrap();

        let mut walker = TarWalker::new(Cursor::new(data), ["top/bin"]);
        let paths: Vec<_> = walker
            .entries()
            .unwrap()
            .map(|e| e.unwrap().path().to_path_buf())
            .collect();
        assert_eq!(paths, vec![PathBuf::from("top/bin/clang")]);
    }

    #[test]
    fn multiple_prefixes() {
        let mut walker = TarWalker::new(Cursor::new(sample()), ["top/lib", "top/binutils"]);
        let count = walker.entries().unwrap().filter(|e| e.is_ok()).count();
        assert_eq!(count, 2);
    }

    #[test]
    fn entries_cannot_be_restarted() {
        let mut walker = TarWalker::new(Cursor::new(sample()), ["top/bin"]);
        assert_eq!(walker.entries().unwrap().count(), 4);
        assert!(walker.entries().is_err());
    }

    #[test]
    fn truncated_stream_reports_corruption_once() {
        let mut data = sample();
        data.truncate(700);
        let mut walker = TarWalker::new(Cursor::new(data), ["top"]);
        let results: Vec<_> = walker.entries().unwrap().collect();
        let errors = results.iter().filter(|r| r.is_err()).count();
        assert_eq!(errors, 1);
        assert!(matches!(results.last(), Some(Err(Error::CorruptArchive { .. }))));
    }

    #[test]
    fn short_entry_data_is_an_error() {
        let mut builder = tar::Builder::new(Vec::new());
        append_file(&mut builder, "top/bin/clang", &[7u8; 4096]);
        let mut data = builder.into_inner().unwrap();
        // header plus the first 1024 data bytes
        data.truncate(512 + 1024);

        let mut walker = TarWalker::new(Cursor::new(data), ["top"]);
        let mut entry = walker.entries().unwrap().next().unwrap().unwrap();
        let mut buf = Vec::new();
        let err = entry.read_to_end(&mut buf).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
        assert_eq!(buf.len(), 1024);
    }

    #[test]
    fn garbage_header_is_corrupt() {
        let data = vec![0x5a; 1024];
        let mut walker = TarWalker::new(Cursor::new(data), ["top"]);
        let first = walker.entries().unwrap().next();
        assert!(matches!(first, Some(Err(Error::CorruptArchive { .. }))));
    }
}
