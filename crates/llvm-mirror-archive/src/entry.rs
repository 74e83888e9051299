use std::path::{Path, PathBuf};

/// Kind of a tar record, as declared by its header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntryKind {
    Regular,
    Directory,
    Symlink,
    Other,
}

impl EntryKind {
    pub fn from_tar(entry_type: tar::EntryType) -> Self {
        if entry_type.is_file() {
            Self::Regular
        } else if entry_type.is_dir() {
            Self::Directory
        } else if entry_type.is_symlink() {
            Self::Symlink
        } else {
            Self::Other
        }
    }
}

/// Header facts about one tar entry, detached from its content stream.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntryMeta {
    pub path: PathBuf,
    pub kind: EntryKind,
    pub size: u64,
}

impl EntryMeta {
    pub fn new(path: impl Into<PathBuf>, kind: EntryKind, size: u64) -> Self {
        Self {
            path: path.into(),
            kind,
            size,
        }
    }

    /// Final path component, if it is valid UTF-8.
    pub fn base_name(&self) -> Option<&str> {
        self.path.file_name().and_then(|name| name.to_str())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Decides which entries are staged for publishing.
///
/// Only non-empty regular files whose base name starts with one of the allowed prefixes
/// pass. Symbolic links and directories never do.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntrySelector {
    prefixes: Vec<String>,
}

impl EntrySelector {
    pub fn new<I, S>(prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            prefixes: prefixes.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_eligible(&self, entry: &EntryMeta) -> bool {
        if entry.kind != EntryKind::Regular || entry.size == 0 {
            return false;
        }
        entry
            .base_name()
            .is_some_and(|name| self.prefixes.iter().any(|p| name.starts_with(p.as_str())))
    }
}

impl Default for EntrySelector {
    fn default() -> Self {
        Self::new(["clang", "llvm"])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(path: &str, size: u64) -> EntryMeta {
        EntryMeta::new(path, EntryKind::Regular, size)
    }

    #[test]
    fn accepts_allowed_binaries() {
        let selector = EntrySelector::default();
        assert!(selector.is_eligible(&file("top/bin/clang", 1024)));
        assert!(selector.is_eligible(&file("top/bin/clang-format", 1)));
        assert!(selector.is_eligible(&file("top/bin/llvm-ar", 7)));
        assert!(selector.is_eligible(&file("top/bin/llvm-config.exe", 7)));
    }

    #[test]
    fn rejects_directories() {
        let selector = EntrySelector::default();
        let dir = EntryMeta::new("top/bin/clang.d", EntryKind::Directory, 4096);
        assert!(!selector.is_eligible(&dir));
    }

    #[test]
    fn rejects_symlinks_and_other_records() {
        let selector = EntrySelector::default();
        assert!(!selector.is_eligible(&EntryMeta::new("top/bin/clang++", EntryKind::Symlink, 0)));
        assert!(!selector.is_eligible(&EntryMeta::new("top/bin/clang++", EntryKind::Symlink, 5)));
        assert!(!selector.is_eligible(&EntryMeta::new("top/bin/clang-cl", EntryKind::Other, 5)));
    }

    #[test]
    fn rejects_empty_files() {
        let selector = EntrySelector::default();
        assert!(!selector.is_eligible(&file("top/bin/clang", 0)));
    }

    #[test]
    fn rejects_names_outside_allow_list() {
        let selector = EntrySelector::default();
        assert!(!selector.is_eligible(&file("top/bin/lld", 10)));
        assert!(!selector.is_eligible(&file("top/bin/opt", 10)));
        // prefix applies to the base name, not the directory
        assert!(!selector.is_eligible(&file("clang/bin/ld.lld", 10)));
    }

    #[test]
    fn custom_prefixes() {
        let selector = EntrySelector::new(["lld"]);
        assert!(selector.is_eligible(&file("top/bin/lld-link", 10)));
        assert!(!selector.is_eligible(&file("top/bin/clang", 10)));
    }
}
