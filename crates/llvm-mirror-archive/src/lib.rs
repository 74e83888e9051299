//! Selective streaming extraction of compressed toolchain tarballs.
//!
//! # Architecture
//!
//! - `format.rs` - Asset name parsing and decompression codec selection
//! - `walker.rs` - Forward-only tar entry stream restricted to path prefixes
//! - `entry.rs` - Entry metadata and the staging eligibility predicate
//! - `naming.rs` - Republished file name derivation
//!
//! Nothing here buffers a whole archive: the decoder wraps the caller's reader and the
//! walker surfaces one entry at a time, each readable only until the next is requested.

pub use entry::{EntryKind, EntryMeta, EntrySelector};
pub use error::{Error, Result};
pub use format::{ArchiveName, Compression, Decoder, is_mirrored_asset};
pub use naming::{output_name, split_extension};
pub use walker::{TarEntries, TarEntry, TarWalker};

pub mod entry;
mod error;
pub mod format;
pub mod naming;
pub mod walker;
