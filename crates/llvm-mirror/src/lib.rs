//! Mirrors selected toolchain binaries from upstream release tarballs.
//!
//! # Architecture
//!
//! - `config.rs` - Read-only settings shared by every pipeline
//! - `pipeline.rs` - Per-archive walk, filter, rename, stage, publish
//! - `github.rs` - Release lookup, asset download and upload
//! - `mirror.rs` - Multi-archive orchestration and failure collection
//!
//! Archive handling lives in `llvm-mirror-archive`; staging and retrying publication in
//! `llvm-mirror-publish`.

pub mod config;
mod error;
pub mod github;
pub mod mirror;
pub mod pipeline;

pub use config::{ConfigError, MirrorConfig};
pub use error::MirrorError;
pub use github::{GithubClient, GithubError, ReleaseUploader, RepoRef};
pub use mirror::{MirrorSummary, MirrorTarget, extract_local, mirror_release};
pub use pipeline::{AssetPipeline, AssetReport};
