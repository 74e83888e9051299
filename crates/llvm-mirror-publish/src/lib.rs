//! Staging and idempotent publication of extracted release files.
//!
//! # Architecture
//!
//! - `staging.rs` - Copies a single-pass entry stream into a re-readable temp file
//! - `retry.rs` - Bounded retry with a fixed delay
//! - `sink.rs` - Destination abstraction and a local directory implementation
//! - `publisher.rs` - Commits staged files, treating "already exists" as success
//!
//! Retry sleeps block the calling thread only. Callers that publish several archives at
//! once run each on its own thread.

mod error;
mod publisher;
mod retry;
mod sink;
mod staging;

pub use error::{PublishError, StagingError, UploadError};
pub use publisher::{PublishOutcome, PublishReport, Publisher};
pub use retry::{Exhausted, Retried, RetryPolicy};
pub use sink::{AssetSink, DirectorySink};
pub use staging::{StagedFile, Stager};
