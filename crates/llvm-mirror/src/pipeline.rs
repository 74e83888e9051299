use std::io::Read;
use std::path::PathBuf;

use llvm_mirror_archive::{ArchiveName, TarWalker, output_name};
use llvm_mirror_publish::{AssetSink, PublishOutcome, Publisher, Stager};
use tokio_util::sync::CancellationToken;

use crate::config::MirrorConfig;
use crate::error::MirrorError;

/// What one asset run did.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AssetReport {
    pub asset: String,
    /// Entries found under the binaries directory.
    pub entries: u64,
    /// Entries passed over outside the binaries directory.
    pub outside_prefix: u64,
    /// Entries under the binaries directory the selector rejected.
    pub ineligible: u64,
    pub published: Vec<String>,
    pub already_present: Vec<String>,
    /// Stopped early because cancellation was requested.
    pub cancelled: bool,
}

impl AssetReport {
    pub fn new(asset: impl Into<String>) -> Self {
        Self {
            asset: asset.into(),
            ..Self::default()
        }
    }
}

/// Extracts and publishes the selected binaries of a single archive.
///
/// Entries are handled strictly in stream order: each one is filtered, renamed, staged
/// and published before the next is read. Cancellation is checked before every entry;
/// an entry already being staged or published runs to completion.
pub struct AssetPipeline<'a, S> {
    config: &'a MirrorConfig,
    publisher: &'a Publisher<S>,
    cancel: &'a CancellationToken,
}

impl<'a, S: AssetSink> AssetPipeline<'a, S> {
    pub fn new(
        config: &'a MirrorConfig,
        publisher: &'a Publisher<S>,
        cancel: &'a CancellationToken,
    ) -> Self {
        Self {
            config,
            publisher,
            cancel,
        }
    }

    /// Run the pipeline over the compressed bytes of `asset`.
    pub fn run<R: Read>(&self, asset: &str, reader: R) -> Result<AssetReport, MirrorError> {
        let _span = tracing::info_span!("asset", asset).entered();

        let name = ArchiveName::parse(asset, &self.config.family_prefix)
            .map_err(|e| MirrorError::from_archive(asset, e))?;
        let stager = match &self.config.staging_dir {
            Some(dir) => Stager::new_in(dir),
            None => Stager::new(),
        }
        .map_err(|e| MirrorError::from_staging(asset, PathBuf::new(), e))?;
        let selector = self.config.selector();
        let prefix = name.bin_prefix(&self.config.bin_dir);

        tracing::info!(
            version = %name.version_tag,
            prefix = %prefix.display(),
            "extracting"
        );

        let mut walker = TarWalker::new(name.compression.decoder(reader), [prefix]);
        let mut entries = walker
            .entries()
            .map_err(|e| MirrorError::from_archive(asset, e))?;
        let mut report = AssetReport::new(asset);

        loop {
            if self.cancel.is_cancelled() {
                tracing::warn!("cancelled, not starting further entries");
                report.cancelled = true;
                break;
            }
            let Some(entry) = entries.next() else {
                break;
            };
            let mut entry = entry.map_err(|e| MirrorError::from_archive(asset, e))?;
            report.entries += 1;

            let path = entry.path().to_path_buf();
            if !selector.is_eligible(entry.meta()) {
                tracing::trace!(entry = %path.display(), "not eligible");
                report.ineligible += 1;
                continue;
            }
            let base_name = entry.meta().base_name().unwrap_or_default();
            let output = output_name(base_name, &name.version_tag);
            tracing::info!(entry = %path.display(), output = %output, "staging");

            let staged = stager
                .stage(&mut entry, output)
                .map_err(|e| MirrorError::from_staging(asset, path.clone(), e))?;
            let published = self
                .publisher
                .publish(&staged)
                .map_err(|source| MirrorError::Publish {
                    asset: asset.to_string(),
                    entry: path,
                    source,
                })?;
            drop(staged);

            match published.outcome {
                PublishOutcome::Published => report.published.push(published.name),
                PublishOutcome::AlreadyExists => report.already_present.push(published.name),
            }
        }

        report.outside_prefix = entries.skipped();
        tracing::info!(
            published = report.published.len(),
            already_present = report.already_present.len(),
            ineligible = report.ineligible,
            "asset done"
        );
        Ok(report)
    }
}
