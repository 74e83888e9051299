//! Runs one pipeline per archive, several at a time, each on its own blocking thread.

use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;

use futures_util::{StreamExt, stream};
use llvm_mirror_archive::is_mirrored_asset;
use llvm_mirror_publish::{AssetSink, DirectorySink, Publisher};
use tokio::runtime::Handle;
use tokio_util::io::{StreamReader, SyncIoBridge};
use tokio_util::sync::CancellationToken;

use crate::config::MirrorConfig;
use crate::error::MirrorError;
use crate::github::{GithubClient, GithubError, NewRelease, ReleaseAsset, ReleaseUploader, RepoRef};
use crate::pipeline::{AssetPipeline, AssetReport};

/// Outcome of a whole run. Failed assets do not stop the others.
#[derive(Debug, Default)]
pub struct MirrorSummary {
    pub reports: Vec<AssetReport>,
    pub failures: Vec<MirrorError>,
}

impl MirrorSummary {
    fn collect(results: Vec<Result<AssetReport, MirrorError>>) -> Self {
        let mut summary = Self::default();
        for result in results {
            match result {
                Ok(report) => summary.reports.push(report),
                Err(e) => {
                    tracing::error!(asset = e.asset(), error = %e, "asset failed");
                    summary.failures.push(e);
                }
            }
        }
        summary
    }

    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn cancelled(&self) -> bool {
        self.reports.iter().any(|r| r.cancelled)
    }

    pub fn published(&self) -> usize {
        self.reports.iter().map(|r| r.published.len()).sum()
    }

    pub fn already_present(&self) -> usize {
        self.reports.iter().map(|r| r.already_present.len()).sum()
    }
}

/// Where a release gets mirrored to.
#[derive(Clone, Debug)]
pub struct MirrorTarget {
    pub repo: RepoRef,
    pub tag: String,
}

/// Mirror the upstream release tagged `target.tag` into `target.repo`.
///
/// Fails early only when the releases themselves cannot be resolved; per-asset failures
/// are collected in the summary.
pub async fn mirror_release(
    config: Arc<MirrorConfig>,
    upstream: GithubClient,
    mirror: GithubClient,
    target: MirrorTarget,
    cancel: CancellationToken,
) -> Result<MirrorSummary, GithubError> {
    let upstream_repo = RepoRef::new(&config.upstream.owner, &config.upstream.repo);
    let release = upstream.release_by_tag(&upstream_repo, &target.tag).await?;
    tracing::info!(
        repo = %upstream_repo,
        tag = %target.tag,
        assets = release.assets.len(),
        "found upstream release"
    );

    let mirror_release = mirror
        .ensure_release(
            &target.repo,
            &NewRelease {
                tag_name: target.tag.clone(),
                name: release.name.clone(),
                body: release.body.clone(),
            },
        )
        .await?;

    let uploader = ReleaseUploader::new(mirror, &mirror_release, Handle::current());
    let publisher = Arc::new(Publisher::with_retry(
        uploader,
        config.publish.max_attempts,
        config.retry_delay(),
    ));

    let assets: Vec<ReleaseAsset> = release
        .assets
        .into_iter()
        .filter(|asset| is_mirrored_asset(&asset.name, &config.family_prefix))
        .collect();

    let results = stream::iter(assets)
        .map(|asset| {
            let config = config.clone();
            let publisher = publisher.clone();
            let cancel = cancel.clone();
            let upstream = upstream.clone();
            let repo = upstream_repo.clone();
            async move {
                if cancel.is_cancelled() {
                    return Ok::<_, MirrorError>(cancelled_report(asset.name));
                }
                tracing::info!(asset = %asset.name, size = asset.size, "downloading");
                let body = upstream
                    .download_asset(&repo, asset.id)
                    .await
                    .map_err(|source| MirrorError::Download {
                        asset: asset.name.clone(),
                        source,
                    })?;
                let reader = SyncIoBridge::new(StreamReader::new(body));
                run_blocking(config, publisher, cancel, asset.name, reader).await
            }
        })
        .buffer_unordered(config.jobs)
        .collect::<Vec<_>>()
        .await;

    Ok(MirrorSummary::collect(results))
}

/// Run the pipeline over local archive files, publishing into `output`.
pub async fn extract_local(
    config: Arc<MirrorConfig>,
    archives: Vec<PathBuf>,
    output: PathBuf,
    cancel: CancellationToken,
) -> MirrorSummary {
    let publisher = Arc::new(Publisher::with_retry(
        DirectorySink::new(output),
        config.publish.max_attempts,
        config.retry_delay(),
    ));

    let results = stream::iter(archives)
        .map(|path| {
            let config = config.clone();
            let publisher = publisher.clone();
            let cancel = cancel.clone();
            async move {
                let asset = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| path.display().to_string());
                if cancel.is_cancelled() {
                    return Ok::<_, MirrorError>(cancelled_report(asset));
                }
                let file = std::fs::File::open(&path).map_err(|source| MirrorError::Open {
                    asset: asset.clone(),
                    source,
                })?;
                run_blocking(config, publisher, cancel, asset, file).await
            }
        })
        .buffer_unordered(config.jobs)
        .collect::<Vec<_>>()
        .await;

    MirrorSummary::collect(results)
}

fn cancelled_report(asset: String) -> AssetReport {
    AssetReport {
        cancelled: true,
        ..AssetReport::new(asset)
    }
}

async fn run_blocking<S, R>(
    config: Arc<MirrorConfig>,
    publisher: Arc<Publisher<S>>,
    cancel: CancellationToken,
    asset: String,
    reader: R,
) -> Result<AssetReport, MirrorError>
where
    S: AssetSink + 'static,
    R: Read + Send + 'static,
{
    let worker_asset = asset.clone();
    tokio::task::spawn_blocking(move || {
        AssetPipeline::new(&config, &publisher, &cancel).run(&worker_asset, reader)
    })
    .await
    .map_err(|e| MirrorError::Worker {
        asset,
        message: e.to_string(),
    })?
}
