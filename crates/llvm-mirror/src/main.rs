use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use llvm_mirror::{
    GithubClient, MirrorConfig, MirrorSummary, MirrorTarget, RepoRef, extract_local,
    mirror_release,
};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use crate::cli::{App, Commands};

mod cli;

#[tokio::main]
async fn main() -> ExitCode {
    let app = App::parse();
    init_tracing(app.verbose);

    match run(app).await {
        Ok(summary) if summary.cancelled() => {
            tracing::warn!("interrupted");
            ExitCode::from(130)
        }
        Ok(summary) if summary.is_success() => ExitCode::SUCCESS,
        Ok(summary) => {
            tracing::error!(failed = summary.failures.len(), "some assets failed");
            ExitCode::FAILURE
        }
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(app: App) -> anyhow::Result<MirrorSummary> {
    let config = match &app.config {
        Some(path) => MirrorConfig::load(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => MirrorConfig::default(),
    };
    let config = Arc::new(config);
    let cancel = CancellationToken::new();
    watch_interrupt(cancel.clone());

    let summary = match app.cmd {
        Commands::Mirror(arg) => {
            let target = MirrorTarget {
                repo: RepoRef::new(&arg.owner, arg.repo_name()),
                tag: arg.tag.clone(),
            };
            tracing::info!(repo = %target.repo, tag = %target.tag, "mirroring release");
            // the workflow token cannot read other repositories, so upstream is anonymous
            let upstream = GithubClient::new(None).context("building upstream client")?;
            let mirror = GithubClient::new(Some(arg.token)).context("building mirror client")?;
            mirror_release(config, upstream, mirror, target, cancel)
                .await
                .context("resolving releases")?
        }
        Commands::Extract(arg) => {
            std::fs::create_dir_all(&arg.output)
                .with_context(|| format!("creating {}", arg.output.display()))?;
            extract_local(config, arg.archives, arg.output, cancel).await
        }
    };

    tracing::info!(
        assets = summary.reports.len(),
        published = summary.published(),
        already_present = summary.already_present(),
        failed = summary.failures.len(),
        "done"
    );
    Ok(summary)
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}

fn watch_interrupt(cancel: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, finishing in-flight entries");
            cancel.cancel();
        }
    });
}
