use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};

#[derive(Clone, Debug, Parser)]
#[command(name = "llvm-mirror", version = env!("CARGO_PKG_VERSION"), about, long_about = None, propagate_version = true)]
pub struct App {
    /// TOML file overriding the built-in settings.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace). `RUST_LOG` takes precedence.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Clone, Debug, Subcommand)]
pub enum Commands {
    /// Republish binaries of an upstream release into a mirror release.
    #[command(alias = "m")]
    Mirror(MirrorArg),
    /// Extract binaries from local archives into a directory.
    #[command(alias = "x")]
    Extract(ExtractArg),
}

#[derive(Clone, Debug, Args)]
pub struct MirrorArg {
    /// Owner of the mirror repository.
    #[arg(long, env = "GITHUB_REPOSITORY_OWNER")]
    pub owner: String,

    /// Mirror repository, either `name` or `owner/name`.
    #[arg(long, env = "GITHUB_REPOSITORY")]
    pub repo: String,

    /// Release tag, identical upstream and in the mirror.
    #[arg(long, env = "GITHUB_REF_NAME")]
    pub tag: String,

    /// Token with write access to the mirror repository.
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub token: String,
}

impl MirrorArg {
    /// Repository name with any `owner/` prefix removed.
    pub fn repo_name(&self) -> &str {
        self.repo
            .strip_prefix(self.owner.as_str())
            .and_then(|rest| rest.strip_prefix('/'))
            .unwrap_or(&self.repo)
    }
}

#[derive(Clone, Debug, Args)]
pub struct ExtractArg {
    /// Directory receiving the renamed binaries.
    #[arg(short, long, default_value = ".")]
    pub output: PathBuf,

    /// Archives named like `clang+llvm-<version>-<target>.tar.xz`.
    #[arg(required = true)]
    pub archives: Vec<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_is_well_formed() {
        App::command().debug_assert();
    }

    #[test]
    fn repo_prefix_is_stripped() {
        let arg = MirrorArg {
            owner: "someone".into(),
            repo: "someone/llvm-bin".into(),
            tag: "llvmorg-17.0.0".into(),
            token: String::new(),
        };
        assert_eq!(arg.repo_name(), "llvm-bin");

        let plain = MirrorArg {
            repo: "llvm-bin".into(),
            ..arg
        };
        assert_eq!(plain.repo_name(), "llvm-bin");
    }

    #[test]
    fn parses_extract() {
        let app = App::try_parse_from(["llvm-mirror", "-vv", "extract", "-o", "out", "a.tar.xz"])
            .unwrap();
        assert_eq!(app.verbose, 2);
        match app.cmd {
            Commands::Extract(arg) => {
                assert_eq!(arg.output, PathBuf::from("out"));
                assert_eq!(arg.archives, vec![PathBuf::from("a.tar.xz")]);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
