use std::path::{Path, PathBuf};
use std::time::Duration;

use llvm_mirror_archive::EntrySelector;
use serde::Deserialize;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config '{path}': {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Read-only settings shared by every asset pipeline of a run.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct MirrorConfig {
    pub upstream: Upstream,
    /// Asset name prefix of mirrored tarballs, also stripped to form the version tag.
    pub family_prefix: String,
    /// Directory below the archive's top-level directory holding the binaries.
    pub bin_dir: String,
    /// Base name prefixes of binaries that get republished.
    pub allowed_prefixes: Vec<String>,
    /// Parent of per-asset staging directories; the system temp dir when unset.
    pub staging_dir: Option<PathBuf>,
    /// Archives processed concurrently.
    pub jobs: usize,
    pub publish: PublishSettings,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct Upstream {
    pub owner: String,
    pub repo: String,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct PublishSettings {
    pub max_attempts: u32,
    pub delay_secs: u64,
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            upstream: Upstream::default(),
            family_prefix: "clang+llvm".into(),
            bin_dir: "bin".into(),
            allowed_prefixes: vec!["clang".into(), "llvm".into()],
            staging_dir: None,
            jobs: 1,
            publish: PublishSettings::default(),
        }
    }
}

impl Default for Upstream {
    fn default() -> Self {
        Self {
            owner: "llvm".into(),
            repo: "llvm-project".into(),
        }
    }
}

impl Default for PublishSettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay_secs: 3,
        }
    }
}

impl MirrorConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.jobs == 0 {
            return Err(ConfigError::Invalid("jobs must be at least 1".into()));
        }
        if self.publish.max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "publish.max_attempts must be at least 1".into(),
            ));
        }
        if self.allowed_prefixes.is_empty() || self.allowed_prefixes.iter().any(String::is_empty) {
            return Err(ConfigError::Invalid(
                "allowed_prefixes must list non-empty prefixes".into(),
            ));
        }
        if self.family_prefix.is_empty() || self.bin_dir.is_empty() {
            return Err(ConfigError::Invalid(
                "family_prefix and bin_dir must not be empty".into(),
            ));
        }
        Ok(())
    }

    pub fn selector(&self) -> EntrySelector {
        EntrySelector::new(self.allowed_prefixes.iter().cloned())
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.publish.delay_secs)
    }
}
