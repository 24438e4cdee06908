//! Configuration file for smellcheck.
//!
//! Tells the client where the analysis service lives and how long to wait
//! for it. Every field has a default, so an empty file is valid.

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Default config file names searched in the working directory.
pub const DEFAULT_CONFIG_NAMES: &[&str] = &["smellcheck.yaml", ".smellcheck.yaml"];

pub const DEFAULT_ENDPOINT: &str = "http://localhost:8000";
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub version: String,
    /// Base URL of the analysis service.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Upper bound for a single request, in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default)]
    pub user_agent: Option<String>,
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: String::new(),
            endpoint: default_endpoint(),
            timeout_ms: default_timeout_ms(),
            user_agent: None,
        }
    }
}

impl Config {
    /// Parse a config from a YAML file.
    pub fn parse_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::parse_str(&content)
    }

    pub fn parse_str(content: &str) -> anyhow::Result<Self> {
        // An empty YAML document deserializes as null.
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Config = serde_yaml::from_str(content)?;
        Ok(config)
    }

    /// Endpoint with any trailing slash removed.
    pub fn base_url(&self) -> &str {
        self.endpoint.trim_end_matches('/')
    }

    pub fn user_agent(&self) -> String {
        self.user_agent
            .clone()
            .unwrap_or_else(|| format!("smellcheck/{}", env!("CARGO_PKG_VERSION")))
    }
}

/// Validate a parsed config.
pub fn validate(config: &Config) -> anyhow::Result<()> {
    if !(config.endpoint.starts_with("http://") || config.endpoint.starts_with("https://")) {
        anyhow::bail!(
            "endpoint {:?} must start with http:// or https://",
            config.endpoint
        );
    }
    if config.timeout_ms == 0 {
        anyhow::bail!("timeout_ms must be greater than zero");
    }
    Ok(())
}

/// Per-user config file path, e.g. `~/.config/smellcheck/config.yaml`.
pub fn user_config_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "smellcheck").map(|dirs| dirs.config_dir().join("config.yaml"))
}

/// Find a config file: working directory first, then the per-user location.
pub fn discover(dir: &Path) -> Option<PathBuf> {
    DEFAULT_CONFIG_NAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|path| path.exists())
        .or_else(|| user_config_path().filter(|path| path.exists()))
}

/// Load the config at `explicit` if given, otherwise the discovered one,
/// otherwise defaults.
pub fn load(explicit: Option<&Path>, dir: &Path) -> anyhow::Result<Config> {
    let path = match explicit {
        Some(p) => Some(p.to_path_buf()),
        None => discover(dir),
    };

    let config = match path {
        Some(p) => {
            debug!(path = %p.display(), "loading config");
            Config::parse_file(&p)?
        }
        None => Config::default(),
    };
    validate(&config)?;
    Ok(config)
}
