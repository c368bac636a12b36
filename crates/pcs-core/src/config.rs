use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use pcs_util::errors::{PcsError, PcsResult};

use crate::version::VersionPolicy;

pub const DEFAULT_REGISTRY: &str = "https://registry.npmjs.org";

/// User configuration loaded from `~/.pcs/config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub registry: RegistryConfig,

    #[serde(default)]
    pub solver: SolverConfig,
}

/// Registry access settings from `[registry]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RegistryConfig {
    #[serde(default = "default_registry_url")]
    pub url: String,
    #[serde(default = "default_retries")]
    pub retries: u32,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_concurrent_fetches")]
    pub max_concurrent_fetches: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            url: default_registry_url(),
            retries: default_retries(),
            retry_delay_ms: default_retry_delay_ms(),
            timeout_secs: default_timeout_secs(),
            max_concurrent_fetches: default_max_concurrent_fetches(),
        }
    }
}

impl RegistryConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_registry_url() -> String {
    DEFAULT_REGISTRY.to_string()
}

fn default_retries() -> u32 {
    5
}

fn default_retry_delay_ms() -> u64 {
    300
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_max_concurrent_fetches() -> usize {
    8
}

/// Solver selection from `[solver]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SolverConfig {
    #[serde(default)]
    pub bruteforce: bool,
    #[serde(default)]
    pub search_in_range: bool,
    #[serde(default = "default_max_solutions")]
    pub max_solutions: usize,
    #[serde(default)]
    pub policy: VersionPolicy,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            bruteforce: false,
            search_in_range: false,
            max_solutions: default_max_solutions(),
            policy: VersionPolicy::default(),
        }
    }
}

fn default_max_solutions() -> usize {
    1
}

impl Config {
    /// Load `~/.pcs/config.toml`, or defaults if the file doesn't exist.
    pub fn load() -> PcsResult<Self> {
        let path = Self::default_path();
        if path.is_file() {
            Self::from_path(&path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn from_path(path: &Path) -> PcsResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| PcsError::Config {
            message: format!("Failed to read {}: {e}", path.display()),
        })?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> PcsResult<Self> {
        toml::from_str(content).map_err(|e| PcsError::Config {
            message: format!("Failed to parse config: {e}"),
        })
    }

    /// Returns the default path to the config file.
    pub fn default_path() -> PathBuf {
        dirs_path().join("config.toml")
    }
}

/// Returns the path to the pcs data directory (`~/.pcs/`).
pub fn dirs_path() -> PathBuf {
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .unwrap_or_else(|_| ".".to_string());
    Path::new(&home).join(".pcs")
}
