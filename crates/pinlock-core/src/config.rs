use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Global user configuration loaded from `~/.pinlock/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GlobalConfig {
    #[serde(default)]
    pub resolver: ResolverConfig,

    #[serde(default)]
    pub index: IndexConfig,

    #[serde(default)]
    pub output: OutputConfig,
}

/// Resolution settings from `[resolver]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Number of backtracking steps allowed before giving up.
    #[serde(default = "default_max_backtracks", rename = "max-backtracks")]
    pub max_backtracks: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            max_backtracks: default_max_backtracks(),
        }
    }
}

fn default_max_backtracks() -> usize {
    10_000
}

/// Index query settings from `[index]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    #[serde(default = "default_timeout_secs", rename = "timeout-secs")]
    pub timeout_secs: u64,
    /// Upper bound on concurrent prefetch queries.
    #[serde(default = "default_jobs")]
    pub jobs: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            jobs: default_jobs(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_jobs() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

/// Lock file header settings from `[output]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_tool_name", rename = "tool-name")]
    pub tool_name: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            tool_name: default_tool_name(),
        }
    }
}

fn default_tool_name() -> String {
    "pinlock".to_string()
}

impl GlobalConfig {
    /// Load the global configuration, or return defaults if the file doesn't exist.
    pub fn load() -> miette::Result<Self> {
        Self::load_from(&Self::default_path())
    }

    /// Load configuration from an explicit path, defaulting when it is absent.
    pub fn load_from(path: &Path) -> miette::Result<Self> {
        if path.is_file() {
            let content = std::fs::read_to_string(path).map_err(|e| {
                pinlock_util::errors::PinlockError::Config {
                    message: format!("Failed to read {}: {e}", path.display()),
                }
            })?;
            Self::parse_toml(&content)
        } else {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            Ok(Self::default())
        }
    }

    pub fn parse_toml(content: &str) -> miette::Result<Self> {
        toml::from_str(content).map_err(|e| {
            pinlock_util::errors::PinlockError::Config {
                message: format!("Failed to parse config: {e}"),
            }
            .into()
        })
    }

    /// Returns the default path to the global config file.
    pub fn default_path() -> PathBuf {
        dirs_path().join("config.toml")
    }
}

/// Returns the pinlock data directory: `$PINLOCK_HOME`, else `~/.pinlock/`.
pub fn dirs_path() -> PathBuf {
    if let Ok(dir) = std::env::var("PINLOCK_HOME") {
        return PathBuf::from(dir);
    }
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .unwrap_or_else(|_| ".".to_string());
    Path::new(&home).join(".pinlock")
}
