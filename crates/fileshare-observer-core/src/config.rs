//! Scan and observer configuration types.

use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Default seconds between the starts of two scan cycles.
pub const DEFAULT_INTERVAL_SECS: u64 = 30;

/// Default port of the metrics endpoint.
pub const DEFAULT_METRICS_PORT: u16 = 8000;

/// How the extension filter compares file names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaseMatching {
    /// Follow the platform's usual filesystem rule: case-insensitive on
    /// Windows and macOS, case-sensitive elsewhere.
    #[default]
    Native,
    /// Exact, byte-for-byte suffix match.
    Sensitive,
    /// Unicode lowercase comparison.
    Insensitive,
}

impl CaseMatching {
    /// Resolve `Native` to the concrete rule for this platform.
    pub fn is_case_insensitive(&self) -> bool {
        match self {
            CaseMatching::Native => cfg!(any(windows, target_os = "macos")),
            CaseMatching::Sensitive => false,
            CaseMatching::Insensitive => true,
        }
    }
}

/// File name suffix filter applied to the oldest/newest selections.
///
/// An empty suffix matches every file. Only the final path component is
/// compared, so `.log` never matches a directory named `x.log/` above the file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionFilter {
    suffix: String,
    case_insensitive: bool,
}

impl ExtensionFilter {
    /// Create a filter for `suffix` under the given case rule.
    pub fn new(suffix: impl Into<String>, case: CaseMatching) -> Self {
        let case_insensitive = case.is_case_insensitive();
        let suffix = suffix.into();
        let suffix = if case_insensitive {
            suffix.to_lowercase()
        } else {
            suffix
        };
        Self {
            suffix,
            case_insensitive,
        }
    }

    /// A filter that accepts everything.
    pub fn any() -> Self {
        Self::new(String::new(), CaseMatching::Sensitive)
    }

    /// Check whether the filter is a no-op.
    pub fn is_empty(&self) -> bool {
        self.suffix.is_empty()
    }

    /// Check if a file path passes the filter.
    pub fn matches(&self, path: &Path) -> bool {
        if self.suffix.is_empty() {
            return true;
        }
        let Some(name) = path.file_name() else {
            return false;
        };
        let name = name.to_string_lossy();
        if self.case_insensitive {
            name.to_lowercase().ends_with(&self.suffix)
        } else {
            name.ends_with(&self.suffix)
        }
    }
}

/// Configuration for a single aggregate scan.
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct ScanConfig {
    /// Root path to observe (local path or UNC share).
    pub root: PathBuf,

    /// Number of oldest and newest files to retain.
    #[builder(default = "1")]
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// File name suffix for the oldest/newest selections (empty = all files).
    #[builder(default)]
    #[serde(default)]
    pub extension_filter: String,

    /// Case rule for the extension filter.
    #[builder(default)]
    #[serde(default)]
    pub case_matching: CaseMatching,

    /// Descend into symbolic links.
    #[builder(default = "false")]
    #[serde(default)]
    pub follow_symlinks: bool,

    /// Include hidden files (starting with .).
    #[builder(default = "true")]
    #[serde(default = "default_true")]
    pub include_hidden: bool,

    /// Walker threads: 1 = serial, 0 = shared rayon pool, n = dedicated pool.
    #[builder(default = "1")]
    #[serde(default = "default_threads")]
    pub threads: usize,
}

fn default_true() -> bool {
    true
}

fn default_top_k() -> usize {
    1
}

fn default_threads() -> usize {
    1
}

impl ScanConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        match self.root {
            Some(ref root) if root.as_os_str().is_empty() => {
                Err("Root path cannot be empty".to_string())
            }
            Some(_) => Ok(()),
            None => Err("Root path is required".to_string()),
        }
    }
}

impl ScanConfig {
    /// Create a new scan config builder.
    pub fn builder() -> ScanConfigBuilder {
        ScanConfigBuilder::default()
    }

    /// Create a simple config for scanning a path.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            top_k: 1,
            extension_filter: String::new(),
            case_matching: CaseMatching::default(),
            follow_symlinks: false,
            include_hidden: true,
            threads: 1,
        }
    }

    /// Build the extension filter described by this config.
    pub fn extension_filter(&self) -> ExtensionFilter {
        ExtensionFilter::new(self.extension_filter.clone(), self.case_matching)
    }
}

/// Settings for the metrics exposition endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSettings {
    /// Address the `/metrics` endpoint listens on.
    #[serde(default = "default_listen")]
    pub listen: SocketAddr,
}

fn default_listen() -> SocketAddr {
    SocketAddr::from((Ipv4Addr::UNSPECIFIED, DEFAULT_METRICS_PORT))
}

impl Default for MetricsSettings {
    fn default() -> Self {
        Self {
            listen: default_listen(),
        }
    }
}

/// Settings for the sibling activity logger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivitySettings {
    /// Run the activity logger alongside the scheduler.
    #[serde(default)]
    pub enabled: bool,

    /// Append-only log file receiving one line per change event.
    #[serde(default = "default_log_path")]
    pub log_path: PathBuf,
}

fn default_log_path() -> PathBuf {
    PathBuf::from("FileshareActivity.log")
}

impl Default for ActivitySettings {
    fn default() -> Self {
        Self {
            enabled: false,
            log_path: default_log_path(),
        }
    }
}

/// Full process configuration, usually loaded from `config.toml`.
///
/// ```toml
/// interval_secs = 30
///
/// [scan]
/// root = '\\server\share\team'
/// top_k = 3
/// extension_filter = ".sql"
///
/// [metrics]
/// listen = "0.0.0.0:8000"
///
/// [activity]
/// enabled = true
/// log_path = "FileshareActivity.log"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObserverConfig {
    /// What to scan and how.
    pub scan: ScanConfig,

    /// Seconds from the start of one cycle to the start of the next.
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// Metrics endpoint settings.
    #[serde(default)]
    pub metrics: MetricsSettings,

    /// Activity logger settings.
    #[serde(default)]
    pub activity: ActivitySettings,
}

fn default_interval_secs() -> u64 {
    DEFAULT_INTERVAL_SECS
}

impl ObserverConfig {
    /// Create a config with defaults for everything but the root.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            scan: ScanConfig::new(root),
            interval_secs: DEFAULT_INTERVAL_SECS,
            metrics: MetricsSettings::default(),
            activity: ActivitySettings::default(),
        }
    }

    /// Default config file location (`<config_dir>/fileshare-observer/config.toml`).
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("fileshare-observer").join("config.toml"))
    }

    /// Load and validate a TOML config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&contents, path)
    }

    /// Parse and validate TOML held in memory.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        Self::parse(contents, Path::new("<inline>"))
    }

    fn parse(contents: &str, origin: &Path) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(contents).map_err(|source| ConfigError::Parse {
            path: origin.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check the invariants serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.scan.root.as_os_str().is_empty() {
            return Err(ConfigError::Invalid {
                message: "scan.root cannot be empty".to_string(),
            });
        }
        if self.interval_secs == 0 {
            return Err(ConfigError::Invalid {
                message: "interval_secs must be a positive number of seconds".to_string(),
            });
        }
        Ok(())
    }

    /// Cycle interval as a duration.
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}
