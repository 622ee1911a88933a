//! Configuration management.
//!
//! Settings are resolved in three layers: built-in defaults, an optional TOML
//! file, then `KGRAPH_*` environment variables.
//!
//! ```toml
//! data_dir = "/var/lib/kgraph"
//!
//! [persistence]
//! backup = true
//!
//! [graph]
//! autosave_interval_ms = 5000
//! indexed_properties = ["type", "name", "sourceDocument"]
//! max_batch_size = 1000
//!
//! [query]
//! cache_ttl_secs = 300
//! cache_capacity = 1000
//!
//! [logging]
//! format = "json"
//! file = "/var/log/kgraph.log"
//! ```

use crate::observability::{LogFormat, LoggingConfig};
use crate::services::QueryEngineConfig;
use crate::services::query::{DEFAULT_CACHE_CAPACITY, DEFAULT_CACHE_TTL};
use crate::storage::graph::{
    DEFAULT_AUTOSAVE_INTERVAL, DEFAULT_INDEXED_PROPERTIES, DEFAULT_MAX_BATCH_SIZE,
};
use crate::storage::GraphStoreConfig;
use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Overrides the snapshot directory.
pub const ENV_DATA_DIR: &str = "KGRAPH_DATA_DIR";
/// Overrides `persistence.backup`.
pub const ENV_BACKUP: &str = "KGRAPH_BACKUP";
/// Overrides `graph.autosave_interval_ms`.
pub const ENV_AUTOSAVE_INTERVAL_MS: &str = "KGRAPH_AUTOSAVE_INTERVAL_MS";
/// Overrides `query.cache_ttl_secs`.
pub const ENV_CACHE_TTL_SECS: &str = "KGRAPH_CACHE_TTL_SECS";

/// Main configuration for kgraph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KgraphConfig {
    /// Directory holding `<identifier>.json` snapshots.
    pub data_dir: PathBuf,
    /// Snapshot persistence settings.
    pub persistence: PersistenceSettings,
    /// Graph store settings.
    pub graph: GraphSettings,
    /// Query engine settings.
    pub query: QuerySettings,
    /// Logging settings.
    pub logging: LoggingSettings,
}

/// Snapshot persistence settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistenceSettings {
    /// Copy the previous snapshot to `<file>.backup` before overwriting.
    pub backup: bool,
}

/// Graph store settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphSettings {
    /// Minimum time between automatic saves, in milliseconds.
    pub autosave_interval_ms: u64,
    /// Property keys with exact-match indexes.
    pub indexed_properties: Vec<String>,
    /// Largest accepted document (entities plus relations).
    pub max_batch_size: usize,
}

/// Query engine settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuerySettings {
    /// Cache entry lifetime in seconds.
    pub cache_ttl_secs: u64,
    /// Maximum cached results.
    pub cache_capacity: usize,
}

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LoggingSettings {
    /// Output format.
    pub format: LogFormat,
    /// Optional log file; stderr when unset.
    pub file: Option<PathBuf>,
}

/// Configuration file structure (for TOML parsing).
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    /// Snapshot directory.
    pub data_dir: Option<String>,
    /// Persistence section.
    pub persistence: Option<ConfigFilePersistence>,
    /// Graph section.
    pub graph: Option<ConfigFileGraph>,
    /// Query section.
    pub query: Option<ConfigFileQuery>,
    /// Logging section.
    pub logging: Option<ConfigFileLogging>,
}

/// Persistence section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFilePersistence {
    /// Backup toggle.
    pub backup: Option<bool>,
}

/// Graph section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileGraph {
    /// Autosave interval.
    pub autosave_interval_ms: Option<u64>,
    /// Indexed keys.
    pub indexed_properties: Option<Vec<String>>,
    /// Batch limit.
    pub max_batch_size: Option<usize>,
}

/// Query section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileQuery {
    /// Cache TTL.
    pub cache_ttl_secs: Option<u64>,
    /// Cache capacity.
    pub cache_capacity: Option<usize>,
}

/// Logging section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileLogging {
    /// `pretty` or `json`.
    pub format: Option<String>,
    /// Log file path.
    pub file: Option<String>,
}

impl Default for KgraphConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            persistence: PersistenceSettings { backup: true },
            graph: GraphSettings::default(),
            query: QuerySettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

impl Default for GraphSettings {
    fn default() -> Self {
        Self {
            autosave_interval_ms: u64::try_from(DEFAULT_AUTOSAVE_INTERVAL.as_millis())
                .unwrap_or(u64::MAX),
            indexed_properties: DEFAULT_INDEXED_PROPERTIES
                .iter()
                .map(ToString::to_string)
                .collect(),
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
        }
    }
}

impl Default for QuerySettings {
    fn default() -> Self {
        Self {
            cache_ttl_secs: DEFAULT_CACHE_TTL.as_secs(),
            cache_capacity: DEFAULT_CACHE_CAPACITY,
        }
    }
}

fn default_data_dir() -> PathBuf {
    directories::ProjectDirs::from("", "", "kgraph").map_or_else(
        || PathBuf::from(".kgraph"),
        |dirs| dirs.data_dir().join("graphs"),
    )
}

impl KgraphConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the snapshot directory.
    #[must_use]
    pub fn with_data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.data_dir = path.into();
        self
    }

    /// Loads configuration from a file path.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if the file cannot be read or parsed.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::InvalidInput(format!("cannot read config {}: {e}", path.display()))
        })?;
        Self::from_toml(&contents)
            .map_err(|e| Error::InvalidInput(format!("config {}: {e}", path.display())))
    }

    /// Parses configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for malformed TOML or values.
    pub fn from_toml(contents: &str) -> Result<Self> {
        let file: ConfigFile =
            toml::from_str(contents).map_err(|e| Error::InvalidInput(e.to_string()))?;
        Self::from_config_file(file)
    }

    /// Loads configuration from the default location.
    ///
    /// Checks the platform config dir, then `~/.config/kgraph/config.toml`.
    /// Returns defaults if no readable file is found.
    #[must_use]
    pub fn load_default() -> Self {
        let Some(base_dirs) = directories::BaseDirs::new() else {
            return Self::default();
        };

        let candidates = [
            base_dirs.config_dir().join("kgraph").join("config.toml"),
            base_dirs
                .home_dir()
                .join(".config")
                .join("kgraph")
                .join("config.toml"),
        ];
        for path in candidates.iter().filter(|p| p.exists()) {
            match Self::load_from_file(path) {
                Ok(config) => return config,
                Err(e) => tracing::warn!(path = %path.display(), error = %e, "Ignoring config file"),
            }
        }

        Self::default()
    }

    /// Loads `path` if given, otherwise the default location, then applies
    /// environment overrides.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if an explicit file or an environment
    /// value is invalid.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => Self::load_from_file(path)?,
            None => Self::load_default(),
        };
        config.with_env_overrides(|key| std::env::var(key).ok())
    }

    /// Applies `KGRAPH_*` overrides read through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if a numeric or boolean value does not parse.
    pub fn with_env_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(dir) = lookup(ENV_DATA_DIR).filter(|d| !d.is_empty()) {
            self.data_dir = PathBuf::from(dir);
        }
        if let Some(value) = lookup(ENV_BACKUP) {
            self.persistence.backup = parse_bool(ENV_BACKUP, &value)?;
        }
        if let Some(value) = lookup(ENV_AUTOSAVE_INTERVAL_MS) {
            self.graph.autosave_interval_ms = parse_number(ENV_AUTOSAVE_INTERVAL_MS, &value)?;
        }
        if let Some(value) = lookup(ENV_CACHE_TTL_SECS) {
            self.query.cache_ttl_secs = parse_number(ENV_CACHE_TTL_SECS, &value)?;
        }
        Ok(self)
    }

    /// Graph store settings derived from this configuration.
    #[must_use]
    pub fn store_config(&self) -> GraphStoreConfig {
        GraphStoreConfig::default()
            .with_autosave_interval(Duration::from_millis(self.graph.autosave_interval_ms))
            .with_indexed_properties(self.graph.indexed_properties.iter().cloned())
            .with_max_batch_size(self.graph.max_batch_size)
    }

    /// Query engine settings derived from this configuration.
    #[must_use]
    pub const fn query_config(&self) -> QueryEngineConfig {
        QueryEngineConfig {
            cache_ttl: Duration::from_secs(self.query.cache_ttl_secs),
            cache_capacity: self.query.cache_capacity,
        }
    }

    /// Logging settings with the filter resolved from the environment.
    #[must_use]
    pub fn logging_config(&self, verbose: bool) -> LoggingConfig {
        LoggingConfig::from_env(verbose, self.logging.format, self.logging.file.clone())
    }

    fn from_config_file(file: ConfigFile) -> Result<Self> {
        let mut config = Self::default();

        if let Some(data_dir) = file.data_dir {
            config.data_dir = PathBuf::from(data_dir);
        }
        if let Some(backup) = file.persistence.and_then(|p| p.backup) {
            config.persistence.backup = backup;
        }
        if let Some(graph) = file.graph {
            if let Some(interval) = graph.autosave_interval_ms {
                config.graph.autosave_interval_ms = interval;
            }
            if let Some(keys) = graph.indexed_properties {
                config.graph.indexed_properties = keys;
            }
            if let Some(max) = graph.max_batch_size {
                config.graph.max_batch_size = max;
            }
        }
        if let Some(query) = file.query {
            if let Some(ttl) = query.cache_ttl_secs {
                config.query.cache_ttl_secs = ttl;
            }
            if let Some(capacity) = query.cache_capacity {
                config.query.cache_capacity = capacity;
            }
        }
        if let Some(logging) = file.logging {
            if let Some(format) = logging.format {
                config.logging.format = format.parse()?;
            }
            config.logging.file = logging.file.map(PathBuf::from);
        }

        Ok(config)
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(Error::InvalidInput(format!("{key}: expected a boolean, got '{other}'"))),
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::InvalidInput(format!("{key}: expected a number, got '{value}'")))
}
