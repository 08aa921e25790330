//! Configuration management for mfst.
//!
//! Parses `mfst.toml` configuration files with serde and provides
//! auto-discovery of config files in parent directories.
//!
//! CLI settings can be applied during load via [`CliSettings`].
//!
//! ## Environment Variable Expansion
//!
//! `storage.root_dir` supports `~` and environment variable expansion:
//!
//! - `${VAR}` - expands to the value of VAR, errors if unset
//! - `${VAR:-default}` - expands to VAR if set, otherwise uses default

mod expand;

use std::path::{Path, PathBuf};
use std::time::Duration;

use mfst_runtime::{ContentType, Strategies, strategy_by_name};
use serde::Deserialize;

/// CLI settings that override configuration file values.
///
/// All fields are optional. Only non-None values override the loaded config.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override storage root directory.
    pub root_dir: Option<PathBuf>,
    /// Override content type for new files.
    pub content_type: Option<ContentType>,
    /// Override cache enabled flag.
    pub cache_enabled: Option<bool>,
}

/// Configuration filename to search for.
pub const CONFIG_FILENAME: &str = "mfst.toml";

/// Application configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Storage configuration (paths are relative strings from TOML).
    storage: StorageConfigRaw,
    /// Cache configuration.
    pub cache: CacheConfig,
    /// Watcher configuration.
    pub watch: WatchConfig,

    /// Resolved storage configuration (set after loading).
    #[serde(skip)]
    pub storage_resolved: StorageConfig,
    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self::default_with_base(Path::new("."))
    }
}

/// Raw storage configuration as parsed from TOML.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct StorageConfigRaw {
    root_dir: Option<String>,
    content_type: Option<String>,
    identifiers: Option<Vec<String>>,
}

/// Resolved storage configuration with an absolute root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageConfig {
    /// Directory holding one subdirectory per kind.
    pub root_dir: PathBuf,
    /// Format of newly written files.
    pub content_type: ContentType,
    /// Identifier strategy names, tried in order.
    pub identifiers: Vec<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root_dir: PathBuf::from("manifests"),
            content_type: ContentType::Yaml,
            identifiers: default_identifiers(),
        }
    }
}

impl StorageConfig {
    /// Identifier strategies named by `identifiers`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` for an unknown strategy name.
    pub fn strategies(&self) -> Result<Strategies, ConfigError> {
        self.identifiers
            .iter()
            .map(|name| {
                strategy_by_name(name).ok_or_else(|| {
                    ConfigError::InvalidValue(format!(
                        "storage.identifiers: unknown strategy {name:?}"
                    ))
                })
            })
            .collect()
    }
}

fn default_identifiers() -> Vec<String> {
    vec!["name".to_owned(), "uid".to_owned()]
}

/// Cache configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Whether reads go through the in-memory cache.
    pub enabled: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Watcher configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Subscriber queue capacity.
    pub queue_capacity: usize,
    /// Settle window in milliseconds.
    pub settle_ms: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 4096,
            settle_ms: 100,
        }
    }
}

impl WatchConfig {
    #[must_use]
    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Environment variable error during expansion.
    #[error("Expansion error in {field}: {message}")]
    Expand {
        /// Config field path (e.g., "`storage.root_dir`").
        field: String,
        message: String,
    },
    /// Value out of range or not recognized.
    #[error("Configuration error: {0}")]
    InvalidValue(String),
}

impl Config {
    /// Load configuration from file with optional CLI settings.
    ///
    /// If `config_path` is provided, loads from that file.
    /// Otherwise, searches for `mfst.toml` in current directory and parents.
    ///
    /// CLI settings are applied after loading and path resolution, allowing CLI
    /// arguments to take precedence over config file values.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist or parsing fails.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path)?
        } else if let Some(discovered) = std::env::current_dir()
            .ok()
            .and_then(|cwd| Self::discover_config(&cwd))
        {
            Self::load_from_file(&discovered)?
        } else {
            Self::default_with_cwd()
        };

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings);
        }

        Ok(config)
    }

    /// Apply CLI settings to the configuration.
    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(root_dir) = &settings.root_dir {
            self.storage_resolved.root_dir.clone_from(root_dir);
        }
        if let Some(content_type) = settings.content_type {
            self.storage_resolved.content_type = content_type;
        }
        if let Some(cache_enabled) = settings.cache_enabled {
            self.cache.enabled = cache_enabled;
        }
    }

    /// Search for a config file in `start` and its parents.
    fn discover_config(start: &Path) -> Option<PathBuf> {
        let mut current = start.to_path_buf();
        loop {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.exists() {
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    /// Create default config with paths relative to current working directory.
    fn default_with_cwd() -> Self {
        let cwd = std::env::current_dir().unwrap_or_default();
        Self::default_with_base(&cwd)
    }

    /// Create default config with paths relative to given base directory.
    fn default_with_base(base: &Path) -> Self {
        Self {
            storage: StorageConfigRaw::default(),
            cache: CacheConfig::default(),
            watch: WatchConfig::default(),
            storage_resolved: StorageConfig {
                root_dir: base.join("manifests"),
                ..StorageConfig::default()
            },
            config_path: None,
        }
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;

        let config_dir = path.parent().unwrap_or(Path::new("."));
        config.resolve(config_dir)?;
        config.config_path = Some(path.to_path_buf());

        config.validate()?;

        Ok(config)
    }

    /// Expand and resolve raw storage settings relative to `config_dir`.
    fn resolve(&mut self, config_dir: &Path) -> Result<(), ConfigError> {
        let root_dir = match &self.storage.root_dir {
            Some(raw) => config_dir.join(expand::expand_env(raw, "storage.root_dir")?),
            None => config_dir.join("manifests"),
        };

        let content_type = match &self.storage.content_type {
            Some(raw) => raw
                .parse()
                .map_err(|e| ConfigError::InvalidValue(format!("storage.content_type: {e}")))?,
            None => ContentType::Yaml,
        };

        self.storage_resolved = StorageConfig {
            root_dir,
            content_type,
            identifiers: self
                .storage
                .identifiers
                .clone()
                .unwrap_or_else(default_identifiers),
        };

        Ok(())
    }

    /// Validate configuration values.
    ///
    /// Called automatically after loading from file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.storage_resolved.identifiers.is_empty() {
            return Err(ConfigError::InvalidValue(
                "storage.identifiers cannot be empty".to_owned(),
            ));
        }
        self.storage_resolved.strategies()?;

        if self.watch.queue_capacity == 0 {
            return Err(ConfigError::InvalidValue(
                "watch.queue_capacity must be greater than 0".to_owned(),
            ));
        }

        Ok(())
    }
}
