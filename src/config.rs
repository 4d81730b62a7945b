use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Source of a configuration value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigSource {
    Default,
    File,
    Environment,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::Default => write!(f, "default"),
            ConfigSource::File => write!(f, "file"),
            ConfigSource::Environment => write!(f, "environment"),
        }
    }
}

/// A configuration value with its source
#[derive(Debug, Clone, Serialize)]
pub struct ConfigValue<T> {
    pub value: T,
    pub source: ConfigSource,
}

impl<T> ConfigValue<T> {
    pub fn new(value: T, source: ConfigSource) -> Self {
        Self { value, source }
    }
}

/// Application configuration with source tracking
#[derive(Debug, Clone, Serialize)]
pub struct Config {
    /// Path to the SQLite database
    pub database_path: ConfigValue<PathBuf>,
    /// Nutrient and flag tables replacing the built-in catalog
    pub catalog_path: ConfigValue<Option<PathBuf>>,
    /// Config file path used (if any)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_file: Option<PathBuf>,
}

/// Internal struct for deserializing config file
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ConfigFile {
    database_path: Option<PathBuf>,
    catalog_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration with priority: env vars > config file > defaults
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let default_db_path = Self::default_data_dir().join("diet.db");

        // Start with defaults
        let mut database_path = ConfigValue::new(default_db_path, ConfigSource::Default);
        let mut catalog_path = ConfigValue::new(None, ConfigSource::Default);
        let mut config_file = None;

        // Try to load from config file
        let path = config_path.unwrap_or_else(Self::default_config_path);
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .map_err(|e| ConfigError::ReadError(path.clone(), e))?;
            let file_config: ConfigFile = serde_yaml::from_str(&contents)
                .map_err(|e| ConfigError::ParseError(path.clone(), e))?;

            config_file = Some(path.clone());

            if let Some(db_path) = file_config.database_path {
                database_path =
                    ConfigValue::new(resolve_relative(&path, db_path), ConfigSource::File);
            }
            if let Some(catalog) = file_config.catalog_path {
                catalog_path =
                    ConfigValue::new(Some(resolve_relative(&path, catalog)), ConfigSource::File);
            }
        }

        // Apply environment variable overrides
        if let Ok(db_path) = std::env::var("DIET_DATABASE_PATH") {
            database_path = ConfigValue::new(PathBuf::from(db_path), ConfigSource::Environment);
        }
        if let Ok(catalog) = std::env::var("DIET_CATALOG_PATH") {
            catalog_path =
                ConfigValue::new(Some(PathBuf::from(catalog)), ConfigSource::Environment);
        }

        Ok(Self {
            database_path,
            catalog_path,
            config_file,
        })
    }

    /// Default config directory (platform-specific):
    /// - Linux: ~/.config/diet/
    /// - macOS: ~/Library/Application Support/diet/
    /// - Windows: %APPDATA%/diet/
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("diet")
    }

    /// Default data directory (platform-specific):
    /// - Linux: ~/.local/share/diet/
    /// - macOS: ~/Library/Application Support/diet/
    /// - Windows: %APPDATA%/diet/
    pub fn default_data_dir() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("diet")
    }

    /// Default config file path (platform-specific config dir + config.yaml)
    pub fn default_config_path() -> PathBuf {
        Self::default_config_dir().join("config.yaml")
    }
}

/// Resolves a path from the config file against the file's directory.
fn resolve_relative(config_file: &Path, value: PathBuf) -> PathBuf {
    if value.is_relative() {
        config_file
            .parent()
            .map(|p| p.join(&value))
            .unwrap_or(value)
    } else {
        value
    }
}

#[derive(Debug)]
pub enum ConfigError {
    ReadError(PathBuf, std::io::Error),
    ParseError(PathBuf, serde_yaml::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::ReadError(path, e) => {
                write!(f, "Failed to read config file '{}': {}", path.display(), e)
            }
            ConfigError::ParseError(path, e) => {
                write!(f, "Failed to parse config file '{}': {}", path.display(), e)
            }
        }
    }
}

impl std::error::Error for ConfigError {}
