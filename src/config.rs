//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::components::{RegistryConfig, ANY_ORIGIN};
use crate::render::ColumnPolicy;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub components: ComponentsConfig,

    #[serde(default)]
    pub layout: LayoutConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Custom component hosting
#[derive(Debug, Clone, Deserialize)]
pub struct ComponentsConfig {
    /// Server root that component assets are served under
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_target_origin")]
    pub target_origin: String,
}

fn default_base_url() -> String {
    "http://localhost:8501/".to_string()
}

fn default_target_origin() -> String {
    ANY_ORIGIN.to_string()
}

impl Default for ComponentsConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            target_origin: default_target_origin(),
        }
    }
}

impl ComponentsConfig {
    pub fn registry_config(&self) -> RegistryConfig {
        RegistryConfig {
            base_url: self.base_url.clone(),
            target_origin: self.target_origin.clone(),
        }
    }
}

/// Layout of the mounted tree
#[derive(Debug, Clone, Deserialize)]
pub struct LayoutConfig {
    #[serde(default = "default_container_width")]
    pub container_width: u32,

    #[serde(default = "default_breakpoint")]
    pub breakpoint: u32,

    #[serde(default = "default_min_column_width")]
    pub min_column_width: u32,
}

fn default_container_width() -> u32 {
    704
}

fn default_breakpoint() -> u32 {
    640
}

fn default_min_column_width() -> u32 {
    128
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            container_width: default_container_width(),
            breakpoint: default_breakpoint(),
            min_column_width: default_min_column_width(),
        }
    }
}

impl LayoutConfig {
    pub fn column_policy(&self) -> ColumnPolicy {
        ColumnPolicy {
            breakpoint: self.breakpoint,
            min_column_width: self.min_column_width,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Ok(config)
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from default locations or environment
    ///
    /// Nothing is logged here since this runs before the subscriber exists.
    /// Call [`ConfigSource::log`] once logging is up.
    pub fn load_default() -> (Self, ConfigSource) {
        let candidates: Vec<PathBuf> = [
            dirs::config_dir().map(|p| p.join("widget-relay").join("config.toml")),
            Some(PathBuf::from("./widget-relay.toml")),
        ]
        .into_iter()
        .flatten()
        .collect();

        Self::load_first(&candidates, Self::load_with_env)
    }

    fn load_first(
        candidates: &[PathBuf],
        load: impl Fn(&Path) -> Result<Self, ConfigError>,
    ) -> (Self, ConfigSource) {
        let mut skipped = Vec::new();

        for path in candidates.iter().filter(|p| p.exists()) {
            match load(path) {
                Ok(config) => {
                    return (
                        config,
                        ConfigSource::File {
                            path: path.clone(),
                            skipped,
                        },
                    )
                }
                Err(e) => skipped.push(e),
            }
        }

        (Self::from_env(), ConfigSource::Defaults { skipped })
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("WIDGET_RELAY_COMPONENT_BASE_URL") {
            self.components.base_url = url;
        }

        if let Some(width) = lookup("WIDGET_RELAY_CONTAINER_WIDTH") {
            match width.parse() {
                Ok(w) => self.layout.container_width = w,
                Err(_) => tracing::warn!(value = %width, "Ignoring invalid WIDGET_RELAY_CONTAINER_WIDTH"),
            }
        }

        if let Some(level) = lookup("WIDGET_RELAY_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = lookup("WIDGET_RELAY_LOG_FORMAT") {
            self.logging.format = format;
        }
    }
}

/// Where the active configuration came from
#[derive(Debug)]
pub enum ConfigSource {
    /// Loaded from a file, after skipping candidates that failed to load
    File { path: PathBuf, skipped: Vec<ConfigError> },
    /// No usable file; defaults plus environment overrides
    Defaults { skipped: Vec<ConfigError> },
}

impl ConfigSource {
    pub fn skipped(&self) -> &[ConfigError] {
        match self {
            ConfigSource::File { skipped, .. } | ConfigSource::Defaults { skipped } => skipped,
        }
    }

    pub fn log(&self) {
        for error in self.skipped() {
            tracing::warn!(error = %error, "Skipping config file");
        }
        match self {
            ConfigSource::File { path, .. } => {
                tracing::info!(path = %path.display(), "Loaded config")
            }
            ConfigSource::Defaults { .. } => {
                tracing::info!("Using default config with environment overrides")
            }
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# widget-relay Configuration
#
# Environment variables override these settings:
# - WIDGET_RELAY_COMPONENT_BASE_URL
# - WIDGET_RELAY_CONTAINER_WIDTH
# - WIDGET_RELAY_LOG_LEVEL
# - WIDGET_RELAY_LOG_FORMAT

[components]
# Server root; registered components are served under {base_url}component/{name}/
base_url = "http://localhost:8501/"

# Target origin for messages posted into component frames
target_origin = "*"

[layout]
# Width of the main container (pixels)
container_width = 704

# Below this width, columns get a minimum width
breakpoint = 640

# Minimum column width below the breakpoint (pixels)
min_column_width = 128

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"
"#
    .to_string()
}
