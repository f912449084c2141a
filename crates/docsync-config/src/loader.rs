//! Loading docsync configuration from disk
//!
//! The format is picked from the file extension: `.toml`, `.yaml`/`.yml`
//! or `.json`. Missing fields fall back to their defaults.
//!
//! # Example
//!
//! ```rust,no_run
//! use docsync_config::{ConfigFormat, ConfigLoader};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ConfigLoader::load_from_file("/path/to/docsync.toml").await?;
//!
//! let inline = ConfigLoader::from_str("[watcher]\nenabled = true\n", ConfigFormat::Toml)?;
//! assert!(inline.watcher.enabled);
//! # Ok(())
//! # }
//! ```

use crate::{DocsyncConfig, ValidationError};
use std::path::Path;
use thiserror::Error;
use tracing::debug;

/// Errors that can occur while loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file extension does not name a supported format
    #[error("unsupported config format: {0}")]
    UnsupportedFormat(String),

    /// I/O error while reading the file
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error
    #[cfg(feature = "toml")]
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// YAML parsing error
    #[cfg(feature = "yaml")]
    #[error("YAML parse error: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    /// JSON parsing error
    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// The configuration parsed but is not usable
    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Supported configuration file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// TOML
    Toml,
    /// YAML
    Yaml,
    /// JSON
    Json,
}

impl ConfigFormat {
    /// Detect the format from a file extension.
    pub fn from_path(path: &Path) -> ConfigResult<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            "toml" => Ok(Self::Toml),
            "yaml" | "yml" => Ok(Self::Yaml),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::UnsupportedFormat(other.to_string())),
        }
    }
}

/// Reads [`DocsyncConfig`] from files or strings.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from a file, choosing the parser by extension
    pub async fn load_from_file(path: impl AsRef<Path>) -> ConfigResult<DocsyncConfig> {
        let path = path.as_ref();
        let format = ConfigFormat::from_path(path)?;
        let content = tokio::fs::read_to_string(path).await?;
        debug!("Loaded config file {} ({:?})", path.display(), format);
        Self::from_str(&content, format)
    }

    /// Load configuration synchronously (for non-async contexts)
    pub fn load_from_file_sync(path: impl AsRef<Path>) -> ConfigResult<DocsyncConfig> {
        let path = path.as_ref();
        let format = ConfigFormat::from_path(path)?;
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content, format)
    }

    /// Parse configuration text in the given format
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str, format: ConfigFormat) -> ConfigResult<DocsyncConfig> {
        match format {
            #[cfg(feature = "toml")]
            ConfigFormat::Toml => Ok(toml::from_str(content)?),
            #[cfg(feature = "yaml")]
            ConfigFormat::Yaml => Ok(serde_yaml::from_str(content)?),
            ConfigFormat::Json => Ok(serde_json::from_str(content)?),
            #[allow(unreachable_patterns)]
            other => Err(ConfigError::UnsupportedFormat(format!("{:?}", other))),
        }
    }

    /// Load a file and validate it in one step
    pub async fn load_validated(path: impl AsRef<Path>) -> ConfigResult<DocsyncConfig> {
        let config = Self::load_from_file(path).await?;
        crate::ConfigValidator::validate(&config)?;
        Ok(config)
    }
}
