//! Configuration management for mediabox
//!
//! This module provides a layered configuration system that loads settings from:
//! 1. Default values (embedded in structs)
//! 2. TOML configuration file
//! 3. Environment variables (highest priority)
//!
//! # Usage
//!
//! ```no_run
//! use mediabox::config::Config;
//!
//! let config = Config::load().expect("Failed to load configuration");
//! println!("Thumbnails go to: {}", config.thumbnail.path);
//! ```
//!
//! # Environment Variables
//!
//! Configuration can be overridden using environment variables with the pattern:
//! `MEDIABOX__<section>__<key>`
//!
//! Examples:
//! - `MEDIABOX__THUMBNAIL__TYPE=crop`
//! - `MEDIABOX__THUMBNAIL__BACKEND=archive`
//! - `MEDIABOX__MEDIA__MAX_PICTURE_BYTES=50MB`
//!
//! # Configuration File
//!
//! By default, the configuration is loaded from `config/mediabox.toml`.
//! This can be overridden using the `MEDIABOX_CONFIG` environment variable.

mod models;
mod resolver;
mod sources;
mod validation;

pub use crate::humanize::ByteSize;
pub use models::{
    BackendConfig, BackendProvider, Config, DimensionSpec, MediaConfig, StorageConfig,
    ThumbnailConfig,
};
pub use resolver::{ResolvedThumbnail, ThumbnailRequest, resolve_thumbnail};
pub use validation::ValidationError;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Configuration validation failed: {0}")]
    ValidationError(#[from] ValidationError),

    #[error("Failed to render configuration: {0}")]
    RenderError(#[from] toml::ser::Error),
}

impl Config {
    /// Load configuration from all sources (file + environment)
    ///
    /// Configuration is loaded with the following priority (highest to lowest):
    /// 1. Environment variables (`MEDIABOX__*`)
    /// 2. TOML file (default: `config/mediabox.toml`)
    /// 3. Default values
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file is malformed or
    /// validation fails (unknown backend, duplicate size codes, etc.)
    pub fn load() -> Result<Self, ConfigError> {
        let config = sources::load()?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific path
    ///
    /// Useful for testing with custom configuration files.
    pub fn load_from_path(path: std::path::PathBuf) -> Result<Self, ConfigError> {
        let config = sources::load_from_sources(path)?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Effective configuration as TOML
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_load_minimal_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test.toml");

        let toml_content = r#"
[thumbnail]
type = "crop"
        "#;

        fs::write(&config_path, toml_content).unwrap();

        let config = Config::load_from_path(config_path).unwrap();
        assert_eq!(config.thumbnail.kind, "crop");
        assert_eq!(config.storage.backends.len(), 1);
    }

    #[test]
    fn test_validation_catches_missing_backend() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test.toml");

        let toml_content = r#"
[thumbnail]
backend = "nonexistent"
        "#;

        fs::write(&config_path, toml_content).unwrap();

        let result = Config::load_from_path(config_path);
        assert!(matches!(
            result.unwrap_err(),
            ConfigError::ValidationError(ValidationError::UnknownThumbnailBackend { .. })
        ));
    }

    #[test]
    fn test_toml_roundtrip_of_effective_config() {
        let config = Config::default();
        let rendered = config.to_toml().unwrap();
        assert!(rendered.contains("[thumbnail]"));

        let back: Config = toml::from_str(&rendered).unwrap();
        assert_eq!(back.thumbnail, config.thumbnail);
        assert_eq!(back.media.max_picture_bytes, config.media.max_picture_bytes);
    }
}
