//! Configuration validation.

use crate::{DocsyncConfig, ScannerLimits, WatchPathsConfig, WatcherSettings};
use std::path::{Component, Path};
use thiserror::Error;

/// Largest accepted debounce window.
pub const MAX_DEBOUNCE_MS: u64 = 60_000;

/// Configuration validation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Invalid configuration value
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
    /// Invalid workspace-relative path
    #[error("Invalid path for {0}: {1}")]
    InvalidPath(String, String),
    /// Glob pattern that does not compile
    #[error("Invalid exclusion pattern '{0}': {1}")]
    InvalidPattern(String, String),
}

/// Validates loaded configuration before it is handed to the watcher.
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate a complete configuration.
    pub fn validate(config: &DocsyncConfig) -> Result<(), ValidationError> {
        Self::validate_watcher(&config.watcher)?;
        Self::validate_paths(&config.paths)?;
        Self::validate_scanner(&config.scanner)?;
        Ok(())
    }

    /// Validate watcher settings.
    pub fn validate_watcher(settings: &WatcherSettings) -> Result<(), ValidationError> {
        if settings.debounce_ms == 0 {
            return Err(ValidationError::InvalidValue(
                "debounce_ms".to_string(),
                "must be greater than 0".to_string(),
            ));
        }
        if settings.debounce_ms > MAX_DEBOUNCE_MS {
            return Err(ValidationError::InvalidValue(
                "debounce_ms".to_string(),
                format!("must not exceed {}", MAX_DEBOUNCE_MS),
            ));
        }
        Ok(())
    }

    /// Validate the special paths and exclusion patterns.
    pub fn validate_paths(paths: &WatchPathsConfig) -> Result<(), ValidationError> {
        if let Some(ref root) = paths.analysis_root {
            Self::validate_relative("analysis_root", root, true)?;
        }
        Self::validate_relative("report_dir", &paths.report_dir, false)?;
        Self::validate_relative("snapshot_file", &paths.snapshot_file, false)?;

        for pattern in &paths.exclude_patterns {
            let trimmed = pattern.trim();
            if trimmed.is_empty() {
                continue;
            }
            globset::Glob::new(trimmed).map_err(|e| {
                ValidationError::InvalidPattern(pattern.clone(), e.to_string())
            })?;
        }

        Ok(())
    }

    /// Validate scanner limits.
    pub fn validate_scanner(limits: &ScannerLimits) -> Result<(), ValidationError> {
        let fields = [
            ("max_candidates", limits.max_candidates as u64),
            ("max_file_bytes", limits.max_file_bytes),
            ("max_findings", limits.max_findings as u64),
        ];
        for (field, value) in fields {
            if value == 0 {
                return Err(ValidationError::InvalidValue(
                    field.to_string(),
                    "must be greater than 0".to_string(),
                ));
            }
        }
        Ok(())
    }

    fn validate_relative(field: &str, value: &str, allow_empty: bool) -> Result<(), ValidationError> {
        if value.trim().is_empty() {
            if allow_empty {
                return Ok(());
            }
            return Err(ValidationError::InvalidPath(
                field.to_string(),
                "must not be empty".to_string(),
            ));
        }

        let path = Path::new(value);
        if path.is_absolute() {
            return Err(ValidationError::InvalidPath(
                field.to_string(),
                format!("'{}' must be workspace-relative", value),
            ));
        }
        if path.components().any(|c| matches!(c, Component::ParentDir)) {
            return Err(ValidationError::InvalidPath(
                field.to_string(),
                format!("'{}' escapes the workspace", value),
            ));
        }
        Ok(())
    }
}
