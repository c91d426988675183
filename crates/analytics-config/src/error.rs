//! Error types for configuration loading, parsing, and validation.

use std::path::PathBuf;

use analytics_core::StageKind;
use thiserror::Error;

/// Errors that can occur while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No configuration file was found at the given path.
    #[error("configuration file not found: {0}")]
    FileNotFound(PathBuf),

    /// The configuration file could not be read.
    #[error("failed to read configuration: {0}")]
    ReadError(#[from] std::io::Error),

    /// The configuration document is not valid YAML.
    #[error("failed to parse configuration: {0}")]
    ParseError(#[from] serde_yaml::Error),

    /// A pipeline references a plugin name that is not registered under that stage kind.
    #[error("{pipeline}: {kind} '{name}' is not registered (known: {known:?})")]
    UnknownPlugin {
        /// The pipeline that made the reference.
        pipeline: String,
        /// Which registry section was searched.
        kind: StageKind,
        /// The name that could not be found.
        name: String,
        /// The names that were registered under that section, for diagnosis.
        known: Vec<String>,
    },

    /// A pipeline references a plugin *instance* name that the `collectors`/`processors`/
    /// `forwarders` sections of the document never defined.
    #[error("pipeline '{pipeline}' references undefined {kind} '{name}'")]
    MissingStageReference {
        /// The pipeline that made the reference.
        pipeline: String,
        /// Which stage list the reference came from.
        kind: StageKind,
        /// The undefined instance name.
        name: String,
    },

    /// A required field was missing from the document.
    #[error("missing required field: {field}")]
    MissingField {
        /// Dotted path of the missing field.
        field: String,
    },

    /// General validation failure that does not fit a more specific variant.
    #[error("configuration validation failed: {message}")]
    ValidationError {
        /// Human-readable description of the failure.
        message: String,
    },
}

impl ConfigError {
    /// Builds a [`ConfigError::ValidationError`].
    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationError { message: message.into() }
    }

    /// Builds a [`ConfigError::MissingField`].
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingField { field: field.into() }
    }
}

/// Result type used throughout configuration loading and validation.
pub type ConfigResult<T> = Result<T, ConfigError>;
