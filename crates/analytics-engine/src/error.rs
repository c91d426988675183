//! Run-loop-level error types, wrapping the core and config layers.

use analytics_config::ConfigError;
use analytics_core::EngineError;
use thiserror::Error;

/// Errors that can terminate one pipeline's run loop.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A stage raised while the run loop was executing.
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// The configured retry budget was exhausted without a successful run attempt.
    #[error("pipeline '{pipeline}' exhausted its retry budget after {attempts} attempt(s)")]
    RetriesExhausted {
        /// The pipeline's name.
        pipeline: String,
        /// Number of attempts made.
        attempts: u32,
    },
}

/// Result type used by the pipeline run loop.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Errors surfaced by [`crate::manager::Manager`] operations.
#[derive(Debug, Error)]
pub enum ManagerError {
    /// No pipeline with that name is declared in configuration.
    #[error("unknown pipeline: {0}")]
    UnknownPipeline(String),

    /// The pipeline is declared `enabled: false`.
    #[error("pipeline '{0}' is disabled")]
    Disabled(String),

    /// A start was requested for a pipeline that is already running.
    #[error("pipeline '{0}' is already running")]
    AlreadyRunning(String),

    /// A stop was requested for a pipeline that is not running.
    #[error("pipeline '{0}' is not running")]
    NotRunning(String),

    /// Configuration could not be loaded or validated.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Result type used by [`crate::manager::Manager`] operations.
pub type ManagerResult<T> = Result<T, ManagerError>;
