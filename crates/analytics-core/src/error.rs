//! Error types for the engine's stream and plugin-contract layer.

use thiserror::Error;

/// A plugin body's own error, opaque to the engine beyond its `Display`/`source` chain.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The three stage kinds a `PluginConfig`/`PluginDescriptor` can belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageKind {
    /// A collector: produces events.
    Collect,
    /// A processor: transforms events, 0..N per input.
    Process,
    /// A forwarder: delivers events to an external sink.
    Forward,
}

impl StageKind {
    /// The name used in configuration documents (`collectors`/`processors`/`forwarders`).
    pub fn section_name(self) -> &'static str {
        match self {
            StageKind::Collect => "collectors",
            StageKind::Process => "processors",
            StageKind::Forward => "forwarders",
        }
    }
}

impl std::fmt::Display for StageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            StageKind::Collect => "collector",
            StageKind::Process => "processor",
            StageKind::Forward => "forwarder",
        };
        f.write_str(s)
    }
}

/// Errors raised at the stream/plugin-contract boundary.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A collector stream failed to produce its next element.
    #[error("collector '{plugin}' failed: {source}")]
    Collector {
        /// Name of the collector stage instance.
        plugin: String,
        /// The plugin's own error.
        #[source]
        source: BoxError,
    },

    /// A processor raised while handling a single event.
    #[error("processor '{plugin}' failed: {source}")]
    Processor {
        /// Name of the processor stage instance.
        plugin: String,
        /// The plugin's own error.
        #[source]
        source: BoxError,
    },

    /// A forwarder raised while delivering an event.
    #[error("forwarder '{plugin}' failed: {source}")]
    Forwarder {
        /// Name of the forwarder stage instance.
        plugin: String,
        /// The plugin's own error.
        #[source]
        source: BoxError,
    },

    /// The run was cancelled; callers must not treat this as a retryable failure.
    #[error("pipeline run cancelled")]
    Cancelled,
}

/// Result alias used throughout the stream/plugin-contract layer.
pub type EngineResult<T> = Result<T, EngineError>;
