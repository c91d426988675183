//! # analytics-config
//!
//! The plugin registry and configuration model for the analytics pipeline engine.
//!
//! - [`registry`] — the process-wide, link-time-populated [`registry::PluginRegistry`].
//! - [`document`] — the declarative document shape and the [`document::AnalyticsConfig`]
//!   it resolves into.
//! - [`plugin_config`] — [`plugin_config::PluginConfig`], the typed, immutable
//!   configuration of one stage instance.
//! - [`loader`] — search-path resolution, `${VAR}` expansion, and YAML parsing.
//! - [`validation`] — cross-reference checks between pipelines and declared instances.
//! - [`context`] — [`context::RunContext`], the handle passed to every plugin invocation.
//! - [`plugin`] — the [`plugin::CollectorPlugin`]/[`plugin::ProcessorPlugin`]/
//!   [`plugin::ForwarderPlugin`] contracts a plugin implements.

pub mod context;
pub mod document;
pub mod error;
pub mod loader;
pub mod plugin;
pub mod plugin_config;
pub mod registry;
pub mod validation;

pub use context::RunContext;
pub use document::{AnalyticsConfig, OneOrMany, PipelineSpec, RawDocument, RawPipelineSpec, RawPluginEntry};
pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, load_config, load_config_from_file};
pub use plugin::{BoxedCollector, BoxedForwarder, BoxedProcessor, CollectorPlugin, ForwarderPlugin, ProcessorPlugin};
pub use plugin_config::PluginConfig;
pub use registry::{
    COLLECTOR_REGISTRY, CollectorDescriptor, ConfigSchema, FORWARDER_REGISTRY, ForwarderDescriptor,
    PROCESSOR_REGISTRY, PluginRegistry, ProcessorDescriptor,
};
pub use validation::validate_config;

/// Prelude for plugin authors: the contracts to implement, the context handed to
/// each invocation, and the registration types used to publish a descriptor.
pub mod prelude {
    pub use super::{
        BoxedCollector, BoxedForwarder, BoxedProcessor, COLLECTOR_REGISTRY, CollectorDescriptor, CollectorPlugin,
        ConfigSchema, FORWARDER_REGISTRY, ForwarderDescriptor, ForwarderPlugin, PROCESSOR_REGISTRY,
        ProcessorDescriptor, ProcessorPlugin, RunContext,
    };
}
