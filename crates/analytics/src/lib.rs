//! # analytics
//!
//! A pluggable, async event collection, processing, and forwarding engine.
//!
//! ## Overview
//!
//! Every pipeline is a declarative collect→process→forward graph: one or more
//! collectors produce events, an ordered chain of processors transforms and
//! fans them out, and a set of forwarders deliver the survivors to external
//! sinks. Collectors, processors, and forwarders are plugins, resolved by
//! name from a process-wide registry built at compile time — there is no
//! dynamic loading.
//!
//! ```text
//! ┌───────────┐     ┌────────────┐     ┌────────────┐
//! │ Collector │────▶│  Processor │────▶│  Forwarder │
//! │ Collector │────▶│  Processor │──┬─▶│  Forwarder │
//! └───────────┘     └────────────┘  └─▶│  Forwarder │
//!                                       └────────────┘
//! ```
//!
//! - [`analytics_core`] — the event type and stream composition primitives.
//! - [`analytics_config`] — the plugin registry, the configuration document
//!   model, the loader that turns a YAML file into a validated
//!   [`analytics_config::AnalyticsConfig`], and the
//!   `CollectorPlugin`/`ProcessorPlugin`/`ForwarderPlugin` contracts a plugin
//!   crate implements against [`analytics_config::RunContext`].
//! - [`analytics_engine`] — [`analytics_engine::Pipeline`], the runtime for
//!   one configured graph, and [`analytics_engine::Manager`], which owns the
//!   lifecycle of every pipeline declared in configuration.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use analytics::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = load_config("analytics.yaml")?;
//!     let manager = Manager::new(config);
//!     manager.run_until_signal().await;
//!     Ok(())
//! }
//! ```

pub use analytics_config;
pub use analytics_core;
pub use analytics_engine;

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use analytics::prelude::*;
/// ```
pub mod prelude {
    // Runtime — main entry points.
    pub use analytics_engine::{Manager, ManagerError, ManagerResult, Pipeline, PipelineError, PipelineResult};

    // Configuration.
    pub use analytics_config::{AnalyticsConfig, ConfigError, ConfigLoader, PipelineSpec, PluginConfig, load_config, load_config_from_file};

    // Plugin contracts and the context handed to each invocation — for implementing custom plugins.
    pub use analytics_config::{BoxedCollector, BoxedForwarder, BoxedProcessor, CollectorPlugin, ForwarderPlugin, ProcessorPlugin, RunContext};

    // The event type and process-wide identity info.
    pub use analytics_core::{Cache, CollectedEvent, EngineError, EngineResult, RuntimeInfo};

    // Plugin registration.
    pub use analytics_config::{
        COLLECTOR_REGISTRY, CollectorDescriptor, FORWARDER_REGISTRY, ForwarderDescriptor,
        PROCESSOR_REGISTRY, ProcessorDescriptor,
    };
}
