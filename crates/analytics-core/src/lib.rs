//! # analytics-core
//!
//! Foundational types shared by every layer of the analytics pipeline engine:
//! the event that flows through a pipeline, the stream composition primitives
//! (`merge`, `flat_map`) used to build a pipeline's collect→process→forward
//! graph, the plugin-facing `Cache`/`RuntimeInfo` types, and the `EngineError`
//! type stage failures are reported through.
//!
//! The `CollectorPlugin`/`ProcessorPlugin`/`ForwarderPlugin` contracts and the
//! `RunContext` handed to every stage invocation live in `analytics-config`
//! instead: `RunContext` carries a back-pointer to `AnalyticsConfig`, and this
//! crate has no dependency on configuration parsing or pipeline execution —
//! those live in `analytics-config` and `analytics-engine` respectively, both
//! of which depend on the types defined here.

pub mod context;
pub mod error;
pub mod event;
pub mod stream;

pub use context::{Cache, RuntimeInfo};
pub use error::{BoxError, EngineError, EngineResult, StageKind};
pub use event::CollectedEvent;
pub use stream::{EventStream, flat_map, merge};

/// Prelude of this crate's own types. Plugin authors want
/// `analytics_config::prelude` or the top-level `analytics::prelude` instead,
/// since the plugin contracts and `RunContext` live there.
pub mod prelude {
    pub use super::{Cache, CollectedEvent, EngineError, EngineResult, EventStream, RuntimeInfo, StageKind, flat_map, merge};
}
