//! The three stage contracts a plugin implements.

use std::sync::Arc;

use async_trait::async_trait;
use analytics_core::{CollectedEvent, EngineResult, EventStream};

use crate::context::RunContext;

/// A source of events. Polled once per pipeline attempt; the returned stream is
/// merged with every other collector's stream for that run.
#[async_trait]
pub trait CollectorPlugin: Send + Sync {
    fn name(&self) -> &'static str;
    async fn collect(&self, ctx: Arc<RunContext>) -> EventStream;
}

/// Transforms one event into zero or more events. Errors drop only the input
/// event's own descendants, not its siblings.
#[async_trait]
pub trait ProcessorPlugin: Send + Sync {
    fn name(&self) -> &'static str;
    async fn process(&self, ctx: Arc<RunContext>, event: CollectedEvent) -> EngineResult<Vec<CollectedEvent>>;
}

/// A sink for events. Errors are logged and do not affect other forwarders or
/// other events.
#[async_trait]
pub trait ForwarderPlugin: Send + Sync {
    fn name(&self) -> &'static str;
    async fn forward(&self, ctx: Arc<RunContext>, event: CollectedEvent) -> EngineResult<()>;
}

pub type BoxedCollector = Arc<dyn CollectorPlugin>;
pub type BoxedProcessor = Arc<dyn ProcessorPlugin>;
pub type BoxedForwarder = Arc<dyn ForwarderPlugin>;
