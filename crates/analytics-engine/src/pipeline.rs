//! One configured collect→process→forward graph, run to completion or until cancelled.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use analytics_config::{AnalyticsConfig, BoxedForwarder, PipelineSpec, PluginRegistry, RunContext};
use analytics_core::{Cache, CollectedEvent, EngineError, EventStream, RuntimeInfo, StageKind};
use futures::stream::StreamExt;
use rand::Rng;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::{PipelineError, PipelineResult};

const MAX_ATTEMPTS: u32 = 5;
const BASE_DELAY: Duration = Duration::from_secs(1);
const MAX_DELAY: Duration = Duration::from_secs(30);

/// Full jitter exponential backoff: delay doubles per attempt, capped at 30s, then a
/// uniform random value in `[0, delay)` is taken so that many pipelines retrying at
/// once don't all wake up in lockstep.
fn backoff_delay(attempt: u32) -> Duration {
    let exp = BASE_DELAY.saturating_mul(1u32 << attempt.saturating_sub(1).min(31));
    let capped = exp.min(MAX_DELAY);
    let capped_ms = capped.as_millis().max(1) as u64;
    let jittered_ms = rand::rng().random_range(0..capped_ms);
    Duration::from_millis(jittered_ms)
}

fn build_context_map(
    kind: StageKind,
    names: &[String],
    config: &Arc<AnalyticsConfig>,
    shared_cache: &Arc<Cache>,
    info: &Arc<RuntimeInfo>,
) -> HashMap<String, Arc<RunContext>> {
    let mut out = HashMap::with_capacity(names.len());
    for name in names {
        let Some(plugin_config) = config.instances(kind).get(name) else {
            error!(stage = %name, %kind, "pipeline references an instance missing from configuration");
            continue;
        };
        let ctx = RunContext::new(
            name.clone(),
            Arc::new(plugin_config.fields().clone()),
            shared_cache.clone(),
            info.clone(),
            config.clone(),
        );
        out.insert(name.clone(), Arc::new(ctx));
    }
    out
}

/// Runtime object for one configured pipeline.
///
/// Contexts and caches are built once, at construction, and live for as long as the
/// pipeline is started — they are shared across every `_run_once` attempt of every
/// restart burst, and only cleared when the pipeline stops for good.
pub struct Pipeline {
    name: String,
    spec: PipelineSpec,
    config: Arc<AnalyticsConfig>,
    shared_cache: Arc<Cache>,
    collector_ctx: HashMap<String, Arc<RunContext>>,
    processor_ctx: HashMap<String, Arc<RunContext>>,
    forwarder_ctx: HashMap<String, Arc<RunContext>>,
}

impl Pipeline {
    /// Builds a pipeline runtime for `spec`, within the given root configuration.
    pub fn new(config: Arc<AnalyticsConfig>, spec: PipelineSpec) -> Self {
        let shared_cache = Arc::new(Cache::new());
        let info = RuntimeInfo::shared(&config.host_config);

        let collector_ctx = build_context_map(StageKind::Collect, &spec.collect, &config, &shared_cache, &info);
        let processor_ctx = build_context_map(StageKind::Process, &spec.process, &config, &shared_cache, &info);
        let forwarder_ctx = build_context_map(StageKind::Forward, &spec.forward, &config, &shared_cache, &info);

        Self { name: spec.name.clone(), spec, config, shared_cache, collector_ctx, processor_ctx, forwarder_ctx }
    }

    /// The pipeline's declared name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Runs this pipeline until cancelled, or until a failed attempt with
    /// `restart: false` stops it for good. Always clears caches on the way out.
    pub async fn run(self: Arc<Self>, cancel: CancellationToken) -> PipelineResult<()> {
        let result = loop {
            if cancel.is_cancelled() {
                break Ok(());
            }

            match self.run_once(&cancel).await {
                Ok(()) => {
                    if cancel.is_cancelled() {
                        break Ok(());
                    }
                    continue;
                }
                Err(PipelineError::Engine(EngineError::Cancelled)) => break Ok(()),
                Err(e) => {
                    error!(pipeline = %self.name, error = %e, "pipeline run failed");
                    if !self.spec.restart {
                        break Err(e);
                    }
                    if cancel.is_cancelled() {
                        break Ok(());
                    }
                    continue;
                }
            }
        };

        self.cleanup();
        result
    }

    /// One `_run_once` burst: attempts the run up to [`MAX_ATTEMPTS`] times with full
    /// jitter exponential backoff between failures, giving up immediately on
    /// cancellation.
    async fn run_once(&self, cancel: &CancellationToken) -> PipelineResult<()> {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match self.attempt(cancel).await {
                Ok(()) => return Ok(()),
                Err(PipelineError::Engine(EngineError::Cancelled)) => {
                    return Err(PipelineError::Engine(EngineError::Cancelled));
                }
                Err(e) => {
                    if attempt == 1 {
                        error!(pipeline = %self.name, attempt, error = %e, "run attempt failed");
                    } else {
                        warn!(pipeline = %self.name, attempt, error = %e, "run attempt failed");
                    }

                    if attempt >= MAX_ATTEMPTS {
                        return Err(PipelineError::RetriesExhausted { pipeline: self.name.clone(), attempts: attempt });
                    }

                    let delay = backoff_delay(attempt);
                    tokio::select! {
                        _ = cancel.cancelled() => return Err(PipelineError::Engine(EngineError::Cancelled)),
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
            }
        }
    }

    /// One full execution of the collect→process→forward graph, from a fresh set of
    /// collector streams through to exhaustion or the first collector-level error.
    async fn attempt(&self, cancel: &CancellationToken) -> PipelineResult<()> {
        let collector_streams = self.build_collector_streams().await;
        let merged = analytics_core::merge(collector_streams);
        let chained = self
            .spec
            .process
            .iter()
            .fold(merged, |upstream, proc_name| self.chain_processor(upstream, proc_name));

        let mut chained = std::pin::pin!(chained);

        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(PipelineError::Engine(EngineError::Cancelled)),
                item = chained.next() => item,
            };

            match next {
                None => return Ok(()),
                Some(Ok(event)) => self.forward_to_all(event).await,
                Some(Err(e)) => return Err(PipelineError::Engine(e)),
            }
        }
    }

    async fn build_collector_streams(&self) -> Vec<EventStream> {
        let mut streams = Vec::with_capacity(self.spec.collect.len());
        for name in &self.spec.collect {
            let Some(ctx) = self.collector_ctx.get(name) else { continue };
            let Some(plugin_config) = self.config.collectors.get(name) else { continue };
            let Some(plugin) = PluginRegistry::instance().collector(plugin_config.plugin()) else {
                error!(collector = %name, plugin = plugin_config.plugin(), "collector plugin not loaded, skipping");
                continue;
            };

            debug!(collector = %name, "starting collector stream");
            streams.push(plugin.collect(ctx.clone()).await);
        }
        streams
    }

    fn chain_processor(&self, upstream: EventStream, proc_name: &str) -> EventStream {
        let Some(ctx) = self.processor_ctx.get(proc_name).cloned() else {
            return upstream;
        };
        let Some(plugin_config) = self.config.processors.get(proc_name) else {
            return upstream;
        };
        let Some(plugin) = PluginRegistry::instance().processor(plugin_config.plugin()) else {
            error!(processor = %proc_name, plugin = plugin_config.plugin(), "processor plugin not loaded, passing events through");
            return upstream;
        };

        analytics_core::flat_map(upstream, move |item| {
            let ctx = ctx.clone();
            let plugin = plugin.clone();
            async move {
                match item {
                    Err(e) => vec![Err(e)],
                    Ok(event) => match plugin.process(ctx, event).await {
                        Ok(events) => events.into_iter().map(Ok).collect(),
                        Err(e) => {
                            warn!(processor = plugin.name(), error = %e, "processor raised, dropping event");
                            Vec::new()
                        }
                    },
                }
            }
        })
    }

    async fn forward_to_all(&self, event: CollectedEvent) {
        let tasks = self.spec.forward.iter().filter_map(|name| {
            let ctx = self.forwarder_ctx.get(name)?.clone();
            let plugin_config = self.config.forwarders.get(name)?;
            let plugin: BoxedForwarder = PluginRegistry::instance().forwarder(plugin_config.plugin())?;
            let event = event.copy();
            Some(async move {
                if let Err(e) = plugin.forward(ctx, event).await {
                    error!(forwarder = plugin.name(), error = %e, "forwarder raised");
                }
            })
        });

        futures::future::join_all(tasks).await;
    }

    fn cleanup(&self) {
        info!(pipeline = %self.name, "clearing pipeline caches");
        self.shared_cache.clear();
        for ctx in self.collector_ctx.values().chain(self.processor_ctx.values()).chain(self.forwarder_ctx.values()) {
            ctx.cache().clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap as StdHashMap;

    #[test]
    fn backoff_delay_never_exceeds_the_cap() {
        for attempt in 1..=10 {
            assert!(backoff_delay(attempt) <= MAX_DELAY);
        }
    }

    #[test]
    fn backoff_delay_grows_with_attempt_on_average() {
        let early: u128 = (0..50).map(|_| backoff_delay(1).as_millis()).sum();
        let late: u128 = (0..50).map(|_| backoff_delay(5).as_millis()).sum();
        assert!(late >= early);
    }

    fn empty_spec(name: &str) -> PipelineSpec {
        PipelineSpec {
            name: name.to_string(),
            collect: Vec::new(),
            process: Vec::new(),
            forward: Vec::new(),
            enabled: true,
            restart: true,
        }
    }

    fn empty_config() -> Arc<AnalyticsConfig> {
        Arc::new(AnalyticsConfig {
            collectors: StdHashMap::new(),
            processors: StdHashMap::new(),
            forwarders: StdHashMap::new(),
            pipelines: StdHashMap::new(),
            host_config: serde_json::Value::Null,
        })
    }

    #[test]
    fn cleanup_clears_the_shared_cache_and_every_stage_context() {
        let pipeline = Pipeline::new(empty_config(), empty_spec("p"));
        pipeline.shared_cache.insert("k", serde_json::Value::from(1));
        assert!(!pipeline.shared_cache.is_empty());

        pipeline.cleanup();
        assert!(pipeline.shared_cache.is_empty());
    }

    mod restart_false_law {
        use super::*;
        use analytics_config::{BoxedCollector, COLLECTOR_REGISTRY, CollectorDescriptor, CollectorPlugin, PluginConfig};
        use async_trait::async_trait;
        use futures::stream::{self, StreamExt};
        use linkme::distributed_slice;

        struct AlwaysFailingCollector;

        #[async_trait]
        impl CollectorPlugin for AlwaysFailingCollector {
            fn name(&self) -> &'static str {
                "test-pipeline-always-failing-collector"
            }

            async fn collect(&self, _ctx: Arc<RunContext>) -> EventStream {
                stream::iter(vec![Err(EngineError::Collector {
                    plugin: self.name().to_string(),
                    source: "collector raised on purpose".into(),
                })])
                .boxed()
            }
        }

        #[distributed_slice(COLLECTOR_REGISTRY)]
        static ALWAYS_FAILING_COLLECTOR_DESC: CollectorDescriptor = CollectorDescriptor {
            name: "test-pipeline-always-failing-collector",
            build: || Arc::new(AlwaysFailingCollector) as BoxedCollector,
            config_schema: None,
        };

        fn failing_config() -> Arc<AnalyticsConfig> {
            let mut collectors = StdHashMap::new();
            collectors.insert(
                "c".to_string(),
                Arc::new(PluginConfig::new(
                    "c",
                    "test-pipeline-always-failing-collector",
                    serde_json::Value::Object(serde_json::Map::new()),
                )),
            );
            Arc::new(AnalyticsConfig {
                collectors,
                processors: StdHashMap::new(),
                forwarders: StdHashMap::new(),
                pipelines: StdHashMap::new(),
                host_config: serde_json::Value::Null,
            })
        }

        fn failing_spec() -> PipelineSpec {
            PipelineSpec {
                name: "x".to_string(),
                collect: vec!["c".to_string()],
                process: Vec::new(),
                forward: Vec::new(),
                enabled: true,
                restart: false,
            }
        }

        /// With time paused, the backoff sleeps between attempts resolve immediately
        /// instead of costing real wall-clock time, since this future is the only
        /// thing running and the executor auto-advances paused time to the next timer.
        #[tokio::test(start_paused = true)]
        async fn stops_for_good_after_retries_are_exhausted() {
            let pipeline = Arc::new(Pipeline::new(failing_config(), failing_spec()));
            let result = pipeline.run(CancellationToken::new()).await;
            assert!(matches!(result, Err(PipelineError::RetriesExhausted { attempts: 5, .. })));
            assert!(pipeline.shared_cache.is_empty());
        }
    }
}
