//! The handle passed to every plugin invocation.

use std::sync::Arc;

use analytics_core::{Cache, RuntimeInfo};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::document::AnalyticsConfig;

/// Handle passed to every collector/processor/forwarder invocation.
///
/// Exclusively owned by one stage-instance within one pipeline run: `cache` is
/// private to that stage, `shared_cache` is the same instance injected into every
/// stage of the same pipeline's current run.
pub struct RunContext {
    stage_name: String,
    config: Arc<Value>,
    cache: Cache,
    shared_cache: Arc<Cache>,
    info: Arc<RuntimeInfo>,
    pipeline_config: Arc<AnalyticsConfig>,
}

impl RunContext {
    /// Builds a context for one stage-instance of one pipeline run.
    pub fn new(
        stage_name: impl Into<String>,
        config: Arc<Value>,
        shared_cache: Arc<Cache>,
        info: Arc<RuntimeInfo>,
        pipeline_config: Arc<AnalyticsConfig>,
    ) -> Self {
        Self {
            stage_name: stage_name.into(),
            config,
            cache: Cache::new(),
            shared_cache,
            info,
            pipeline_config,
        }
    }

    /// The name of the stage instance this context belongs to.
    pub fn stage_name(&self) -> &str {
        &self.stage_name
    }

    /// Deserializes this stage's configuration into a plugin-owned type.
    ///
    /// Plugins with no opinion on their config shape can skip this and read
    /// [`RunContext::config_value`] directly.
    pub fn config<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        T::deserialize(self.config.as_ref().clone())
    }

    /// The stage's raw, unparsed configuration.
    pub fn config_value(&self) -> &Value {
        &self.config
    }

    /// This stage-instance's private cache.
    pub fn cache(&self) -> &Cache {
        &self.cache
    }

    /// The cache shared by every stage of this pipeline's current run.
    pub fn shared_cache(&self) -> &Cache {
        &self.shared_cache
    }

    /// Host/engine identity info.
    pub fn info(&self) -> &RuntimeInfo {
        &self.info
    }

    /// The root configuration this stage instance was loaded as part of.
    pub fn pipeline_config(&self) -> &Arc<AnalyticsConfig> {
        &self.pipeline_config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn root() -> Arc<AnalyticsConfig> {
        Arc::new(AnalyticsConfig {
            collectors: HashMap::new(),
            processors: HashMap::new(),
            forwarders: HashMap::new(),
            pipelines: HashMap::new(),
            host_config: Value::Null,
        })
    }

    #[test]
    fn run_context_cache_is_private_but_shared_cache_is_shared() {
        let shared = Arc::new(Cache::new());
        let info = Arc::new(RuntimeInfo::resolve(&Value::Null));
        let root = root();
        let a = RunContext::new("a", Arc::new(Value::Null), shared.clone(), info.clone(), root.clone());
        let b = RunContext::new("b", Arc::new(Value::Null), shared.clone(), info, root);

        a.cache().insert("k", Value::from("only-a"));
        assert!(b.cache().get("k").is_none());

        a.shared_cache().insert("shared", Value::from(1));
        assert_eq!(b.shared_cache().get("shared"), Some(Value::from(1)));
    }

    #[test]
    fn pipeline_config_exposes_the_root_this_instance_was_loaded_under() {
        let shared = Arc::new(Cache::new());
        let info = Arc::new(RuntimeInfo::resolve(&Value::Null));
        let root = root();
        let ctx = RunContext::new("a", Arc::new(Value::Null), shared, info, root.clone());

        assert!(Arc::ptr_eq(ctx.pipeline_config(), &root));
    }
}
