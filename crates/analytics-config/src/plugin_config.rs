//! Typed, immutable configuration for one named stage instance.

use std::sync::{Arc, OnceLock, Weak};

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::document::AnalyticsConfig;

/// Configuration for a single named collector/processor/forwarder instance.
///
/// Immutable after construction: `name` and `plugin` are fixed at load time, and
/// `fields` is the validated, frozen config blob. The back-pointer to the root
/// [`AnalyticsConfig`] is set exactly once, after the root has been fully built and
/// wrapped in an `Arc`, to avoid a true reference cycle.
#[derive(Debug)]
pub struct PluginConfig {
    name: String,
    plugin: String,
    fields: Value,
    root: OnceLock<Weak<AnalyticsConfig>>,
}

impl PluginConfig {
    /// Builds a stage-instance config. `root` is bound later, via [`PluginConfig::bind_root`].
    pub fn new(name: impl Into<String>, plugin: impl Into<String>, fields: Value) -> Self {
        Self { name: name.into(), plugin: plugin.into(), fields, root: OnceLock::new() }
    }

    /// This instance's declared name, unique within its stage kind.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The registry name of the plugin this instance is configured against.
    pub fn plugin(&self) -> &str {
        &self.plugin
    }

    /// The raw, validated config fields.
    pub fn fields(&self) -> &Value {
        &self.fields
    }

    /// Deserializes the config fields into a plugin-owned type.
    pub fn get<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        T::deserialize(self.fields.clone())
    }

    /// The root configuration this instance was loaded as part of, if the back-pointer
    /// is still alive.
    pub fn root(&self) -> Option<Arc<AnalyticsConfig>> {
        self.root.get().and_then(Weak::upgrade)
    }

    /// Binds the back-pointer to the root config. Called once by the loader right after
    /// the root has been fully built and `Arc`-wrapped.
    pub(crate) fn bind_root(&self, root: &Arc<AnalyticsConfig>) {
        let _ = self.root.set(Arc::downgrade(root));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::PipelineSpec;
    use std::collections::HashMap;

    #[test]
    fn root_is_none_until_bound() {
        let config = PluginConfig::new("stdin-tail", "file_tail", Value::Null);
        assert!(config.root().is_none());
    }

    #[test]
    fn root_upgrades_after_binding() {
        let config = PluginConfig::new("stdin-tail", "file_tail", Value::Null);
        let root = Arc::new(AnalyticsConfig {
            collectors: HashMap::new(),
            processors: HashMap::new(),
            forwarders: HashMap::new(),
            pipelines: HashMap::<String, PipelineSpec>::new(),
            host_config: Value::Null,
        });
        config.bind_root(&root);
        assert!(config.root().is_some());
    }
}
