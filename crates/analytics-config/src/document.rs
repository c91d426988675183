//! The declarative configuration document and the validated model it builds into.

use std::collections::HashMap;
use std::sync::Arc;

use analytics_core::StageKind;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{ConfigError, ConfigResult};
use crate::plugin_config::PluginConfig;
use crate::registry::PluginRegistry;

/// A YAML scalar or list, coerced to a `Vec` either way.
///
/// `collect: foo` and `collect: [foo]` are equivalent; this is how the document
/// represents both without forcing every author to remember the list form.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    /// A single scalar value.
    One(T),
    /// An explicit list.
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    /// Flattens into a plain `Vec`.
    pub fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::One(v) => vec![v],
            OneOrMany::Many(v) => v,
        }
    }
}

impl<T> Default for OneOrMany<T> {
    fn default() -> Self {
        OneOrMany::Many(Vec::new())
    }
}

/// One raw `collectors`/`processors`/`forwarders` entry before schema validation.
#[derive(Debug, Clone, Deserialize)]
pub struct RawPluginEntry {
    /// The registry name of the plugin module this instance is configured against.
    pub plugin: String,
    /// The instance's own config fields, everything besides `plugin`.
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

/// One raw `pipelines.<name>` entry before normalization.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RawPipelineSpec {
    /// Collector instance name(s) feeding this pipeline.
    pub collect: OneOrMany<String>,
    /// Processor instance name(s), applied in order.
    pub process: OneOrMany<String>,
    /// Forwarder instance name(s) events fan out to.
    pub forward: OneOrMany<String>,
    /// Whether the pipeline should be started at all.
    pub enabled: bool,
    /// Whether a failed run attempt should be retried.
    pub restart: bool,
}

impl Default for RawPipelineSpec {
    fn default() -> Self {
        Self {
            collect: OneOrMany::default(),
            process: OneOrMany::default(),
            forward: OneOrMany::default(),
            enabled: true,
            restart: true,
        }
    }
}

/// The raw document as parsed directly from YAML, before registry resolution.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawDocument {
    /// Declared collector instances.
    pub collectors: HashMap<String, RawPluginEntry>,
    /// Declared processor instances.
    pub processors: HashMap<String, RawPluginEntry>,
    /// Declared forwarder instances.
    pub forwarders: HashMap<String, RawPluginEntry>,
    /// Declared pipelines.
    pub pipelines: HashMap<String, RawPipelineSpec>,
    /// Free-form host identity/role blob, opaque to this crate.
    pub host_config: Value,
}

/// Normalized wiring of one pipeline: which stage instances feed it, in what order,
/// and whether it runs at all.
#[derive(Debug, Clone)]
pub struct PipelineSpec {
    /// The pipeline's declared name.
    pub name: String,
    /// Collector instance names, in the order their streams are merged.
    pub collect: Vec<String>,
    /// Processor instance names, applied in order to every collected event.
    pub process: Vec<String>,
    /// Forwarder instance names every surviving event fans out to.
    pub forward: Vec<String>,
    /// Whether the manager should start this pipeline.
    pub enabled: bool,
    /// Whether a failed run attempt should be retried with backoff.
    pub restart: bool,
}

/// The fully validated, frozen root configuration.
#[derive(Debug)]
pub struct AnalyticsConfig {
    /// Resolved collector instances, by name.
    pub collectors: HashMap<String, Arc<PluginConfig>>,
    /// Resolved processor instances, by name.
    pub processors: HashMap<String, Arc<PluginConfig>>,
    /// Resolved forwarder instances, by name.
    pub forwarders: HashMap<String, Arc<PluginConfig>>,
    /// Declared pipelines, by name.
    pub pipelines: HashMap<String, PipelineSpec>,
    /// Free-form host identity/role blob.
    pub host_config: Value,
}

impl AnalyticsConfig {
    /// The `PluginConfig` map for one stage kind.
    pub fn instances(&self, kind: StageKind) -> &HashMap<String, Arc<PluginConfig>> {
        match kind {
            StageKind::Collect => &self.collectors,
            StageKind::Process => &self.processors,
            StageKind::Forward => &self.forwarders,
        }
    }
}

fn resolve_entries(
    kind: StageKind,
    raw: HashMap<String, RawPluginEntry>,
    registry: &PluginRegistry,
) -> ConfigResult<HashMap<String, Arc<PluginConfig>>> {
    let mut out = HashMap::with_capacity(raw.len());
    for (name, entry) in raw {
        if !registry.contains(kind, &entry.plugin) {
            return Err(ConfigError::UnknownPlugin {
                pipeline: name,
                kind,
                name: entry.plugin,
                known: registry.known_names(kind),
            });
        }

        let fields = Value::Object(entry.fields);
        if let Some(schema) = registry.config_schema(kind, &entry.plugin) {
            schema(&fields).map_err(ConfigError::validation)?;
        }

        out.insert(name.clone(), Arc::new(PluginConfig::new(name, entry.plugin, fields)));
    }
    Ok(out)
}

/// Builds a validated [`AnalyticsConfig`] from a parsed [`RawDocument`], resolving every
/// plugin reference against `registry` and binding each `PluginConfig`'s back-pointer to
/// the finished root.
pub fn build_config(raw: RawDocument, registry: &PluginRegistry) -> ConfigResult<Arc<AnalyticsConfig>> {
    let collectors = resolve_entries(StageKind::Collect, raw.collectors, registry)?;
    let processors = resolve_entries(StageKind::Process, raw.processors, registry)?;
    let forwarders = resolve_entries(StageKind::Forward, raw.forwarders, registry)?;

    let mut pipelines = HashMap::with_capacity(raw.pipelines.len());
    for (name, spec) in raw.pipelines {
        pipelines.insert(
            name.clone(),
            PipelineSpec {
                name,
                collect: spec.collect.into_vec(),
                process: spec.process.into_vec(),
                forward: spec.forward.into_vec(),
                enabled: spec.enabled,
                restart: spec.restart,
            },
        );
    }

    let config = Arc::new(AnalyticsConfig {
        collectors,
        processors,
        forwarders,
        pipelines,
        host_config: raw.host_config,
    });

    for kind in [StageKind::Collect, StageKind::Process, StageKind::Forward] {
        for instance in config.instances(kind).values() {
            instance.bind_root(&config);
        }
    }

    crate::validation::validate_config(&config)?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_or_many_flattens_scalar_and_list_the_same_way() {
        let scalar: OneOrMany<String> = OneOrMany::One("a".into());
        let list: OneOrMany<String> = OneOrMany::Many(vec!["a".into()]);
        assert_eq!(scalar.into_vec(), list.into_vec());
    }

    #[test]
    fn raw_pipeline_spec_defaults_match_the_document_contract() {
        let spec = RawPipelineSpec::default();
        assert!(spec.enabled);
        assert!(spec.restart);
        assert!(spec.process.into_vec().is_empty());
    }
}
