//! Process-wide plugin registry, populated at link time.
//!
//! Plugin crates register themselves by placing a [`PluginDescriptor`] into one of the
//! three [`linkme::distributed_slice`] statics below. There is no runtime dynamic
//! loading: every descriptor that will ever exist in this process is known at compile
//! time, the way the teacher codebase registers its own transport capabilities.

use std::collections::HashMap;
use std::sync::OnceLock;

use analytics_core::StageKind;
use linkme::distributed_slice;
use tracing::{error, warn};

use crate::plugin::{BoxedCollector, BoxedForwarder, BoxedProcessor};

/// A schema validator: given a stage-instance's raw config fields, returns `Err` with a
/// human-readable message if the fields don't satisfy the plugin's declared shape.
///
/// Plugins with no opinion on their config shape can omit this; the generic
/// [`crate::plugin_config::PluginConfig`] shape applies in that case.
pub type ConfigSchema = fn(&serde_json::Value) -> Result<(), String>;

/// A compile-time-registered collector module.
pub struct CollectorDescriptor {
    /// The registry name plugins and config entries refer to this module by.
    pub name: &'static str,
    /// Builds the plugin instance.
    pub build: fn() -> BoxedCollector,
    /// Optional config-shape validator.
    pub config_schema: Option<ConfigSchema>,
}

/// A compile-time-registered processor module.
pub struct ProcessorDescriptor {
    /// The registry name plugins and config entries refer to this module by.
    pub name: &'static str,
    /// Builds the plugin instance.
    pub build: fn() -> BoxedProcessor,
    /// Optional config-shape validator.
    pub config_schema: Option<ConfigSchema>,
}

/// A compile-time-registered forwarder module.
pub struct ForwarderDescriptor {
    /// The registry name plugins and config entries refer to this module by.
    pub name: &'static str,
    /// Builds the plugin instance.
    pub build: fn() -> BoxedForwarder,
    /// Optional config-shape validator.
    pub config_schema: Option<ConfigSchema>,
}

/// Static array every collector plugin crate registers itself into.
#[distributed_slice]
pub static COLLECTOR_REGISTRY: [CollectorDescriptor];

/// Static array every processor plugin crate registers itself into.
#[distributed_slice]
pub static PROCESSOR_REGISTRY: [ProcessorDescriptor];

/// Static array every forwarder plugin crate registers itself into.
#[distributed_slice]
pub static FORWARDER_REGISTRY: [ForwarderDescriptor];

struct LoadedCollector {
    plugin: BoxedCollector,
    config_schema: Option<ConfigSchema>,
}

struct LoadedProcessor {
    plugin: BoxedProcessor,
    config_schema: Option<ConfigSchema>,
}

struct LoadedForwarder {
    plugin: BoxedForwarder,
    config_schema: Option<ConfigSchema>,
}

/// Process-wide, lazily initialized mapping from plugin name to loaded plugin, one
/// namespace per stage kind.
pub struct PluginRegistry {
    collectors: HashMap<String, LoadedCollector>,
    processors: HashMap<String, LoadedProcessor>,
    forwarders: HashMap<String, LoadedForwarder>,
}

static INSTANCE: OnceLock<PluginRegistry> = OnceLock::new();

impl PluginRegistry {
    /// Returns the process-wide singleton, building it from the distributed slices on
    /// first call.
    pub fn instance() -> &'static PluginRegistry {
        INSTANCE.get_or_init(Self::load)
    }

    fn load() -> Self {
        let mut collectors = HashMap::new();
        for descriptor in COLLECTOR_REGISTRY {
            match std::panic::catch_unwind(descriptor.build) {
                Ok(plugin) => {
                    if collectors
                        .insert(
                            descriptor.name.to_string(),
                            LoadedCollector { plugin, config_schema: descriptor.config_schema },
                        )
                        .is_some()
                    {
                        warn!(plugin = descriptor.name, kind = "collector", "duplicate plugin name, last registration wins");
                    }
                }
                Err(_) => {
                    error!(plugin = descriptor.name, kind = "collector", "plugin failed to load, skipping");
                }
            }
        }

        let mut processors = HashMap::new();
        for descriptor in PROCESSOR_REGISTRY {
            match std::panic::catch_unwind(descriptor.build) {
                Ok(plugin) => {
                    if processors
                        .insert(
                            descriptor.name.to_string(),
                            LoadedProcessor { plugin, config_schema: descriptor.config_schema },
                        )
                        .is_some()
                    {
                        warn!(plugin = descriptor.name, kind = "processor", "duplicate plugin name, last registration wins");
                    }
                }
                Err(_) => {
                    error!(plugin = descriptor.name, kind = "processor", "plugin failed to load, skipping");
                }
            }
        }

        let mut forwarders = HashMap::new();
        for descriptor in FORWARDER_REGISTRY {
            match std::panic::catch_unwind(descriptor.build) {
                Ok(plugin) => {
                    if forwarders
                        .insert(
                            descriptor.name.to_string(),
                            LoadedForwarder { plugin, config_schema: descriptor.config_schema },
                        )
                        .is_some()
                    {
                        warn!(plugin = descriptor.name, kind = "forwarder", "duplicate plugin name, last registration wins");
                    }
                }
                Err(_) => {
                    error!(plugin = descriptor.name, kind = "forwarder", "plugin failed to load, skipping");
                }
            }
        }

        Self { collectors, processors, forwarders }
    }

    /// Looks up a loaded collector by name.
    pub fn collector(&self, name: &str) -> Option<BoxedCollector> {
        self.collectors.get(name).map(|l| l.plugin.clone())
    }

    /// Looks up a loaded processor by name.
    pub fn processor(&self, name: &str) -> Option<BoxedProcessor> {
        self.processors.get(name).map(|l| l.plugin.clone())
    }

    /// Looks up a loaded forwarder by name.
    pub fn forwarder(&self, name: &str) -> Option<BoxedForwarder> {
        self.forwarders.get(name).map(|l| l.plugin.clone())
    }

    /// The config-shape validator a loaded plugin advertised, if any.
    pub fn config_schema(&self, kind: StageKind, name: &str) -> Option<ConfigSchema> {
        match kind {
            StageKind::Collect => self.collectors.get(name).and_then(|l| l.config_schema),
            StageKind::Process => self.processors.get(name).and_then(|l| l.config_schema),
            StageKind::Forward => self.forwarders.get(name).and_then(|l| l.config_schema),
        }
    }

    /// Every registered name under the given stage kind, for diagnostic messages.
    pub fn known_names(&self, kind: StageKind) -> Vec<String> {
        let mut names: Vec<String> = match kind {
            StageKind::Collect => self.collectors.keys().cloned().collect(),
            StageKind::Process => self.processors.keys().cloned().collect(),
            StageKind::Forward => self.forwarders.keys().cloned().collect(),
        };
        names.sort();
        names
    }

    /// True if a plugin of the given kind and name is loaded.
    pub fn contains(&self, kind: StageKind, name: &str) -> bool {
        match kind {
            StageKind::Collect => self.collectors.contains_key(name),
            StageKind::Process => self.processors.contains_key(name),
            StageKind::Forward => self.forwarders.contains_key(name),
        }
    }
}
