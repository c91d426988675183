//! Plugin-facing caches and process-wide host/engine identity.
//!
//! [`RunContext`] itself — the handle passed to every plugin invocation — lives in
//! `analytics_config`, since it carries a back-pointer to `AnalyticsConfig` and this
//! crate has no dependency on that one.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;
use serde_json::Value;

/// A mutable, string-keyed map of opaque values.
///
/// Used both for the per-stage `cache` and the pipeline-wide `shared_cache`. Plugins
/// own the keys they write; the engine never inspects the contents, only clears them
/// between runs. Guarded by `parking_lot::Mutex` purely so the map is `Send + Sync`
/// under the multi-threaded Tokio executor — at most one stage of a given pipeline
/// run is ever active at a time, so there is no real contention to design around.
#[derive(Debug, Default)]
pub struct Cache {
    entries: Mutex<HashMap<String, Value>>,
}

impl Cache {
    /// An empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads a value by key.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.entries.lock().get(key).cloned()
    }

    /// Writes a value, returning the previous one if any.
    pub fn insert(&self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.entries.lock().insert(key.into(), value)
    }

    /// Removes a value by key.
    pub fn remove(&self, key: &str) -> Option<Value> {
        self.entries.lock().remove(key)
    }

    /// True if the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Number of entries currently held.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Discards every entry. Called by the pipeline at the end of each run.
    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

/// Host and engine identity exposed to plugins, resolved once per process.
#[derive(Debug, Clone)]
pub struct RuntimeInfo {
    /// Resolved host identifier (see [`RuntimeInfo::resolve`] for the fallback order).
    pub host_id: String,
    /// The host's configured role, if the host-config blob declares one.
    pub host_role: Option<String>,
    /// The host agent's own version string, if present in the host-config blob.
    pub host_version: Option<String>,
    /// This crate's version, as a simple stand-in for "engine version".
    pub engine_version: &'static str,
}

impl RuntimeInfo {
    /// Resolves identity from a host-config blob.
    ///
    /// Fallback chain, evaluated in order:
    /// 1. an explicit `id` key in the blob, if present and non-empty;
    /// 2. a `grains.fqdn`-shaped key in the same blob;
    /// 3. the resolved hostname of the machine, lower-cased;
    /// 4. a fixed fallback that never fails.
    pub fn resolve(host_config: &Value) -> Self {
        let host_id = host_config
            .get("id")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_owned)
            .or_else(|| {
                host_config
                    .get("grains")
                    .and_then(|g| g.get("fqdn"))
                    .and_then(Value::as_str)
                    .filter(|s| !s.is_empty())
                    .map(str::to_owned)
            })
            .or_else(|| {
                hostname::get()
                    .ok()
                    .map(|h| h.to_string_lossy().to_lowercase())
                    .filter(|s| !s.is_empty())
            })
            .unwrap_or_else(|| "unknown-host".to_string());

        let host_role = host_config
            .get("__role")
            .and_then(Value::as_str)
            .map(str::to_owned);

        let host_version = host_config
            .get("version")
            .and_then(Value::as_str)
            .map(str::to_owned);

        Self {
            host_id,
            host_role,
            host_version,
            engine_version: env!("CARGO_PKG_VERSION"),
        }
    }
}

static RUNTIME_INFO: OnceLock<Arc<RuntimeInfo>> = OnceLock::new();

impl RuntimeInfo {
    /// Returns the process-wide [`RuntimeInfo`], resolving it from `host_config` on the
    /// first call and handing out the same `Arc` to every caller thereafter.
    ///
    /// Host identity cannot change during a process's life, so every `RunContext` built
    /// for every pipeline shares this one instance rather than each pipeline resolving
    /// (and allocating) its own copy.
    pub fn shared(host_config: &Value) -> Arc<RuntimeInfo> {
        RUNTIME_INFO.get_or_init(|| Arc::new(Self::resolve(host_config))).clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_clear_empties_the_map() {
        let cache = Cache::new();
        cache.insert("a", Value::from(1));
        assert!(!cache.is_empty());
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn runtime_info_prefers_explicit_id() {
        let blob = serde_json::json!({ "id": "minion-1", "__role": "minion" });
        let info = RuntimeInfo::resolve(&blob);
        assert_eq!(info.host_id, "minion-1");
        assert_eq!(info.host_role.as_deref(), Some("minion"));
    }

    #[test]
    fn runtime_info_falls_back_to_grains_fqdn() {
        let blob = serde_json::json!({ "grains": { "fqdn": "node.example.org" } });
        let info = RuntimeInfo::resolve(&blob);
        assert_eq!(info.host_id, "node.example.org");
    }

    #[test]
    fn runtime_info_never_fails_on_empty_blob() {
        let info = RuntimeInfo::resolve(&Value::Null);
        assert!(!info.host_id.is_empty());
    }
}
