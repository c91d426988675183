//! Configuration file loader: search-path resolution, env-var expansion, parsing.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};

use crate::document::{AnalyticsConfig, RawDocument};
use crate::error::{ConfigError, ConfigResult};
use crate::registry::PluginRegistry;

/// Configuration loader with support for multiple search locations.
pub struct ConfigLoader {
    search_paths: Vec<PathBuf>,
}

impl ConfigLoader {
    /// Creates a loader with no search paths configured.
    pub fn new() -> Self {
        Self { search_paths: Vec::new() }
    }

    /// Adds a search path for configuration files.
    pub fn add_search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.search_paths.push(path.as_ref().to_path_buf());
        self
    }

    /// Adds the current directory to the search paths.
    pub fn with_current_dir(self) -> Self {
        if let Ok(cwd) = std::env::current_dir() { self.add_search_path(cwd) } else { self }
    }

    /// Adds the user config directory to the search paths.
    pub fn with_user_config_dir(self) -> Self {
        if let Some(config_dir) = dirs::config_dir() {
            self.add_search_path(config_dir.join("analytics"))
        } else {
            self
        }
    }

    /// Loads configuration from the first file found on the search path, resolving
    /// plugin references against the process-wide registry.
    pub fn load(&self) -> ConfigResult<Arc<AnalyticsConfig>> {
        if let Some(path) = self.find_config_file() {
            return self.load_from_file(&path);
        }

        info!("no configuration file found on search path, using an empty configuration");
        self.build(RawDocument::default())
    }

    /// Loads configuration from a specific file.
    pub fn load_from_file<P: AsRef<Path>>(&self, path: P) -> ConfigResult<Arc<AnalyticsConfig>> {
        let path = path.as_ref();
        info!(path = %path.display(), "loading configuration");

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }

        let content = std::fs::read_to_string(path)?;
        self.load_from_str(&content)
    }

    /// Loads configuration from a YAML string, resolving plugin references against the
    /// process-wide registry.
    pub fn load_from_str(&self, yaml: &str) -> ConfigResult<Arc<AnalyticsConfig>> {
        let raw = self.parse_yaml(yaml)?;
        self.build(raw)
    }

    fn build(&self, raw: RawDocument) -> ConfigResult<Arc<AnalyticsConfig>> {
        let config = crate::document::build_config(raw, PluginRegistry::instance())?;
        debug!(
            pipelines = config.pipelines.len(),
            collectors = config.collectors.len(),
            processors = config.processors.len(),
            forwarders = config.forwarders.len(),
            "configuration loaded"
        );
        Ok(config)
    }

    fn find_config_file(&self) -> Option<PathBuf> {
        const CONFIG_NAMES: &[&str] = &[
            "analytics.yaml",
            "analytics.yml",
            "config.yaml",
            "config.yml",
            ".analytics.yaml",
            ".analytics.yml",
        ];

        for search_path in &self.search_paths {
            for name in CONFIG_NAMES {
                let path = search_path.join(name);
                debug!(path = %path.display(), "checking for configuration file");
                if path.exists() {
                    info!(path = %path.display(), "found configuration file");
                    return Some(path);
                }
            }
        }

        None
    }

    fn parse_yaml(&self, content: &str) -> ConfigResult<RawDocument> {
        let expanded = expand_env_vars(content);
        serde_yaml::from_str(&expanded).map_err(ConfigError::from)
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new().with_current_dir().with_user_config_dir()
    }
}

/// Expands `${VAR}` and `${VAR:-default}` references against the process environment.
fn expand_env_vars(content: &str) -> String {
    static PATTERN: std::sync::OnceLock<regex::Regex> = std::sync::OnceLock::new();
    let re = PATTERN
        .get_or_init(|| regex::Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)(:-([^}]*))?\}").unwrap());

    re.replace_all(content, |caps: &regex::Captures| {
        let var_name = &caps[1];
        let default_value = caps.get(3).map(|m| m.as_str());
        std::env::var(var_name).ok().or_else(|| default_value.map(String::from)).unwrap_or_default()
    })
    .into_owned()
}

/// Loads configuration with the default search path (current directory, then the user
/// config directory).
pub fn load_config() -> ConfigResult<Arc<AnalyticsConfig>> {
    ConfigLoader::default().load()
}

/// Loads configuration from a specific file, ignoring the default search path.
pub fn load_config_from_file<P: AsRef<Path>>(path: P) -> ConfigResult<Arc<AnalyticsConfig>> {
    ConfigLoader::new().load_from_file(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_yaml_yields_an_empty_configuration() {
        let loader = ConfigLoader::new();
        let config = loader.load_from_str("").unwrap();
        assert!(config.pipelines.is_empty());
        assert!(config.collectors.is_empty());
    }

    #[test]
    fn unknown_plugin_reference_fails_to_load() {
        let yaml = r#"
collectors:
  main:
    plugin: nonexistent_plugin_kind
"#;
        let loader = ConfigLoader::new();
        let err = loader.load_from_str(yaml).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownPlugin { .. }));
    }

    #[test]
    fn env_var_expansion_substitutes_a_set_variable() {
        // SAFETY: test runs single-threaded within this process.
        unsafe { std::env::set_var("ANALYTICS_TEST_VAR", "hello") };
        let expanded = expand_env_vars("value: ${ANALYTICS_TEST_VAR}");
        assert_eq!(expanded, "value: hello");
        unsafe { std::env::remove_var("ANALYTICS_TEST_VAR") };
    }

    #[test]
    fn env_var_expansion_falls_back_to_default() {
        let expanded = expand_env_vars("value: ${ANALYTICS_NONEXISTENT_VAR:-fallback}");
        assert_eq!(expanded, "value: fallback");
    }

    #[test]
    fn pipeline_referencing_an_undeclared_instance_fails_validation() {
        let yaml = r#"
pipelines:
  main:
    collect: some-collector
    forward: some-forwarder
"#;
        let loader = ConfigLoader::new();
        let err = loader.load_from_str(yaml).unwrap_err();
        assert!(matches!(err, ConfigError::MissingStageReference { .. }));
    }
}
