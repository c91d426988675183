//! Cross-reference validation for a built [`AnalyticsConfig`].
//!
//! Plugin-name resolution against the registry already happens while building each
//! `collectors`/`processors`/`forwarders` entry (see [`crate::document::build_config`]);
//! what's left here is checking that every pipeline only names stage instances that
//! were actually declared in those sections.

use analytics_core::StageKind;

use crate::document::AnalyticsConfig;
use crate::error::{ConfigError, ConfigResult};

/// Validates the entire configuration.
pub fn validate_config(config: &AnalyticsConfig) -> ConfigResult<()> {
    for pipeline in config.pipelines.values() {
        validate_stage_references(config, &pipeline.name, StageKind::Collect, &pipeline.collect)?;
        validate_stage_references(config, &pipeline.name, StageKind::Process, &pipeline.process)?;
        validate_stage_references(config, &pipeline.name, StageKind::Forward, &pipeline.forward)?;
    }
    Ok(())
}

fn validate_stage_references(
    config: &AnalyticsConfig,
    pipeline: &str,
    kind: StageKind,
    names: &[String],
) -> ConfigResult<()> {
    let instances = config.instances(kind);
    for name in names {
        if !instances.contains_key(name) {
            return Err(ConfigError::MissingStageReference {
                pipeline: pipeline.to_string(),
                kind,
                name: name.clone(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::PipelineSpec;
    use std::collections::HashMap;

    fn empty_config() -> AnalyticsConfig {
        AnalyticsConfig {
            collectors: HashMap::new(),
            processors: HashMap::new(),
            forwarders: HashMap::new(),
            pipelines: HashMap::new(),
            host_config: serde_json::Value::Null,
        }
    }

    #[test]
    fn empty_configuration_is_valid() {
        assert!(validate_config(&empty_config()).is_ok());
    }

    #[test]
    fn pipeline_referencing_an_undeclared_collector_fails() {
        let mut config = empty_config();
        config.pipelines.insert(
            "p".to_string(),
            PipelineSpec {
                name: "p".to_string(),
                collect: vec!["missing".to_string()],
                process: Vec::new(),
                forward: Vec::new(),
                enabled: true,
                restart: true,
            },
        );

        let err = validate_config(&config).unwrap_err();
        assert!(matches!(err, ConfigError::MissingStageReference { kind: StageKind::Collect, .. }));
    }
}
