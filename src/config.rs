//! Engine configuration
//!
//! One YAML document, every field optional:
//!
//! ```yaml
//! classifier:
//!   rules_file: rules.yaml
//!   include_default_rules: true
//!   tie_break: table_order
//! assembly:
//!   condition_policy: recurring
//! quality:
//!   required_context: [catalyst, condition, substrate]
//! batch:
//!   workers: 4
//!   budget_secs: 600
//! ```

use crate::assemble::AssemblyOptions;
use crate::batch::BatchOptions;
use crate::classify::{default_rules, ClassifyError, PatternClassifier, RuleFile, RuleSpec, TieBreak};
use crate::quality::QualityConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Classifier(#[from] ClassifyError),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Extra rule file, resolved relative to the config file
    pub rules_file: Option<PathBuf>,
    /// Inline rules
    pub rules: Vec<RuleSpec>,
    /// Start from the built-in table
    pub include_default_rules: bool,
    pub tie_break: TieBreak,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            rules_file: None,
            rules: Vec::new(),
            include_default_rules: true,
            tie_break: TieBreak::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub classifier: ClassifierConfig,
    pub assembly: AssemblyOptions,
    pub quality: QualityConfig,
    pub batch: BatchOptions,
}

impl EngineConfig {
    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(text)?)
    }

    /// Load from a file. A relative `rules_file` is taken relative to the
    /// config file's directory.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let mut config = Self::from_yaml_str(&text)?;
        if let (Some(rules_file), Some(dir)) = (config.classifier.rules_file.as_mut(), path.parent()) {
            if rules_file.is_relative() {
                *rules_file = dir.join(&*rules_file);
            }
        }
        Ok(config)
    }

    /// Compile the configured rule table: built-in rules (if enabled),
    /// then the rule file, then inline rules.
    pub fn build_classifier(&self) -> Result<PatternClassifier, ConfigError> {
        let mut specs = if self.classifier.include_default_rules {
            default_rules()
        } else {
            Vec::new()
        };
        if let Some(path) = &self.classifier.rules_file {
            let text = std::fs::read_to_string(path).map_err(|source| ClassifyError::Io {
                path: path.display().to_string(),
                source,
            })?;
            let file: RuleFile = serde_yaml::from_str(&text).map_err(ClassifyError::from)?;
            specs.extend(file.rules);
        }
        specs.extend(self.classifier.rules.iter().cloned());
        Ok(PatternClassifier::new(&specs, self.classifier.tie_break)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assemble::ConditionPolicy;
    use crate::quality::ContextField;

    #[test]
    fn empty_document_gives_defaults() {
        let config = EngineConfig::from_yaml_str("{}").unwrap();
        assert!(config.classifier.include_default_rules);
        assert_eq!(config.assembly.condition_policy, ConditionPolicy::Recurring);
        assert_eq!(config.quality.required_context.len(), 3);
        assert_eq!(config.batch.workers, 0);
    }

    #[test]
    fn overrides_are_applied() {
        let yaml = r#"
classifier:
  include_default_rules: false
  tie_break: label
  rules:
    - label: Nitrile
      smarts: "C#N"
      priority: 5
assembly:
  condition_policy: inline
  min_structure_length: 10
quality:
  required_context: [substrate, product]
batch:
  workers: 2
  budget_secs: 30
"#;
        let config = EngineConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.assembly.condition_policy, ConditionPolicy::Inline);
        assert_eq!(config.assembly.min_structure_length, 10);
        assert_eq!(
            config.quality.required_context,
            vec![ContextField::Substrate, ContextField::Product]
        );
        assert_eq!(config.batch.budget_secs, Some(30));

        let classifier = config.build_classifier().unwrap();
        assert_eq!(classifier.rules().len(), 1);
        assert_eq!(classifier.tie_break(), TieBreak::Label);
    }

    #[test]
    fn rules_file_is_relative_to_config() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("extra.yaml"),
            "rules:\n  - label: Thiol\n    smarts: \"[SX2H1]\"\n    priority: 12\n",
        )
        .unwrap();
        let config_path = dir.path().join("engine.yaml");
        std::fs::write(&config_path, "classifier:\n  rules_file: extra.yaml\n").unwrap();

        let config = EngineConfig::load(&config_path).unwrap();
        let classifier = config.build_classifier().unwrap();
        assert_eq!(classifier.rules().len(), default_rules().len() + 1);
    }

    #[test]
    fn invalid_rule_surfaces_as_classifier_error() {
        let yaml = "classifier:\n  rules:\n    - label: Broken\n      smarts: \"C1CC\"\n";
        let config = EngineConfig::from_yaml_str(yaml).unwrap();
        assert!(matches!(config.build_classifier(), Err(ConfigError::Classifier(_))));
    }
}
