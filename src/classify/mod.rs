//! Pattern Classifier: ordered rule table of (pattern, label, priority)
//!
//! Every rule whose pattern matches fires. Labels come out ordered by
//! priority, highest first, with equal priorities ordered by the configured
//! [`TieBreak`]. The table is immutable after construction and shared
//! read-only across ingestion workers.

mod matcher;
mod rules;
pub mod smarts;

pub use matcher::{has_substructure, MatchTarget};
pub use rules::{default_rules, RuleFile, RuleSpec};
pub use smarts::{QueryGraph, SmartsError};

use crate::canonical::{CanonicalEntity, EntityKind};
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Label assigned when no rule matches
pub const UNCLASSIFIED: &str = "Unclassified";

/// Errors building a rule table
#[derive(Debug, Error)]
pub enum ClassifyError {
    #[error("rule '{label}': invalid pattern: {reason}")]
    InvalidPattern { label: String, reason: String },

    #[error("rule '{label}' must set exactly one of `smarts` or `regex`")]
    AmbiguousRule { label: String },

    #[error("failed to read rule file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse rule file: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Ordering among rules of equal priority
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TieBreak {
    /// Keep the order rules appear in the table
    #[default]
    TableOrder,
    /// Order by label, alphabetically
    Label,
}

#[derive(Debug, Clone)]
pub enum RulePattern {
    Substructure(QueryGraph),
    Text(Regex),
}

/// A compiled rule
#[derive(Debug, Clone)]
pub struct Rule {
    pub label: String,
    pub priority: i32,
    pub pattern: RulePattern,
    pub applies_to: Vec<EntityKind>,
    /// Source text of the pattern
    pub source: String,
}

impl Rule {
    pub fn compile(spec: &RuleSpec) -> Result<Self, ClassifyError> {
        let invalid = |reason: String| ClassifyError::InvalidPattern {
            label: spec.label.clone(),
            reason,
        };
        let (pattern, source, default_targets) = match (&spec.smarts, &spec.regex) {
            (Some(smarts), None) => (
                RulePattern::Substructure(QueryGraph::parse(smarts).map_err(|e| invalid(e.to_string()))?),
                smarts.clone(),
                vec![EntityKind::Structure],
            ),
            (None, Some(regex)) => (
                RulePattern::Text(
                    RegexBuilder::new(regex)
                        .case_insensitive(true)
                        .build()
                        .map_err(|e| invalid(e.to_string()))?,
                ),
                regex.clone(),
                vec![EntityKind::Peptide, EntityKind::Name],
            ),
            _ => {
                return Err(ClassifyError::AmbiguousRule {
                    label: spec.label.clone(),
                })
            }
        };
        if spec.label.trim().is_empty() {
            return Err(invalid("empty label".to_string()));
        }
        Ok(Self {
            label: spec.label.clone(),
            priority: spec.priority,
            pattern,
            applies_to: if spec.applies_to.is_empty() {
                default_targets
            } else {
                spec.applies_to.clone()
            },
            source,
        })
    }

    fn applies(&self, kind: EntityKind) -> bool {
        self.applies_to.contains(&kind)
    }
}

/// Immutable, ordered rule table
#[derive(Debug, Clone)]
pub struct PatternClassifier {
    rules: Vec<Rule>,
    tie_break: TieBreak,
}

impl PatternClassifier {
    /// Compile a table. Rules are kept in evaluation order.
    pub fn new(specs: &[RuleSpec], tie_break: TieBreak) -> Result<Self, ClassifyError> {
        let mut rules = specs.iter().map(Rule::compile).collect::<Result<Vec<_>, _>>()?;
        // Stable sort keeps table order among equal priorities.
        match tie_break {
            TieBreak::TableOrder => rules.sort_by(|a, b| b.priority.cmp(&a.priority)),
            TieBreak::Label => {
                rules.sort_by(|a, b| b.priority.cmp(&a.priority).then_with(|| a.label.cmp(&b.label)))
            }
        }
        Ok(Self { rules, tie_break })
    }

    /// Classifier over the built-in reactivity library
    pub fn with_default_rules() -> Self {
        match Self::new(&default_rules(), TieBreak::default()) {
            Ok(classifier) => classifier,
            Err(err) => unreachable!("built-in rule table failed to compile: {}", err),
        }
    }

    /// Load rules from a YAML file with a top-level `rules:` list.
    pub fn from_yaml_file(path: &Path, tie_break: TieBreak) -> Result<Self, ClassifyError> {
        let text = std::fs::read_to_string(path).map_err(|source| ClassifyError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let file: RuleFile = serde_yaml::from_str(&text)?;
        Self::new(&file.rules, tie_break)
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn tie_break(&self) -> TieBreak {
        self.tie_break
    }

    /// Role labels for an entity, never empty.
    ///
    /// Unresolved entities and entities matching no rule get
    /// [`UNCLASSIFIED`].
    pub fn classify(&self, entity: &CanonicalEntity) -> Vec<String> {
        let Some(key) = entity.key() else {
            return vec![UNCLASSIFIED.to_string()];
        };
        let target = entity.structure.as_ref().map(MatchTarget::new);

        let mut labels: Vec<String> = Vec::new();
        for rule in self.rules.iter().filter(|r| r.applies(entity.kind)) {
            let fired = match &rule.pattern {
                RulePattern::Substructure(query) => {
                    target.as_ref().is_some_and(|t| t.has_match(query))
                }
                RulePattern::Text(regex) => regex.is_match(key.as_str()),
            };
            if fired && !labels.contains(&rule.label) {
                labels.push(rule.label.clone());
            }
        }

        if labels.is_empty() {
            labels.push(UNCLASSIFIED.to_string());
        }
        labels
    }
}

impl Default for PatternClassifier {
    fn default() -> Self {
        Self::with_default_rules()
    }
}

/// Whether a label list carries any real classification
pub fn is_classified(labels: &[String]) -> bool {
    labels.iter().any(|l| l != UNCLASSIFIED)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canonical::Canonicalizer;

    fn entity(raw: &str, kind: EntityKind) -> CanonicalEntity {
        Canonicalizer::new().resolve(raw, kind)
    }

    fn classify(raw: &str, kind: EntityKind) -> Vec<String> {
        PatternClassifier::with_default_rules().classify(&entity(raw, kind))
    }

    #[test]
    fn default_table_compiles() {
        let classifier = PatternClassifier::with_default_rules();
        assert_eq!(classifier.rules().len(), default_rules().len());
    }

    #[test]
    fn diazo_ester_outranks_generic_diazo() {
        let labels = classify("CCOC(=O)C=[N+]=[N-]", EntityKind::Structure);
        assert_eq!(labels[0], "Alpha-Diazo-Ester");
        assert!(labels.contains(&"Diazo-Group".to_string()));
    }

    #[test]
    fn azidoacetate_is_a_carbene_precursor() {
        let labels = classify("CCOC(=O)CN=[N+]=[N-]", EntityKind::Structure);
        assert_eq!(labels[0], "Alpha-Diazo-Ester");
    }

    #[test]
    fn shared_labels_are_reported_once() {
        let labels = classify("C1CC1C1OC1", EntityKind::Structure);
        let count = labels
            .iter()
            .filter(|l| *l == "Epoxide/Aziridine/Cyclopropane")
            .count();
        assert_eq!(count, 1);
    }

    #[test]
    fn styrene_labels_in_priority_order() {
        let labels = classify("C=Cc1ccccc1", EntityKind::Structure);
        assert_eq!(labels, vec!["Styrene-Like".to_string(), "Isolated-Alkene".to_string()]);
    }

    #[test]
    fn no_match_is_unclassified() {
        assert_eq!(classify("CCCC", EntityKind::Structure), vec![UNCLASSIFIED.to_string()]);
        assert_eq!(classify("C1CC", EntityKind::Structure), vec![UNCLASSIFIED.to_string()]);
    }

    #[test]
    fn text_rules_match_names_and_peptides() {
        assert_eq!(classify("Hemin", EntityKind::Name)[0], "Heme-Like-Core");
        let labels = classify("Ac-HLVFFAE", EntityKind::Peptide);
        assert_eq!(labels[0], "Amyloid-Core-Motif");
        assert!(labels.contains(&"Catalytic-Histidine".to_string()));
    }

    #[test]
    fn text_rules_do_not_apply_to_structures() {
        // "c1ccc(Cl)cc1" contains no rule text, but a structure key
        // should never be tested against name patterns anyway.
        let spec = [RuleSpec::text("Chloro", "cl", 10, &[EntityKind::Name])];
        let classifier = PatternClassifier::new(&spec, TieBreak::TableOrder).unwrap();
        assert_eq!(
            classifier.classify(&entity("Clc1ccccc1", EntityKind::Structure)),
            vec![UNCLASSIFIED.to_string()]
        );
    }

    #[test]
    fn tie_break_by_label() {
        let specs = [
            RuleSpec::smarts("Zeta", "C", 10),
            RuleSpec::smarts("Alpha", "C", 10),
        ];
        let table = PatternClassifier::new(&specs, TieBreak::TableOrder).unwrap();
        let by_label = PatternClassifier::new(&specs, TieBreak::Label).unwrap();
        let e = entity("CC", EntityKind::Structure);

        assert_eq!(table.classify(&e), vec!["Zeta".to_string(), "Alpha".to_string()]);
        assert_eq!(by_label.classify(&e), vec!["Alpha".to_string(), "Zeta".to_string()]);
    }

    #[test]
    fn invalid_patterns_are_rejected_at_load() {
        let bad = [RuleSpec::smarts("Broken", "n1ccc2c1", 1)];
        assert!(matches!(
            PatternClassifier::new(&bad, TieBreak::TableOrder),
            Err(ClassifyError::InvalidPattern { .. })
        ));

        let both = RuleSpec {
            regex: Some("x".into()),
            ..RuleSpec::smarts("Both", "C", 1)
        };
        assert!(matches!(
            PatternClassifier::new(&[both], TieBreak::TableOrder),
            Err(ClassifyError::AmbiguousRule { .. })
        ));
    }

    #[test]
    fn rule_file_parses_from_yaml() {
        let yaml = r#"
rules:
  - label: Nitrile
    priority: 20
    smarts: "C#N"
  - label: Dye
    regex: "red$"
    applies_to: [name]
"#;
        let file: RuleFile = serde_yaml::from_str(yaml).unwrap();
        let classifier = PatternClassifier::new(&file.rules, TieBreak::TableOrder).unwrap();
        assert_eq!(classifier.classify(&entity("CC#N", EntityKind::Structure)), vec!["Nitrile".to_string()]);
        assert_eq!(classifier.classify(&entity("Congo Red", EntityKind::Name)), vec!["Dye".to_string()]);
    }

    #[test]
    fn classifier_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<PatternClassifier>();
    }
}
