//! Rule definitions and the built-in reactivity library

use crate::canonical::EntityKind;
use serde::{Deserialize, Serialize};

/// One rule as written in configuration
///
/// Exactly one of `smarts` or `regex` must be set. Substructure rules apply
/// to structures; text rules default to peptides and names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleSpec {
    pub label: String,
    #[serde(default)]
    pub priority: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub smarts: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regex: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub applies_to: Vec<EntityKind>,
}

impl RuleSpec {
    pub fn smarts(label: &str, pattern: &str, priority: i32) -> Self {
        Self {
            label: label.to_string(),
            priority,
            smarts: Some(pattern.to_string()),
            regex: None,
            applies_to: Vec::new(),
        }
    }

    pub fn text(label: &str, pattern: &str, priority: i32, applies_to: &[EntityKind]) -> Self {
        Self {
            label: label.to_string(),
            priority,
            smarts: None,
            regex: Some(pattern.to_string()),
            applies_to: applies_to.to_vec(),
        }
    }
}

/// A rule file: `rules:` followed by a list of rules
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuleFile {
    #[serde(default)]
    pub rules: Vec<RuleSpec>,
}

/// The built-in table, in table order.
///
/// Diazo, olefin, amine and ring contexts describe the immediate electronic
/// environment of a reactive group. Several rules may share a label; the
/// label is reported once.
pub fn default_rules() -> Vec<RuleSpec> {
    use EntityKind::{Name, Peptide};
    vec![
        // Diazo contexts. Azido esters are grouped with diazo esters as
        // nitrene/carbene precursors.
        RuleSpec::smarts("Alpha-Diazo-Ester", "[N-]=[N+]=C-C(=O)O", 100),
        RuleSpec::smarts("Alpha-Diazo-Ester", "[N-]=[N+]=N-[CH2]-C(=O)O", 100),
        RuleSpec::smarts("Alpha-Diazo-Ketone", "[N-]=[N+]=C-C(=O)[#6]", 95),
        RuleSpec::smarts("Aryl-Diazo", "[N-]=[N+]=N-c", 90),
        RuleSpec::smarts("Diazo-Group", "[N-]=[N+]=[#6,#7]", 80),
        // Olefin contexts
        RuleSpec::smarts("Styrene-Like", "C=C-c", 70),
        RuleSpec::smarts("Michael-Acceptor", "C=C-C(=O)", 65),
        RuleSpec::smarts("Isolated-Alkene", "C=C", 50),
        // Amine contexts
        RuleSpec::smarts("Amide", "NC(=O)", 47),
        RuleSpec::smarts("Aryl-Amine", "[NX3;+0]c", 45),
        RuleSpec::smarts("Alkyl-Amine", "[NX3;+0]C", 40),
        // Ring contexts
        RuleSpec::smarts("Epoxide/Aziridine/Cyclopropane", "C1CC1", 60),
        RuleSpec::smarts("Epoxide/Aziridine/Cyclopropane", "C1OC1", 60),
        RuleSpec::smarts("Epoxide/Aziridine/Cyclopropane", "C1NC1", 60),
        RuleSpec::smarts("Heme-Like-Core", "n1cccc1", 55),
        // Named chemicals
        RuleSpec::text("Heme-Like-Core", r"hemin|heme|porphyrin", 88, &[Name]),
        RuleSpec::text("Amyloid-Dye", r"thioflavin|congo red", 50, &[Name]),
        RuleSpec::text("Reducing-Agent", r"dithionite|ascorbate", 50, &[Name]),
        RuleSpec::text("Aryl-Aldehyde", r"benzaldehyde", 45, &[Name]),
        RuleSpec::text("Aryl-Amine", r"aniline", 45, &[Name]),
        // Peptide motifs
        RuleSpec::text("Amyloid-Core-Motif", r"LVFF", 85, &[Peptide]),
        RuleSpec::text("Aromatic-Zipper", r"FF|FY|YF|WW", 60, &[Peptide]),
        RuleSpec::text("Catalytic-Histidine", r"H", 30, &[Peptide]),
    ]
}
