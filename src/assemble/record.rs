//! Reaction-evidence records: the intermediate format produced by upstream
//! extractors, one per observed reaction context.

use crate::graph::Relationship;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Namespace for content-derived reaction ids
const REACTION_NAMESPACE: Uuid = Uuid::from_u128(0x6d1f_2c9a_4b7e_5f03_a1c8_93e2_7d45_0b16);

/// Declared role of a structure mention
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleHint {
    Substrate,
    Product,
    Catalyst,
}

impl RoleHint {
    pub fn relationship(&self) -> Relationship {
        match self {
            Self::Substrate => Relationship::HasSubstrate,
            Self::Product => Relationship::HasProduct,
            Self::Catalyst => Relationship::CatalyzedBy,
        }
    }
}

/// A raw structure string with its declared role
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructureMention {
    pub value: String,
    pub role_hint: RoleHint,
}

/// One reaction context reported by a document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactionEvidenceRecord {
    pub document_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_file: Option<String>,
    #[serde(default)]
    pub structures: Vec<StructureMention>,
    #[serde(default)]
    pub peptides: Vec<String>,
    #[serde(default)]
    pub conditions: BTreeMap<String, String>,
    #[serde(default)]
    pub reaction_types: Vec<String>,
}

impl ReactionEvidenceRecord {
    pub fn new(document_id: impl Into<String>) -> Self {
        Self {
            document_id: document_id.into(),
            ..Default::default()
        }
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_structure(mut self, value: impl Into<String>, role_hint: RoleHint) -> Self {
        self.structures.push(StructureMention {
            value: value.into(),
            role_hint,
        });
        self
    }

    pub fn with_peptide(mut self, value: impl Into<String>) -> Self {
        self.peptides.push(value.into());
        self
    }

    pub fn with_condition(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.conditions.insert(name.into(), value.into());
        self
    }

    pub fn with_reaction_type(mut self, reaction_type: impl Into<String>) -> Self {
        self.reaction_types.push(reaction_type.into());
        self
    }

    /// Count of mentions and conditions, blank or not
    pub fn field_count(&self) -> usize {
        self.structures.len() + self.peptides.len() + self.conditions.len()
    }

    /// Count of mentions and conditions with non-blank content
    pub fn usable_field_count(&self) -> usize {
        let structures = self
            .structures
            .iter()
            .filter(|s| !s.value.trim().is_empty())
            .count();
        let peptides = self.peptides.iter().filter(|p| !p.trim().is_empty()).count();
        let conditions = self
            .conditions
            .iter()
            .filter(|(k, v)| !k.trim().is_empty() && !v.trim().is_empty())
            .count();
        structures + peptides + conditions
    }

    /// Reaction label: the first two reaction types, or a generic label.
    pub fn reaction_label(&self) -> String {
        let types: Vec<&str> = self
            .reaction_types
            .iter()
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
            .take(2)
            .collect();
        if types.is_empty() {
            "Catalytic Process".to_string()
        } else {
            types.join(" / ")
        }
    }

    /// Content-derived id: identical evidence yields the identical id.
    pub fn fingerprint(&self) -> Uuid {
        let bytes = serde_json::to_vec(self).unwrap_or_default();
        Uuid::new_v5(&REACTION_NAMESPACE, &bytes)
    }
}
