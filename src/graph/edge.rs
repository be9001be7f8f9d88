//! Typed, directed edges

use super::node::NodeId;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Relationship carried by an edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Relationship {
    /// Paper → Reaction
    Contains,
    /// Reaction → Molecule/Peptide
    HasSubstrate,
    /// Reaction → Molecule/Peptide
    HasProduct,
    /// Reaction → Molecule/Peptide
    CatalyzedBy,
    /// Reaction → Condition
    UsesCondition,
}

impl Relationship {
    pub const ALL: [Relationship; 5] = [
        Self::Contains,
        Self::HasSubstrate,
        Self::HasProduct,
        Self::CatalyzedBy,
        Self::UsesCondition,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Contains => "contains",
            Self::HasSubstrate => "has_substrate",
            Self::HasProduct => "has_product",
            Self::CatalyzedBy => "catalyzed_by",
            Self::UsesCondition => "uses_condition",
        }
    }
}

impl std::fmt::Display for Relationship {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Relationship {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| format!("unknown relationship '{}'", s))
    }
}

/// A directed edge between two nodes
///
/// Edges have no identity beyond their endpoints and relationship, so the
/// same link observed twice collapses into one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Edge {
    pub source: NodeId,
    pub target: NodeId,
    pub relationship: Relationship,
}

impl Edge {
    pub fn new(source: NodeId, target: NodeId, relationship: Relationship) -> Self {
        Self {
            source,
            target,
            relationship,
        }
    }
}

impl std::fmt::Display for Edge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} -{}-> {}", self.source, self.relationship, self.target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relationship_names_roundtrip() {
        for r in Relationship::ALL {
            assert_eq!(r.as_str().parse::<Relationship>().unwrap(), r);
        }
        assert!("related_to".parse::<Relationship>().is_err());
    }

    #[test]
    fn relationship_serializes_snake_case() {
        let json = serde_json::to_string(&Relationship::CatalyzedBy).unwrap();
        assert_eq!(json, "\"catalyzed_by\"");
    }

    #[test]
    fn edges_with_same_endpoints_and_type_are_equal() {
        let a = Edge::new("reaction:1".into(), "peptide:HLVFFAE".into(), Relationship::CatalyzedBy);
        let b = Edge::new("reaction:1".into(), "peptide:HLVFFAE".into(), Relationship::CatalyzedBy);
        let c = Edge::new("reaction:1".into(), "peptide:HLVFFAE".into(), Relationship::HasSubstrate);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
