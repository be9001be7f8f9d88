//! Quality report types

use crate::graph::NodeId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A mean exposed as numerator over denominator
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Ratio {
    pub numerator: f64,
    pub denominator: usize,
}

impl Ratio {
    pub fn new(numerator: f64, denominator: usize) -> Self {
        Self { numerator, denominator }
    }

    /// Zero for an empty denominator
    pub fn value(&self) -> f64 {
        if self.denominator == 0 {
            0.0
        } else {
            self.numerator / self.denominator as f64
        }
    }
}

impl fmt::Display for Ratio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3} ({:.1}/{})", self.value(), self.numerator, self.denominator)
    }
}

/// Reaction Context Score for one reaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReactionScore {
    pub reaction: NodeId,
    pub label: String,
    pub paper: Option<String>,
    pub present: Vec<String>,
    pub missing: Vec<String>,
    pub rcs: f64,
}

/// Chemical Resolution Score for one entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityScore {
    pub entity: NodeId,
    pub node_type: String,
    pub canonical_key: String,
    pub role_labels: Vec<String>,
    pub crs: f64,
}

/// Node and edge counts by type
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphCounts {
    pub papers: usize,
    pub reactions: usize,
    pub molecules: usize,
    pub peptides: usize,
    pub conditions: usize,
    pub edges: usize,
}

impl GraphCounts {
    pub fn nodes(&self) -> usize {
        self.papers + self.reactions + self.molecules + self.peptides + self.conditions
    }
}

/// Corpus-level quality report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityReport {
    pub generated_at: DateTime<Utc>,
    pub counts: GraphCounts,
    pub corpus_rcs: f64,
    pub corpus_crs: f64,
    pub rcs: Ratio,
    pub crs: Ratio,
    /// Non-paper nodes per paper
    pub knowledge_density: f64,
    /// Equal-weight mean of corpus RCS and CRS
    pub overall: f64,
    pub reactions: Vec<ReactionScore>,
    pub entities: Vec<EntityScore>,
}

impl fmt::Display for QualityReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Graph quality report ({})", self.generated_at.to_rfc3339())?;
        writeln!(
            f,
            "  nodes: {} ({} papers, {} reactions, {} molecules, {} peptides, {} conditions)",
            self.counts.nodes(),
            self.counts.papers,
            self.counts.reactions,
            self.counts.molecules,
            self.counts.peptides,
            self.counts.conditions
        )?;
        writeln!(f, "  edges: {}", self.counts.edges)?;
        writeln!(f, "  reaction context (RCS):      {}", self.rcs)?;
        writeln!(f, "  chemical resolution (CRS):   {}", self.crs)?;
        writeln!(f, "  knowledge density: {:.2} nodes per paper", self.knowledge_density)?;
        write!(f, "  overall quality: {:.3}", self.overall)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_ratio_is_zero() {
        let ratio = Ratio::new(0.0, 0);
        assert_eq!(ratio.value(), 0.0);
        assert_eq!(ratio.to_string(), "0.000 (0.0/0)");
    }

    #[test]
    fn ratio_value_is_mean() {
        assert!((Ratio::new(1.5, 2).value() - 0.75).abs() < 1e-12);
    }
}
