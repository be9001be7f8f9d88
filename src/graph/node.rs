//! Node representation in the knowledge graph

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;

/// Canonical key carried by nodes whose identity could not be resolved.
pub const UNKNOWN_KEY: &str = "Unknown";

/// Unique identifier for a node
///
/// Serializes as a plain string. Identifiers are derived from content
/// (`paper:<doc>`, `structure:<key>`, `reaction:<uuid>`) so that two
/// independently built graphs agree on them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    /// Create a NodeId from a string
    pub fn from_string(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the inner string value
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for NodeId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Type tag of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum NodeType {
    Paper,
    Reaction,
    Molecule,
    Peptide,
    Condition,
}

impl NodeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Paper => "Paper",
            Self::Reaction => "Reaction",
            Self::Molecule => "Molecule",
            Self::Peptide => "Peptide",
            Self::Condition => "Condition",
        }
    }

    /// Molecules and peptides are the identity-resolved chemical entities
    /// that receive role labels and count toward the resolution score.
    pub fn is_chemical_entity(&self) -> bool {
        matches!(self, Self::Molecule | Self::Peptide)
    }
}

impl std::fmt::Display for NodeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Paper" => Ok(Self::Paper),
            "Reaction" => Ok(Self::Reaction),
            "Molecule" => Ok(Self::Molecule),
            "Peptide" => Ok(Self::Peptide),
            "Condition" => Ok(Self::Condition),
            other => Err(format!("unknown node type '{}'", other)),
        }
    }
}

/// Typed property values
#[derive(Debug, Clone, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Array(Vec<PropertyValue>),
    Object(BTreeMap<String, PropertyValue>),
}

impl PropertyValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    fn is_unknown(&self) -> bool {
        match self {
            Self::String(s) => s.is_empty() || s == UNKNOWN_KEY,
            Self::Array(items) => items.is_empty(),
            Self::Object(map) => map.is_empty(),
            _ => false,
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

/// Properties collection
pub type Properties = BTreeMap<String, PropertyValue>;

/// A node in the knowledge graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Unique identifier
    pub id: NodeId,
    /// Type tag
    pub node_type: NodeType,
    /// Merge key, or [`UNKNOWN_KEY`] when unresolved
    pub canonical_key: String,
    /// Raw strings observed for this node
    pub evidence: BTreeSet<String>,
    /// Role labels, primary label first
    pub role_labels: Vec<String>,
    /// Type-specific attributes
    pub properties: Properties,
}

impl Node {
    /// Create a new node with the given identity
    pub fn new(id: NodeId, node_type: NodeType, canonical_key: impl Into<String>) -> Self {
        Self {
            id,
            node_type,
            canonical_key: canonical_key.into(),
            evidence: BTreeSet::new(),
            role_labels: Vec::new(),
            properties: Properties::new(),
        }
    }

    /// Add a raw evidence string
    pub fn with_evidence(mut self, evidence: impl Into<String>) -> Self {
        self.evidence.insert(evidence.into());
        self
    }

    /// Set the role labels
    pub fn with_role_labels(mut self, labels: Vec<String>) -> Self {
        self.role_labels = labels;
        self
    }

    /// Add a property to the node
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn property(&self, key: &str) -> Option<&PropertyValue> {
        self.properties.get(key)
    }

    pub fn is_unknown(&self) -> bool {
        self.canonical_key == UNKNOWN_KEY
    }

    pub fn has_role_label(&self, label: &str) -> bool {
        self.role_labels.iter().any(|l| l == label)
    }

    /// The first role label, if any.
    pub fn primary_label(&self) -> Option<&str> {
        self.role_labels.first().map(String::as_str)
    }

    /// Merge another observation of the same node into this one.
    ///
    /// Evidence and role labels are unioned. Attributes are fill-only: a
    /// value is taken when none was set or the current one is unknown or
    /// empty. When two concrete values disagree the smaller one is kept,
    /// which makes the merge commutative. Merging the same node twice is a
    /// no-op.
    pub fn merge(&mut self, other: &Node) {
        if self.is_unknown() && !other.is_unknown() {
            self.canonical_key = other.canonical_key.clone();
        }

        self.evidence.extend(other.evidence.iter().cloned());

        self.role_labels = union_labels(&self.role_labels, &other.role_labels);

        for (key, incoming) in &other.properties {
            match self.properties.get_mut(key) {
                None => {
                    self.properties.insert(key.clone(), incoming.clone());
                }
                Some(existing) => merge_value(existing, incoming),
            }
        }
    }
}

/// Label union that does not depend on which side is merged into which.
///
/// The longer list (or the smaller, at equal length) keeps its priority
/// order; labels only the other list carries follow in sorted order.
fn union_labels(a: &[String], b: &[String]) -> Vec<String> {
    let (base, extra) = if (b.len(), a) > (a.len(), b) { (b, a) } else { (a, b) };
    let mut merged = base.to_vec();
    let mut rest: Vec<&String> = extra.iter().filter(|l| !base.contains(l)).collect();
    rest.sort();
    rest.dedup();
    merged.extend(rest.into_iter().cloned());
    merged
}

fn merge_value(existing: &mut PropertyValue, incoming: &PropertyValue) {
    if incoming.is_unknown() || existing == incoming {
        return;
    }
    if existing.is_unknown() {
        *existing = incoming.clone();
        return;
    }
    match (existing, incoming) {
        (PropertyValue::Array(current), PropertyValue::Array(more)) => {
            for item in more {
                if !current.contains(item) {
                    current.push(item.clone());
                }
            }
            current.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        }
        (PropertyValue::Object(current), PropertyValue::Object(more)) => {
            for (k, v) in more {
                match current.get_mut(k) {
                    None => {
                        current.insert(k.clone(), v.clone());
                    }
                    Some(slot) => merge_value(slot, v),
                }
            }
        }
        (current, incoming) => {
            if incoming.partial_cmp(current) == Some(std::cmp::Ordering::Less) {
                *current = incoming.clone();
            }
        }
    }
}
