//! Canonicalizer: raw mention strings to stable merge keys
//!
//! Structure strings are parsed into a molecular graph and re-written in a
//! canonical form, so any two notations of the same structure share a key.
//! Peptides reduce to their bare one-letter sequence, names and conditions
//! to a case- and whitespace-folded form. All functions here are pure.

mod canon;
pub mod molecule;
mod peptide;
pub mod smiles;

pub use canon::{canonical_ranks, canonical_smiles};
pub use molecule::{Atom, Bond, BondOrder, Molecule};
pub use peptide::{looks_like_peptide, normalize_peptide};

use crate::graph::{NodeType, UNKNOWN_KEY};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use thiserror::Error;

/// Why a structure string could not be parsed
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CanonicalError {
    #[error("empty structure")]
    Empty,

    #[error("syntax error at {position}: {reason}")]
    Syntax { position: usize, reason: String },

    #[error("ring closure {0} never closed")]
    UnclosedRing(u16),

    #[error("invalid bond between atoms {a} and {b}")]
    InvalidBond { a: usize, b: usize },

    #[error("atom {atom} ({symbol}) has valence {valence}")]
    Valence { atom: usize, symbol: String, valence: u8 },

    #[error("aromatic atom {0} is not in a ring")]
    AromaticOutsideRing(usize),
}

/// What a raw mention denotes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// Line-notation molecular structure
    Structure,
    /// Amino-acid sequence notation
    Peptide,
    /// Trivial or systematic chemical name
    Name,
    /// Reaction parameter, `name=value`
    Condition,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Structure => "structure",
            Self::Peptide => "peptide",
            Self::Name => "name",
            Self::Condition => "condition",
        }
    }

    pub fn node_type(&self) -> NodeType {
        match self {
            Self::Structure | Self::Name => NodeType::Molecule,
            Self::Peptide => NodeType::Peptide,
            Self::Condition => NodeType::Condition,
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stable merge key
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CanonicalKey(String);

impl CanonicalKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CanonicalKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Outcome of canonicalization
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Canonicalization {
    Resolved(CanonicalKey),
    Unresolved,
}

impl Canonicalization {
    pub fn key(&self) -> Option<&CanonicalKey> {
        match self {
            Self::Resolved(key) => Some(key),
            Self::Unresolved => None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved(_))
    }

    /// The key, or `"Unknown"`
    pub fn key_or_unknown(&self) -> &str {
        self.key().map(CanonicalKey::as_str).unwrap_or(UNKNOWN_KEY)
    }
}

/// A mention after canonicalization, with its parsed structure if any
#[derive(Debug, Clone)]
pub struct CanonicalEntity {
    pub raw: String,
    pub kind: EntityKind,
    pub canonicalization: Canonicalization,
    pub structure: Option<Molecule>,
}

impl CanonicalEntity {
    pub fn key(&self) -> Option<&CanonicalKey> {
        self.canonicalization.key()
    }

    pub fn is_resolved(&self) -> bool {
        self.canonicalization.is_resolved()
    }
}

/// Strings extractors emit when they found nothing.
const PLACEHOLDERS: [&str; 7] = [
    "unknown",
    "none",
    "n/a",
    "na",
    "null",
    "mock_smiles_string",
    "?",
];

/// Chemical names: letters, digits and name punctuation, with at least one
/// run of three lowercase letters.
static NAME_CHARS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[\p{L}\p{N}][\p{L}\p{N} ,'()\[\]+\-]*$").expect("name pattern is valid")
});

static NAME_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\p{Ll}{3,}").expect("name word pattern is valid"));

fn compact(raw: &str) -> String {
    raw.chars().filter(|c| !c.is_whitespace()).collect()
}

fn fold_text(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn is_placeholder(raw: &str) -> bool {
    let folded = fold_text(raw);
    folded.is_empty() || PLACEHOLDERS.contains(&folded.as_str())
}

/// Decide what kind of entity a raw mention is.
///
/// Precedence is peptide, then structure, then name. Anything else is
/// treated as a structure that will fail to resolve.
pub fn detect_kind(raw: &str) -> EntityKind {
    let compacted = compact(raw);
    if looks_like_peptide(&compacted) {
        return EntityKind::Peptide;
    }
    if is_placeholder(raw) || smiles::parse(&compacted).is_ok() {
        return EntityKind::Structure;
    }
    let trimmed = raw.trim();
    if NAME_CHARS.is_match(trimmed) && NAME_WORD.is_match(trimmed) {
        return EntityKind::Name;
    }
    EntityKind::Structure
}

/// Canonicalize with default options.
///
/// Whitespace never matters. Letter case matters for structures only:
/// lowercase marks aromatic atoms and `Cl` is not `CL`, so `cco` or `CLC`
/// come back `Unresolved` rather than folded to `CCO` or `CCl`. Peptide,
/// name and condition keys are case-folded.
pub fn canonicalize(raw: &str, kind: EntityKind) -> Canonicalization {
    Canonicalizer::default().canonicalize(raw, kind)
}

/// Canonicalizer with its options
#[derive(Debug, Clone, Copy, Default)]
pub struct Canonicalizer {
    /// Keep only the first dot-separated structure fragment
    pub first_fragment_only: bool,
}

impl Canonicalizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_first_fragment_only(mut self, enabled: bool) -> Self {
        self.first_fragment_only = enabled;
        self
    }

    pub fn canonicalize(&self, raw: &str, kind: EntityKind) -> Canonicalization {
        self.resolve(raw, kind).canonicalization
    }

    /// Canonicalize a mention, keeping the parsed structure for classification.
    pub fn resolve(&self, raw: &str, kind: EntityKind) -> CanonicalEntity {
        let mut structure = None;
        let canonicalization = if is_placeholder(raw) {
            Canonicalization::Unresolved
        } else {
            match kind {
                EntityKind::Structure => match self.parse_structure(raw) {
                    Ok(mol) => {
                        let key = canonical_smiles(&mol);
                        structure = Some(mol);
                        Canonicalization::Resolved(CanonicalKey(key))
                    }
                    Err(err) => {
                        tracing::debug!(raw, error = %err, "structure did not parse");
                        Canonicalization::Unresolved
                    }
                },
                EntityKind::Peptide => match normalize_peptide(raw) {
                    Some(seq) => Canonicalization::Resolved(CanonicalKey(seq)),
                    None => Canonicalization::Unresolved,
                },
                EntityKind::Name => Canonicalization::Resolved(CanonicalKey(fold_text(raw))),
                EntityKind::Condition => match raw.split_once('=') {
                    Some((name, value)) => condition_key(name, value)
                        .map_or(Canonicalization::Unresolved, Canonicalization::Resolved),
                    None => Canonicalization::Unresolved,
                },
            }
        };
        CanonicalEntity {
            raw: raw.to_string(),
            kind,
            canonicalization,
            structure,
        }
    }

    fn parse_structure(&self, raw: &str) -> Result<Molecule, CanonicalError> {
        let compacted = compact(raw);
        let input = if self.first_fragment_only {
            compacted.split('.').next().unwrap_or_default()
        } else {
            compacted.as_str()
        };
        smiles::parse(input)
    }
}

/// Key for a condition `name`/`value` pair; `None` when either is blank.
pub fn condition_key(name: &str, value: &str) -> Option<CanonicalKey> {
    let name = fold_text(name);
    let value = fold_text(value);
    if name.is_empty() || value.is_empty() {
        return None;
    }
    Some(CanonicalKey(format!("{}={}", name, value)))
}
