//! Graph and report serialization
//!
//! GraphML is the interchange format; node-link JSON is offered for tools
//! that prefer it. Writing never mutates the graph, so a failed export
//! leaves the in-memory graph available for a retry.

pub mod graphml;
pub mod json;

use crate::graph::KnowledgeGraph;
use crate::quality::QualityReport;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("XML error: {0}")]
    Xml(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("malformed graph file: {0}")]
    Malformed(String),
}

impl ExportError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            source,
        }
    }
}

/// Graph output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Graphml,
    Json,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Graphml => "graphml",
            Self::Json => "json",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "graphml" => Ok(Self::Graphml),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown export format '{}' (expected graphml or json)", other)),
        }
    }
}

/// Write a graph to `path` in the given format.
pub fn save_graph(graph: &KnowledgeGraph, path: &Path, format: ExportFormat) -> Result<(), ExportError> {
    match format {
        ExportFormat::Graphml => graphml::save(graph, path),
        ExportFormat::Json => json::save(graph, path),
    }
}

/// Write a quality report as pretty JSON.
pub fn save_report(report: &QualityReport, path: &Path) -> Result<(), ExportError> {
    let file = File::create(path).map_err(|e| ExportError::io(path, e))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, report)?;
    writer.flush().map_err(|e| ExportError::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_parses_case_insensitively() {
        assert_eq!("GraphML".parse::<ExportFormat>(), Ok(ExportFormat::Graphml));
        assert_eq!("json".parse::<ExportFormat>(), Ok(ExportFormat::Json));
        assert!("csv".parse::<ExportFormat>().is_err());
    }
}
