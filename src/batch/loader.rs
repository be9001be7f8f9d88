//! Record discovery and loading
//!
//! A path may name a single file or a directory, walked recursively.
//! `.json` files hold one record or an array of records; `.jsonl` files
//! hold one record per line. Records that fail to deserialize are counted
//! and skipped; so are files that cannot be read.

use super::BatchError;
use crate::assemble::ReactionEvidenceRecord;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Records gathered from one or more input files
#[derive(Debug, Clone, Default)]
pub struct LoadedRecords {
    pub records: Vec<ReactionEvidenceRecord>,
    pub files_read: usize,
    pub files_failed: usize,
    pub malformed: usize,
}

impl LoadedRecords {
    fn extend(&mut self, other: LoadedRecords) {
        self.records.extend(other.records);
        self.files_read += other.files_read;
        self.files_failed += other.files_failed;
        self.malformed += other.malformed;
    }
}

fn is_record_file(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("json") | Some("jsonl")
    )
}

/// Input files under `path`, sorted so that runs are reproducible.
pub fn discover(path: &Path) -> Result<Vec<PathBuf>, BatchError> {
    if !path.exists() {
        return Err(BatchError::NotFound(path.display().to_string()));
    }
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }
    let mut files: Vec<PathBuf> = WalkDir::new(path)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file() && is_record_file(e.path()))
        .map(|e| e.into_path())
        .collect();
    files.sort();
    Ok(files)
}

/// Parse records from text, by file extension.
pub fn parse_records(text: &str, jsonl: bool) -> (Vec<ReactionEvidenceRecord>, usize) {
    let mut values = Vec::new();
    let mut malformed = 0;

    if jsonl {
        for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
            match serde_json::from_str::<Value>(line) {
                Ok(value) => values.push(value),
                Err(e) => {
                    debug!(error = %e, "malformed line");
                    malformed += 1;
                }
            }
        }
    } else {
        match serde_json::from_str::<Value>(text) {
            Ok(Value::Array(items)) => values = items,
            Ok(value) => values.push(value),
            Err(e) => {
                debug!(error = %e, "malformed document");
                malformed += 1;
            }
        }
    }

    let mut records = Vec::with_capacity(values.len());
    for value in values {
        match serde_json::from_value::<ReactionEvidenceRecord>(value) {
            Ok(record) => records.push(record),
            Err(e) => {
                debug!(error = %e, "malformed record");
                malformed += 1;
            }
        }
    }
    (records, malformed)
}

pub fn load_file(path: &Path) -> Result<LoadedRecords, BatchError> {
    let text = std::fs::read_to_string(path).map_err(|source| BatchError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let jsonl = path.extension().and_then(|e| e.to_str()) == Some("jsonl");
    let (records, malformed) = parse_records(&text, jsonl);
    if malformed > 0 {
        warn!(path = %path.display(), malformed, "skipped malformed records");
    }
    Ok(LoadedRecords {
        records,
        files_read: 1,
        files_failed: 0,
        malformed,
    })
}

/// Load every record under `path`.
///
/// Unreadable files are logged and skipped. Fails only when input files
/// exist and none of them could be read.
pub fn load_path(path: &Path) -> Result<LoadedRecords, BatchError> {
    let files = discover(path)?;
    let mut loaded = LoadedRecords::default();
    for file in &files {
        match load_file(file) {
            Ok(records) => loaded.extend(records),
            Err(e) => {
                warn!(error = %e, "skipping unreadable input file");
                loaded.files_failed += 1;
            }
        }
    }
    if loaded.files_read == 0 && loaded.files_failed > 0 {
        return Err(BatchError::NoReadableInput(path.display().to_string()));
    }
    debug!(
        files = loaded.files_read,
        records = loaded.records.len(),
        malformed = loaded.malformed,
        "loaded records"
    );
    Ok(loaded)
}
