//! Error and warning types.
//!
//! Whole-document problems are errors and abort the operation. Per-entity
//! problems are warnings: they are collected alongside the result and never
//! stop an analysis.

use serde::{Serialize, Serializer};
use thiserror::Error;

/// The timeline payload does not have the expected top-level shape.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MalformedInputError {
    #[error("Timeline file is not valid JSON: {0}")]
    InvalidJson(String),
    #[error("Timeline payload must be a JSON object")]
    NotAnObject,
    #[error("Timeline payload is missing a \"records\" array")]
    MissingRecords,
    #[error("Timeline \"records\" must be an array, found {0}")]
    RecordsNotArray(&'static str),
}

/// A recoverable anomaly found while normalizing timeline records.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TimelineWarning {
    #[error("Skipped a timeline record without a valid id (record #{index})")]
    MissingId { index: usize },
    #[error("Skipped record with duplicate id \"{id}\" (record #{index}); the first occurrence is kept")]
    DuplicateId { id: String, index: usize },
    #[error("Record \"{id}\" references missing parent \"{parent_id}\"; treating it as a root")]
    MissingParent { id: String, parent_id: String },
    #[error("Cycle detected: \"{from}\" leads back to \"{to}\"; depth assignment stopped on this path")]
    Cycle { from: String, to: String },
    #[error("Record \"{id}\" is not reachable from any root; treating it as an additional root")]
    Disconnected { id: String },
}

impl Serialize for TimelineWarning {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A recoverable problem with a classification rule.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuleWarning {
    #[error("Rule \"{rule_id}\" has an invalid regular expression and never matches: {reason}")]
    InvalidRegex { rule_id: String, reason: String },
}

impl Serialize for RuleWarning {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A rule-set file could not be imported.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuleSetImportError {
    #[error("Rule file is not valid JSON: {0}")]
    InvalidJson(String),
    #[error("Rule file must be a JSON object")]
    NotAnObject,
    #[error("Unsupported rule file version: {found} (supported version is {supported})")]
    UnsupportedVersion { found: String, supported: u32 },
    #[error("Rule file \"rules\" must be an array")]
    RulesNotArray,
}

/// Stored state could not be read or written.
#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("Storage I/O failed for key \"{key}\": {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to encode stored state: {0}")]
    Encode(#[from] serde_json::Error),
}
