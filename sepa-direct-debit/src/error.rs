//! Error types for direct debit message generation

use crate::validation::ValidationReport;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for direct debit operations
pub type Result<T> = std::result::Result<T, Error>;

/// Direct debit errors
#[derive(Error, Debug)]
pub enum Error {
    /// One or more field rules were violated
    #[error("Validation failed: {0}")]
    Validation(ValidationReport),

    /// The configured schema directory has no XSD for the schema version
    #[error("Schema file not found: {}", .0.display())]
    SchemaFileMissing(PathBuf),

    /// The rendered document does not conform to the XSD
    #[error("Document does not conform to schema ({} violation(s)): {}", .0.len(), format_violations(.0))]
    SchemaConformance(Vec<SchemaViolation>),

    /// The XSD could not be read or uses unsupported constructs
    #[error("Schema error: {0}")]
    Schema(String),

    /// XML serialization error
    #[error("XML error: {0}")]
    Xml(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ValidationReport> for Error {
    fn from(report: ValidationReport) -> Self {
        Error::Validation(report)
    }
}

/// A single schema conformance finding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaViolation {
    /// Slash-separated element path, e.g. `Document/CstmrDrctDbtInitn/GrpHdr/MsgId`
    pub path: String,

    /// What is wrong at that path
    pub message: String,
}

impl fmt::Display for SchemaViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

fn format_violations(violations: &[SchemaViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
