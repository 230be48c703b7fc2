//! Conformance checking of rendered documents against the pain.008 XSD
//!
//! The XSD is looked up as `<dir>/pain.<version>.xsd`. Without a configured
//! directory, checking is disabled and every document passes.

use crate::config::SchemaConfig;
use crate::xsd::Schema;
use crate::{Error, Result};
use std::path::PathBuf;

/// Validates documents against the configured pain.008 schema
#[derive(Debug, Clone)]
pub struct SchemaValidator {
    schema: SchemaConfig,
}

impl SchemaValidator {
    /// Create a validator for the configured schema version and directory
    pub fn new(schema: SchemaConfig) -> Self {
        Self { schema }
    }

    /// Whether a schema directory is configured
    pub fn is_enabled(&self) -> bool {
        self.schema.dir.is_some()
    }

    /// Location of the XSD, if a schema directory is configured
    pub fn schema_path(&self) -> Option<PathBuf> {
        self.schema
            .dir
            .as_ref()
            .map(|dir| dir.join(self.schema.file_name()))
    }

    /// Check a document.
    ///
    /// Returns [`Error::SchemaFileMissing`] when the directory has no XSD for
    /// the version and [`Error::SchemaConformance`] with every finding when the
    /// document does not conform.
    pub fn validate(&self, xml: &str) -> Result<()> {
        let Some(path) = self.schema_path() else {
            tracing::debug!("No schema directory configured, skipping conformance check");
            return Ok(());
        };

        if !path.is_file() {
            tracing::warn!("Schema file {} not found", path.display());
            return Err(Error::SchemaFileMissing(path));
        }

        let xsd = std::fs::read_to_string(&path)?;
        let schema = Schema::parse(&xsd)?;

        if schema.target_namespace() != Some(self.schema.namespace().as_str()) {
            tracing::warn!(
                "Schema {} declares target namespace {:?}, expected {}",
                path.display(),
                schema.target_namespace(),
                self.schema.namespace()
            );
        }

        let violations = schema.validate(xml);
        if violations.is_empty() {
            tracing::debug!("Document conforms to {}", path.display());
            Ok(())
        } else {
            tracing::warn!(
                "Document violates {} in {} place(s)",
                path.display(),
                violations.len()
            );
            Err(Error::SchemaConformance(violations))
        }
    }
}
