//! Configuration for direct debit message generation

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default pain.008 schema version
pub const DEFAULT_SCHEMA_VERSION: &str = "008.002.02";

/// Message generation configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Schema selection and conformance checking
    pub schema: SchemaConfig,

    /// XML output configuration
    pub output: OutputConfig,
}

/// Schema configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemaConfig {
    /// pain.008 version, e.g. `008.002.02` or `008.003.02`.
    /// Selects the document namespace and the XSD file name.
    pub version: String,

    /// Directory holding `pain.<version>.xsd`.
    /// When unset, rendered documents are not checked against a schema.
    pub dir: Option<PathBuf>,
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            version: DEFAULT_SCHEMA_VERSION.to_string(),
            dir: None,
        }
    }
}

impl SchemaConfig {
    /// Document namespace for the configured version
    pub fn namespace(&self) -> String {
        format!("urn:iso:std:iso:20022:tech:xsd:pain.{}", self.version)
    }

    /// XSD file name for the configured version
    pub fn file_name(&self) -> String {
        format!("pain.{}.xsd", self.version)
    }
}

/// XML output configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Indent the document with two spaces per level
    pub pretty_print: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { pretty_print: true }
    }
}

impl Config {
    /// Load from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))?;
        config.check()?;
        Ok(config)
    }

    /// Load from environment variables
    pub fn from_env() -> crate::Result<Self> {
        let mut config = Config::default();

        if let Ok(version) = std::env::var("PAIN008_SCHEMA_VERSION") {
            config.schema.version = version;
        }

        if let Ok(dir) = std::env::var("PAIN008_SCHEMA_DIR") {
            if !dir.is_empty() {
                config.schema.dir = Some(PathBuf::from(dir));
            }
        }

        if let Ok(pretty) = std::env::var("PAIN008_PRETTY_PRINT") {
            config.output.pretty_print = pretty.parse().map_err(|_| {
                crate::Error::Config(format!("PAIN008_PRETTY_PRINT must be true or false, got '{}'", pretty))
            })?;
        }

        config.check()?;
        Ok(config)
    }

    /// Reject versions that cannot form a namespace or file name
    fn check(&self) -> crate::Result<()> {
        let version = &self.schema.version;
        let well_formed = !version.is_empty()
            && version.split('.').all(|part| !part.is_empty() && part.chars().all(|c| c.is_ascii_digit()));
        if !well_formed {
            return Err(crate::Error::Config(format!(
                "Schema version must look like 008.002.02, got '{}'",
                version
            )));
        }
        Ok(())
    }
}
