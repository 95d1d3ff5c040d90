//! Pipeline configuration file.
//!
//! ```toml
//! period = "2023"
//!
//! [paths]
//! raw_dir = "data/raw"
//! staging_dir = "data/processed"
//!
//! [database]
//! table = "regional_economic_data_2023"
//!
//! [[source]]
//! kind = "unemployment"
//! file = "labour_market_2023.csv"
//! sheet = "1(34)"
//! header_skip = 13
//! region_column = "A"
//! value_column = "H"
//! number_format = "comma"
//! ```
//!
//! Sources left out of the file fall back to the builtin catalogue.

use crate::error::ConfigError;
use crate::model::SourceKind;
use crate::source::{SourceConfig, builtin_source};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Directories used by the file-based stages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Directory holding the raw sheet exports
    pub raw_dir: PathBuf,

    /// Directory for staged tables and the wide output
    pub staging_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            raw_dir: PathBuf::from("data/raw"),
            staging_dir: PathBuf::from("data/processed"),
        }
    }
}

/// Destination settings. The database location itself comes from the
/// environment or the command line.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Destination table, defaults to `regional_economic_data_<period>`
    pub table: Option<String>,
}

/// Full pipeline configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Reporting period, used in staged file and table names
    #[serde(default = "default_period")]
    pub period: String,

    /// Directories
    #[serde(default)]
    pub paths: PathsConfig,

    /// Destination settings
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Source layouts
    #[serde(default, rename = "source")]
    pub sources: Vec<SourceConfig>,
}

fn default_period() -> String {
    "2023".to_string()
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            period: default_period(),
            paths: PathsConfig::default(),
            database: DatabaseConfig::default(),
            sources: Vec::new(),
        }
        .with_builtin_sources()
    }
}

impl PipelineConfig {
    /// Parse and validate a TOML configuration.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        let config = config.with_builtin_sources();
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML configuration file.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Fill in builtin layouts for sources the file does not mention.
    fn with_builtin_sources(mut self) -> Self {
        for kind in SourceKind::all() {
            if !self.sources.iter().any(|s| s.kind == kind) {
                self.sources.push(builtin_source(kind));
            }
        }
        self.sources.sort_by_key(|s| s.kind);
        self
    }

    /// Check that every source appears exactly once with a valid layout,
    /// and that the table name is a plain identifier.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for kind in SourceKind::all() {
            match self.sources.iter().filter(|s| s.kind == kind).count() {
                0 => return Err(ConfigError::MissingSource(kind)),
                1 => {}
                _ => return Err(ConfigError::DuplicateSource(kind)),
            }
        }
        for source in &self.sources {
            source.validate()?;
        }
        validate_identifier(&self.table_name())?;
        Ok(())
    }

    /// Layout of one source.
    pub fn source(&self, kind: SourceKind) -> Result<&SourceConfig, ConfigError> {
        self.sources
            .iter()
            .find(|s| s.kind == kind)
            .ok_or(ConfigError::MissingSource(kind))
    }

    /// Destination table name.
    pub fn table_name(&self) -> String {
        self.database
            .table
            .clone()
            .unwrap_or_else(|| format!("regional_economic_data_{}", self.period))
    }

    /// Path of the staged table for a source.
    pub fn staging_path(&self, kind: SourceKind) -> PathBuf {
        self.paths
            .staging_dir
            .join(format!("{}_{}.csv", kind.staging_stem(), self.period))
    }

    /// Path of the reconciled wide dataset.
    pub fn output_path(&self) -> PathBuf {
        self.paths
            .staging_dir
            .join(format!("regional_economic_data_{}.csv", self.period))
    }
}

/// Check that a name is safe to splice into SQL as a table identifier.
pub fn validate_identifier(name: &str) -> Result<(), ConfigError> {
    let mut chars = name.chars();
    let valid = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(ConfigError::InvalidTableName(name.to_string()))
    }
}
