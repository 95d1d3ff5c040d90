//! Source sheet configuration and reading.
//!
//! Each statistical source is described by a [`SourceConfig`]: which file
//! holds the sheet export, how many leading rows to skip, which columns carry
//! the region label and the metric, how its numbers are formatted, and which
//! labels mark aggregate rows to discard.

pub mod catalogue;
pub mod column;
pub mod sheet;

pub use catalogue::{DEFAULT_EXCLUSIONS, builtin_source, builtin_sources};
pub use column::ColumnRef;
pub use sheet::RawSheet;

use crate::error::ConfigError;
use crate::model::SourceKind;
use crate::number::NumberFormat;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Layout of one source sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Which indicator the sheet carries
    pub kind: SourceKind,

    /// Sheet export file, relative to the raw data directory
    pub file: PathBuf,

    /// Sheet identifier within the original workbook
    pub sheet: String,

    /// Leading rows to discard before data begins
    pub header_skip: usize,

    /// Column holding the region label
    pub region_column: ColumnRef,

    /// Column holding the metric value
    pub value_column: ColumnRef,

    /// Decimal notation of the metric values
    #[serde(default)]
    pub number_format: NumberFormat,

    /// Case-insensitive patterns; matching region labels are dropped
    #[serde(default = "default_exclusions")]
    pub exclude: Vec<String>,
}

fn default_exclusions() -> Vec<String> {
    DEFAULT_EXCLUSIONS.iter().map(ToString::to_string).collect()
}

impl SourceConfig {
    /// Check the column mapping and compile the exclusion patterns.
    pub fn validate(&self) -> Result<Vec<Regex>, ConfigError> {
        if self.region_column == self.value_column {
            return Err(ConfigError::SameColumn {
                kind: self.kind,
                column: self.region_column.label(),
            });
        }
        self.compile_exclusions()
    }

    /// Compile the exclusion patterns as case-insensitive regular expressions.
    pub fn compile_exclusions(&self) -> Result<Vec<Regex>, ConfigError> {
        self.exclude
            .iter()
            .map(|pattern| {
                RegexBuilder::new(pattern)
                    .case_insensitive(true)
                    .build()
                    .map_err(|source| ConfigError::InvalidPattern {
                        kind: self.kind,
                        pattern: pattern.clone(),
                        source,
                    })
            })
            .collect()
    }
}
