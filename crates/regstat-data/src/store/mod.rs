//! Relational destination for reconciled records.

pub mod sqlite;

pub use sqlite::SqliteStore;

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// What to do when the destination table already holds rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadPolicy {
    /// Fail without writing anything
    #[default]
    Reject,

    /// Delete existing rows, then load
    Replace,

    /// Insert new regions and overwrite existing ones by region key
    Upsert,
}

impl fmt::Display for LoadPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reject => f.write_str("reject"),
            Self::Replace => f.write_str("replace"),
            Self::Upsert => f.write_str("upsert"),
        }
    }
}

impl FromStr for LoadPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reject" => Ok(Self::Reject),
            "replace" => Ok(Self::Replace),
            "upsert" => Ok(Self::Upsert),
            other => Err(ConfigError::UnknownPolicy(other.to_string())),
        }
    }
}

/// Counts reported after a successful load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadOutcome {
    /// Rows written
    pub written: usize,

    /// Rows deleted beforehand under [`LoadPolicy::Replace`]
    pub removed: usize,

    /// Rows in the table after the load
    pub total: usize,
}

/// Errors that can occur while loading the destination.
#[derive(Debug, Error)]
pub enum LoadError {
    /// Database error outside of a record write
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Destination table name is not a plain identifier
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Destination already populated under [`LoadPolicy::Reject`]
    #[error("Table {table} already holds {rows} rows; choose the replace or upsert policy")]
    DestinationNotEmpty {
        /// Destination table
        table: String,
        /// Rows found
        rows: usize,
    },

    /// A metric that cannot be stored faithfully
    #[error("Invalid value {value} for {field} (field {field_index}) of region {region:?}")]
    InvalidValue {
        /// Region of the offending record
        region: String,
        /// Zero-based index of the field in the destination schema
        field_index: usize,
        /// Column name of the field
        field: &'static str,
        /// The rejected value
        value: f64,
    },

    /// A record write failed.
    #[error("Failed to write row {row_index} (region {region:?}): {source}")]
    Write {
        /// Region of the offending record
        region: String,
        /// Zero-based position of the record in the batch
        row_index: usize,
        /// Underlying database error
        #[source]
        source: rusqlite::Error,
    },

    /// Filesystem error preparing the database location
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Polars error building the read-back frame
    #[error("Polars error: {0}")]
    Polars(#[from] polars::prelude::PolarsError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_parse() {
        assert_eq!("Replace".parse::<LoadPolicy>().unwrap(), LoadPolicy::Replace);
        assert_eq!(LoadPolicy::default(), LoadPolicy::Reject);
        assert!("append".parse::<LoadPolicy>().is_err());
    }
}
