//! Error types for data operations.

use crate::model::SourceKind;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for data operations.
pub type Result<T> = std::result::Result<T, DataError>;

/// Errors raised while turning a raw sheet into a normalized table.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The sheet does not match the configured layout.
    #[error("Source format error in {kind} source: {reason}")]
    SourceFormat {
        /// Source being extracted
        kind: SourceKind,
        /// What about the layout was violated
        reason: String,
    },

    /// Filtering removed every row.
    #[error("No rows survived filtering in {kind} source (header skip {header_skip})")]
    EmptyResult {
        /// Source being extracted
        kind: SourceKind,
        /// Configured header-skip count, the usual culprit
        header_skip: usize,
    },

    /// A record handed to a normalized table breaks its invariants.
    #[error("Invalid record in {kind} table for region {region:?}: {reason}")]
    InvalidRecord {
        /// Table being built
        kind: SourceKind,
        /// Offending region label
        region: String,
        /// Why the record was rejected
        reason: String,
    },

    /// Two records share one region key.
    #[error("Duplicate region {region:?} in {kind} table")]
    DuplicateRegion {
        /// Table being built
        kind: SourceKind,
        /// Region label of the second occurrence
        region: String,
    },

    /// The source file could not be read as CSV.
    #[error("Failed to read source {path}: {source}")]
    SourceRead {
        /// Path of the sheet export
        path: PathBuf,
        /// Underlying CSV error
        #[source]
        source: csv::Error,
    },

    /// CSV decoding error from an in-memory reader.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Errors raised while loading or validating pipeline configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("Failed to read config file {path}: {source}")]
    Read {
        /// Path of the configuration file
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// TOML parsing error
    #[error("Config parsing error: {0}")]
    Parse(#[from] toml::de::Error),

    /// Unrecognized source name
    #[error("Unknown source: {0} (expected gdp, population, unemployment or wages)")]
    UnknownSource(String),

    /// Column reference that is neither a letter label nor an index
    #[error("Invalid column reference: {0:?}")]
    InvalidColumn(String),

    /// Unrecognized load policy name
    #[error("Unknown load policy: {0} (expected reject, replace or upsert)")]
    UnknownPolicy(String),

    /// Unrecognized number format name
    #[error("Unknown number format: {0} (expected point or comma)")]
    UnknownNumberFormat(String),

    /// Exclusion pattern that is not a valid regular expression
    #[error("Invalid exclusion pattern {pattern:?} for {kind} source: {source}")]
    InvalidPattern {
        /// Source the pattern belongs to
        kind: SourceKind,
        /// The pattern as written
        pattern: String,
        /// Regex compilation error
        #[source]
        source: regex::Error,
    },

    /// Region and value columns point at the same cell.
    #[error("Region and value columns are both {column} in {kind} source")]
    SameColumn {
        /// Source being configured
        kind: SourceKind,
        /// The shared column label
        column: String,
    },

    /// A source kind is configured more than once.
    #[error("Source {0} is configured more than once")]
    DuplicateSource(SourceKind),

    /// A source kind has no configuration.
    #[error("Source {0} is not configured")]
    MissingSource(SourceKind),

    /// Destination table name is not a plain SQL identifier.
    #[error("Invalid table name: {0:?}")]
    InvalidTableName(String),
}

/// Errors that can occur during data operations.
#[derive(Debug, Error)]
pub enum DataError {
    /// Extraction error
    #[error(transparent)]
    Extract(#[from] ExtractError),

    /// Configuration error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Staging file error
    #[error(transparent)]
    Staging(#[from] crate::staging::StagingError),

    /// Destination store error
    #[error(transparent)]
    Load(#[from] crate::store::LoadError),

    /// Polars error
    #[error("Polars error: {0}")]
    Polars(#[from] polars::prelude::PolarsError),
}
