//! Staged normalized tables.
//!
//! Between the extract and reconcile stages a normalized table can be written
//! to a two-column CSV file (`voivodeship,<metric column>`) and read back, so
//! the stages can run as separate processes.

use crate::error::ExtractError;
use crate::model::{NormalizedTable, REGION_COLUMN, RegionMetricRecord, SourceKind};
use crate::number::NumberFormat;
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

/// Errors that can occur while staging tables.
#[derive(Debug, Error)]
pub enum StagingError {
    /// CSV error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// IO error on a staged file
    #[error("IO error on {path}: {source}")]
    Io {
        /// Staged file path
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// Header row does not match the expected columns.
    #[error("Unexpected header in staged {kind} table: expected {expected:?}, found {found:?}")]
    Header {
        /// Table being read
        kind: SourceKind,
        /// Expected header
        expected: Vec<String>,
        /// Header found in the file
        found: Vec<String>,
    },

    /// A staged row breaks a table invariant.
    #[error(transparent)]
    Table(#[from] ExtractError),
}

fn expected_header(kind: SourceKind) -> Vec<String> {
    vec![REGION_COLUMN.to_string(), kind.metric_column().to_string()]
}

/// Write a normalized table as CSV.
pub fn write_table<W: Write>(table: &NormalizedTable, writer: W) -> Result<(), StagingError> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(expected_header(table.kind()))?;
    for record in table.records() {
        wtr.write_record([record.region_name(), record.metric_value()])?;
    }
    wtr.flush().map_err(csv::Error::from)?;
    Ok(())
}

/// Read a staged table, re-checking every table invariant.
pub fn read_table<R: Read>(
    kind: SourceKind,
    number_format: NumberFormat,
    reader: R,
) -> Result<NormalizedTable, StagingError> {
    let mut rdr = csv::Reader::from_reader(reader);

    let found: Vec<String> = rdr.headers()?.iter().map(str::to_string).collect();
    let expected = expected_header(kind);
    if found != expected {
        return Err(StagingError::Header {
            kind,
            expected,
            found,
        });
    }

    let mut records = Vec::new();
    for row in rdr.records() {
        let row = row?;
        records.push(RegionMetricRecord::new(
            row.get(0).unwrap_or_default(),
            row.get(1).unwrap_or_default(),
        ));
    }

    Ok(NormalizedTable::from_records(kind, number_format, records)?)
}

/// Write a normalized table to a file, creating parent directories.
pub fn write_table_file(table: &NormalizedTable, path: &Path) -> Result<(), StagingError> {
    let io_err = |source| StagingError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(io_err)?;
    }
    let file = File::create(path).map_err(io_err)?;
    write_table(table, file)?;
    info!(source = %table.kind(), path = %path.display(), rows = table.len(), "Staged table");
    Ok(())
}

/// Read a staged table from a file.
pub fn read_table_file(
    kind: SourceKind,
    number_format: NumberFormat,
    path: &Path,
) -> Result<NormalizedTable, StagingError> {
    let file = File::open(path).map_err(|source| StagingError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    read_table(kind, number_format, file)
}
