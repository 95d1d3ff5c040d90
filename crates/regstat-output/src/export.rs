//! Export of the reconciled dataset.
//!
//! The wide dataset is written as CSV with the destination column names as
//! header, or as JSON. CSV files written here can be read back with
//! [`read_records`] for the load stage.

use regstat_data::model::{JoinGap, ReconciledRecord, Reconciliation};
use serde::Serialize;
use std::fmt;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur during export operations.
#[derive(Debug, Error)]
pub enum ExportError {
    /// CSV serialization error.
    #[error("CSV serialization error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization error.
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialized output was not valid UTF-8.
    #[error("Output is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    /// Invalid format error.
    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    /// A dataset file does not have the expected header.
    #[error("Unexpected dataset header: expected {expected:?}, found {found:?}")]
    Header {
        /// Expected column names
        expected: Vec<String>,
        /// Column names found
        found: Vec<String>,
    },
}

/// Export format options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExportFormat {
    /// Comma-separated values format.
    #[default]
    Csv,

    /// Compact JSON format.
    Json,

    /// Pretty-printed JSON format.
    PrettyJson,
}

impl ExportFormat {
    /// Get the file extension for this format.
    pub const fn extension(&self) -> &str {
        match self {
            Self::Csv => "csv",
            Self::Json | Self::PrettyJson => "json",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Csv => f.write_str("csv"),
            Self::Json => f.write_str("json"),
            Self::PrettyJson => f.write_str("pretty-json"),
        }
    }
}

impl FromStr for ExportFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            "pretty-json" | "pretty" => Ok(Self::PrettyJson),
            other => Err(ExportError::InvalidFormat(other.to_string())),
        }
    }
}

/// Trait for exporting data in various formats.
pub trait Exporter {
    /// Export data to a string in the specified format.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError>;

    /// Export data to a file in the specified format, creating parent
    /// directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or file writing fails.
    fn export_to_file(&self, path: &Path, format: ExportFormat) -> Result<(), ExportError> {
        let content = self.export_to_string(format)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = File::create(path)?;
        file.write_all(content.as_bytes())?;
        Ok(())
    }
}

pub(crate) fn finish_csv(wtr: csv::Writer<Vec<u8>>) -> Result<String, ExportError> {
    let bytes = wtr.into_inner().map_err(|e| e.into_error())?;
    Ok(String::from_utf8(bytes)?)
}

fn records_csv(records: &[ReconciledRecord]) -> Result<String, ExportError> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    // Written explicitly so an empty dataset still carries its header.
    wtr.write_record(ReconciledRecord::COLUMNS)?;
    for record in records {
        wtr.write_record([
            record.voivodeship.clone(),
            record.gdp_per_capita_pln.to_string(),
            record.unemployment_rate.to_string(),
            record.average_gross_wage.to_string(),
            record.population_total.to_string(),
        ])?;
    }
    finish_csv(wtr)
}

impl Exporter for [ReconciledRecord] {
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError> {
        match format {
            ExportFormat::Csv => records_csv(self),
            ExportFormat::Json => Ok(serde_json::to_string(self)?),
            ExportFormat::PrettyJson => Ok(serde_json::to_string_pretty(self)?),
        }
    }
}

/// JSON view of a reconciliation: the dataset plus the regions it dropped.
#[derive(Serialize)]
struct ReconciliationView<'a> {
    records: &'a [ReconciledRecord],
    dropped: &'a [JoinGap],
}

impl Exporter for Reconciliation {
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError> {
        let view = ReconciliationView {
            records: &self.records,
            dropped: &self.gaps,
        };
        match format {
            ExportFormat::Csv => records_csv(&self.records),
            ExportFormat::Json => Ok(serde_json::to_string(&view)?),
            ExportFormat::PrettyJson => Ok(serde_json::to_string_pretty(&view)?),
        }
    }
}

/// Read a wide dataset CSV written by [`Exporter`].
///
/// # Errors
///
/// Returns [`ExportError::Header`] if the columns differ from the destination
/// schema, or a CSV error if a row does not parse.
pub fn read_records<R: Read>(reader: R) -> Result<Vec<ReconciledRecord>, ExportError> {
    let mut rdr = csv::Reader::from_reader(reader);

    let found: Vec<String> = rdr.headers()?.iter().map(str::to_string).collect();
    if found != ReconciledRecord::COLUMNS {
        return Err(ExportError::Header {
            expected: ReconciledRecord::COLUMNS
                .iter()
                .map(|c| c.to_string())
                .collect(),
            found,
        });
    }

    let records = rdr
        .deserialize::<ReconciledRecord>()
        .collect::<Result<Vec<_>, _>>()?;
    Ok(records)
}

/// Read a wide dataset CSV file.
pub fn read_records_file(path: &Path) -> Result<Vec<ReconciledRecord>, ExportError> {
    read_records(File::open(path)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use regstat_data::model::SourceKind;
    use rstest::rstest;

    fn records() -> Vec<ReconciledRecord> {
        vec![
            ReconciledRecord {
                voivodeship: "Dolnośląskie".to_string(),
                gdp_per_capita_pln: 104_123.5,
                unemployment_rate: 4.1,
                average_gross_wage: 7423.98,
                population_total: 2_891_321.0,
            },
            ReconciledRecord {
                voivodeship: "Lubuskie".to_string(),
                gdp_per_capita_pln: 70_210.0,
                unemployment_rate: 4.6,
                average_gross_wage: 6455.71,
                population_total: 973_720.0,
            },
        ]
    }

    #[test]
    fn test_records_csv_header_and_rows() {
        let csv = records().export_to_string(ExportFormat::Csv).unwrap();
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(
            lines[0],
            "voivodeship,gdp_per_capita_pln,unemployment_rate,average_gross_wage,population_total"
        );
        assert_eq!(lines[1], "Dolnośląskie,104123.5,4.1,7423.98,2891321");
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn test_empty_dataset_keeps_header() {
        let csv = Vec::<ReconciledRecord>::new()
            .export_to_string(ExportFormat::Csv)
            .unwrap();
        assert_eq!(csv.lines().count(), 1);
    }

    #[test]
    fn test_csv_reads_back() {
        let csv = records().export_to_string(ExportFormat::Csv).unwrap();
        let read = read_records(csv.as_bytes()).unwrap();
        assert_eq!(read, records());
    }

    #[test]
    fn test_read_rejects_foreign_header() {
        let err = read_records("region,value\nA,1\n".as_bytes()).unwrap_err();
        assert!(matches!(err, ExportError::Header { .. }));
    }

    #[test]
    fn test_reconciliation_json_lists_dropped_regions() {
        let reconciliation = Reconciliation {
            records: records(),
            gaps: vec![JoinGap {
                region: "Opolskie".to_string(),
                present_in: vec![SourceKind::Gdp],
                missing_from: vec![
                    SourceKind::Unemployment,
                    SourceKind::Wages,
                    SourceKind::Population,
                ],
            }],
        };

        let json = reconciliation.export_to_string(ExportFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["records"].as_array().unwrap().len(), 2);
        assert_eq!(value["dropped"][0]["region"], "Opolskie");
        assert_eq!(value["dropped"][0]["missing_from"][0], "unemployment");
    }

    #[test]
    fn test_export_to_file_creates_parent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("processed").join("regional_economic_data_2023.csv");

        records().export_to_file(&path, ExportFormat::Csv).unwrap();
        assert_eq!(read_records_file(&path).unwrap().len(), 2);
    }

    #[rstest]
    #[case("csv", ExportFormat::Csv)]
    #[case("JSON", ExportFormat::Json)]
    #[case("pretty-json", ExportFormat::PrettyJson)]
    fn test_format_parse(#[case] text: &str, #[case] expected: ExportFormat) {
        assert_eq!(text.parse::<ExportFormat>().unwrap(), expected);
    }
}
