//! Raw sheet grids read from CSV exports.

use crate::error::ExtractError;
use std::io::Read;
use std::path::Path;

/// A grid of raw cell text, exactly as exported from one sheet.
///
/// No row is interpreted as a header. Rows may differ in length; cells past
/// the end of a short row read as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawSheet {
    rows: Vec<Vec<String>>,
}

impl RawSheet {
    /// Build a sheet from in-memory rows.
    pub fn from_rows<R, C>(rows: R) -> Self
    where
        R: IntoIterator<Item = Vec<C>>,
        C: Into<String>,
    {
        Self {
            rows: rows
                .into_iter()
                .map(|row| row.into_iter().map(Into::into).collect())
                .collect(),
        }
    }

    /// Read a sheet export from any reader.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, ExtractError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(reader);

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            rows.push(record.iter().map(str::to_string).collect());
        }
        Ok(Self { rows })
    }

    /// Read a sheet export from a file.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, ExtractError> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|e| ExtractError::SourceRead {
            path: path.to_path_buf(),
            source: e.into(),
        })?;
        Self::from_reader(file).map_err(|e| match e {
            ExtractError::Csv(source) => ExtractError::SourceRead {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })
    }

    /// All rows.
    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the sheet has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Widest row length among rows from `start` on.
    pub fn width_from(&self, start: usize) -> usize {
        self.rows
            .iter()
            .skip(start)
            .map(Vec::len)
            .max()
            .unwrap_or(0)
    }

    /// Trimmed text of a cell, or `None` when absent or blank.
    pub fn cell(&self, row: usize, column: usize) -> Option<&str> {
        self.rows
            .get(row)?
            .get(column)
            .map(|c| c.trim())
            .filter(|c| !c.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_reader_ragged_rows() {
        let data = "TABLE 1. GDP\n,,\nRegion,2022,2023,per capita\nDolnośląskie,1,2,\"98 765,4\"\n";
        let sheet = RawSheet::from_reader(data.as_bytes()).unwrap();

        assert_eq!(sheet.len(), 4);
        assert_eq!(sheet.width_from(0), 4);
        assert_eq!(sheet.cell(3, 3), Some("98 765,4"));
        assert_eq!(sheet.cell(0, 3), None);
    }

    #[test]
    fn test_blank_cell_is_absent() {
        let sheet = RawSheet::from_rows(vec![vec!["  ", "12"]]);
        assert_eq!(sheet.cell(0, 0), None);
        assert_eq!(sheet.cell(0, 1), Some("12"));
        assert_eq!(sheet.cell(5, 0), None);
    }

    #[test]
    fn test_missing_file() {
        let err = RawSheet::from_path("/nonexistent/regstat/sheet.csv").unwrap_err();
        assert!(matches!(err, ExtractError::SourceRead { .. }));
    }
}
