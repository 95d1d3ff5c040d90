//! Extraction of normalized region tables from raw sheets.

use crate::error::{ConfigError, ExtractError};
use crate::model::{NormalizedTable, RegionKey, RegionMetricRecord, SourceKind};
use crate::number::looks_numeric;
use crate::source::{RawSheet, SourceConfig};
use regex::Regex;
use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use tracing::{debug, info};

/// Why a data row did not make it into the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DropReason {
    /// Region cell blank or absent
    MissingRegion,
    /// Value cell blank or absent
    MissingValue,
    /// Value cell holds a placeholder or text
    NonNumericValue,
    /// Region label matches an exclusion pattern
    Excluded,
    /// Region already seen earlier in the sheet
    Duplicate,
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            Self::MissingRegion => "missing region",
            Self::MissingValue => "missing value",
            Self::NonNumericValue => "non-numeric value",
            Self::Excluded => "excluded label",
            Self::Duplicate => "duplicate region",
        };
        f.write_str(reason)
    }
}

/// Turns one source's raw sheet into a [`NormalizedTable`].
#[derive(Debug, Clone)]
pub struct Extractor {
    config: SourceConfig,
    exclusions: Vec<Regex>,
}

impl Extractor {
    /// Create an extractor, validating the source configuration.
    pub fn new(config: SourceConfig) -> Result<Self, ConfigError> {
        let exclusions = config.validate()?;
        Ok(Self { config, exclusions })
    }

    /// Source configuration in use.
    pub const fn config(&self) -> &SourceConfig {
        &self.config
    }

    /// Source kind this extractor produces.
    pub const fn kind(&self) -> SourceKind {
        self.config.kind
    }

    /// Read the configured file under `raw_dir` and extract it.
    pub fn extract_file(&self, raw_dir: &Path) -> Result<NormalizedTable, ExtractError> {
        let path = raw_dir.join(&self.config.file);
        info!(
            source = %self.config.kind,
            path = %path.display(),
            sheet = %self.config.sheet,
            header_skip = self.config.header_skip,
            "Reading source sheet"
        );
        let sheet = RawSheet::from_path(&path)?;
        self.extract(&sheet)
    }

    /// Extract the normalized table from a raw sheet.
    ///
    /// Rows are filtered in sheet order; the first occurrence of a region
    /// wins. The result is sorted by region key.
    pub fn extract(&self, sheet: &RawSheet) -> Result<NormalizedTable, ExtractError> {
        let kind = self.config.kind;
        let skip = self.config.header_skip;

        if sheet.len() <= skip {
            return Err(ExtractError::SourceFormat {
                kind,
                reason: format!(
                    "sheet has {} rows, need more than the {} header rows",
                    sheet.len(),
                    skip
                ),
            });
        }

        let width = sheet.width_from(skip);
        for (role, column) in [
            ("region", self.config.region_column),
            ("value", self.config.value_column),
        ] {
            if column.index() >= width {
                return Err(ExtractError::SourceFormat {
                    kind,
                    reason: format!(
                        "{} column {} is missing, data rows are {} columns wide",
                        role, column, width
                    ),
                });
            }
        }

        let mut seen = HashSet::new();
        let mut records = Vec::new();
        let mut dropped = 0usize;

        for row in skip..sheet.len() {
            match self.row_record(sheet, row, &mut seen) {
                Ok(record) => records.push(record),
                Err(reason) => {
                    dropped += 1;
                    debug!(
                        source = %kind,
                        row = row + 1,
                        cell = sheet.cell(row, self.config.region_column.index()).unwrap_or(""),
                        %reason,
                        "Dropped row"
                    );
                }
            }
        }

        if records.is_empty() {
            return Err(ExtractError::EmptyResult {
                kind,
                header_skip: skip,
            });
        }

        info!(source = %kind, kept = records.len(), dropped, "Extracted source");
        NormalizedTable::from_records(kind, self.config.number_format, records)
    }

    fn row_record(
        &self,
        sheet: &RawSheet,
        row: usize,
        seen: &mut HashSet<RegionKey>,
    ) -> Result<RegionMetricRecord, DropReason> {
        let region = sheet
            .cell(row, self.config.region_column.index())
            .ok_or(DropReason::MissingRegion)?;
        let value = sheet
            .cell(row, self.config.value_column.index())
            .ok_or(DropReason::MissingValue)?;
        if !looks_numeric(value) {
            return Err(DropReason::NonNumericValue);
        }

        let record = RegionMetricRecord::new(region, value);
        if record.region_name().is_empty() {
            return Err(DropReason::MissingRegion);
        }
        if self
            .exclusions
            .iter()
            .any(|p| p.is_match(record.region_name()))
        {
            return Err(DropReason::Excluded);
        }
        if !seen.insert(record.key().clone()) {
            return Err(DropReason::Duplicate);
        }
        Ok(record)
    }
}
