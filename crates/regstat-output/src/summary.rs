//! Run summary: what each stage kept, joined, dropped and loaded.

use crate::export::{ExportError, ExportFormat, Exporter, finish_csv};
use chrono::{DateTime, Utc};
use regstat_data::model::{JoinGap, Reconciliation, SourceKind};
use regstat_data::store::{LoadOutcome, LoadPolicy};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Rows kept by one extractor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRowCount {
    /// Source
    pub source: SourceKind,

    /// Regions in its normalized table
    pub rows: usize,
}

/// Result of the load stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadSummary {
    /// Destination table
    pub table: String,

    /// Policy the load ran under
    pub policy: LoadPolicy,

    /// Rows written
    pub written: usize,

    /// Rows deleted before writing
    pub removed: usize,

    /// Rows in the table afterwards
    pub total: usize,
}

impl LoadSummary {
    /// Summarize a completed load.
    pub fn new(table: impl Into<String>, policy: LoadPolicy, outcome: LoadOutcome) -> Self {
        Self {
            table: table.into(),
            policy,
            written: outcome.written,
            removed: outcome.removed,
            total: outcome.total,
        }
    }
}

/// Summary of one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Reporting period
    pub period: String,

    /// When the summary was produced
    pub generated_at: DateTime<Utc>,

    /// Rows kept per source, in join order
    pub source_rows: Vec<SourceRowCount>,

    /// Regions present in every source
    pub reconciled: usize,

    /// Regions dropped by the join and the sources they are missing from
    pub dropped: Vec<JoinGap>,

    /// Load result, if the run reached the load stage
    pub load: Option<LoadSummary>,
}

impl RunSummary {
    /// Summarize a reconciliation.
    ///
    /// # Arguments
    ///
    /// * `period` - Reporting period of the run
    /// * `source_rows` - Rows kept by each extractor
    /// * `reconciliation` - Reconciler output
    pub fn new<I>(period: impl Into<String>, source_rows: I, reconciliation: &Reconciliation) -> Self
    where
        I: IntoIterator<Item = (SourceKind, usize)>,
    {
        let mut source_rows: Vec<SourceRowCount> = source_rows
            .into_iter()
            .map(|(source, rows)| SourceRowCount { source, rows })
            .collect();
        let order = SourceKind::join_order();
        source_rows.sort_by_key(|c| order.iter().position(|k| *k == c.source));

        Self {
            period: period.into(),
            generated_at: Utc::now(),
            source_rows,
            reconciled: reconciliation.region_count(),
            dropped: reconciliation.gaps.clone(),
            load: None,
        }
    }

    /// Attach the load result.
    pub fn with_load(mut self, load: LoadSummary) -> Self {
        self.load = Some(load);
        self
    }

    /// Number of regions dropped by the join.
    pub fn dropped_count(&self) -> usize {
        self.dropped.len()
    }

    /// Format as ASCII table for terminal display.
    pub fn to_ascii_table(&self) -> String {
        let mut output = String::new();

        output.push_str(&format!("\nRegional data run: {}\n", self.period));
        output.push_str(&format!(
            "Generated: {}\n",
            self.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
        ));
        output.push_str(&"=".repeat(60));
        output.push('\n');

        output.push_str(&format!("{:<30} {:>12}\n", "Source", "Regions"));
        output.push_str(&"-".repeat(60));
        output.push('\n');
        for count in &self.source_rows {
            output.push_str(&format!("{:<30} {:>12}\n", count.source.name(), count.rows));
        }
        output.push_str(&"-".repeat(60));
        output.push('\n');
        output.push_str(&format!("{:<30} {:>12}\n", "Reconciled", self.reconciled));
        output.push_str(&format!("{:<30} {:>12}\n", "Dropped", self.dropped_count()));

        if !self.dropped.is_empty() {
            output.push_str("\nDropped regions:\n");
            for gap in &self.dropped {
                output.push_str(&format!("  {gap}\n"));
            }
        }

        if let Some(load) = &self.load {
            output.push_str(&format!(
                "\nLoaded {} rows into {} ({}, {} removed, {} total)\n",
                load.written, load.table, load.policy, load.removed, load.total
            ));
        }

        output.push_str(&"=".repeat(60));
        output.push('\n');
        output
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} regions reconciled, {} dropped",
            self.reconciled,
            self.dropped_count()
        )
    }
}

/// Flattened summary line for CSV export.
#[derive(Debug, Serialize)]
struct SummaryFlat {
    section: &'static str,
    name: String,
    value: String,
}

impl RunSummary {
    fn to_flat_records(&self) -> Vec<SummaryFlat> {
        let mut records: Vec<SummaryFlat> = self
            .source_rows
            .iter()
            .map(|c| SummaryFlat {
                section: "source",
                name: c.source.id().to_string(),
                value: c.rows.to_string(),
            })
            .collect();

        records.push(SummaryFlat {
            section: "join",
            name: "reconciled".to_string(),
            value: self.reconciled.to_string(),
        });
        records.extend(self.dropped.iter().map(|gap| SummaryFlat {
            section: "dropped",
            name: gap.region.clone(),
            value: gap
                .missing_from
                .iter()
                .map(SourceKind::id)
                .collect::<Vec<_>>()
                .join(";"),
        }));
        if let Some(load) = &self.load {
            records.push(SummaryFlat {
                section: "load",
                name: load.table.clone(),
                value: load.written.to_string(),
            });
        }
        records
    }
}

impl Exporter for RunSummary {
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError> {
        match format {
            ExportFormat::Csv => {
                let mut wtr = csv::Writer::from_writer(vec![]);
                for record in self.to_flat_records() {
                    wtr.serialize(&record)?;
                }
                finish_csv(wtr)
            }
            ExportFormat::Json => Ok(serde_json::to_string(self)?),
            ExportFormat::PrettyJson => Ok(serde_json::to_string_pretty(self)?),
        }
    }
}
