//! In-process pipeline runner.
//!
//! Each stage is exposed on its own so the command line can run them as
//! separate invocations connected by staged files, and [`Pipeline::run`]
//! chains all of them passing values directly.

use crate::reconcile::{ReconcileError, SourceTables, reconcile};
use regstat_data::config::PipelineConfig;
use regstat_data::error::{ConfigError, ExtractError};
use regstat_data::extract::Extractor;
use regstat_data::model::{NormalizedTable, ReconciledRecord, Reconciliation, SourceKind};
use regstat_data::staging::{StagingError, read_table_file, write_table_file};
use regstat_data::store::{LoadError, LoadPolicy, SqliteStore};
use regstat_output::export::{ExportError, ExportFormat, Exporter, read_records_file};
use regstat_output::summary::{LoadSummary, RunSummary};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

/// Pipeline stage, used to label failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Reading and validating configuration
    Config,
    /// Turning raw sheets into normalized tables
    Extract,
    /// Writing or reading staged tables
    Staging,
    /// Joining the normalized tables
    Reconcile,
    /// Writing or reading the wide dataset file
    Export,
    /// Writing the destination table
    Load,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Config => "config",
            Self::Extract => "extract",
            Self::Staging => "staging",
            Self::Reconcile => "reconcile",
            Self::Export => "export",
            Self::Load => "load",
        })
    }
}

/// A failure in one pipeline stage. Every stage failure aborts the run.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Extraction error
    #[error("Extract failed: {0}")]
    Extract(#[from] ExtractError),

    /// Staged file error
    #[error("Staging failed: {0}")]
    Staging(#[from] StagingError),

    /// Reconciliation error
    #[error("Reconcile failed: {0}")]
    Reconcile(#[from] ReconcileError),

    /// Dataset file error
    #[error("Export failed: {0}")]
    Export(#[from] ExportError),

    /// Load error
    #[error("Load failed: {0}")]
    Load(#[from] LoadError),
}

impl PipelineError {
    /// Stage the failure happened in.
    pub const fn stage(&self) -> Stage {
        match self {
            Self::Config(_) => Stage::Config,
            Self::Extract(_) => Stage::Extract,
            Self::Staging(_) => Stage::Staging,
            Self::Reconcile(_) => Stage::Reconcile,
            Self::Export(_) => Stage::Export,
            Self::Load(_) => Stage::Load,
        }
    }
}

/// Runs pipeline stages against one validated configuration.
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    /// Create a pipeline, validating the configuration.
    pub fn new(config: PipelineConfig) -> Result<Self, PipelineError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// The pipeline configuration.
    pub const fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Extract one source from its raw sheet export.
    pub fn extract(&self, kind: SourceKind) -> Result<NormalizedTable, PipelineError> {
        let extractor = Extractor::new(self.config.source(kind)?.clone())?;
        Ok(extractor.extract_file(&self.config.paths.raw_dir)?)
    }

    /// Extract every source.
    pub fn extract_all(&self) -> Result<Vec<NormalizedTable>, PipelineError> {
        SourceKind::all()
            .into_iter()
            .map(|kind| self.extract(kind))
            .collect()
    }

    /// Write a normalized table to its staging file.
    pub fn stage(&self, table: &NormalizedTable) -> Result<PathBuf, PipelineError> {
        let path = self.config.staging_path(table.kind());
        write_table_file(table, &path)?;
        Ok(path)
    }

    /// Read one staged table back.
    pub fn read_staged(&self, kind: SourceKind) -> Result<NormalizedTable, PipelineError> {
        let format = self.config.source(kind)?.number_format;
        Ok(read_table_file(kind, format, &self.config.staging_path(kind))?)
    }

    /// Read all four staged tables.
    pub fn read_all_staged(&self) -> Result<SourceTables, PipelineError> {
        let tables = SourceKind::all()
            .into_iter()
            .map(|kind| self.read_staged(kind))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(SourceTables::new(tables)?)
    }

    /// Reconcile the four tables.
    pub fn reconcile(&self, tables: &SourceTables) -> Result<Reconciliation, PipelineError> {
        Ok(reconcile(tables)?)
    }

    /// Write the reconciled dataset to its output CSV file.
    pub fn export(&self, reconciliation: &Reconciliation) -> Result<PathBuf, PipelineError> {
        let path = self.config.output_path();
        reconciliation.export_to_file(&path, ExportFormat::Csv)?;
        info!(path = %path.display(), rows = reconciliation.region_count(), "Wrote dataset");
        Ok(path)
    }

    /// Read the reconciled dataset back from its output CSV file.
    pub fn read_exported(&self) -> Result<Vec<ReconciledRecord>, PipelineError> {
        Ok(read_records_file(&self.config.output_path())?)
    }

    /// Open the destination store at `database`.
    pub fn open_store(&self, database: &Path) -> Result<SqliteStore, PipelineError> {
        Ok(SqliteStore::new(database, &self.config.table_name())?)
    }

    /// Load records into the destination.
    pub fn load(
        &self,
        store: &SqliteStore,
        records: &[ReconciledRecord],
        policy: LoadPolicy,
    ) -> Result<LoadSummary, PipelineError> {
        let outcome = store.load(records, policy)?;
        Ok(LoadSummary::new(store.table(), policy, outcome))
    }

    /// Run every stage: extract, stage, reconcile, export and load.
    ///
    /// Stops at the first failing stage. Nothing is written to the
    /// destination unless every earlier stage succeeded.
    pub fn run(&self, store: &SqliteStore, policy: LoadPolicy) -> Result<RunSummary, PipelineError> {
        info!(period = %self.config.period, "Starting pipeline run");

        let tables = self.extract_all()?;
        for table in &tables {
            self.stage(table)?;
        }
        let counts: Vec<(SourceKind, usize)> = tables.iter().map(|t| (t.kind(), t.len())).collect();

        let tables = SourceTables::new(tables)?;
        let reconciliation = self.reconcile(&tables)?;
        self.export(&reconciliation)?;

        let load = self.load(store, &reconciliation.records, policy)?;
        let summary =
            RunSummary::new(self.config.period.clone(), counts, &reconciliation).with_load(load);

        info!(
            reconciled = summary.reconciled,
            dropped = summary.dropped_count(),
            "Pipeline run complete"
        );
        Ok(summary)
    }
}
