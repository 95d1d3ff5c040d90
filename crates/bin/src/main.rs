//! Regstat CLI binary.
//!
//! Runs the regional statistics pipeline as a whole or stage by stage.

mod integration;

use clap::{Parser, Subcommand, ValueEnum};
use integration::database::resolve_database_path;
use integration::logging::init_logging;
use regstat::{Pipeline, PipelineError};
use regstat_data::config::PipelineConfig;
use regstat_data::model::SourceKind;
use regstat_data::store::LoadPolicy;
use regstat_output::{ExportFormat, Exporter, RunSummary};
use std::path::{Path, PathBuf};
use std::process;

#[derive(Parser)]
#[command(name = "regstat")]
#[command(about = "Regstat: regional statistics extract, reconcile and load", long_about = None)]
#[command(version)]
struct Cli {
    /// Pipeline configuration file (TOML); builtin layouts when omitted
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// SQLite database file
    #[arg(long, global = true, env = "REGSTAT_DATABASE")]
    database: Option<PathBuf>,

    /// Log every dropped row
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the configured source layouts
    Sources,

    /// Extract raw sheets into staged tables
    Extract {
        /// Source to extract (repeatable); all sources when omitted
        #[arg(long = "source")]
        sources: Vec<SourceKind>,
    },

    /// Reconcile staged tables into the wide dataset file
    Reconcile {
        /// Summary output format
        #[arg(long, value_enum, default_value = "text")]
        format: SummaryFormat,
    },

    /// Load the wide dataset file into the database
    Load {
        /// What to do when the table already holds rows
        #[arg(long, default_value = "reject")]
        policy: LoadPolicy,
    },

    /// Run every stage in one process
    Run {
        /// What to do when the table already holds rows
        #[arg(long, default_value = "reject")]
        policy: LoadPolicy,

        /// Summary output format
        #[arg(long, value_enum, default_value = "text")]
        format: SummaryFormat,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SummaryFormat {
    Text,
    Json,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error in {} stage: {}", e.stage(), e);
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), PipelineError> {
    let config = match &cli.config {
        Some(path) => PipelineConfig::from_path(path)?,
        None => PipelineConfig::default(),
    };
    let pipeline = Pipeline::new(config)?;

    match cli.command {
        Commands::Sources => list_sources(&pipeline),
        Commands::Extract { sources } => extract(&pipeline, &sources)?,
        Commands::Reconcile { format } => {
            let summary = reconcile(&pipeline)?;
            print_summary(&summary, format)?;
        }
        Commands::Load { policy } => {
            let database = resolve_database_path(cli.database);
            load(&pipeline, &database, policy)?;
        }
        Commands::Run { policy, format } => {
            let database = resolve_database_path(cli.database);
            let store = pipeline.open_store(&database)?;
            let summary = pipeline.run(&store, policy)?;
            print_summary(&summary, format)?;

            if matches!(format, SummaryFormat::Text) {
                let df = store.read_frame().map_err(PipelineError::Load)?;
                println!("\n{}", df);
            }
        }
    }

    Ok(())
}

fn list_sources(pipeline: &Pipeline) {
    let config = pipeline.config();

    println!("Sources (period {}):", config.period);
    println!("====================\n");
    println!(
        "{:<14} {:<32} {:<10} {:>5} {:>7} {:>6} {:<6}",
        "Source", "File", "Sheet", "Skip", "Region", "Value", "Format"
    );
    for kind in SourceKind::all() {
        if let Ok(source) = config.source(kind) {
            println!(
                "{:<14} {:<32} {:<10} {:>5} {:>7} {:>6} {:<6}",
                kind.id(),
                source.file.display(),
                source.sheet,
                source.header_skip,
                source.region_column.label(),
                source.value_column.label(),
                source.number_format,
            );
        }
    }
    println!("\nRaw directory:     {}", config.paths.raw_dir.display());
    println!("Staging directory: {}", config.paths.staging_dir.display());
    println!("Destination table: {}", config.table_name());
}

fn extract(pipeline: &Pipeline, sources: &[SourceKind]) -> Result<(), PipelineError> {
    let kinds: Vec<SourceKind> = if sources.is_empty() {
        SourceKind::all().to_vec()
    } else {
        sources.to_vec()
    };

    for kind in kinds {
        let table = pipeline.extract(kind)?;
        let path = pipeline.stage(&table)?;
        println!(
            "{:<14} {:>3} regions -> {}",
            kind.id(),
            table.len(),
            path.display()
        );
    }
    Ok(())
}

fn reconcile(pipeline: &Pipeline) -> Result<RunSummary, PipelineError> {
    let tables = pipeline.read_all_staged()?;
    let counts: Vec<(SourceKind, usize)> = tables.iter().map(|t| (t.kind(), t.len())).collect();

    let reconciliation = pipeline.reconcile(&tables)?;
    let path = pipeline.export(&reconciliation)?;
    println!("Wrote {}", path.display());

    Ok(RunSummary::new(
        pipeline.config().period.clone(),
        counts,
        &reconciliation,
    ))
}

fn load(pipeline: &Pipeline, database: &Path, policy: LoadPolicy) -> Result<(), PipelineError> {
    let records = pipeline.read_exported()?;
    let store = pipeline.open_store(database)?;
    let load = pipeline.load(&store, &records, policy)?;

    println!(
        "Loaded {} rows into {} at {} ({} removed, {} total)",
        load.written,
        load.table,
        database.display(),
        load.removed,
        load.total
    );
    Ok(())
}

fn print_summary(summary: &RunSummary, format: SummaryFormat) -> Result<(), PipelineError> {
    match format {
        SummaryFormat::Text => print!("{}", summary.to_ascii_table()),
        SummaryFormat::Json => println!("{}", summary.export_to_string(ExportFormat::PrettyJson)?),
    }
    Ok(())
}
