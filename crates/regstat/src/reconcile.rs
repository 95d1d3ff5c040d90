//! Key-aligned reconciliation of the four normalized tables.
//!
//! Reconciliation is an inner join on the region key, computed as a set
//! intersection so that the result does not depend on the order in which
//! tables are supplied. Every region outside the intersection is reported as
//! a [`JoinGap`]; none is dropped silently.

use regstat_data::model::{
    JoinGap, NormalizedTable, ReconciledRecord, Reconciliation, RegionKey, SourceKind,
};
use regstat_data::number::NumberError;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{info, warn};

/// Errors that can occur while reconciling.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// A metric could not be coerced to a number.
    #[error("Cannot coerce {kind} value {value:?} for region {region:?}: {source}")]
    Coercion {
        /// Source table of the value
        kind: SourceKind,
        /// Region of the offending record
        region: String,
        /// The raw value text
        value: String,
        /// Why parsing failed
        #[source]
        source: NumberError,
    },

    /// No table supplied for a source.
    #[error("No table supplied for source {0}")]
    MissingTable(SourceKind),

    /// More than one table supplied for a source.
    #[error("More than one table supplied for source {0}")]
    DuplicateTable(SourceKind),
}

/// Exactly one normalized table per source.
#[derive(Debug, Clone)]
pub struct SourceTables {
    tables: BTreeMap<SourceKind, NormalizedTable>,
}

impl SourceTables {
    /// Collect tables, requiring each source exactly once.
    pub fn new<I>(tables: I) -> Result<Self, ReconcileError>
    where
        I: IntoIterator<Item = NormalizedTable>,
    {
        let mut map = BTreeMap::new();
        for table in tables {
            let kind = table.kind();
            if map.insert(kind, table).is_some() {
                return Err(ReconcileError::DuplicateTable(kind));
            }
        }
        if let Some(kind) = SourceKind::all().into_iter().find(|k| !map.contains_key(k)) {
            return Err(ReconcileError::MissingTable(kind));
        }
        Ok(Self { tables: map })
    }

    /// Table of one source.
    pub fn get(&self, kind: SourceKind) -> &NormalizedTable {
        // Construction guarantees every kind is present.
        &self.tables[&kind]
    }

    /// Tables in declaration order of [`SourceKind`].
    pub fn iter(&self) -> impl Iterator<Item = &NormalizedTable> {
        self.tables.values()
    }
}

/// One table with every value coerced to `f64`, keyed by region.
struct CoercedTable<'a> {
    kind: SourceKind,
    values: BTreeMap<&'a RegionKey, (&'a str, f64)>,
}

fn coerce_table(table: &NormalizedTable) -> Result<CoercedTable<'_>, ReconcileError> {
    let format = table.number_format();
    let mut values = BTreeMap::new();
    for record in table.records() {
        let value =
            format
                .parse(record.metric_value())
                .map_err(|source| ReconcileError::Coercion {
                    kind: table.kind(),
                    region: record.region_name().to_string(),
                    value: record.metric_value().to_string(),
                    source,
                })?;
        values.insert(record.key(), (record.region_name(), value));
    }
    Ok(CoercedTable {
        kind: table.kind(),
        values,
    })
}

/// Reconcile the four tables into one record per region present in all.
///
/// Every value in every table is coerced first; a value that does not parse
/// under its source's number format fails the whole reconciliation. Output
/// records and gaps are sorted by region key.
pub fn reconcile(tables: &SourceTables) -> Result<Reconciliation, ReconcileError> {
    let gdp = coerce_table(tables.get(SourceKind::Gdp))?;
    let unemployment = coerce_table(tables.get(SourceKind::Unemployment))?;
    let wages = coerce_table(tables.get(SourceKind::Wages))?;
    let population = coerce_table(tables.get(SourceKind::Population))?;
    // Same order as SourceKind::join_order().
    let coerced = [&gdp, &unemployment, &wages, &population];

    // Every key in any table, with its display name from the first table
    // in join order that has it.
    let mut regions: BTreeMap<&RegionKey, &str> = BTreeMap::new();
    for table in coerced {
        for (key, (name, _)) in &table.values {
            regions.entry(*key).or_insert(*name);
        }
    }

    let mut records = Vec::new();
    let mut gaps = Vec::new();

    for (key, name) in regions {
        match (
            gdp.values.get(key),
            unemployment.values.get(key),
            wages.values.get(key),
            population.values.get(key),
        ) {
            (Some((_, g)), Some((_, u)), Some((_, w)), Some((_, p))) => {
                records.push(ReconciledRecord {
                    voivodeship: name.to_string(),
                    gdp_per_capita_pln: *g,
                    unemployment_rate: *u,
                    average_gross_wage: *w,
                    population_total: *p,
                });
            }
            _ => {
                let (present_in, missing_from): (Vec<_>, Vec<_>) = coerced
                    .into_iter()
                    .partition(|t| t.values.contains_key(key));
                let gap = JoinGap {
                    region: name.to_string(),
                    present_in: present_in.iter().map(|t| t.kind).collect(),
                    missing_from: missing_from.iter().map(|t| t.kind).collect(),
                };
                warn!(region = %gap.region, missing_from = ?gap.missing_from, "Region dropped by join");
                gaps.push(gap);
            }
        }
    }

    info!(
        reconciled = records.len(),
        dropped = gaps.len(),
        "Reconciled sources"
    );
    Ok(Reconciliation { records, gaps })
}
