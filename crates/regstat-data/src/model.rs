//! Core record and table types shared by every pipeline stage.

use crate::error::{ConfigError, ExtractError};
use crate::number::{NumberFormat, looks_numeric};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

/// Name of the region column in every staged and reconciled table.
pub const REGION_COLUMN: &str = "voivodeship";

/// The four statistical sources feeding the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// GDP per capita in PLN (regional accounts)
    Gdp,

    /// Resident population
    Population,

    /// Registered unemployment rate in percent
    Unemployment,

    /// Average gross monthly wage
    Wages,
}

impl SourceKind {
    /// Returns all source kinds in declaration order.
    pub const fn all() -> [Self; 4] {
        [Self::Gdp, Self::Population, Self::Unemployment, Self::Wages]
    }

    /// Order in which sources are intersected during reconciliation.
    ///
    /// The result of an inner join does not depend on it; it only decides
    /// which source provides the display name of a region.
    pub const fn join_order() -> [Self; 4] {
        [Self::Gdp, Self::Unemployment, Self::Wages, Self::Population]
    }

    /// Column name of this source's metric in staged and reconciled tables.
    pub const fn metric_column(&self) -> &'static str {
        match self {
            Self::Gdp => "gdp_per_capita_pln",
            Self::Population => "population_total",
            Self::Unemployment => "unemployment_rate",
            Self::Wages => "average_gross_wage",
        }
    }

    /// Stem of the staged file name, completed with the reporting period.
    pub const fn staging_stem(&self) -> &'static str {
        match self {
            Self::Gdp => "gdp_per_capita",
            Self::Population => "population",
            Self::Unemployment => "unemployment_rate",
            Self::Wages => "average_gross_wage",
        }
    }

    /// Short identifier used in configuration and on the command line.
    pub const fn id(&self) -> &'static str {
        match self {
            Self::Gdp => "gdp",
            Self::Population => "population",
            Self::Unemployment => "unemployment",
            Self::Wages => "wages",
        }
    }

    /// Human readable name.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Gdp => "GDP per capita",
            Self::Population => "Population",
            Self::Unemployment => "Unemployment rate",
            Self::Wages => "Average gross wage",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for SourceKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gdp" => Ok(Self::Gdp),
            "population" => Ok(Self::Population),
            "unemployment" => Ok(Self::Unemployment),
            "wages" => Ok(Self::Wages),
            other => Err(ConfigError::UnknownSource(other.to_string())),
        }
    }
}

/// Clean a raw region label for display.
///
/// Collapses whitespace runs, drops spacing around hyphens and strips
/// trailing footnote markers such as `*`, `a)` or `(1)`.
pub fn clean_region_label(raw: &str) -> String {
    let mut tokens: Vec<&str> = raw.split_whitespace().collect();

    while let Some(&last) = tokens.last() {
        let stripped = last.trim_end_matches('*');
        if stripped.len() != last.len() {
            tokens.pop();
            if !stripped.is_empty() {
                tokens.push(stripped);
            }
        } else if tokens.len() > 1 && is_footnote_marker(last) {
            tokens.pop();
        } else {
            break;
        }
    }

    tokens.join(" ").replace(" -", "-").replace("- ", "-")
}

fn is_footnote_marker(token: &str) -> bool {
    let Some(inner) = token.strip_suffix(')') else {
        return false;
    };
    let inner = inner.strip_prefix('(').unwrap_or(inner);
    !inner.is_empty() && inner.len() <= 2 && inner.chars().all(|c| c.is_ascii_alphanumeric())
}

/// Normalized join key of a region.
///
/// Two labels refer to the same region when their keys are equal, regardless
/// of case, whitespace or footnote markers.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RegionKey(String);

impl RegionKey {
    /// Derive the key of a raw label.
    pub fn new(label: &str) -> Self {
        Self(clean_region_label(label).to_lowercase())
    }

    /// The normalized key text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RegionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One region's metric as read from a single source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionMetricRecord {
    key: RegionKey,
    region_name: String,
    metric_value: String,
}

impl RegionMetricRecord {
    /// Create a record from a region label and the metric cell text.
    pub fn new(region_name: impl AsRef<str>, metric_value: impl AsRef<str>) -> Self {
        let region_name = clean_region_label(region_name.as_ref());
        Self {
            key: RegionKey(region_name.to_lowercase()),
            region_name,
            metric_value: metric_value.as_ref().trim().to_string(),
        }
    }

    /// Join key of this record.
    pub const fn key(&self) -> &RegionKey {
        &self.key
    }

    /// Cleaned region label.
    pub fn region_name(&self) -> &str {
        &self.region_name
    }

    /// Metric cell text, formatted as in the source.
    pub fn metric_value(&self) -> &str {
        &self.metric_value
    }
}

/// The output of one extractor: unique regions sorted by key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedTable {
    kind: SourceKind,
    number_format: NumberFormat,
    records: Vec<RegionMetricRecord>,
}

impl NormalizedTable {
    /// Build a table from records, enforcing the table invariants.
    ///
    /// Records are sorted by region key. Blank names, non-numeric values and
    /// repeated regions are rejected, as is an empty record set.
    pub fn from_records(
        kind: SourceKind,
        number_format: NumberFormat,
        mut records: Vec<RegionMetricRecord>,
    ) -> Result<Self, ExtractError> {
        let mut seen = HashSet::with_capacity(records.len());
        for record in &records {
            if record.region_name.is_empty() {
                return Err(ExtractError::InvalidRecord {
                    kind,
                    region: record.region_name.clone(),
                    reason: "region name is blank".to_string(),
                });
            }
            if !looks_numeric(&record.metric_value) {
                return Err(ExtractError::InvalidRecord {
                    kind,
                    region: record.region_name.clone(),
                    reason: format!("metric value {:?} is not numeric", record.metric_value),
                });
            }
            if !seen.insert(record.key.clone()) {
                return Err(ExtractError::DuplicateRegion {
                    kind,
                    region: record.region_name.clone(),
                });
            }
        }

        if records.is_empty() {
            return Err(ExtractError::EmptyResult {
                kind,
                header_skip: 0,
            });
        }

        records.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(Self {
            kind,
            number_format,
            records,
        })
    }

    /// Source this table was extracted from.
    pub const fn kind(&self) -> SourceKind {
        self.kind
    }

    /// Number format of the metric values.
    pub const fn number_format(&self) -> NumberFormat {
        self.number_format
    }

    /// Records sorted by region key.
    pub fn records(&self) -> &[RegionMetricRecord] {
        &self.records
    }

    /// Number of regions.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the table has no regions. Never true for a constructed table.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Look up a region by key.
    pub fn get(&self, key: &RegionKey) -> Option<&RegionMetricRecord> {
        self.records
            .binary_search_by(|r| r.key.cmp(key))
            .ok()
            .map(|i| &self.records[i])
    }

    /// Two-column frame view: region name and the metric text.
    pub fn to_frame(&self) -> PolarsResult<DataFrame> {
        let names: Vec<&str> = self.records.iter().map(|r| r.region_name()).collect();
        let values: Vec<&str> = self.records.iter().map(|r| r.metric_value()).collect();
        DataFrame::new(vec![
            Series::new(REGION_COLUMN.into(), names).into(),
            Series::new(self.kind.metric_column().into(), values).into(),
        ])
    }
}

/// One region present in every source, with all four metrics coerced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciledRecord {
    /// Region display name
    pub voivodeship: String,

    /// GDP per capita in PLN
    pub gdp_per_capita_pln: f64,

    /// Registered unemployment rate in percent
    pub unemployment_rate: f64,

    /// Average gross monthly wage
    pub average_gross_wage: f64,

    /// Resident population
    pub population_total: f64,
}

impl ReconciledRecord {
    /// Column names of the destination schema, in order.
    pub const COLUMNS: [&'static str; 5] = [
        REGION_COLUMN,
        "gdp_per_capita_pln",
        "unemployment_rate",
        "average_gross_wage",
        "population_total",
    ];

    /// Join key of the region, the identity of the record in the destination.
    pub fn key(&self) -> RegionKey {
        RegionKey::new(&self.voivodeship)
    }

    /// The four metrics in schema order.
    pub const fn metrics(&self) -> [f64; 4] {
        [
            self.gdp_per_capita_pln,
            self.unemployment_rate,
            self.average_gross_wage,
            self.population_total,
        ]
    }
}

/// A region that appears in some sources but not all of them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinGap {
    /// Region display name, from the first source that has it
    pub region: String,

    /// Sources that contain the region
    pub present_in: Vec<SourceKind>,

    /// Sources that lack the region
    pub missing_from: Vec<SourceKind>,
}

impl fmt::Display for JoinGap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let missing: Vec<&str> = self.missing_from.iter().map(SourceKind::id).collect();
        write!(f, "{} (missing from {})", self.region, missing.join(", "))
    }
}

/// The result of reconciling four normalized tables.
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciliation {
    /// Regions present in every source, sorted by region key
    pub records: Vec<ReconciledRecord>,

    /// Regions excluded by the inner join, sorted by region key
    pub gaps: Vec<JoinGap>,
}

impl Reconciliation {
    /// Number of reconciled regions.
    pub fn region_count(&self) -> usize {
        self.records.len()
    }

    /// Number of regions dropped by the join.
    pub fn dropped_count(&self) -> usize {
        self.gaps.len()
    }

    /// Wide frame with the destination schema.
    pub fn to_frame(&self) -> PolarsResult<DataFrame> {
        records_to_frame(&self.records)
    }
}

/// Build a wide frame with the destination schema from reconciled records.
pub fn records_to_frame(records: &[ReconciledRecord]) -> PolarsResult<DataFrame> {
    let names: Vec<&str> = records.iter().map(|r| r.voivodeship.as_str()).collect();
    let column = |f: fn(&ReconciledRecord) -> f64| -> Vec<f64> { records.iter().map(f).collect() };

    DataFrame::new(vec![
        Series::new(REGION_COLUMN.into(), names).into(),
        Series::new("gdp_per_capita_pln".into(), column(|r| r.gdp_per_capita_pln)).into(),
        Series::new("unemployment_rate".into(), column(|r| r.unemployment_rate)).into(),
        Series::new("average_gross_wage".into(), column(|r| r.average_gross_wage)).into(),
        Series::new("population_total".into(), column(|r| r.population_total)).into(),
    ])
}
