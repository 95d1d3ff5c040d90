//! Builtin source catalogue.
//!
//! Layouts of the Statistics Poland 2023 regional tables, used when no
//! pipeline configuration file is given.

use super::{ColumnRef, SourceConfig};
use crate::model::SourceKind;
use crate::number::NumberFormat;

/// Region labels that mark aggregate or header rows rather than a region.
///
/// National totals, re-stated section headers ("by voivodeship") and
/// sub-aggregates ("of which").
pub const DEFAULT_EXCLUSIONS: &[&str] = &[
    r"\b(polska|poland)\b",
    r"\bwojew[oó]dztw|\bvoivode?ships?\b",
    r"\b(of which|w tym)\b",
];

/// Get the builtin layout of one source.
pub fn builtin_source(kind: SourceKind) -> SourceConfig {
    let (file, sheet, header_skip, value_column) = match kind {
        SourceKind::Gdp => ("regional_accounts_2023.csv", "1(148)", 10, 3),
        SourceKind::Population => ("population_2023.csv", "15 (33)", 10, 1),
        SourceKind::Unemployment => ("labour_market_2023.csv", "1(34)", 13, 7),
        SourceKind::Wages => ("wages_and_salaries_2023.csv", "1(47)", 11, 1),
    };

    SourceConfig {
        kind,
        file: file.into(),
        sheet: sheet.to_string(),
        header_skip,
        region_column: ColumnRef::new(0),
        value_column: ColumnRef::new(value_column),
        number_format: NumberFormat::Point,
        exclude: DEFAULT_EXCLUSIONS.iter().map(ToString::to_string).collect(),
    }
}

/// Get the builtin layouts of all sources.
pub fn builtin_sources() -> Vec<SourceConfig> {
    SourceKind::all().into_iter().map(builtin_source).collect()
}
