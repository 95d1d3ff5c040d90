//! End-to-end pipeline runs over builtin-layout sheet exports.

use approx::assert_relative_eq;
use regstat::{Pipeline, Stage};
use regstat_data::config::PipelineConfig;
use regstat_data::model::SourceKind;
use regstat_data::store::{LoadPolicy, SqliteStore};
use std::fs;
use std::path::Path;

/// Render a sheet export: `skip` title rows, then one row per region with the
/// label in column A and the value in `value_column`.
fn sheet(skip: usize, value_column: usize, rows: &[(&str, &str)]) -> String {
    let width = value_column + 1;
    let mut out = String::new();
    for i in 0..skip {
        let mut cells = vec![String::new(); width];
        cells[0] = format!("title row {i}");
        out.push_str(&cells.join(","));
        out.push('\n');
    }
    for (region, value) in rows {
        let mut cells = vec!["\"\"".to_string(); width];
        cells[0] = format!("\"{region}\"");
        cells[value_column] = format!("\"{value}\"");
        out.push_str(&cells.join(","));
        out.push('\n');
    }
    out
}

fn write_sources(raw: &Path, unemployment: &[(&str, &str)]) {
    fs::create_dir_all(raw).unwrap();
    fs::write(
        raw.join("regional_accounts_2023.csv"),
        sheet(
            10,
            3,
            &[
                ("POLSKA", "94000"),
                ("Dolnośląskie", "104123.5"),
                ("Lubuskie", "70210"),
                ("Opolskie", "72100"),
            ],
        ),
    )
    .unwrap();
    fs::write(
        raw.join("population_2023.csv"),
        sheet(
            10,
            1,
            &[
                ("Polska", "37636508"),
                ("Dolnośląskie", "2891321"),
                ("Lubuskie *", "973720"),
            ],
        ),
    )
    .unwrap();
    fs::write(raw.join("labour_market_2023.csv"), sheet(13, 7, unemployment)).unwrap();
    fs::write(
        raw.join("wages_and_salaries_2023.csv"),
        sheet(
            11,
            1,
            &[
                ("WOJEWÓDZTWA", ""),
                ("Dolnośląskie", "7423.98"),
                ("Lubuskie", "6455.71"),
                ("Opolskie", "6512.03"),
                ("Podkarpackie", "x"),
            ],
        ),
    )
    .unwrap();
}

const UNEMPLOYMENT: &[(&str, &str)] = &[
    ("Polska", "5.0"),
    ("Dolnośląskie", "4.1"),
    ("LUBUSKIE", "4.6"),
    ("Opolskie", "6.2"),
];

fn pipeline(dir: &Path) -> Pipeline {
    let mut config = PipelineConfig::default();
    config.paths.raw_dir = dir.join("raw");
    config.paths.staging_dir = dir.join("processed");
    Pipeline::new(config).unwrap()
}

#[test]
fn test_full_run() {
    let dir = tempfile::tempdir().unwrap();
    write_sources(&dir.path().join("raw"), UNEMPLOYMENT);
    let pipeline = pipeline(dir.path());
    let store = SqliteStore::in_memory(&pipeline.config().table_name()).unwrap();

    let summary = pipeline.run(&store, LoadPolicy::Reject).unwrap();

    assert_eq!(summary.reconciled, 2);
    assert_eq!(summary.dropped_count(), 1);
    assert_eq!(summary.dropped[0].region, "Opolskie");
    assert_eq!(summary.dropped[0].missing_from, vec![SourceKind::Population]);

    let rows: Vec<usize> = summary.source_rows.iter().map(|c| c.rows).collect();
    assert_eq!(rows, [3, 3, 3, 2]);

    let records = store.read_records().unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].voivodeship, "Dolnośląskie");
    assert_relative_eq!(records[0].gdp_per_capita_pln, 104_123.5);
    assert_relative_eq!(records[0].unemployment_rate, 4.1);
    assert_relative_eq!(records[0].average_gross_wage, 7423.98);
    assert_relative_eq!(records[0].population_total, 2_891_321.0);
    assert_eq!(records[1].voivodeship, "Lubuskie");

    for kind in SourceKind::all() {
        assert!(pipeline.config().staging_path(kind).exists());
    }
    assert!(pipeline.config().output_path().exists());
}

#[test]
fn test_staged_stages_match_in_process_run() {
    let dir = tempfile::tempdir().unwrap();
    write_sources(&dir.path().join("raw"), UNEMPLOYMENT);
    let pipeline = pipeline(dir.path());

    for table in pipeline.extract_all().unwrap() {
        pipeline.stage(&table).unwrap();
    }
    let tables = pipeline.read_all_staged().unwrap();
    let reconciliation = pipeline.reconcile(&tables).unwrap();
    pipeline.export(&reconciliation).unwrap();

    let records = pipeline.read_exported().unwrap();
    assert_eq!(records, reconciliation.records);

    let db = dir.path().join("db").join("regstat.db");
    let store = pipeline.open_store(&db).unwrap();
    let load = pipeline.load(&store, &records, LoadPolicy::Reject).unwrap();
    assert_eq!(load.written, 2);
    assert_eq!(load.table, "regional_economic_data_2023");
}

#[test]
fn test_rerun_respects_load_policy() {
    let dir = tempfile::tempdir().unwrap();
    write_sources(&dir.path().join("raw"), UNEMPLOYMENT);
    let pipeline = pipeline(dir.path());
    let store = SqliteStore::in_memory(&pipeline.config().table_name()).unwrap();

    pipeline.run(&store, LoadPolicy::Reject).unwrap();

    let err = pipeline.run(&store, LoadPolicy::Reject).unwrap_err();
    assert_eq!(err.stage(), Stage::Load);
    assert_eq!(store.row_count().unwrap(), 2);

    let summary = pipeline.run(&store, LoadPolicy::Replace).unwrap();
    let load = summary.load.unwrap();
    assert_eq!(load.removed, 2);
    assert_eq!(load.total, 2);
}

#[test]
fn test_coercion_failure_loads_nothing() {
    let dir = tempfile::tempdir().unwrap();
    write_sources(
        &dir.path().join("raw"),
        &[("Dolnośląskie", "4,1"), ("Lubuskie", "4.6")],
    );
    let pipeline = pipeline(dir.path());
    let store = SqliteStore::in_memory(&pipeline.config().table_name()).unwrap();

    let err = pipeline.run(&store, LoadPolicy::Reject).unwrap_err();
    assert_eq!(err.stage(), Stage::Reconcile);
    assert!(err.to_string().contains("4,1"));
    assert_eq!(store.row_count().unwrap(), 0);
}

#[test]
fn test_comma_format_from_config_file() {
    let dir = tempfile::tempdir().unwrap();
    write_sources(
        &dir.path().join("raw"),
        &[("Dolnośląskie", "4,1"), ("Lubuskie", "4,6"), ("Opolskie", "6,2")],
    );

    let config = PipelineConfig::from_toml_str(&format!(
        r#"
        [paths]
        raw_dir = {raw:?}
        staging_dir = {staging:?}

        [[source]]
        kind = "unemployment"
        file = "labour_market_2023.csv"
        sheet = "1(34)"
        header_skip = 13
        region_column = "A"
        value_column = "H"
        number_format = "comma"
        "#,
        raw = dir.path().join("raw").display().to_string(),
        staging = dir.path().join("processed").display().to_string(),
    ))
    .unwrap();
    let pipeline = Pipeline::new(config).unwrap();
    let store = SqliteStore::in_memory(&pipeline.config().table_name()).unwrap();

    pipeline.run(&store, LoadPolicy::Reject).unwrap();
    let records = store.read_records().unwrap();
    assert_relative_eq!(records[1].unemployment_rate, 4.6);
}

#[test]
fn test_wrong_header_skip_reports_format_error() {
    let dir = tempfile::tempdir().unwrap();
    let raw = dir.path().join("raw");
    write_sources(&raw, UNEMPLOYMENT);
    fs::write(raw.join("regional_accounts_2023.csv"), sheet(10, 3, &[])).unwrap();

    let err = pipeline(dir.path()).extract(SourceKind::Gdp).unwrap_err();
    assert_eq!(err.stage(), Stage::Extract);
}
