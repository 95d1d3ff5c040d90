//! Integration tests for dataset export and the run summary.

use regstat_data::model::{JoinGap, ReconciledRecord, Reconciliation, SourceKind};
use regstat_data::store::{LoadPolicy, SqliteStore};
use regstat_output::{ExportFormat, Exporter, LoadSummary, RunSummary, read_records_file};

fn reconciliation() -> Reconciliation {
    Reconciliation {
        records: vec![
            ReconciledRecord {
                voivodeship: "Dolnośląskie".to_string(),
                gdp_per_capita_pln: 104_123.5,
                unemployment_rate: 4.1,
                average_gross_wage: 7423.98,
                population_total: 2_891_321.0,
            },
            ReconciledRecord {
                voivodeship: "Mazowieckie".to_string(),
                gdp_per_capita_pln: 159_800.0,
                unemployment_rate: 4.3,
                average_gross_wage: 8896.3,
                population_total: 5_514_699.0,
            },
        ],
        gaps: vec![JoinGap {
            region: "Podkarpackie".to_string(),
            present_in: vec![SourceKind::Gdp, SourceKind::Unemployment, SourceKind::Population],
            missing_from: vec![SourceKind::Wages],
        }],
    }
}

#[test]
fn test_exported_dataset_loads_into_store() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("regional_economic_data_2023.csv");
    let reconciliation = reconciliation();

    reconciliation.export_to_file(&path, ExportFormat::Csv).unwrap();
    let records = read_records_file(&path).unwrap();
    assert_eq!(records, reconciliation.records);

    let store = SqliteStore::in_memory("regional_economic_data_2023").unwrap();
    let outcome = store.load(&records, LoadPolicy::Reject).unwrap();
    assert_eq!(outcome.total, 2);
    assert_eq!(store.read_records().unwrap(), records);
}

#[test]
fn test_full_run_summary() {
    let reconciliation = reconciliation();
    let store = SqliteStore::in_memory("regional_economic_data_2023").unwrap();
    let outcome = store
        .load(&reconciliation.records, LoadPolicy::Reject)
        .unwrap();

    let summary = RunSummary::new(
        "2023",
        SourceKind::all().map(|kind| (kind, if kind == SourceKind::Wages { 2 } else { 3 })),
        &reconciliation,
    )
    .with_load(LoadSummary::new(store.table(), LoadPolicy::Reject, outcome));

    let text = summary.to_ascii_table();
    assert!(text.contains("Podkarpackie (missing from wages)"));
    assert!(text.contains("Loaded 2 rows"));

    let json: serde_json::Value =
        serde_json::from_str(&summary.export_to_string(ExportFormat::Json).unwrap()).unwrap();
    assert_eq!(json["reconciled"], 2);
    assert_eq!(json["load"]["policy"], "reject");
    assert_eq!(json["dropped"][0]["missing_from"][0], "wages");
}
