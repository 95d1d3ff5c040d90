//! Integration tests for extracting builtin-layout sheet exports.

use regstat_data::source::builtin_source;
use regstat_data::staging::{read_table_file, write_table_file};
use regstat_data::{Extractor, NumberFormat, RegionKey, SourceKind};
use std::fs;
use std::path::Path;

/// A wages sheet shaped like the Statistics Poland export: eleven title and
/// header rows, a re-stated section header and a sub-aggregate row.
const WAGES_SHEET: &str = "\
TABLE 1(47). AVERAGE MONTHLY GROSS WAGES AND SALARIES,,
BY VOIVODSHIPS,,
,,
,,
,,
,,
,,
WYSZCZEGÓLNIENIE,2023,
SPECIFICATION,,
,,
POLSKA,7155.48,
WOJEWÓDZTWA / VOIVODSHIPS,,
Dolnośląskie,7423.98,
Kujawsko-pomorskie,6342.10,
Lubuskie,6455.71,
Mazowieckie,8896.30,
Of which: Warszawa,9980.20,
Opolskie,6512.03,
Podkarpackie,x,
Śląskie,7337.09,
Dolnośląskie,0,
";

fn write_sheet(dir: &Path, name: &str, content: &str) {
    fs::write(dir.join(name), content).unwrap();
}

#[test]
fn test_extract_builtin_wages_layout() {
    let dir = tempfile::tempdir().unwrap();
    let config = builtin_source(SourceKind::Wages);
    write_sheet(dir.path(), config.file.to_str().unwrap(), WAGES_SHEET);

    let extractor = Extractor::new(config).unwrap();
    let table = extractor.extract_file(dir.path()).unwrap();

    let names: Vec<&str> = table.records().iter().map(|r| r.region_name()).collect();
    assert_eq!(
        names,
        [
            "Dolnośląskie",
            "Kujawsko-pomorskie",
            "Lubuskie",
            "Mazowieckie",
            "Opolskie",
            "Śląskie"
        ]
    );

    let dolnoslaskie = table.get(&RegionKey::new("dolnośląskie")).unwrap();
    assert_eq!(dolnoslaskie.metric_value(), "7423.98");
    assert!(table.get(&RegionKey::new("Polska")).is_none());
    assert!(table.get(&RegionKey::new("Podkarpackie")).is_none());
}

#[test]
fn test_extract_stage_and_reload() {
    let dir = tempfile::tempdir().unwrap();
    let config = builtin_source(SourceKind::Wages);
    write_sheet(dir.path(), config.file.to_str().unwrap(), WAGES_SHEET);

    let extractor = Extractor::new(config).unwrap();
    let table = extractor.extract_file(dir.path()).unwrap();

    let staged = dir.path().join("processed").join("average_gross_wage_2023.csv");
    write_table_file(&table, &staged).unwrap();
    let reloaded = read_table_file(SourceKind::Wages, NumberFormat::Point, &staged).unwrap();

    assert_eq!(reloaded, table);
}

#[test]
fn test_unemployment_column_h() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = builtin_source(SourceKind::Unemployment);
    config.header_skip = 1;
    config.number_format = NumberFormat::Comma;

    write_sheet(
        dir.path(),
        config.file.to_str().unwrap(),
        "Region,a,b,c,d,e,f,rate\nOpolskie,1,2,3,4,5,6,\"5,9\"\nLubuskie,1,2,3,4,5,6,\"4,7\"\n",
    );

    let table = Extractor::new(config).unwrap().extract_file(dir.path()).unwrap();
    assert_eq!(table.len(), 2);
    assert_eq!(table.records()[0].metric_value(), "4,7");
}
