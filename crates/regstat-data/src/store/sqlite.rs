//! SQLite destination for the reconciled dataset.

use super::{LoadError, LoadOutcome, LoadPolicy};
use crate::config::validate_identifier;
use crate::model::{ReconciledRecord, records_to_frame};
use polars::prelude::DataFrame;
use rusqlite::{Connection, params};
use std::path::Path;
use tracing::info;

/// SQLite store holding one reconciled dataset table.
#[derive(Debug)]
pub struct SqliteStore {
    conn: Connection,
    table: String,
}

impl SqliteStore {
    /// Open (or create) a database file and ensure the table exists.
    ///
    /// # Arguments
    /// * `path` - Path to the SQLite database file
    /// * `table` - Destination table name, a plain SQL identifier
    pub fn new<P: AsRef<Path>>(path: P, table: &str) -> Result<Self, LoadError> {
        validate_identifier(table)?;
        if let Some(parent) = path.as_ref().parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        let store = Self {
            conn,
            table: table.to_string(),
        };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Create an in-memory store (useful for testing).
    pub fn in_memory(table: &str) -> Result<Self, LoadError> {
        validate_identifier(table)?;
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn,
            table: table.to_string(),
        };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Destination table name.
    pub fn table(&self) -> &str {
        &self.table
    }

    fn initialize_schema(&self) -> Result<(), LoadError> {
        self.conn.execute(
            &format!(
                "CREATE TABLE IF NOT EXISTS {} (
                    region_key TEXT PRIMARY KEY,
                    voivodeship TEXT NOT NULL,
                    gdp_per_capita_pln REAL NOT NULL,
                    unemployment_rate REAL NOT NULL,
                    average_gross_wage REAL NOT NULL,
                    population_total REAL NOT NULL
                )",
                self.table
            ),
            [],
        )?;
        Ok(())
    }

    /// Number of rows in the table.
    pub fn row_count(&self) -> Result<usize, LoadError> {
        let count: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", self.table),
            [],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    /// Write all records in a single transaction.
    ///
    /// Rows are identified by the normalized region key, so a label that
    /// differs only in case or spacing refers to the same row.
    ///
    /// Either every record is written or none is: any failure rolls the
    /// transaction back, including rows removed under
    /// [`LoadPolicy::Replace`].
    pub fn load(
        &self,
        records: &[ReconciledRecord],
        policy: LoadPolicy,
    ) -> Result<LoadOutcome, LoadError> {
        validate_records(records)?;

        let tx = self.conn.unchecked_transaction()?;

        let existing: i64 = tx.query_row(
            &format!("SELECT COUNT(*) FROM {}", self.table),
            [],
            |row| row.get(0),
        )?;
        let existing = existing as usize;

        let removed = match policy {
            LoadPolicy::Reject if existing > 0 => {
                return Err(LoadError::DestinationNotEmpty {
                    table: self.table.clone(),
                    rows: existing,
                });
            }
            LoadPolicy::Replace => tx.execute(&format!("DELETE FROM {}", self.table), [])?,
            LoadPolicy::Reject | LoadPolicy::Upsert => 0,
        };

        let verb = match policy {
            LoadPolicy::Upsert => "INSERT OR REPLACE",
            LoadPolicy::Reject | LoadPolicy::Replace => "INSERT",
        };
        {
            let mut stmt = tx.prepare(&format!(
                "{verb} INTO {} (region_key, voivodeship, gdp_per_capita_pln,
                    unemployment_rate, average_gross_wage, population_total)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                self.table
            ))?;

            for (row_index, record) in records.iter().enumerate() {
                stmt.execute(params![
                    record.key().as_str(),
                    record.voivodeship,
                    record.gdp_per_capita_pln,
                    record.unemployment_rate,
                    record.average_gross_wage,
                    record.population_total,
                ])
                .map_err(|source| LoadError::Write {
                    region: record.voivodeship.clone(),
                    row_index,
                    source,
                })?;
            }
        }

        let total: i64 = tx.query_row(
            &format!("SELECT COUNT(*) FROM {}", self.table),
            [],
            |row| row.get(0),
        )?;
        tx.commit()?;

        let outcome = LoadOutcome {
            written: records.len(),
            removed,
            total: total as usize,
        };
        info!(
            table = %self.table,
            %policy,
            written = outcome.written,
            removed = outcome.removed,
            total = outcome.total,
            "Loaded reconciled records"
        );
        Ok(outcome)
    }

    /// Read every row back, ordered by region key.
    pub fn read_records(&self) -> Result<Vec<ReconciledRecord>, LoadError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT voivodeship, gdp_per_capita_pln, unemployment_rate,
                    average_gross_wage, population_total
             FROM {}
             ORDER BY region_key ASC",
            self.table
        ))?;

        let records = stmt
            .query_map([], |row| {
                Ok(ReconciledRecord {
                    voivodeship: row.get(0)?,
                    gdp_per_capita_pln: row.get(1)?,
                    unemployment_rate: row.get(2)?,
                    average_gross_wage: row.get(3)?,
                    population_total: row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(records)
    }

    /// Read every row back as a frame with the destination schema.
    pub fn read_frame(&self) -> Result<DataFrame, LoadError> {
        let records = self.read_records()?;
        Ok(records_to_frame(&records)?)
    }

    /// Delete every row.
    pub fn clear(&self) -> Result<usize, LoadError> {
        Ok(self
            .conn
            .execute(&format!("DELETE FROM {}", self.table), [])?)
    }
}

/// Reject values SQLite would not store faithfully before touching the table.
fn validate_records(records: &[ReconciledRecord]) -> Result<(), LoadError> {
    for record in records {
        for (i, value) in record.metrics().into_iter().enumerate() {
            if !value.is_finite() {
                return Err(LoadError::InvalidValue {
                    region: record.voivodeship.clone(),
                    field_index: i + 1,
                    field: ReconciledRecord::COLUMNS[i + 1],
                    value,
                });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const TABLE: &str = "regional_economic_data_2023";

    fn record(name: &str, gdp: f64) -> ReconciledRecord {
        ReconciledRecord {
            voivodeship: name.to_string(),
            gdp_per_capita_pln: gdp,
            unemployment_rate: 5.1,
            average_gross_wage: 7123.45,
            population_total: 2_891_321.0,
        }
    }

    #[test]
    fn test_store_initialization() {
        let store = SqliteStore::in_memory(TABLE).unwrap();
        assert_eq!(store.row_count().unwrap(), 0);
    }

    #[test]
    fn test_invalid_table_name() {
        assert!(matches!(
            SqliteStore::in_memory("x; DROP TABLE y"),
            Err(LoadError::Config(_))
        ));
    }

    #[test]
    fn test_round_trip() {
        let store = SqliteStore::in_memory(TABLE).unwrap();
        let records = vec![record("Dolnośląskie", 104_123.4), record("Lubuskie", 65_432.1)];

        let outcome = store.load(&records, LoadPolicy::Reject).unwrap();
        assert_eq!(outcome.written, 2);
        assert_eq!(outcome.total, 2);

        let read = store.read_records().unwrap();
        assert_eq!(read.len(), 2);
        for (a, b) in records.iter().zip(&read) {
            assert_eq!(a.voivodeship, b.voivodeship);
            for (x, y) in a.metrics().into_iter().zip(b.metrics()) {
                assert_relative_eq!(x, y, epsilon = 1e-6);
            }
        }
    }

    #[test]
    fn test_reject_policy_on_populated_table() {
        let store = SqliteStore::in_memory(TABLE).unwrap();
        store.load(&[record("Opolskie", 1.0)], LoadPolicy::Reject).unwrap();

        let err = store
            .load(&[record("Opolskie", 2.0)], LoadPolicy::Reject)
            .unwrap_err();
        assert!(matches!(err, LoadError::DestinationNotEmpty { rows: 1, .. }));
        assert_eq!(store.row_count().unwrap(), 1);
    }

    #[test]
    fn test_replace_policy() {
        let store = SqliteStore::in_memory(TABLE).unwrap();
        store
            .load(&[record("Opolskie", 1.0), record("Lubuskie", 1.0)], LoadPolicy::Reject)
            .unwrap();

        let outcome = store.load(&[record("Opolskie", 2.0)], LoadPolicy::Replace).unwrap();
        assert_eq!(outcome.removed, 2);
        assert_eq!(outcome.total, 1);
        assert_relative_eq!(store.read_records().unwrap()[0].gdp_per_capita_pln, 2.0);
    }

    #[test]
    fn test_upsert_policy() {
        let store = SqliteStore::in_memory(TABLE).unwrap();
        store
            .load(&[record("Opolskie", 1.0), record("Lubuskie", 1.0)], LoadPolicy::Reject)
            .unwrap();

        let outcome = store.load(&[record("Opolskie", 3.0)], LoadPolicy::Upsert).unwrap();
        assert_eq!(outcome.total, 2);

        let read = store.read_records().unwrap();
        let opolskie = read.iter().find(|r| r.voivodeship == "Opolskie").unwrap();
        assert_relative_eq!(opolskie.gdp_per_capita_pln, 3.0);
    }

    #[test]
    fn test_upsert_matches_recased_label() {
        let store = SqliteStore::in_memory(TABLE).unwrap();
        store.load(&[record("Opolskie", 1.0)], LoadPolicy::Reject).unwrap();

        let outcome = store
            .load(&[record("OPOLSKIE ", 2.0)], LoadPolicy::Upsert)
            .unwrap();
        assert_eq!(outcome.total, 1);

        let read = store.read_records().unwrap();
        assert_eq!(read.len(), 1);
        assert_relative_eq!(read[0].gdp_per_capita_pln, 2.0);
    }

    #[test]
    fn test_batch_with_recased_duplicate_fails() {
        let store = SqliteStore::in_memory(TABLE).unwrap();
        let err = store
            .load(
                &[record("Lubuskie", 1.0), record("LUBUSKIE", 2.0)],
                LoadPolicy::Reject,
            )
            .unwrap_err();
        assert!(matches!(err, LoadError::Write { row_index: 1, .. }));
        assert_eq!(store.row_count().unwrap(), 0);
    }

    #[test]
    fn test_failed_write_rolls_back() {
        let store = SqliteStore::in_memory(TABLE).unwrap();
        store.load(&[record("Opolskie", 1.0)], LoadPolicy::Reject).unwrap();

        let err = store
            .load(
                &[record("Lubuskie", 1.0), record("Lubuskie", 2.0)],
                LoadPolicy::Replace,
            )
            .unwrap_err();
        match err {
            LoadError::Write {
                region, row_index, ..
            } => {
                assert_eq!(region, "Lubuskie");
                assert_eq!(row_index, 1);
            }
            other => panic!("unexpected error: {other}"),
        }

        let read = store.read_records().unwrap();
        assert_eq!(read.len(), 1);
        assert_eq!(read[0].voivodeship, "Opolskie");
    }

    #[test]
    fn test_non_finite_value_rejected() {
        let store = SqliteStore::in_memory(TABLE).unwrap();
        let mut bad = record("Opolskie", 1.0);
        bad.average_gross_wage = f64::NAN;

        let err = store.load(&[bad], LoadPolicy::Reject).unwrap_err();
        assert!(matches!(
            err,
            LoadError::InvalidValue {
                field_index: 3,
                field: "average_gross_wage",
                ..
            }
        ));
        assert_eq!(store.row_count().unwrap(), 0);
    }

    #[test]
    fn test_read_frame() {
        let store = SqliteStore::in_memory(TABLE).unwrap();
        store.load(&[record("Opolskie", 1.0)], LoadPolicy::Reject).unwrap();

        let df = store.read_frame().unwrap();
        assert_eq!(df.height(), 1);
        assert_eq!(df.width(), 5);
    }

    #[test]
    fn test_file_store_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db").join("regstat.db");

        {
            let store = SqliteStore::new(&path, TABLE).unwrap();
            store.load(&[record("Opolskie", 1.0)], LoadPolicy::Reject).unwrap();
        }

        let store = SqliteStore::new(&path, TABLE).unwrap();
        assert_eq!(store.row_count().unwrap(), 1);
    }
}
