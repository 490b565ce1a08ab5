//! Shared helpers for the end-to-end suite

use rowcheck::{Connection, Database, HarnessConfig, SqlValue, SqliteDatabase, TABLE_NAME};
use tempfile::TempDir;

/// Config rooted in `dir` with the given topology.
pub fn config(dir: &TempDir, rows: u64, workers: usize, batch_size: u64) -> HarnessConfig {
    HarnessConfig {
        data_dir: dir.path().to_path_buf(),
        database: "e2e.db".into(),
        rows,
        workers,
        batch_size,
        ..Default::default()
    }
}

/// Fresh connection to the config's database.
pub fn connect(cfg: &HarnessConfig) -> Box<dyn Connection> {
    SqliteDatabase::new(cfg.database_path()).connect().unwrap()
}

/// Every id in the table, ascending.
pub fn table_ids(cfg: &HarnessConfig) -> Vec<u64> {
    connect(cfg)
        .query_rows(&format!("SELECT id FROM {} ORDER BY id", TABLE_NAME))
        .unwrap()
        .into_iter()
        .map(|row| row[0].as_u64().unwrap())
        .collect()
}

/// Delete one row.
pub fn delete_row(cfg: &HarnessConfig, id: u64) {
    let deleted = connect(cfg)
        .execute(&format!("DELETE FROM {} WHERE id = {}", TABLE_NAME, id))
        .unwrap();
    assert_eq!(deleted, 1);
}

/// Overwrite the `uuid` column of one row.
pub fn overwrite_uuid(cfg: &HarnessConfig, id: u64, value: &str) {
    let mut conn = connect(cfg);
    conn.execute(&format!(
        "UPDATE {} SET uuid = '{}' WHERE id = {}",
        TABLE_NAME, value, id
    ))
    .unwrap();
    let row = conn
        .query_row(
            &format!("SELECT uuid FROM {} WHERE id = ?", TABLE_NAME),
            &[SqlValue::try_from(id).unwrap()],
        )
        .unwrap()
        .unwrap();
    assert_eq!(row[0].as_text(), Some(value));
}
