//! SQLite backend via rusqlite
//!
//! Every worker opens its own connection to the same database file.
//! Connections use WAL journaling and a busy timeout so that concurrent
//! writers queue on the write lock instead of failing immediately.

use std::path::{Path, PathBuf};
use std::time::Duration;

use rusqlite::types::{ToSqlOutput, ValueRef};
use rusqlite::{params_from_iter, ToSql};

use super::{Connection, Database, DbResult, Row, SqlValue};
use crate::config::DbType;

/// How long a connection waits on a locked database before failing.
pub const BUSY_TIMEOUT: Duration = Duration::from_secs(30);

/// SQLite database file.
#[derive(Debug, Clone)]
pub struct SqliteDatabase {
    path: PathBuf,
}

impl SqliteDatabase {
    /// Database at `path`; the file is created on first connect.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Database file path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Database for SqliteDatabase {
    fn db_type(&self) -> DbType {
        DbType::Sqlite
    }

    fn connect(&self) -> DbResult<Box<dyn Connection>> {
        let conn = rusqlite::Connection::open(&self.path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.execute_batch("PRAGMA journal_mode = WAL; PRAGMA synchronous = NORMAL;")?;
        Ok(Box::new(SqliteConnection { conn }))
    }
}

struct SqliteConnection {
    conn: rusqlite::Connection,
}

impl ToSql for SqlValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            SqlValue::Null => ToSqlOutput::Borrowed(ValueRef::Null),
            SqlValue::Integer(i) => ToSqlOutput::Borrowed(ValueRef::Integer(*i)),
            SqlValue::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
        })
    }
}

fn to_sql_value(value: ValueRef<'_>) -> SqlValue {
    match value {
        ValueRef::Null => SqlValue::Null,
        ValueRef::Integer(i) => SqlValue::Integer(i),
        ValueRef::Real(f) => SqlValue::Text(f.to_string()),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
            SqlValue::Text(String::from_utf8_lossy(bytes).into_owned())
        }
    }
}

fn read_row(row: &rusqlite::Row<'_>, columns: usize) -> rusqlite::Result<Row> {
    (0..columns)
        .map(|i| row.get_ref(i).map(to_sql_value))
        .collect()
}

impl Connection for SqliteConnection {
    fn execute(&mut self, sql: &str) -> DbResult<u64> {
        Ok(self.conn.execute(sql, [])? as u64)
    }

    fn query_row(&mut self, sql: &str, params: &[SqlValue]) -> DbResult<Option<Row>> {
        let mut stmt = self.conn.prepare_cached(sql)?;
        let columns = stmt.column_count();
        let mut rows = stmt.query(params_from_iter(params.iter()))?;
        match rows.next()? {
            Some(row) => Ok(Some(read_row(row, columns)?)),
            None => Ok(None),
        }
    }

    fn query_rows(&mut self, sql: &str) -> DbResult<Vec<Row>> {
        let mut stmt = self.conn.prepare(sql)?;
        let columns = stmt.column_count();
        let rows = stmt.query_map([], |row| read_row(row, columns))?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn table_exists(&mut self, table: &str) -> DbResult<bool> {
        let row = self.query_row(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?1",
            &[SqlValue::from(table)],
        )?;
        Ok(row.is_some())
    }

    fn column_count(&mut self, table: &str) -> DbResult<usize> {
        let quoted = format!("\"{}\"", table.replace('"', "\"\""));
        Ok(self
            .query_rows(&format!("PRAGMA table_info({})", quoted))?
            .len())
    }
}
