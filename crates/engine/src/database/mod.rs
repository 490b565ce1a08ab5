//! Database capability
//!
//! The harness never talks to a concrete driver. It needs exactly:
//! - open one connection per worker,
//! - execute a statement,
//! - fetch one row (with bound parameters) or all rows of a query,
//! - a little schema introspection (does a table exist, how many columns).
//!
//! Backends implement [`Database`] and [`Connection`]. SQLite is always
//! built; MySQL needs the `mysql` feature. Backends that are not built in
//! report [`DbError::Unsupported`] when opened rather than being silently
//! ignored.

#[cfg(feature = "mysql")]
mod mysql;
mod sqlite;

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{DbType, HarnessConfig};

#[cfg(feature = "mysql")]
pub use self::mysql::MysqlDatabase;
pub use sqlite::SqliteDatabase;

/// Result type for database operations
pub type DbResult<T> = std::result::Result<T, DbError>;

/// One row, values in select-list order.
pub type Row = Vec<SqlValue>;

/// Errors from a database backend.
#[derive(Debug, Error)]
pub enum DbError {
    /// The backend is recognised but has no driver.
    #[error("database type {0} is not supported")]
    Unsupported(DbType),

    /// The backend name is not recognised.
    #[error("unknown db type: {0}")]
    UnknownType(String),

    /// SQLite driver error.
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// MySQL driver error.
    #[cfg(feature = "mysql")]
    #[error("mysql: {0}")]
    Mysql(#[from] ::mysql::Error),

    /// The server could not be prepared for a run.
    #[cfg(feature = "mysql")]
    #[error("database bootstrap failed: {0}")]
    Bootstrap(String),

    /// A column held a value of an unexpected kind.
    #[error("unexpected value in column {column}: {value}")]
    UnexpectedValue {
        /// Column name or position
        column: String,
        /// Value found
        value: SqlValue,
    },
}

/// A value crossing the driver boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SqlValue {
    /// SQL NULL
    Null,
    /// Integer value
    Integer(i64),
    /// Text value
    Text(String),
}

impl SqlValue {
    /// Text content, if this is a text value.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            SqlValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Non-negative integer content.
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            SqlValue::Integer(i) => u64::try_from(*i).ok(),
            _ => None,
        }
    }
}

impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlValue::Null => f.write_str("NULL"),
            SqlValue::Integer(i) => write!(f, "{}", i),
            SqlValue::Text(s) => write!(f, "'{}'", s),
        }
    }
}

impl TryFrom<u64> for SqlValue {
    type Error = DbError;

    /// BIGINT keys are signed; ids above `i64::MAX` cannot be bound.
    fn try_from(v: u64) -> DbResult<Self> {
        i64::try_from(v)
            .map(SqlValue::Integer)
            .map_err(|_| DbError::UnexpectedValue {
                column: "id".into(),
                value: SqlValue::Text(v.to_string()),
            })
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        SqlValue::Text(v.to_string())
    }
}

/// A database the harness can open connections to.
pub trait Database: Send + Sync {
    /// Backend kind.
    fn db_type(&self) -> DbType;

    /// Open a new connection. Each worker owns one.
    fn connect(&self) -> DbResult<Box<dyn Connection>>;
}

/// One open connection.
pub trait Connection: Send {
    /// Execute a statement that returns no rows; returns rows affected.
    fn execute(&mut self, sql: &str) -> DbResult<u64>;

    /// Fetch the first row of a query with bound parameters.
    fn query_row(&mut self, sql: &str, params: &[SqlValue]) -> DbResult<Option<Row>>;

    /// Fetch every row of a query.
    fn query_rows(&mut self, sql: &str) -> DbResult<Vec<Row>>;

    /// True if `table` exists in the current database.
    fn table_exists(&mut self, table: &str) -> DbResult<bool>;

    /// Number of columns of `table`.
    fn column_count(&mut self, table: &str) -> DbResult<usize>;

    /// Start a transaction.
    fn begin(&mut self) -> DbResult<()> {
        self.execute("BEGIN").map(|_| ())
    }

    /// Commit the current transaction.
    fn commit(&mut self) -> DbResult<()> {
        self.execute("COMMIT").map(|_| ())
    }

    /// Roll back the current transaction.
    fn rollback(&mut self) -> DbResult<()> {
        self.execute("ROLLBACK").map(|_| ())
    }
}

/// Open the backend named by `config.db_type`.
pub fn open_database(config: &HarnessConfig) -> DbResult<Arc<dyn Database>> {
    match config.db_type {
        DbType::Sqlite => Ok(Arc::new(SqliteDatabase::new(config.database_path()))),
        #[cfg(feature = "mysql")]
        DbType::Mysql => Ok(Arc::new(MysqlDatabase::open(config)?)),
        other => {
            tracing::error!(target: "rowcheck::db", db_type = %other, "Database type not supported");
            Err(DbError::Unsupported(other))
        }
    }
}
