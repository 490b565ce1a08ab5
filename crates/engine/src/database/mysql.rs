//! MySQL backend via the `mysql` driver
//!
//! Opening the backend bootstraps the target database: the server's
//! `lower_case_table_names` setting decides how the configured name is
//! compared against `SHOW DATABASES`, and a missing database is created.
//! Worker connections then select that database as their default schema.
//!
//! Row-returning queries go through the binary protocol so that integer
//! columns come back as integers rather than text.

use ::mysql::prelude::Queryable;
use ::mysql::{Conn, Opts, OptsBuilder, Params, Row as MysqlRow, Value};

use super::{Connection, Database, DbError, DbResult, Row, SqlValue};
use crate::config::{DbType, HarnessConfig};

/// MySQL server and the database the harness works in.
#[derive(Debug, Clone)]
pub struct MysqlDatabase {
    opts: Opts,
}

impl MysqlDatabase {
    /// Connect to the server, create the configured database if it is
    /// missing, and remember the options worker connections use.
    pub fn open(config: &HarnessConfig) -> DbResult<Self> {
        let server = OptsBuilder::new()
            .ip_or_hostname(Some(config.host.clone()))
            .tcp_port(config.port)
            .user(Some(config.user.clone()))
            .pass(Some(config.password.clone()));

        let mut conn = Conn::new(server.clone())?;
        ensure_database(&mut conn, &config.database)?;

        tracing::info!(
            target: "rowcheck::db",
            host = %config.host,
            port = config.port,
            database = %config.database,
            "Connected to MySQL"
        );
        Ok(Self {
            opts: Opts::from(server.db_name(Some(config.database.clone()))),
        })
    }
}

impl Database for MysqlDatabase {
    fn db_type(&self) -> DbType {
        DbType::Mysql
    }

    fn connect(&self) -> DbResult<Box<dyn Connection>> {
        let conn = Conn::new(self.opts.clone())?;
        Ok(Box::new(MysqlConnection { conn }))
    }
}

fn quote_ident(ident: &str) -> String {
    format!("`{}`", ident.replace('`', "``"))
}

/// Name the server will report for `database` under `lower_case_table_names`.
fn stored_name(database: &str, lower_case_setting: Option<&str>) -> DbResult<String> {
    match lower_case_setting {
        Some("0") => Ok(database.to_string()),
        Some("1") => Ok(database.to_lowercase()),
        other => Err(DbError::Bootstrap(format!(
            "unexpected lower_case_table_names: {:?}",
            other
        ))),
    }
}

fn ensure_database(conn: &mut Conn, database: &str) -> DbResult<()> {
    let variable: Option<(String, String)> =
        conn.query_first("SHOW VARIABLES LIKE 'lower_case_table_names'")?;
    let setting = variable
        .as_ref()
        .filter(|(name, _)| name == "lower_case_table_names")
        .map(|(_, value)| value.as_str());
    let wanted = stored_name(database, setting)?;

    let existing: Vec<String> = conn.query("SHOW DATABASES")?;
    if existing.iter().any(|name| *name == wanted) {
        tracing::info!(target: "rowcheck::db", database, "Database exists");
        return Ok(());
    }
    conn.query_drop(format!("CREATE DATABASE {}", quote_ident(database)))?;
    tracing::info!(target: "rowcheck::db", database, "Created database");
    Ok(())
}

struct MysqlConnection {
    conn: Conn,
}

fn to_mysql_value(value: &SqlValue) -> Value {
    match value {
        SqlValue::Null => Value::NULL,
        SqlValue::Integer(i) => Value::Int(*i),
        SqlValue::Text(s) => Value::Bytes(s.as_bytes().to_vec()),
    }
}

fn to_sql_value(value: Value) -> SqlValue {
    match value {
        Value::NULL => SqlValue::Null,
        Value::Int(i) => SqlValue::Integer(i),
        Value::UInt(u) => match i64::try_from(u) {
            Ok(i) => SqlValue::Integer(i),
            Err(_) => SqlValue::Text(u.to_string()),
        },
        Value::Bytes(bytes) => SqlValue::Text(String::from_utf8_lossy(&bytes).into_owned()),
        other => SqlValue::Text(other.as_sql(false)),
    }
}

fn to_params(params: &[SqlValue]) -> Params {
    if params.is_empty() {
        Params::Empty
    } else {
        Params::Positional(params.iter().map(to_mysql_value).collect())
    }
}

fn read_row(row: MysqlRow) -> Row {
    (0..row.len())
        .map(|i| row.as_ref(i).cloned().map_or(SqlValue::Null, to_sql_value))
        .collect()
}

impl Connection for MysqlConnection {
    fn execute(&mut self, sql: &str) -> DbResult<u64> {
        self.conn.query_drop(sql)?;
        Ok(self.conn.affected_rows())
    }

    fn query_row(&mut self, sql: &str, params: &[SqlValue]) -> DbResult<Option<Row>> {
        let row: Option<MysqlRow> = self.conn.exec_first(sql, to_params(params))?;
        Ok(row.map(read_row))
    }

    fn query_rows(&mut self, sql: &str) -> DbResult<Vec<Row>> {
        let rows: Vec<MysqlRow> = self.conn.exec(sql, Params::Empty)?;
        Ok(rows.into_iter().map(read_row).collect())
    }

    fn table_exists(&mut self, table: &str) -> DbResult<bool> {
        let row = self.query_row(
            "SELECT table_name FROM information_schema.tables \
             WHERE table_schema = DATABASE() AND table_name = ?",
            &[SqlValue::from(table)],
        )?;
        Ok(row.is_some())
    }

    fn column_count(&mut self, table: &str) -> DbResult<usize> {
        let row = self.query_row(
            "SELECT COUNT(*) FROM information_schema.columns \
             WHERE table_schema = DATABASE() AND table_name = ?",
            &[SqlValue::from(table)],
        )?;
        match row.and_then(|r| r.into_iter().next()) {
            Some(value) => value
                .as_u64()
                .map(|n| n as usize)
                .ok_or(DbError::UnexpectedValue {
                    column: "COUNT(*)".into(),
                    value,
                }),
            None => Ok(0),
        }
    }
}
