//! Testing table layout and the SQL that touches it
//!
//! ```text
//! rowcheck_test(id BIGINT PRIMARY KEY, uuid CHAR(36), uuid_extra_0 CHAR(36), ..., uuid_extra_{k-1} CHAR(36))
//! ```
//!
//! Statement builders are pure so they can be tested without a database.

use rowcheck_core::Entry;

use crate::database::{Connection, DbError, DbResult, Row, SqlValue};
use crate::error::{EngineError, Result};

/// Name of the testing table.
pub const TABLE_NAME: &str = "rowcheck_test";

/// Columns every table has besides the extra payload columns.
pub const FIXED_COLUMNS: usize = 2;

/// Name of extra payload column `i`.
pub fn extra_column_name(i: usize) -> String {
    format!("uuid_extra_{}", i)
}

/// Column names in table order.
pub fn column_names(extra_columns: usize) -> Vec<String> {
    let mut names = Vec::with_capacity(extra_columns + FIXED_COLUMNS);
    names.push("id".to_string());
    names.push("uuid".to_string());
    names.extend((0..extra_columns).map(extra_column_name));
    names
}

/// `CREATE TABLE` statement, with `options` appended after the column list.
pub fn create_table_sql(extra_columns: usize, options: &str) -> String {
    let mut sql = format!(
        "CREATE TABLE IF NOT EXISTS {} (id BIGINT NOT NULL PRIMARY KEY, uuid CHAR(36) NOT NULL",
        TABLE_NAME
    );
    for i in 0..extra_columns {
        sql.push_str(&format!(", {} CHAR(36) NOT NULL", extra_column_name(i)));
    }
    sql.push(')');
    let options = options.trim();
    if !options.is_empty() {
        sql.push(' ');
        sql.push_str(options);
    }
    sql
}

fn quote_literal(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

/// One multi-row `INSERT` covering every entry of a batch.
///
/// All entries must carry the same number of extra fields.
pub fn insert_sql(entries: &[Entry]) -> String {
    let extra = entries.first().map_or(0, Entry::extra_count);
    let mut sql = format!("INSERT INTO {} ({})", TABLE_NAME, column_names(extra).join(", "));
    sql.push_str(" VALUES ");
    for (i, entry) in entries.iter().enumerate() {
        if i > 0 {
            sql.push_str(", ");
        }
        sql.push_str(&format!("({}, {}", entry.id, quote_literal(&entry.uuid)));
        for value in &entry.extra_uuid {
            sql.push_str(", ");
            sql.push_str(&quote_literal(value));
        }
        sql.push(')');
    }
    sql
}

/// Point lookup by id with one bound parameter.
pub fn select_by_id_sql(extra_columns: usize) -> String {
    format!(
        "SELECT {} FROM {} WHERE id = ?",
        column_names(extra_columns).join(", "),
        TABLE_NAME
    )
}

/// Largest id in the table.
pub fn max_id_sql() -> String {
    format!("SELECT id FROM {} ORDER BY id DESC LIMIT 1", TABLE_NAME)
}

/// Create the table if missing, else check its column count.
pub fn prepare_table(
    conn: &mut dyn Connection,
    extra_columns: usize,
    table_options: &str,
) -> Result<()> {
    if !conn.table_exists(TABLE_NAME)? {
        conn.execute(&create_table_sql(extra_columns, table_options))?;
        tracing::info!(target: "rowcheck::schema", table = TABLE_NAME, extra_columns, "Created testing table");
        return Ok(());
    }

    let columns = conn.column_count(TABLE_NAME)?;
    if columns != extra_columns + FIXED_COLUMNS {
        let table_extra = columns.saturating_sub(FIXED_COLUMNS);
        tracing::error!(
            target: "rowcheck::schema",
            table_extra,
            configured_extra = extra_columns,
            "Extra column count differs between table and configuration"
        );
        return Err(EngineError::SchemaMismatch {
            table_extra,
            configured_extra: extra_columns,
        });
    }
    Ok(())
}

/// Largest id in the table, `None` when it is empty.
pub fn max_id(conn: &mut dyn Connection) -> DbResult<Option<u64>> {
    let Some(row) = conn.query_row(&max_id_sql(), &[])? else {
        return Ok(None);
    };
    match row.into_iter().next() {
        Some(value) => value
            .as_u64()
            .map(Some)
            .ok_or_else(|| DbError::UnexpectedValue {
                column: "id".into(),
                value,
            }),
        None => Ok(None),
    }
}

/// Fetch the row with `id`, values in table column order.
pub fn fetch_row(conn: &mut dyn Connection, sql: &str, id: u64) -> DbResult<Option<Row>> {
    conn.query_row(sql, &[SqlValue::try_from(id)?])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{Database, SqliteDatabase};
    use tempfile::TempDir;

    #[test]
    fn test_fetch_row_rejects_unbindable_id() {
        let dir = TempDir::new().unwrap();
        let mut conn = SqliteDatabase::new(dir.path().join("s.db")).connect().unwrap();
        prepare_table(conn.as_mut(), 0, "").unwrap();
        let sql = select_by_id_sql(0);

        assert_eq!(fetch_row(conn.as_mut(), &sql, 1).unwrap(), None);
        assert!(matches!(
            fetch_row(conn.as_mut(), &sql, u64::MAX),
            Err(DbError::UnexpectedValue { .. })
        ));
    }

    #[test]
    fn test_create_table_sql() {
        assert_eq!(
            create_table_sql(0, ""),
            "CREATE TABLE IF NOT EXISTS rowcheck_test (id BIGINT NOT NULL PRIMARY KEY, uuid CHAR(36) NOT NULL)"
        );
        let sql = create_table_sql(2, " WITHOUT ROWID ");
        assert!(sql.contains("uuid_extra_0 CHAR(36) NOT NULL, uuid_extra_1 CHAR(36) NOT NULL)"));
        assert!(sql.ends_with(") WITHOUT ROWID"));
    }

    #[test]
    fn test_insert_sql_batches_rows() {
        let entries = vec![
            Entry::new(4, "a", vec!["x".into()]),
            Entry::new(5, "b", vec!["y".into()]),
        ];
        assert_eq!(
            insert_sql(&entries),
            "INSERT INTO rowcheck_test (id, uuid, uuid_extra_0) VALUES (4, 'a', 'x'), (5, 'b', 'y')"
        );
    }

    #[test]
    fn test_insert_sql_escapes_quotes() {
        let entries = vec![Entry::new(1, "it's", vec![])];
        assert!(insert_sql(&entries).ends_with("(1, 'it''s')"));
    }

    #[test]
    fn test_select_sql() {
        assert_eq!(
            select_by_id_sql(1),
            "SELECT id, uuid, uuid_extra_0 FROM rowcheck_test WHERE id = ?"
        );
        assert_eq!(
            max_id_sql(),
            "SELECT id FROM rowcheck_test ORDER BY id DESC LIMIT 1"
        );
    }
}
