//! Front and post SQL scripts
//!
//! A script holds one statement per line. Blank lines and lines starting
//! with `--` are skipped. The whole script runs in one transaction; the
//! first failing line rolls it back.

use std::path::Path;

use crate::database::Connection;
use crate::error::{EngineError, Result};

/// Statements of a script with their 1-based line numbers.
pub fn parse_script(text: &str) -> Vec<(usize, &str)> {
    text.lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty() && !line.starts_with("--"))
        .collect()
}

/// Run the script at `path` in a single transaction.
///
/// Returns the number of statements executed.
pub fn run_sql_script(conn: &mut dyn Connection, path: &Path) -> Result<usize> {
    let text = std::fs::read_to_string(path).map_err(|source| EngineError::ScriptRead {
        path: path.to_path_buf(),
        source,
    })?;
    let statements = parse_script(&text);

    conn.begin()?;
    for &(line, sql) in &statements {
        if let Err(source) = conn.execute(sql) {
            tracing::error!(
                target: "rowcheck::script",
                path = %path.display(),
                line,
                error = %source,
                "SQL script statement failed"
            );
            if let Err(e) = conn.rollback() {
                tracing::warn!(target: "rowcheck::script", error = %e, "Rollback failed");
            }
            return Err(EngineError::Script {
                path: path.to_path_buf(),
                line,
                source,
            });
        }
    }
    conn.commit()?;

    tracing::info!(
        target: "rowcheck::script",
        path = %path.display(),
        statements = statements.len(),
        "Executed SQL script"
    );
    Ok(statements.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{Database, SqliteDatabase};
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_parse_skips_comments_and_blanks() {
        let text = "-- setup\nCREATE TABLE a (x INT)\n\n  INSERT INTO a VALUES (1)  \n--done\n";
        assert_eq!(
            parse_script(text),
            vec![(2, "CREATE TABLE a (x INT)"), (4, "INSERT INTO a VALUES (1)")]
        );
    }

    #[test]
    fn test_script_commits() {
        let dir = TempDir::new().unwrap();
        let db = SqliteDatabase::new(dir.path().join("s.db"));
        let mut conn = db.connect().unwrap();
        let script = dir.path().join("front.sql");
        fs::write(&script, "CREATE TABLE a (x INT)\nINSERT INTO a VALUES (1)\n").unwrap();

        assert_eq!(run_sql_script(conn.as_mut(), &script).unwrap(), 2);
        assert_eq!(conn.query_rows("SELECT x FROM a").unwrap().len(), 1);
    }

    #[test]
    fn test_failing_line_rolls_back() {
        let dir = TempDir::new().unwrap();
        let db = SqliteDatabase::new(dir.path().join("s.db"));
        let mut conn = db.connect().unwrap();
        conn.execute("CREATE TABLE a (x INT)").unwrap();
        let script = dir.path().join("bad.sql");
        fs::write(&script, "INSERT INTO a VALUES (1)\nINSERT INTO missing VALUES (2)\n").unwrap();

        match run_sql_script(conn.as_mut(), &script) {
            Err(EngineError::Script { line, .. }) => assert_eq!(line, 2),
            other => panic!("expected script error, got {:?}", other),
        }
        assert!(conn.query_rows("SELECT x FROM a").unwrap().is_empty());
    }

    #[test]
    fn test_missing_script() {
        let dir = TempDir::new().unwrap();
        let db = SqliteDatabase::new(dir.path().join("s.db"));
        let mut conn = db.connect().unwrap();
        let result = run_sql_script(conn.as_mut(), &dir.path().join("nope.sql"));
        assert!(matches!(result, Err(EngineError::ScriptRead { .. })));
    }
}
