//! Harness configuration
//!
//! A [`HarnessConfig`] can be built in code, loaded from a TOML file, or
//! assembled from command-line flags (the CLI loads a file first and lets
//! flags override it).
//!
//! # Example
//!
//! ```toml
//! db_type = "sqlite"
//! database = "stress.db"
//! data_dir = "/var/lib/rowcheck"
//! rows = 1000000
//! workers = 8
//! batch_size = 100
//! extra_columns = 2
//! ```

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::database::DbError;
use crate::error::{EngineError, Result};

/// Upper bound on extra payload columns.
pub const MAX_EXTRA_COLUMNS: usize = 1000;

/// Database backend selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DbType {
    /// Embedded SQLite file
    #[default]
    Sqlite,
    /// MySQL server
    Mysql,
    /// PostgreSQL server
    Postgres,
}

impl fmt::Display for DbType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DbType::Sqlite => "sqlite",
            DbType::Mysql => "mysql",
            DbType::Postgres => "postgres",
        };
        f.write_str(name)
    }
}

impl FromStr for DbType {
    type Err = DbError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sqlite" | "sqlite3" => Ok(DbType::Sqlite),
            "mysql" => Ok(DbType::Mysql),
            "postgres" | "postgresql" => Ok(DbType::Postgres),
            _ => Err(DbError::UnknownType(s.to_string())),
        }
    }
}

/// Everything a run needs to know.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Backend to drive
    pub db_type: DbType,
    /// Server host (network backends)
    pub host: String,
    /// Server port (network backends)
    pub port: u16,
    /// User name (network backends)
    pub user: String,
    /// Password (network backends)
    pub password: String,
    /// Database name (created on MySQL if missing), or file path for SQLite
    /// (relative to `data_dir`)
    pub database: String,
    /// Directory holding archives, the ledger and relative SQLite files
    pub data_dir: PathBuf,
    /// Rows to insert; zero runs until interrupted
    pub rows: u64,
    /// Concurrent workers; zero is treated as one
    pub workers: usize,
    /// Rows per claim and per INSERT; zero is treated as one
    pub batch_size: u64,
    /// Extra payload columns beyond `uuid`
    pub extra_columns: usize,
    /// Pause after each batch, in milliseconds
    pub insert_delay_ms: u64,
    /// Run the insertion phase
    pub insert_data: bool,
    /// Run the verification phase
    pub check_data: bool,
    /// SQL script run before the table is prepared
    pub front_sql: Option<PathBuf>,
    /// SQL script run after all phases
    pub post_sql: Option<PathBuf>,
    /// Text appended to `CREATE TABLE`, e.g. `WITHOUT ROWID`
    pub table_options: String,
    /// Report wall-clock time of the phases
    pub time_consume: bool,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            db_type: DbType::Sqlite,
            host: "127.0.0.1".to_string(),
            port: 3306,
            user: "root".to_string(),
            password: String::new(),
            database: "rowcheck.db".to_string(),
            data_dir: PathBuf::from("."),
            rows: 0,
            workers: 1,
            batch_size: 1,
            extra_columns: 0,
            insert_delay_ms: 0,
            insert_data: true,
            check_data: true,
            front_sql: None,
            post_sql: None,
            table_options: String::new(),
            time_consume: false,
        }
    }
}

impl HarnessConfig {
    /// Parse a TOML document. Missing keys take their defaults.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }

    /// Load a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| EngineError::ConfigFile {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Apply the "zero means one" rules for workers and batch size.
    pub fn normalized(mut self) -> Self {
        self.workers = self.workers.max(1);
        self.batch_size = self.batch_size.max(1);
        self
    }

    /// Reject configurations that cannot run.
    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(EngineError::InvalidConfig("workers must be at least 1".into()));
        }
        if self.batch_size == 0 {
            return Err(EngineError::InvalidConfig(
                "batch_size must be at least 1".into(),
            ));
        }
        if self.extra_columns > MAX_EXTRA_COLUMNS {
            return Err(EngineError::InvalidConfig(format!(
                "extra_columns {} exceeds maximum {}",
                self.extra_columns, MAX_EXTRA_COLUMNS
            )));
        }
        if self.database.is_empty() {
            return Err(EngineError::InvalidConfig("database must not be empty".into()));
        }
        if self.db_type == DbType::Mysql && self.password.is_empty() {
            return Err(EngineError::InvalidConfig(
                "password is required for mysql".into(),
            ));
        }
        if !self.insert_data && !self.check_data {
            tracing::warn!(target: "rowcheck::config", "Both insert_data and check_data are disabled");
        }
        Ok(())
    }

    /// SQLite file path: `database` resolved against `data_dir`.
    pub fn database_path(&self) -> PathBuf {
        let db = Path::new(&self.database);
        if db.is_absolute() {
            db.to_path_buf()
        } else {
            self.data_dir.join(db)
        }
    }

    /// Pause after each batch.
    pub fn insert_delay(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.insert_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = HarnessConfig::default();
        assert_eq!(cfg.db_type, DbType::Sqlite);
        assert_eq!(cfg.workers, 1);
        assert_eq!(cfg.batch_size, 1);
        assert_eq!(cfg.rows, 0);
        assert!(cfg.insert_data);
        assert!(cfg.check_data);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_from_toml_partial() {
        let cfg = HarnessConfig::from_toml_str(
            r#"
            db_type = "sqlite"
            rows = 500
            workers = 4
            extra_columns = 2
            front_sql = "front.sql"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.rows, 500);
        assert_eq!(cfg.workers, 4);
        assert_eq!(cfg.extra_columns, 2);
        assert_eq!(cfg.front_sql, Some(PathBuf::from("front.sql")));
        assert_eq!(cfg.batch_size, 1);
    }

    #[test]
    fn test_from_toml_rejects_unknown_backend() {
        assert!(HarnessConfig::from_toml_str("db_type = \"oracle\"").is_err());
    }

    #[test]
    fn test_normalized_zero_means_one() {
        let cfg = HarnessConfig {
            workers: 0,
            batch_size: 0,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
        let cfg = cfg.normalized();
        assert_eq!(cfg.workers, 1);
        assert_eq!(cfg.batch_size, 1);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_too_many_extra_columns() {
        let cfg = HarnessConfig {
            extra_columns: MAX_EXTRA_COLUMNS + 1,
            ..Default::default()
        };
        assert!(matches!(cfg.validate(), Err(EngineError::InvalidConfig(_))));
    }

    #[test]
    fn test_mysql_requires_password() {
        let cfg = HarnessConfig {
            db_type: DbType::Mysql,
            database: "rowcheck".into(),
            ..Default::default()
        };
        assert!(matches!(cfg.validate(), Err(EngineError::InvalidConfig(_))));
        let cfg = HarnessConfig {
            password: "secret".into(),
            ..cfg
        };
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_db_type_parse() {
        assert_eq!("MySQL".parse::<DbType>().unwrap(), DbType::Mysql);
        assert_eq!("sqlite".parse::<DbType>().unwrap(), DbType::Sqlite);
        assert_eq!("PostgreSQL".parse::<DbType>().unwrap(), DbType::Postgres);
        assert!(matches!(
            "oracle".parse::<DbType>(),
            Err(DbError::UnknownType(_))
        ));
    }

    #[test]
    fn test_database_path_resolution() {
        let cfg = HarnessConfig {
            data_dir: PathBuf::from("/data"),
            database: "x.db".into(),
            ..Default::default()
        };
        assert_eq!(cfg.database_path(), PathBuf::from("/data/x.db"));

        let cfg = HarnessConfig {
            database: "/abs/y.db".into(),
            ..cfg
        };
        assert_eq!(cfg.database_path(), PathBuf::from("/abs/y.db"));
    }
}
