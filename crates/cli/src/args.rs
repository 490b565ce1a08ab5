use std::path::PathBuf;

use clap::Parser;
use rowcheck_engine::{DbType, HarnessConfig};

/// Concurrent insert-and-verify stress harness.
///
/// Settings come from `--config` when given; every flag below overrides the
/// file.
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "rowcheck", version)]
pub struct Args {
    /// TOML configuration file.
    #[arg(long, short = 'c')]
    pub config: Option<PathBuf>,

    /// Type of the tested database: sqlite, or mysql when built with the
    /// `mysql` feature. postgres is recognised but has no driver.
    #[arg(long)]
    pub db_type: Option<DbType>,

    /// Host of the tested database.
    #[arg(long)]
    pub host: Option<String>,

    /// Port of the tested database.
    #[arg(long)]
    pub port: Option<u16>,

    /// User of the tested database.
    #[arg(long)]
    pub user: Option<String>,

    /// Password of the tested database (required for mysql).
    #[arg(long)]
    pub password: Option<String>,

    /// Database name, or SQLite file path.
    #[arg(long = "db")]
    pub database: Option<String>,

    /// Directory for archives and the progress ledger.
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Rows to insert (0 runs until interrupted).
    #[arg(long)]
    pub rows: Option<u64>,

    /// Concurrent workers (0 and 1 both mean one).
    #[arg(long, alias = "routine-num")]
    pub workers: Option<usize>,

    /// Rows per insert statement (0 and 1 both mean one).
    #[arg(long, alias = "insert-package")]
    pub batch_size: Option<u64>,

    /// Extra uuid columns in the testing table.
    #[arg(long, alias = "extra-column-num")]
    pub extra_columns: Option<usize>,

    /// Pause after each insert, in milliseconds.
    #[arg(long, alias = "insert-delay")]
    pub insert_delay_ms: Option<u64>,

    /// Run the insertion phase.
    #[arg(long)]
    pub insert_data: Option<bool>,

    /// Run the verification phase.
    #[arg(long)]
    pub check_data: Option<bool>,

    /// SQL script run before testing.
    #[arg(long)]
    pub front_sql: Option<PathBuf>,

    /// SQL script run after testing.
    #[arg(long)]
    pub post_sql: Option<PathBuf>,

    /// Text appended to CREATE TABLE.
    #[arg(long, alias = "unique-syntax")]
    pub table_options: Option<String>,

    /// Report the time the phases took.
    #[arg(long)]
    pub time_consume: bool,

    /// Write the run report as JSON to this file.
    #[arg(long)]
    pub report: Option<PathBuf>,

    /// Write logs to this file instead of stdout.
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

macro_rules! override_field {
    ($cfg:ident, $args:ident, $($field:ident),+ $(,)?) => {
        $(
            if let Some(value) = $args.$field.clone() {
                $cfg.$field = value;
            }
        )+
    };
}

impl Args {
    /// Load the config file, if any, and apply flag overrides.
    pub fn to_config(&self) -> anyhow::Result<HarnessConfig> {
        let mut config = match &self.config {
            Some(path) => HarnessConfig::from_file(path)?,
            None => HarnessConfig::default(),
        };
        self.apply(&mut config);
        Ok(config.normalized())
    }

    fn apply(&self, config: &mut HarnessConfig) {
        let args = self;
        override_field!(
            config,
            args,
            db_type,
            host,
            port,
            user,
            password,
            database,
            data_dir,
            rows,
            workers,
            batch_size,
            extra_columns,
            insert_delay_ms,
            insert_data,
            check_data,
            table_options,
        );
        if let Some(path) = &self.front_sql {
            config.front_sql = Some(path.clone());
        }
        if let Some(path) = &self.post_sql {
            config.post_sql = Some(path.clone());
        }
        if self.time_consume {
            config.time_consume = true;
        }
    }
}
