//! Insertion and verification pipelines for rowcheck
//!
//! - `config`: run configuration (HarnessConfig)
//! - `database`: database capability and backends
//! - `schema`: testing table bootstrap and statements
//! - `script`: front/post SQL scripts
//! - `context`: shared state of one run (RunContext)
//! - `insert`: insertion pipeline
//! - `verify`: verification pipeline
//! - `harness`: orchestration of a whole run

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod context;
pub mod database;
pub mod error;
pub mod harness;
pub mod insert;
pub mod schema;
pub mod script;
pub mod verify;

pub use config::{DbType, HarnessConfig, MAX_EXTRA_COLUMNS};
pub use context::RunContext;
pub use database::{open_database, Connection, Database, DbError, SqlValue, SqliteDatabase};
#[cfg(feature = "mysql")]
pub use database::MysqlDatabase;
pub use error::{EngineError, Result};
pub use harness::{run, Harness, HarnessReport};
pub use insert::{reconcile, run_insert, synthesize_entry, InsertReport, ResumeState};
pub use schema::TABLE_NAME;
pub use script::run_sql_script;
pub use verify::{compare_row, run_verify, VerifyFailure, VerifyReport};
