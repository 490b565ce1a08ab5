//! Harness orchestration
//!
//! A run executes, in order:
//!
//! 1. the front SQL script, if configured,
//! 2. the testing-table bootstrap,
//! 3. the insertion phase, if enabled,
//! 4. the verification phase, if enabled,
//! 5. the post SQL script, if configured.
//!
//! Any error in steps 1, 2 or 5 or in a phase's setup aborts the run.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use rowcheck_concurrency::StopFlag;
use serde::{Deserialize, Serialize};

use crate::config::HarnessConfig;
use crate::context::RunContext;
use crate::database::{open_database, Database};
use crate::error::Result;
use crate::insert::{run_insert, InsertReport};
use crate::schema;
use crate::script::run_sql_script;
use crate::verify::{run_verify, VerifyReport};

/// Outcome of a whole run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HarnessReport {
    /// Insertion outcome, if the phase ran
    pub insert: Option<InsertReport>,
    /// Verification outcome, if the phase ran
    pub verify: Option<VerifyReport>,
    /// Wall-clock seconds of the phases, if timing was requested
    pub elapsed_secs: Option<f64>,
    /// When the phases started
    pub started_at: Option<DateTime<Utc>>,
    /// When the phases finished
    pub finished_at: Option<DateTime<Utc>>,
}

impl HarnessReport {
    /// False only if verification ran and found defects.
    pub fn passed(&self) -> bool {
        self.verify.as_ref().map_or(true, VerifyReport::passed)
    }
}

/// A configured harness bound to a database and a data directory.
#[derive(Debug)]
pub struct Harness {
    ctx: RunContext,
}

impl Harness {
    /// Open the configured backend and data directory.
    pub fn new(config: HarnessConfig) -> Result<Self> {
        let config = config.normalized();
        config.validate()?;
        let database = open_database(&config)?;
        Self::with_database(config, database, StopFlag::new())
    }

    /// Use an already opened database and an externally owned stop flag.
    pub fn with_database(
        config: HarnessConfig,
        database: Arc<dyn Database>,
        stop: StopFlag,
    ) -> Result<Self> {
        Ok(Self {
            ctx: RunContext::open(config, database, stop)?,
        })
    }

    /// Handle that stops the insertion phase when set.
    pub fn stop_flag(&self) -> StopFlag {
        self.ctx.stop_flag().clone()
    }

    /// Run context.
    pub fn context(&self) -> &RunContext {
        &self.ctx
    }

    /// Execute every configured step.
    ///
    /// A harness runs once: reaching the row target raises its stop flag for
    /// good. Build a new one to run again over the same dataset.
    pub fn run(mut self) -> Result<HarnessReport> {
        let config = self.ctx.config().clone();
        let mut conn = self.ctx.database().connect()?;

        match &config.front_sql {
            Some(path) => {
                run_sql_script(conn.as_mut(), path)?;
            }
            None => tracing::debug!(target: "rowcheck::harness", "No front SQL"),
        }

        schema::prepare_table(conn.as_mut(), config.extra_columns, &config.table_options)?;

        let mut report = HarnessReport {
            started_at: Some(Utc::now()),
            ..Default::default()
        };
        let begin = Instant::now();
        if config.insert_data {
            report.insert = Some(run_insert(&mut self.ctx)?);
        }
        if config.check_data {
            report.verify = Some(run_verify(&mut self.ctx)?);
        }
        report.finished_at = Some(Utc::now());
        if config.time_consume {
            let secs = begin.elapsed().as_secs_f64();
            tracing::info!(target: "rowcheck::harness", secs, "Time consume");
            report.elapsed_secs = Some(secs);
        }

        match &config.post_sql {
            Some(path) => {
                run_sql_script(conn.as_mut(), path)?;
            }
            None => tracing::debug!(target: "rowcheck::harness", "No post SQL"),
        }
        Ok(report)
    }
}

/// Convenience: build a harness from `config` and run it once.
pub fn run(config: HarnessConfig) -> Result<HarnessReport> {
    Harness::new(config)?.run()
}
