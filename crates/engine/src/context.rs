//! Run context
//!
//! Everything a run shares between phases and workers lives here instead of
//! in process globals: the configuration, the database handle, the stop
//! flag, the progress ledger and the per-worker archives. Several contexts
//! can coexist in one process, each over its own data directory.

use std::sync::Arc;

use rowcheck_concurrency::StopFlag;
use rowcheck_durability::{open_all, ArchiveLog, ProgressLedger};

use crate::config::HarnessConfig;
use crate::database::{Connection, Database};
use crate::error::{EngineError, Result};

/// Shared state of one harness run.
pub struct RunContext {
    config: HarnessConfig,
    database: Arc<dyn Database>,
    stop: StopFlag,
    ledger: ProgressLedger,
    archives: Vec<ArchiveLog>,
}

impl std::fmt::Debug for RunContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunContext")
            .field("db_type", &self.database.db_type())
            .field("data_dir", &self.config.data_dir)
            .field("workers", &self.archives.len())
            .field("stopped", &self.stop.is_set())
            .finish()
    }
}

impl RunContext {
    /// Create the data directory and open one archive per worker.
    ///
    /// The configuration is normalized and validated first.
    pub fn open(config: HarnessConfig, database: Arc<dyn Database>, stop: StopFlag) -> Result<Self> {
        let config = config.normalized();
        config.validate()?;

        std::fs::create_dir_all(&config.data_dir).map_err(|source| EngineError::DataDir {
            path: config.data_dir.clone(),
            source,
        })?;
        let archives = open_all(&config.data_dir, config.workers)?;
        let ledger = ProgressLedger::in_dir(&config.data_dir);

        tracing::debug!(
            target: "rowcheck::context",
            data_dir = %config.data_dir.display(),
            workers = config.workers,
            "Opened run context"
        );
        Ok(Self {
            config,
            database,
            stop,
            ledger,
            archives,
        })
    }

    /// Normalized configuration.
    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Database handle.
    pub fn database(&self) -> &Arc<dyn Database> {
        &self.database
    }

    /// Stop flag shared with the signal handler.
    pub fn stop_flag(&self) -> &StopFlag {
        &self.stop
    }

    /// Progress ledger.
    pub fn ledger(&self) -> &ProgressLedger {
        &self.ledger
    }

    /// Mutable access to the archives for a phase's workers.
    pub fn archives_mut(&mut self) -> &mut [ArchiveLog] {
        &mut self.archives
    }

    /// Number of workers.
    pub fn workers(&self) -> usize {
        self.config.workers
    }

    /// Open one connection per worker.
    ///
    /// Connections are opened up front so a connect failure aborts the
    /// phase before any worker starts.
    pub fn connect_workers(&self) -> Result<Vec<Box<dyn Connection>>> {
        (0..self.config.workers)
            .map(|_| self.database.connect().map_err(EngineError::from))
            .collect()
    }
}
