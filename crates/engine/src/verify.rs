//! Verification pipeline
//!
//! Every worker replays its own archive from the start and looks each entry
//! up in the database by id. Columns are compared positionally. Problems
//! with a row are recorded and the scan moves on, so one pass produces a
//! complete report. A worker whose archive cannot be read further records
//! that and stops; the other workers are unaffected.
//!
//! The ledger total drives percentage progress. Without a readable ledger
//! the pass still runs, silently; a worker-count mismatch is fatal.

use std::fmt;
use std::thread;

use rowcheck_concurrency::{Milestones, ProgressCounter};
use rowcheck_core::Entry;
use rowcheck_durability::{ArchiveLog, LedgerError};
use serde::{Deserialize, Serialize};

use crate::context::RunContext;
use crate::database::{Connection, Row, SqlValue};
use crate::error::{EngineError, Result};
use crate::schema;

/// One verification defect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum VerifyFailure {
    /// No row with this id exists.
    Missing {
        /// Row id
        id: u64,
    },
    /// A column differs from the archived value.
    Mismatch {
        /// Row id
        id: u64,
        /// Column name
        column: String,
        /// Archived value
        expected: String,
        /// Stored value
        actual: String,
    },
    /// The point lookup failed.
    QueryFailed {
        /// Row id
        id: u64,
        /// Error message
        error: String,
    },
    /// The worker's archive could not be read past some point.
    ArchiveRead {
        /// Worker index
        worker: usize,
        /// Error message
        error: String,
    },
}

impl fmt::Display for VerifyFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VerifyFailure::Missing { id } => write!(f, "id {}: row missing", id),
            VerifyFailure::Mismatch {
                id,
                column,
                expected,
                actual,
            } => write!(
                f,
                "id {}: column {} differs, archive [{}] database [{}]",
                id, column, expected, actual
            ),
            VerifyFailure::QueryFailed { id, error } => write!(f, "id {}: select failed: {}", id, error),
            VerifyFailure::ArchiveRead { worker, error } => {
                write!(f, "worker {}: read archive failed: {}", worker, error)
            }
        }
    }
}

/// Outcome of a verification pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyReport {
    /// Entries read from archives and looked up
    pub checked: u64,
    /// Total entries recorded by the ledger, if it was readable
    pub expected: Option<u64>,
    /// Entries checked by each worker
    pub checked_per_worker: Vec<u64>,
    /// Every defect found
    pub failures: Vec<VerifyFailure>,
}

impl VerifyReport {
    /// True iff no defect was found.
    pub fn passed(&self) -> bool {
        self.failures.is_empty()
    }
}

#[derive(Debug, Default)]
struct WorkerOutcome {
    checked: u64,
    failures: Vec<VerifyFailure>,
}

struct VerifyShared<'a> {
    extra_columns: usize,
    select_sql: &'a str,
    progress: &'a ProgressCounter,
    milestones: Milestones,
}

/// Compare a fetched row against the archived entry.
///
/// Row values are in table order: `id`, `uuid`, then the extra columns.
pub fn compare_row(entry: &Entry, row: &Row, failures: &mut Vec<VerifyFailure>) {
    let expected = std::iter::once(&entry.uuid).chain(entry.extra_uuid.iter());
    for (i, expected) in expected.enumerate() {
        let index = i + 1;
        let actual = row.get(index);
        if actual.and_then(SqlValue::as_text) == Some(expected.as_str()) {
            continue;
        }
        let column = if i == 0 {
            "uuid".to_string()
        } else {
            schema::extra_column_name(i - 1)
        };
        failures.push(VerifyFailure::Mismatch {
            id: entry.id,
            column,
            expected: expected.clone(),
            actual: actual.map_or_else(|| "<absent>".to_string(), |v| match v {
                SqlValue::Text(s) => s.clone(),
                other => other.to_string(),
            }),
        });
    }
}

/// Run the verification phase.
pub fn run_verify(ctx: &mut RunContext) -> Result<VerifyReport> {
    let workers = ctx.workers();
    let extra_columns = ctx.config().extra_columns;

    let expected = match ctx.ledger().load(workers, false) {
        Ok(counts) => Some(counts.iter().sum::<u64>()),
        Err(e @ LedgerError::WorkerCountMismatch { .. }) => {
            tracing::error!(target: "rowcheck::verify", error = %e, "Worker count differs from the previous run");
            return Err(e.into());
        }
        Err(_) => {
            tracing::warn!(target: "rowcheck::verify", "Total entry count unknown, progress will not be reported");
            None
        }
    };

    let mut conns = ctx.connect_workers()?;
    for archive in ctx.archives_mut().iter_mut() {
        archive.rewind();
    }

    let select_sql = schema::select_by_id_sql(extra_columns);
    let progress = ProgressCounter::new();
    let shared = VerifyShared {
        extra_columns,
        select_sql: &select_sql,
        progress: &progress,
        milestones: Milestones::tenths_of(expected.unwrap_or(0)),
    };

    tracing::info!(target: "rowcheck::verify", workers, expected = ?expected, "Checking");

    let outcomes = {
        let shared = &shared;
        let joined: Vec<_> = thread::scope(|s| {
            let handles: Vec<_> = ctx
                .archives_mut()
                .iter_mut()
                .zip(conns.iter_mut())
                .enumerate()
                .map(|(worker, (archive, conn))| {
                    s.spawn(move || verify_worker(worker, archive, conn.as_mut(), shared))
                })
                .collect();
            handles.into_iter().map(|h| h.join()).collect()
        });
        joined
            .into_iter()
            .enumerate()
            .map(|(worker, r)| r.map_err(|_| EngineError::WorkerPanicked { worker }))
            .collect::<Result<Vec<WorkerOutcome>>>()?
    };

    let mut report = VerifyReport {
        expected,
        ..Default::default()
    };
    for outcome in outcomes {
        report.checked += outcome.checked;
        report.checked_per_worker.push(outcome.checked);
        report.failures.extend(outcome.failures);
    }

    if report.passed() {
        tracing::info!(target: "rowcheck::verify", checked = report.checked, "Check success");
    } else {
        tracing::error!(
            target: "rowcheck::verify",
            checked = report.checked,
            failures = report.failures.len(),
            "Check failed"
        );
    }
    Ok(report)
}

fn verify_worker(
    worker: usize,
    archive: &mut ArchiveLog,
    conn: &mut dyn Connection,
    shared: &VerifyShared<'_>,
) -> WorkerOutcome {
    let mut outcome = WorkerOutcome::default();

    loop {
        let entry = match archive.get_one_entry(shared.extra_columns) {
            Ok(entry) => entry,
            Err(e) if e.is_end_of_data() => break,
            Err(e) => {
                tracing::error!(target: "rowcheck::verify", worker, error = %e, "Read archive failed");
                outcome.failures.push(VerifyFailure::ArchiveRead {
                    worker,
                    error: e.to_string(),
                });
                break;
            }
        };

        outcome.checked += 1;
        let done = shared.progress.add(1);
        if let Some(reached) = shared.milestones.crossed(done - 1, done) {
            tracing::info!(
                target: "rowcheck::verify",
                percent = shared.milestones.percent(reached).unwrap_or(0),
                rows = reached,
                total = shared.milestones.total(),
                "Check progress"
            );
        }

        let before = outcome.failures.len();
        match schema::fetch_row(conn, shared.select_sql, entry.id) {
            Ok(Some(row)) => compare_row(&entry, &row, &mut outcome.failures),
            Ok(None) => outcome.failures.push(VerifyFailure::Missing { id: entry.id }),
            Err(e) => outcome.failures.push(VerifyFailure::QueryFailed {
                id: entry.id,
                error: e.to_string(),
            }),
        }
        for failure in &outcome.failures[before..] {
            tracing::error!(target: "rowcheck::verify", worker, "Check failed: {}", failure);
        }
    }
    outcome
}
