//! Insertion pipeline
//!
//! # Design
//!
//! Before any worker starts, the run is reconciled against what earlier runs
//! left behind:
//!
//! | table      | ledger      | outcome                         |
//! |------------|-------------|---------------------------------|
//! | empty      | missing     | fresh run from id 0             |
//! | has rows   | present     | resume from `max(id) + 1`       |
//! | has rows   | missing     | [`EngineError::LedgerLost`]     |
//! | empty      | present     | [`EngineError::DatabaseDataLost`] |
//!
//! Each worker then loops: claim a batch from the shared [`IdAllocator`],
//! synthesize one uuid per column per row, insert the batch with one
//! statement, and on success append the whole batch to its own archive with
//! one write. A failed insert is logged and its ids stay consumed but
//! unarchived. The loop ends when the stop flag is raised, either by the
//! allocator reaching the row target or by an external interrupt.
//!
//! After all workers finish, archives are synced and the ledger is
//! rewritten with `previous + appended` per worker.

use std::thread;

use rowcheck_concurrency::{IdAllocator, Milestones, StopFlag, UNBOUNDED_STEP};
use rowcheck_core::Entry;
use rowcheck_durability::{ArchiveLog, LedgerError, ProgressLedger};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::HarnessConfig;
use crate::context::RunContext;
use crate::database::Connection;
use crate::error::{EngineError, Result};
use crate::schema;

/// Where an insertion run starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResumeState {
    /// First id this run may claim
    pub resume_id: u64,
    /// Ledger counts from earlier runs, `None` on a fresh dataset
    pub previous_counts: Option<Vec<u64>>,
}

impl ResumeState {
    /// Previous count of `worker`, zero on a fresh dataset.
    pub fn previous(&self, worker: usize) -> u64 {
        self.previous_counts
            .as_ref()
            .and_then(|c| c.get(worker).copied())
            .unwrap_or(0)
    }
}

/// Outcome of an insertion run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsertReport {
    /// First id claimable by this run
    pub resume_id: u64,
    /// Batches claimed by all workers
    pub batches_claimed: u64,
    /// Rows the database accepted
    pub rows_inserted: u64,
    /// Batches whose insert failed; their ids are consumed but unarchived
    pub failed_batches: u64,
    /// Inserted batches that could not be appended to the archive
    pub archive_failures: u64,
    /// Lost compare-and-swap races
    pub cas_failures: u64,
    /// Entries appended to each worker's archive in this run
    pub appended_per_worker: Vec<u64>,
    /// Cumulative counts written to the ledger
    pub ledger_counts: Vec<u64>,
    /// False if rewriting the ledger failed
    pub ledger_stored: bool,
}

#[derive(Debug, Default)]
struct WorkerStats {
    batches: u64,
    rows_inserted: u64,
    failed_batches: u64,
    archive_failures: u64,
}

struct InsertShared<'a> {
    config: &'a HarnessConfig,
    alloc: &'a IdAllocator,
    stop: &'a StopFlag,
    milestones: Milestones,
}

/// Check the table and ledger agree, and find the resume point.
pub fn reconcile(
    conn: &mut dyn Connection,
    ledger: &ProgressLedger,
    workers: usize,
) -> Result<ResumeState> {
    let max_id = schema::max_id(conn)?;
    let resume_id = max_id.map_or(0, |id| id + 1);

    let previous_counts = match ledger.load(workers, true) {
        Ok(counts) => {
            if max_id.is_none() {
                tracing::error!(target: "rowcheck::insert", "Testing table is empty but a progress ledger exists");
                return Err(EngineError::DatabaseDataLost);
            }
            Some(counts)
        }
        Err(LedgerError::NotFound { .. }) => {
            if let Some(max_id) = max_id {
                tracing::error!(target: "rowcheck::insert", max_id, "Progress ledger is lost");
                return Err(EngineError::LedgerLost { max_id });
            }
            None
        }
        Err(e) => {
            tracing::error!(target: "rowcheck::insert", error = %e, "Read progress ledger failed");
            return Err(e.into());
        }
    };

    Ok(ResumeState {
        resume_id,
        previous_counts,
    })
}

/// Synthesize the row for `id` with fresh random uuids.
pub fn synthesize_entry(id: u64, extra_columns: usize) -> Entry {
    Entry::new(
        id,
        Uuid::new_v4().to_string(),
        (0..extra_columns)
            .map(|_| Uuid::new_v4().to_string())
            .collect(),
    )
}

/// Run the insertion phase.
pub fn run_insert(ctx: &mut RunContext) -> Result<InsertReport> {
    let config = ctx.config().clone();
    let workers = config.workers;
    let mut conns = ctx.connect_workers()?;
    let resume = reconcile(conns[0].as_mut(), ctx.ledger(), workers)?;

    let mut appended_before = Vec::with_capacity(workers);
    for archive in ctx.archives_mut().iter_mut() {
        archive.seek_for_append()?;
        appended_before.push(archive.entries_appended());
    }

    let alloc = IdAllocator::new(resume.resume_id, config.batch_size, config.rows);
    let milestones = if config.rows == 0 {
        Milestones::every(UNBOUNDED_STEP)
    } else {
        Milestones::tenths_of(config.rows)
    };
    let stop = ctx.stop_flag().clone();
    let shared = InsertShared {
        config: &config,
        alloc: &alloc,
        stop: &stop,
        milestones,
    };

    tracing::info!(
        target: "rowcheck::insert",
        resume_id = resume.resume_id,
        rows = config.rows,
        workers,
        batch_size = config.batch_size,
        "Inserting"
    );

    let stats = {
        let shared = &shared;
        let joined: Vec<_> = thread::scope(|s| {
            let handles: Vec<_> = ctx
                .archives_mut()
                .iter_mut()
                .zip(conns.iter_mut())
                .enumerate()
                .map(|(worker, (archive, conn))| {
                    s.spawn(move || insert_worker(worker, archive, conn.as_mut(), shared))
                })
                .collect();
            handles.into_iter().map(|h| h.join()).collect()
        });
        joined
            .into_iter()
            .enumerate()
            .map(|(worker, r)| r.map_err(|_| EngineError::WorkerPanicked { worker }))
            .collect::<Result<Vec<WorkerStats>>>()?
    };

    let mut report = InsertReport {
        resume_id: resume.resume_id,
        cas_failures: alloc.cas_failures(),
        ..Default::default()
    };
    for s in &stats {
        report.batches_claimed += s.batches;
        report.rows_inserted += s.rows_inserted;
        report.failed_batches += s.failed_batches;
        report.archive_failures += s.archive_failures;
    }

    for (worker, archive) in ctx.archives_mut().iter_mut().enumerate() {
        archive.flush()?;
        let appended = archive.entries_appended() - appended_before[worker];
        report.appended_per_worker.push(appended);
        report.ledger_counts.push(resume.previous(worker) + appended);
    }
    report.ledger_stored = store_ledger(ctx.ledger(), &report.ledger_counts);

    tracing::info!(
        target: "rowcheck::insert",
        rows_inserted = report.rows_inserted,
        batches = report.batches_claimed,
        failed_batches = report.failed_batches,
        next_id = alloc.current(),
        "Insert finished"
    );
    Ok(report)
}

/// Rewrite the ledger. A failure is logged and the run carries on; the next
/// insertion run will find the ledger lost or stale.
fn store_ledger(ledger: &ProgressLedger, counts: &[u64]) -> bool {
    match ledger.store(counts) {
        Ok(()) => true,
        Err(e) => {
            tracing::error!(target: "rowcheck::insert", error = %e, "Store progress ledger failed");
            false
        }
    }
}

fn insert_worker(
    worker: usize,
    archive: &mut ArchiveLog,
    conn: &mut dyn Connection,
    shared: &InsertShared<'_>,
) -> WorkerStats {
    let extra = shared.config.extra_columns;
    let delay = shared.config.insert_delay();
    let mut stats = WorkerStats::default();
    let mut encoded = Vec::new();
    let mut local = shared.alloc.current();

    while let Some(claim) = shared.alloc.next_batch(&mut local, shared.stop) {
        stats.batches += 1;
        report_progress(&shared.milestones, claim.offset, claim.offset + claim.len);

        let entries: Vec<Entry> = claim.ids().map(|id| synthesize_entry(id, extra)).collect();
        match conn.execute(&schema::insert_sql(&entries)) {
            Ok(_) => {
                stats.rows_inserted += claim.len;
                encoded.clear();
                for entry in &entries {
                    entry.encode_into(&mut encoded);
                }
                if let Err(e) = archive.append_entries(&encoded, claim.len) {
                    stats.archive_failures += 1;
                    tracing::error!(
                        target: "rowcheck::insert",
                        worker,
                        id = claim.start,
                        rows = claim.len,
                        error = %e,
                        "Batch inserted but append to archive failed"
                    );
                }
            }
            Err(e) => {
                stats.failed_batches += 1;
                tracing::error!(
                    target: "rowcheck::insert",
                    worker,
                    id = claim.start,
                    rows = claim.len,
                    error = %e,
                    "Insert batch failed"
                );
            }
        }

        if !delay.is_zero() {
            thread::sleep(delay);
        }
    }
    stats
}

fn report_progress(milestones: &Milestones, before: u64, after: u64) {
    let Some(reached) = milestones.crossed(before, after) else {
        return;
    };
    match milestones.percent(reached) {
        Some(percent) => tracing::info!(
            target: "rowcheck::insert",
            percent,
            rows = reached,
            total = milestones.total(),
            "Insert progress"
        ),
        None => tracing::info!(target: "rowcheck::insert", rows = reached, "Insert count"),
    }
}
