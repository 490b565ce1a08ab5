//! Lock-free row id allocation
//!
//! One shared counter holds the next unclaimed row id. Workers claim a
//! contiguous batch with a single compare-and-swap from the value they last
//! observed to that value plus the batch size. A lost race reloads the
//! observed value and retries; nothing is claimed and nothing else changes.
//!
//! # Guarantees
//!
//! - Every id in `[resume_id, current)` belongs to exactly one successful
//!   claim.
//! - Claims are contiguous and never overlap.
//! - Ids are never handed out twice, even if a claim is abandoned.
//!
//! # Targets
//!
//! With a finite row target, a claim whose start offset (relative to
//! `resume_id`) has reached the target is abandoned and the stop flag is
//! raised. A claim that starts below the target keeps its full batch, so
//! the last batch of a run may end past the target.

use std::ops::Range;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::stop::StopFlag;

/// A contiguous range of ids owned by one worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchClaim {
    /// First id of the batch
    pub start: u64,
    /// Number of ids the worker should use
    pub len: u64,
    /// `start - resume_id`: rows claimed before this batch in this run
    pub offset: u64,
}

impl BatchClaim {
    /// Ids to insert.
    pub fn ids(&self) -> Range<u64> {
        self.start..self.start + self.len
    }
}

/// Result of one compare-and-swap that won the race.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimOutcome {
    /// The batch is the caller's to insert.
    Claimed(BatchClaim),
    /// The claim starts at or past the row target; it is abandoned.
    TargetReached {
        /// Start offset of the abandoned claim
        offset: u64,
    },
    /// The id space would overflow `u64`.
    Exhausted,
}

/// Shared id counter handing out batches by compare-and-swap.
#[derive(Debug)]
pub struct IdAllocator {
    next: AtomicU64,
    resume_id: u64,
    batch_size: u64,
    target: u64,
    cas_failures: AtomicU64,
}

impl IdAllocator {
    /// Create an allocator starting at `resume_id`.
    ///
    /// `batch_size` of zero is treated as one. `target` of zero means
    /// unbounded.
    pub fn new(resume_id: u64, batch_size: u64, target: u64) -> Self {
        Self {
            next: AtomicU64::new(resume_id),
            resume_id,
            batch_size: batch_size.max(1),
            target,
            cas_failures: AtomicU64::new(0),
        }
    }

    /// First id this allocator handed out.
    pub fn resume_id(&self) -> u64 {
        self.resume_id
    }

    /// Ids per claim.
    pub fn batch_size(&self) -> u64 {
        self.batch_size
    }

    /// Row target, zero when unbounded.
    pub fn target(&self) -> u64 {
        self.target
    }

    /// Current value of the shared counter: the next unclaimed id.
    #[inline]
    pub fn current(&self) -> u64 {
        self.next.load(Ordering::Acquire)
    }

    /// Ids consumed so far, including abandoned claims.
    pub fn consumed(&self) -> u64 {
        self.current() - self.resume_id
    }

    /// Compare-and-swap attempts that lost a race.
    pub fn cas_failures(&self) -> u64 {
        self.cas_failures.load(Ordering::Relaxed)
    }

    /// Attempt one claim from the caller's last observed counter value.
    ///
    /// Returns `Err(actual)` with the counter's current value if another
    /// worker moved it first.
    pub fn try_claim(&self, observed: u64) -> Result<ClaimOutcome, u64> {
        let Some(end) = observed.checked_add(self.batch_size) else {
            return Ok(ClaimOutcome::Exhausted);
        };

        self.next
            .compare_exchange(observed, end, Ordering::AcqRel, Ordering::Acquire)?;

        let offset = observed - self.resume_id;
        if self.target != 0 && offset >= self.target {
            return Ok(ClaimOutcome::TargetReached { offset });
        }
        Ok(ClaimOutcome::Claimed(BatchClaim {
            start: observed,
            len: self.batch_size,
            offset,
        }))
    }

    /// Claim the next batch, retrying lost races.
    ///
    /// `local` is the worker's cached view of the counter; it is refreshed on
    /// every lost race and advanced past a successful claim. Returns `None`
    /// once `stop` is set, raising it first if this call hit the target.
    pub fn next_batch(&self, local: &mut u64, stop: &StopFlag) -> Option<BatchClaim> {
        while !stop.is_set() {
            match self.try_claim(*local) {
                Ok(ClaimOutcome::Claimed(claim)) => {
                    *local = claim.start + self.batch_size;
                    return Some(claim);
                }
                Ok(ClaimOutcome::TargetReached { offset }) => {
                    tracing::debug!(
                        target: "rowcheck::alloc",
                        offset,
                        target_rows = self.target,
                        "Row target reached"
                    );
                    stop.set();
                }
                Ok(ClaimOutcome::Exhausted) => {
                    tracing::warn!(target: "rowcheck::alloc", next = *local, "Row id space exhausted");
                    stop.set();
                }
                Err(actual) => {
                    self.cas_failures.fetch_add(1, Ordering::Relaxed);
                    *local = actual;
                }
            }
        }
        None
    }
}
