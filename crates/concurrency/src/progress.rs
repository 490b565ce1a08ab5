//! Shared progress counting and milestone detection
//!
//! Long phases report coarse progress: every 10% of a known total, or every
//! fixed number of rows when the total is unbounded.

use std::sync::atomic::{AtomicU64, Ordering};

/// Rows between progress events when no total is known.
pub const UNBOUNDED_STEP: u64 = 10_000;

/// Counter shared by all workers of a phase.
#[derive(Debug, Default)]
pub struct ProgressCounter {
    done: AtomicU64,
}

impl ProgressCounter {
    /// Create a counter at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `n` and return the new total.
    #[inline]
    pub fn add(&self, n: u64) -> u64 {
        self.done.fetch_add(n, Ordering::AcqRel) + n
    }

    /// Current total.
    pub fn get(&self) -> u64 {
        self.done.load(Ordering::Acquire)
    }
}

/// Milestone schedule for progress events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Milestones {
    total: u64,
    step: u64,
}

impl Milestones {
    /// One milestone per 10% of `total`. A total below 10 has none.
    pub fn tenths_of(total: u64) -> Self {
        Self {
            total,
            step: total / 10,
        }
    }

    /// One milestone every `step` units, with no known total.
    pub fn every(step: u64) -> Self {
        Self { total: 0, step }
    }

    /// Known total, zero when unbounded.
    pub fn total(&self) -> u64 {
        self.total
    }

    /// If advancing from `before` to `after` crossed a milestone, the last
    /// milestone crossed.
    pub fn crossed(&self, before: u64, after: u64) -> Option<u64> {
        if self.step == 0 || after <= before {
            return None;
        }
        let reached = after / self.step;
        (reached > before / self.step).then(|| reached * self.step)
    }

    /// Percentage of the total that `done` represents, capped at 100.
    pub fn percent(&self, done: u64) -> Option<u64> {
        (self.total != 0).then(|| (done.saturating_mul(100) / self.total).min(100))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_counter_across_threads() {
        let counter = Arc::new(ProgressCounter::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let c = Arc::clone(&counter);
                thread::spawn(move || {
                    for _ in 0..250 {
                        c.add(1);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(counter.get(), 1000);
    }

    #[test]
    fn test_tenths_crossings() {
        let m = Milestones::tenths_of(100);
        assert_eq!(m.crossed(0, 5), None);
        assert_eq!(m.crossed(9, 10), Some(10));
        assert_eq!(m.crossed(18, 35), Some(30));
        assert_eq!(m.percent(30), Some(30));
        assert_eq!(m.percent(250), Some(100));
    }

    #[test]
    fn test_small_totals_have_no_milestones() {
        let m = Milestones::tenths_of(7);
        for n in 0..7 {
            assert_eq!(m.crossed(n, n + 1), None);
        }
    }

    #[test]
    fn test_unbounded_steps() {
        let m = Milestones::every(UNBOUNDED_STEP);
        assert_eq!(m.crossed(9_999, 10_000), Some(10_000));
        assert_eq!(m.crossed(10_000, 10_001), None);
        assert_eq!(m.percent(10_000), None);
    }
}
