//! Concurrency primitives for rowcheck
//!
//! Everything workers share lives here:
//! - `allocator`: compare-and-swap batch allocation of row ids
//! - `stop`: the stop flag raised by the row target or an interrupt
//! - `progress`: shared counters and progress milestones

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod allocator;
pub mod progress;
pub mod stop;

pub use allocator::{BatchClaim, ClaimOutcome, IdAllocator};
pub use progress::{Milestones, ProgressCounter, UNBOUNDED_STEP};
pub use stop::StopFlag;
