//! Harness end-to-end test suite
//!
//! Every test runs the full harness against an on-disk SQLite database in
//! its own temporary data directory.
//!
//! - `scenario`: the three-row walkthrough and a deleted row
//! - `resume`: repeated runs over the same dataset
//! - `archive_damage`: truncated and corrupted archives
//! - `workers`: many workers and batch sizes
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test --test harness_e2e
//! ```

mod test_utils;

mod archive_damage;
mod resume;
mod scenario;
mod workers;
