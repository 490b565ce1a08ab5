//! Repeated runs over one dataset

use rowcheck::{Harness, HarnessConfig};
use tempfile::TempDir;

use crate::test_utils::{config, table_ids};

#[test]
fn test_runs_accumulate() {
    let dir = TempDir::new().unwrap();
    let cfg = config(&dir, 5, 2, 2);
    // Claims at offsets 0, 2 and 4 each insert two rows.
    const PER_RUN: u64 = 6;

    let mut total = 0;
    for run in 0..3u64 {
        let report = Harness::new(cfg.clone()).unwrap().run().unwrap();
        let insert = report.insert.unwrap();
        assert_eq!(insert.resume_id, run * PER_RUN);
        assert_eq!(insert.rows_inserted, PER_RUN);
        total += PER_RUN;
        assert_eq!(insert.ledger_counts.iter().sum::<u64>(), total);

        let verify = report.verify.unwrap();
        assert_eq!(verify.checked, total);
        assert!(verify.passed());
    }
    assert_eq!(table_ids(&cfg), (0..18).collect::<Vec<_>>());
}

#[test]
fn test_verify_only_run_replays_earlier_archives() {
    let dir = TempDir::new().unwrap();
    let cfg = config(&dir, 12, 3, 1);
    Harness::new(HarnessConfig {
        check_data: false,
        ..cfg.clone()
    })
    .unwrap()
    .run()
    .unwrap();

    for _ in 0..2 {
        let report = Harness::new(HarnessConfig {
            insert_data: false,
            ..cfg.clone()
        })
        .unwrap()
        .run()
        .unwrap();
        assert!(report.insert.is_none());
        let verify = report.verify.unwrap();
        assert_eq!(verify.checked, 12);
        assert_eq!(verify.expected, Some(12));
        assert!(verify.passed());
    }
}
