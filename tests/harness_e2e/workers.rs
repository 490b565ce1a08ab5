//! Many workers claiming from one counter

use rand::Rng;
use rowcheck::{ArchiveLog, Harness};
use tempfile::TempDir;

use crate::test_utils::{config, table_ids};

#[test]
fn test_workers_cover_every_id_once() {
    let dir = TempDir::new().unwrap();
    let rows = rand::thread_rng().gen_range(150..300);
    let batch = rand::thread_rng().gen_range(1..9);
    let cfg = config(&dir, rows, 4, batch);
    // Every claim starting below the target is inserted in full.
    let inserted = (rows + batch - 1) / batch * batch;

    let report = Harness::new(cfg.clone()).unwrap().run().unwrap();
    let insert = report.insert.unwrap();
    assert_eq!(insert.rows_inserted, inserted);
    assert_eq!(insert.appended_per_worker.len(), 4);
    assert!(report.verify.unwrap().passed());

    assert_eq!(table_ids(&cfg), (0..inserted).collect::<Vec<_>>());

    // Archives partition the ids and each is ascending.
    let mut seen = Vec::new();
    for worker in 0..4 {
        let mut archive = ArchiveLog::open(dir.path(), worker).unwrap();
        let mut last = None;
        while let Ok(entry) = archive.get_one_entry(0) {
            assert!(last.map_or(true, |l| l < entry.id));
            last = Some(entry.id);
            seen.push(entry.id);
        }
    }
    seen.sort_unstable();
    assert_eq!(seen, (0..inserted).collect::<Vec<_>>());
}

#[test]
fn test_final_batch_runs_past_target() {
    let dir = TempDir::new().unwrap();
    let cfg = config(&dir, 10, 1, 4);

    let report = Harness::new(cfg.clone()).unwrap().run().unwrap();
    let insert = report.insert.unwrap();
    assert_eq!(insert.batches_claimed, 3);
    assert_eq!(insert.rows_inserted, 12);
    assert_eq!(insert.ledger_counts, vec![12]);
    assert_eq!(table_ids(&cfg), (0..12).collect::<Vec<_>>());
    assert_eq!(report.verify.unwrap().checked, 12);
}
