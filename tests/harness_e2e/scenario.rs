//! One worker, one row per batch, three rows

use rowcheck::{ArchiveLog, Harness, HarnessConfig, ProgressLedger, VerifyFailure};
use tempfile::TempDir;

use crate::test_utils::{config, delete_row, overwrite_uuid, table_ids};

fn insert_only(cfg: &HarnessConfig) {
    let cfg = HarnessConfig {
        check_data: false,
        ..cfg.clone()
    };
    Harness::new(cfg).unwrap().run().unwrap();
}

fn verify_only(cfg: &HarnessConfig) -> rowcheck::VerifyReport {
    let cfg = HarnessConfig {
        insert_data: false,
        ..cfg.clone()
    };
    Harness::new(cfg).unwrap().run().unwrap().verify.unwrap()
}

#[test]
fn test_three_rows_archived_and_verified() {
    let dir = TempDir::new().unwrap();
    let cfg = config(&dir, 3, 1, 1);

    let report = Harness::new(cfg.clone()).unwrap().run().unwrap();
    let insert = report.insert.as_ref().unwrap();
    assert_eq!(insert.resume_id, 0);
    assert_eq!(insert.batches_claimed, 3);
    assert_eq!(insert.rows_inserted, 3);
    assert_eq!(insert.appended_per_worker, vec![3]);
    assert_eq!(insert.ledger_counts, vec![3]);
    assert!(insert.ledger_stored);
    assert!(report.passed());

    assert_eq!(table_ids(&cfg), vec![0, 1, 2]);
    assert_eq!(ProgressLedger::in_dir(dir.path()).load(1, false).unwrap(), vec![3]);

    let mut archive = ArchiveLog::open(dir.path(), 0).unwrap();
    let ids: Vec<u64> = (0..3).map(|_| archive.get_one_entry(0).unwrap().id).collect();
    assert_eq!(ids, vec![0, 1, 2]);
    assert!(archive.get_one_entry(0).unwrap_err().is_end_of_data());
}

#[test]
fn test_deleted_row_is_the_only_failure() {
    let dir = TempDir::new().unwrap();
    let cfg = config(&dir, 3, 1, 1);
    insert_only(&cfg);

    delete_row(&cfg, 1);
    let verify = verify_only(&cfg);

    assert!(!verify.passed());
    assert_eq!(verify.checked, 3);
    assert_eq!(verify.failures, vec![VerifyFailure::Missing { id: 1 }]);
}

#[test]
fn test_changed_value_is_a_mismatch() {
    let dir = TempDir::new().unwrap();
    let cfg = config(&dir, 3, 1, 1);
    insert_only(&cfg);

    overwrite_uuid(&cfg, 2, "not-the-archived-uuid");
    let verify = verify_only(&cfg);

    match &verify.failures[..] {
        [VerifyFailure::Mismatch {
            id,
            column,
            actual,
            ..
        }] => {
            assert_eq!(*id, 2);
            assert_eq!(column, "uuid");
            assert_eq!(actual, "not-the-archived-uuid");
        }
        other => panic!("expected one mismatch, got {:?}", other),
    }
}

#[test]
fn test_report_serializes() {
    let dir = TempDir::new().unwrap();
    let cfg = HarnessConfig {
        time_consume: true,
        ..config(&dir, 3, 1, 1)
    };
    let report = Harness::new(cfg).unwrap().run().unwrap();
    assert!(report.elapsed_secs.is_some());
    assert!(report.started_at.unwrap() <= report.finished_at.unwrap());

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["insert"]["ledger_counts"], serde_json::json!([3]));
    assert_eq!(json["verify"]["failures"], serde_json::json!([]));
}

#[test]
fn test_rejected_batch_is_consumed_but_not_archived() {
    let dir = TempDir::new().unwrap();
    let front = dir.path().join("front.sql");
    std::fs::write(
        &front,
        "CREATE TABLE rowcheck_test (id BIGINT NOT NULL PRIMARY KEY, uuid CHAR(36) NOT NULL)\n\
         CREATE TRIGGER reject_one BEFORE INSERT ON rowcheck_test WHEN NEW.id = 1 BEGIN SELECT RAISE(ABORT, 'rejected'); END\n",
    )
    .unwrap();
    let cfg = HarnessConfig {
        front_sql: Some(front),
        ..config(&dir, 3, 1, 1)
    };

    let report = Harness::new(cfg.clone()).unwrap().run().unwrap();
    let insert = report.insert.unwrap();
    assert_eq!(insert.batches_claimed, 3);
    assert_eq!(insert.failed_batches, 1);
    assert_eq!(insert.rows_inserted, 2);
    assert_eq!(insert.ledger_counts, vec![2]);

    assert_eq!(table_ids(&cfg), vec![0, 2]);
    let mut archive = ArchiveLog::open(dir.path(), 0).unwrap();
    let mut archived = Vec::new();
    while let Ok(entry) = archive.get_one_entry(0) {
        archived.push(entry.id);
    }
    assert_eq!(archived, vec![0, 2]);

    // The rejected id is invisible to verification.
    let verify = report.verify.unwrap();
    assert_eq!(verify.checked, 2);
    assert!(verify.passed());
}
