//! Damaged archives surface as failures of the owning worker only

use std::fs::{self, OpenOptions};

use rowcheck::{paths::archive_path, Harness, HarnessConfig, VerifyFailure};
use tempfile::TempDir;

use crate::test_utils::config;

fn insert_only(cfg: &HarnessConfig) -> Vec<u64> {
    Harness::new(HarnessConfig {
        check_data: false,
        ..cfg.clone()
    })
    .unwrap()
    .run()
    .unwrap()
    .insert
    .unwrap()
    .appended_per_worker
}

fn verify_only(cfg: &HarnessConfig) -> rowcheck::VerifyReport {
    Harness::new(HarnessConfig {
        insert_data: false,
        ..cfg.clone()
    })
    .unwrap()
    .run()
    .unwrap()
    .verify
    .unwrap()
}

#[test]
fn test_truncated_archive_stops_one_worker() {
    let dir = TempDir::new().unwrap();
    let cfg = config(&dir, 40, 2, 4);
    let appended = insert_only(&cfg);
    assert_eq!(appended.iter().sum::<u64>(), 40);

    // Damage the busier worker so it is guaranteed to have entries.
    let victim = if appended[0] >= appended[1] { 0 } else { 1 };
    let other = 1 - victim;
    let path = archive_path(dir.path(), victim);
    let len = fs::metadata(&path).unwrap().len();
    OpenOptions::new()
        .write(true)
        .open(&path)
        .unwrap()
        .set_len(len - 5)
        .unwrap();

    let verify = verify_only(&cfg);
    assert!(!verify.passed());
    assert_eq!(verify.failures.len(), 1);
    assert!(matches!(
        &verify.failures[0],
        VerifyFailure::ArchiveRead { worker, error } if *worker == victim && error.contains("incomplete")
    ));
    // The other worker checked all of its entries, the victim all but the cut one.
    assert_eq!(verify.checked_per_worker[other], appended[other]);
    assert_eq!(verify.checked_per_worker[victim], appended[victim] - 1);
}

#[test]
fn test_garbage_archive_is_reported() {
    let dir = TempDir::new().unwrap();
    let cfg = config(&dir, 4, 1, 1);
    insert_only(&cfg);

    let mut bytes = fs::read(archive_path(dir.path(), 0)).unwrap();
    bytes.extend_from_slice(&[0xff; 12]);
    fs::write(archive_path(dir.path(), 0), bytes).unwrap();

    let verify = verify_only(&cfg);
    assert_eq!(verify.checked, 4);
    assert!(matches!(
        &verify.failures[..],
        [VerifyFailure::ArchiveRead { worker: 0, .. }]
    ));
}
