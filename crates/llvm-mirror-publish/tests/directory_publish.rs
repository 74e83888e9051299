use std::io::Cursor;
use std::time::Duration;

use llvm_mirror_publish::{DirectorySink, PublishOutcome, Publisher, Stager};

#[test]
fn republishing_is_idempotent() {
    let out = tempfile::Builder::new()
        .prefix("llvm-mirror-test-out-")
        .tempdir()
        .unwrap();
    let staging_root = tempfile::tempdir().unwrap();
    let stager = Stager::new_in(staging_root.path()).unwrap();
    let publisher = Publisher::with_retry(DirectorySink::new(out.path()), 3, Duration::ZERO);

    let first = stager
        .stage(&mut Cursor::new(b"first run"), "llvm-ar-17.0.0")
        .unwrap();
    let first_path = first.path().to_path_buf();
    let report = publisher.publish(&first).unwrap();
    drop(first);
    assert_eq!(report.outcome, PublishOutcome::Published);
    assert!(!first_path.exists());

    let second = stager
        .stage(&mut Cursor::new(b"second run"), "llvm-ar-17.0.0")
        .unwrap();
    let report = publisher.publish(&second).unwrap();
    assert_eq!(report.outcome, PublishOutcome::AlreadyExists);
    assert_eq!(report.attempts, 1);

    assert_eq!(
        std::fs::read(out.path().join("llvm-ar-17.0.0")).unwrap(),
        b"first run"
    );
}

#[test]
fn missing_destination_is_fatal_and_not_retried() {
    let root = tempfile::tempdir().unwrap();
    let stager = Stager::new_in(root.path()).unwrap();
    let publisher = Publisher::with_retry(
        DirectorySink::new(root.path().join("does-not-exist")),
        3,
        Duration::ZERO,
    );

    let staged = stager.stage(&mut Cursor::new(b"x"), "clang-1").unwrap();
    let err = publisher.publish(&staged).unwrap_err();

    assert_eq!(err.attempts, 1);
    assert!(!err.source.is_transient());
}
