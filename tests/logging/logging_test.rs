//! Tests for `src/logging.rs`.

use tower_installer::logging::LoggingGuard;

#[test]
fn logging_guard_is_send() {
    fn assert_send<T: Send>() {}
    assert_send::<LoggingGuard>();
}

#[test]
fn init_with_file_creates_logs_dir() {
    let tmp = tempfile::tempdir().expect("should create temp dir");
    let logs_dir = tmp.path().join("logs").join("installer");
    assert!(!logs_dir.exists());

    // Only one global subscriber per process; a second install returns Err
    // after the directory has been created.
    let _result = tower_installer::logging::init_with_file(&logs_dir, "installer.log");
    assert!(logs_dir.exists(), "logs directory should be created");
}

#[test]
fn init_cli_twice_is_harmless() {
    tower_installer::logging::init_cli();
    tower_installer::logging::init_cli();
}

#[test]
fn log_file_is_named_after_the_prefix() {
    let tmp = tempfile::tempdir().expect("should create temp dir");
    let logs_dir = tmp.path().join("dist-logs");

    let _result = tower_installer::logging::init_with_file(&logs_dir, "tower-dist.log");

    let names: Vec<String> = std::fs::read_dir(&logs_dir)
        .expect("logs dir exists")
        .filter_map(Result::ok)
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    assert!(
        names.iter().any(|n| n.starts_with("tower-dist.log")),
        "{names:?}"
    );
}
