//! ExecResult status and output tests.

use std::time::Duration;

use tower_installer::executor::ExecResult;

fn result(exit_code: Option<i32>, stdout: &str, stderr: &str, timed_out: bool) -> ExecResult {
    ExecResult {
        exit_code,
        stdout: stdout.to_owned(),
        stderr: stderr.to_owned(),
        timed_out,
        duration: Duration::from_millis(10),
    }
}

#[test]
fn zero_exit_is_success() {
    assert!(result(Some(0), "docker-compose version 1.24.0", "", false).success());
}

#[test]
fn nonzero_exit_is_failure() {
    assert!(!result(Some(101), "", "error[E0425]", false).success());
}

#[test]
fn timeout_overrides_exit_code() {
    assert!(!result(Some(0), "Compiling tower-installer", "", true).success());
}

#[test]
fn signal_termination_is_failure() {
    assert!(!result(None, "", "", false).success());
}

#[test]
fn output_joins_both_streams() {
    let r = result(Some(1), "Updating crates.io index", "error: linker failed", false);
    assert_eq!(r.output(), "Updating crates.io index\nerror: linker failed");
}

#[test]
fn output_with_one_stream_has_no_separator() {
    assert_eq!(result(Some(0), "HEAD", "", false).output(), "HEAD");
    assert_eq!(result(Some(1), "", "fatal: bad object", false).output(), "fatal: bad object");
}
