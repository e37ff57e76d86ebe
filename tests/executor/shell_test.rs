//! HostShell behaviour against a real `sh`.

use std::time::Duration;

use tower_installer::executor::shell::HostShell;
use tower_installer::executor::{shell_quote, ExecOptions, Executor};

#[tokio::test]
async fn captures_stdout_and_exit_code() {
    let result = HostShell::new()
        .execute("echo tower; exit 3", ExecOptions::default())
        .await
        .expect("sh runs");
    assert_eq!(result.stdout.trim(), "tower");
    assert_eq!(result.exit_code, Some(3));
    assert!(!result.success());
    assert!(!result.timed_out);
}

#[tokio::test]
async fn stdin_is_fed_and_closed() {
    let result = HostShell::new()
        .execute("cat", ExecOptions::default().with_stdin("services: {}\n"))
        .await
        .expect("sh runs");
    assert!(result.success());
    assert_eq!(result.stdout, "services: {}\n");
}

#[tokio::test]
async fn env_and_working_dir_are_applied() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let result = HostShell::new()
        .execute(
            "printf '%s:' \"$PRISMA_PORT\"; pwd",
            ExecOptions::default()
                .in_dir(tmp.path())
                .with_env("PRISMA_PORT", "8811"),
        )
        .await
        .expect("sh runs");

    let canonical = tmp.path().canonicalize().expect("canonical");
    let (port, dir) = result.stdout.trim().split_once(':').expect("separator");
    assert_eq!(port, "8811");
    assert_eq!(
        std::path::Path::new(dir).canonicalize().expect("pwd exists"),
        canonical
    );
}

#[tokio::test]
async fn quoted_argument_survives_the_shell() {
    let raw = "it's a $VAR & more";
    let result = HostShell::new()
        .execute(&format!("printf '%s' {}", shell_quote(raw)), ExecOptions::default())
        .await
        .expect("sh runs");
    assert_eq!(result.stdout, raw);
}

#[tokio::test]
async fn timeout_marks_result() {
    let opts = ExecOptions {
        timeout: Some(Duration::from_millis(200)),
        ..ExecOptions::default()
    };
    let result = HostShell::new()
        .execute("sleep 5", opts)
        .await
        .expect("sh runs");
    assert!(result.timed_out);
    assert!(!result.success());
    assert_eq!(result.exit_code, None);
}

#[tokio::test]
async fn discarded_output_is_empty() {
    let result = HostShell::new()
        .execute("echo noisy; echo louder >&2", ExecOptions::quiet())
        .await
        .expect("sh runs");
    assert!(result.success());
    assert!(result.output().is_empty());
}
