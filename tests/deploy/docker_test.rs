//! Docker and docker-compose checks.

use std::path::Path;

use tower_installer::docker::{check_docker, load_images, missing_images};
use tower_installer::error::InstallerError;
use tower_installer::executor::OutputMode;

use crate::support::{FakeEngine, ScriptedExecutor};

#[tokio::test]
async fn compose_version_is_checked_quietly() {
    let executor = ScriptedExecutor::new();
    check_docker(&FakeEngine::with_images(&[]), &executor)
        .await
        .expect("docker and compose present");

    let calls = executor.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].command, "docker-compose version");
    assert_eq!(calls[0].opts.output, OutputMode::Discard);
}

#[tokio::test]
async fn stopped_daemon_is_reported_before_compose() {
    let executor = ScriptedExecutor::new();
    let err = check_docker(&FakeEngine::stopped(), &executor)
        .await
        .expect_err("daemon down");

    assert!(err.to_string().starts_with("docker is not running"));
    assert!(executor.calls().is_empty());
}

#[tokio::test]
async fn missing_images_keep_input_order() {
    let engine = FakeEngine::with_images(&["b"]);
    let missing = missing_images(&engine, &["a", "b", "c"]).await;
    assert_eq!(missing, vec!["a".to_owned(), "c".to_owned()]);
}

#[tokio::test]
async fn load_images_quotes_tarball_path() {
    let executor = ScriptedExecutor::new();
    load_images(&executor, Path::new("/tmp/my images.tar"))
        .await
        .expect("load succeeds");

    let command = executor.commands().pop().expect("command");
    assert!(command.starts_with("docker load --input "));
    assert!(command.contains("my images.tar"));
    assert_ne!(command, "docker load --input /tmp/my images.tar");
}

#[tokio::test]
async fn load_failure_carries_exit_code() {
    let executor = ScriptedExecutor::new().failing("docker load", 125);
    let err = load_images(&executor, Path::new("/tmp/x.tar"))
        .await
        .expect_err("load failed");
    assert!(matches!(
        err,
        InstallerError::CommandFailed {
            exit_code: Some(125),
            ..
        }
    ));
}
