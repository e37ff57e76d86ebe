//! Deploying from a source checkout, and resolving deploy sources.

use std::path::Path;
use std::sync::Arc;

use tower_installer::config::InstallerConfig;
use tower_installer::deploy::{DeploySource, Deployer};
use tower_installer::error::InstallerError;

use crate::support::{FakeEngine, ScriptedExecutor};

fn source_deployer(executor: &Arc<ScriptedExecutor>) -> Deployer {
    Deployer::new(
        InstallerConfig::default(),
        Arc::clone(executor) as Arc<dyn tower_installer::executor::Executor>,
        Arc::new(FakeEngine::with_images(&[])),
    )
}

#[tokio::test]
async fn source_deploy_runs_compose_build_and_setup_in_order() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let executor = Arc::new(ScriptedExecutor::new());
    let deployer = source_deployer(&executor);

    deployer
        .start(&DeploySource::Source(tmp.path().to_path_buf()), false)
        .await
        .expect("source deploy succeeds");

    let calls = executor.calls();
    assert_eq!(calls.len(), 3);

    assert!(calls[0].command.contains("docker-compose.yml"));
    assert!(calls[0].command.ends_with(" up -d"));

    assert_eq!(calls[1].command, "yarn && yarn lerna run prepublish");
    assert_eq!(calls[1].opts.working_dir.as_deref(), Some(tmp.path()));

    let server_dir = tmp.path().join("packages").join("server");
    assert!(calls[2].command.starts_with("yarn prisma deploy && node "));
    assert!(calls[2].command.contains("setup.js"));
    assert!(!calls[2].command.contains("reset"));
    assert_eq!(calls[2].opts.working_dir.as_deref(), Some(server_dir.as_path()));
    assert_eq!(calls[2].opts.env_var("PRISMA_PORT"), Some("8811"));
}

#[tokio::test]
async fn forced_source_deploy_resets_data() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let executor = Arc::new(ScriptedExecutor::new());
    let deployer = source_deployer(&executor);

    deployer
        .start(&DeploySource::Source(tmp.path().to_path_buf()), true)
        .await
        .expect("source deploy succeeds");

    let setup = executor.commands().pop().expect("setup command");
    assert!(setup.contains("yarn prisma deploy && yarn prisma reset -f && node "));
}

#[tokio::test]
async fn build_failure_skips_setup() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let executor = Arc::new(ScriptedExecutor::new().failing("lerna", 1));
    let deployer = source_deployer(&executor);

    let err = deployer
        .start(&DeploySource::Source(tmp.path().to_path_buf()), false)
        .await
        .expect_err("build failed");

    assert_eq!(
        err.to_string(),
        "build tower from source code failed (exit code 1)"
    );
    assert_eq!(executor.calls().len(), 2);
}

#[test]
fn relative_source_dir_is_resolved_against_cwd() {
    let tmp = tempfile::tempdir().expect("tempdir");
    std::fs::create_dir(tmp.path().join("tower")).expect("mkdir");

    let source = DeploySource::from_options(Some(Path::new("tower")), None, tmp.path())
        .expect("existing dir resolves");

    let expected = tmp
        .path()
        .join("tower")
        .canonicalize()
        .expect("canonical");
    assert_eq!(source, DeploySource::Source(expected));
}

#[test]
fn relative_tarball_is_resolved_against_cwd() {
    let tmp = tempfile::tempdir().expect("tempdir");
    std::fs::write(tmp.path().join("images.tar"), b"tar").expect("write");

    let source = DeploySource::from_options(None, Some(Path::new("images.tar")), tmp.path())
        .expect("existing file resolves");

    assert!(matches!(source, DeploySource::Tarball(ref p) if p.ends_with("images.tar")));
}

#[test]
fn no_options_means_images() {
    let source =
        DeploySource::from_options(None, None, Path::new("/")).expect("nothing to resolve");
    assert_eq!(source, DeploySource::Images);
}

#[test]
fn missing_relative_tarball_is_rejected() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let err = DeploySource::from_options(None, Some(Path::new("gone.tar")), tmp.path())
        .expect_err("missing file");
    assert!(matches!(err, InstallerError::InvalidPath { .. }));
}
