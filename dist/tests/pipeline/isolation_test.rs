//! Failing jobs: each failure stays inside its own job.

use std::sync::Arc;

use tower_dist::matrix::BuildMatrix;
use tower_dist::pipeline::{JobError, Step};

use crate::support::{all_platforms_build, Build, FakeToolchain, Workspace};

#[tokio::test]
async fn compile_failure_leaves_siblings_published() {
    let ws = Workspace::new();
    let executor = Arc::new(FakeToolchain::new(vec![
        Build::Produces {
            tree: "ubuntu-latest",
            binary: "installer",
        },
        Build::Produces {
            tree: "macos-latest",
            binary: "installer",
        },
        Build::Fails {
            tree: "windows-latest",
            lines: 3,
        },
    ]));

    let report = ws
        .pipeline(&executor)
        .run(BuildMatrix::default().entries().to_vec())
        .await;

    assert!(!report.success());
    assert_eq!(report.published().len(), 2);
    let failures = report.failures();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].entry.platform_name, "windows-latest");
    assert!(matches!(failures[0].result, Err(JobError::Compile { .. })));
    assert!(!ws
        .artifacts
        .join("windows-latest-tower-installer.exe")
        .exists());
}

#[tokio::test]
async fn compile_failure_keeps_the_diagnostic_tail() {
    let ws = Workspace::new();
    let executor = Arc::new(FakeToolchain::new(vec![Build::Fails {
        tree: "ubuntu-latest",
        lines: 100,
    }]));

    let report = ws
        .pipeline(&executor)
        .run(vec![BuildMatrix::default().entries()[0].clone()])
        .await;

    match &report.outcomes[0].result {
        Err(JobError::Compile { diagnostics }) => {
            let lines: Vec<&str> = diagnostics.lines().collect();
            assert_eq!(lines.len(), 40);
            assert_eq!(lines.first().copied(), Some("error line 61"));
            assert_eq!(lines.last().copied(), Some("error line 100"));
        }
        other => panic!("expected compile failure, got {other:?}"),
    }
}

#[tokio::test]
async fn missing_output_fails_and_publishes_nothing() {
    let ws = Workspace::new();
    let executor = Arc::new(FakeToolchain::new(Vec::new()));

    let report = ws
        .pipeline(&executor)
        .run(vec![BuildMatrix::default().entries()[0].clone()])
        .await;

    let outcome = &report.outcomes[0];
    match &outcome.result {
        Err(JobError::MissingArtifact { path }) => {
            assert!(path.ends_with("target/release/installer"));
        }
        other => panic!("expected missing artifact, got {other:?}"),
    }
    assert!(!ws.artifacts.join("ubuntu-latest-tower-installer").exists());
}

#[tokio::test]
async fn zero_length_output_counts_as_missing() {
    let ws = Workspace::new();
    let executor = Arc::new(FakeToolchain::new(vec![Build::ProducesEmpty {
        tree: "macos-latest",
        binary: "installer",
    }]));

    let report = ws
        .pipeline(&executor)
        .run(vec![BuildMatrix::default().entries()[1].clone()])
        .await;

    let err = report.outcomes[0].result.as_ref().expect_err("empty binary");
    assert_eq!(err.step(), Some(Step::Locate));
}

#[tokio::test]
async fn toolchain_failure_stops_before_build() {
    let ws = Workspace::new();
    let executor = Arc::new(FakeToolchain::new(Vec::new()).failing("rustup toolchain install"));

    let report = ws
        .pipeline(&executor)
        .run(BuildMatrix::default().entries().to_vec())
        .await;

    assert_eq!(report.failures().len(), 3);
    for outcome in &report.outcomes {
        match &outcome.result {
            Err(JobError::Toolchain { channel, detail }) => {
                assert_eq!(channel, "nightly");
                assert!(detail.contains("scripted failure"));
            }
            other => panic!("expected toolchain failure, got {other:?}"),
        }
    }
    assert!(executor.builds().is_empty());
}

#[tokio::test]
async fn checkout_failure_is_reported_per_job() {
    let ws = Workspace::new();
    let executor = Arc::new(FakeToolchain::new(vec![Build::Produces {
        tree: "ubuntu-latest",
        binary: "installer",
    }])
    .failing("macos-latest"));

    let report = ws
        .pipeline(&executor)
        .run(BuildMatrix::default().entries()[..2].to_vec())
        .await;

    assert!(report.outcomes[0].succeeded());
    let err = report.outcomes[1].result.as_ref().expect_err("clone failed");
    assert_eq!(err.step(), Some(Step::Checkout));
}

#[tokio::test]
async fn crashed_job_is_aborted_without_touching_siblings() {
    let ws = Workspace::new();
    let executor = Arc::new(FakeToolchain::new(vec![
        Build::Panics {
            tree: "ubuntu-latest",
        },
        Build::Produces {
            tree: "macos-latest",
            binary: "installer",
        },
    ]));

    let report = ws
        .pipeline(&executor)
        .run(BuildMatrix::default().entries()[..2].to_vec())
        .await;

    assert!(matches!(
        report.outcomes[0].result,
        Err(JobError::Aborted(_))
    ));
    assert!(report.outcomes[1].succeeded());
    assert_eq!(report.outcomes[0].entry.platform_name, "ubuntu-latest");
}

#[tokio::test]
async fn failed_rerun_removes_the_previous_artifact() {
    let ws = Workspace::new();
    let entry = BuildMatrix::default().entries()[0].clone();
    let artifact_dir = ws.artifacts.join(entry.artifact_name());

    let good = Arc::new(FakeToolchain::new(all_platforms_build()));
    let first = ws.pipeline(&good).run(vec![entry.clone()]).await;
    assert!(first.success());
    assert!(artifact_dir.join("installer").is_file());

    let broken = Arc::new(FakeToolchain::new(vec![Build::Fails {
        tree: "ubuntu-latest",
        lines: 1,
    }]));
    let second = ws.pipeline(&broken).run(vec![entry]).await;

    assert!(!second.success());
    assert!(second.published().is_empty());
    assert!(
        !artifact_dir.exists(),
        "stale artifact left at {}",
        artifact_dir.display()
    );
}

#[tokio::test]
async fn failed_checkout_also_removes_the_previous_artifact() {
    let ws = Workspace::new();
    let entry = BuildMatrix::default().entries()[1].clone();
    let artifact_dir = ws.artifacts.join(entry.artifact_name());

    let good = Arc::new(FakeToolchain::new(all_platforms_build()));
    ws.pipeline(&good).run(vec![entry.clone()]).await;
    assert!(artifact_dir.exists());

    let broken = Arc::new(FakeToolchain::new(Vec::new()).failing("git clone"));
    let report = ws.pipeline(&broken).run(vec![entry]).await;

    let err = report.outcomes[0].result.as_ref().expect_err("clone failed");
    assert_eq!(err.step(), Some(Step::Checkout));
    assert!(!artifact_dir.exists());
}

#[tokio::test]
async fn crashed_job_is_labelled_aborted() {
    let ws = Workspace::new();
    let executor = Arc::new(FakeToolchain::new(vec![Build::Panics {
        tree: "ubuntu-latest",
    }]));

    let report = ws
        .pipeline(&executor)
        .run(vec![BuildMatrix::default().entries()[0].clone()])
        .await;

    let err = report.outcomes[0].result.as_ref().expect_err("panicked");
    assert_eq!(err.step(), None);
    assert_eq!(err.label(), "aborted");

    let json = report.to_json();
    assert_eq!(json["jobs"][0]["status"], "aborted");
    assert!(json["jobs"][0]["failed_step"].is_null());
}
