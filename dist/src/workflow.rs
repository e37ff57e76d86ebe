//! GitHub Actions rendering of the release pipeline.
//!
//! The committed `.github/workflows/release.yml` is the output of
//! [`render_workflow`] for the default matrix and config; `tower-dist
//! workflow --check` keeps the two in sync.

use std::fmt::Write as _;

use crate::config::{PipelineConfig, RUSTFLAGS_VAR};
use crate::matrix::{BuildMatrix, ARTIFACT_INFIX};

/// Render the workflow that runs on every push.
pub fn render_workflow(matrix: &BuildMatrix, config: &PipelineConfig) -> String {
    let mut include = String::new();
    for entry in matrix.entries() {
        // Writing into a String cannot fail.
        let _ = write!(
            include,
            "          - os: {}\n            binary: {}\n",
            entry.platform_name, entry.binary_name
        );
    }

    let output_dir = format!(
        "{}/{}",
        config.target_dir.to_string_lossy().replace('\\', "/"),
        config.profile
    );

    format!(
        "name: release

on: [push]

jobs:
  build:
    name: build (${{{{ matrix.os }}}})
    runs-on: ${{{{ matrix.os }}}}
    strategy:
      fail-fast: false
      matrix:
        include:
{include}    env:
      {RUSTFLAGS_VAR}: \"{rustflags}\"
    steps:
      - uses: actions/checkout@v4
      - name: Install toolchain
        run: {toolchain_command}
      - name: Build
        run: {build_command}
      - uses: actions/upload-artifact@v4
        with:
          name: ${{{{ matrix.os }}}}-{ARTIFACT_INFIX}-${{{{ matrix.binary }}}}
          path: {output_dir}/${{{{ matrix.binary }}}}
          if-no-files-found: error
",
        rustflags = config.rustflags,
        toolchain_command = config.toolchain_command(),
        build_command = config.build_command(),
    )
}

/// Compare a committed workflow with the rendering, ignoring line-ending style.
pub fn is_up_to_date(committed: &str, rendered: &str) -> bool {
    committed.replace("\r\n", "\n") == rendered
}
