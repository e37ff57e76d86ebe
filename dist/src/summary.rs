//! Terminal summary of a pipeline run.

use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use tower_installer::report::format_bytes;

use crate::pipeline::RunReport;

fn header_cell(label: &str) -> Cell {
    Cell::new(label).add_attribute(Attribute::Bold)
}

/// One row per job: platform, artifact, status, size, duration.
pub fn summary_table(report: &RunReport) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            header_cell("Platform"),
            header_cell("Artifact"),
            header_cell("Status"),
            header_cell("Size"),
            header_cell("Time"),
        ]);

    for outcome in &report.outcomes {
        let (status, size) = match &outcome.result {
            Ok(artifact) => (
                Cell::new("published").fg(Color::Green),
                Cell::new(format_bytes(artifact.size)),
            ),
            Err(e) => (
                Cell::new(e.label()).fg(Color::Red),
                Cell::new("-"),
            ),
        };
        table.add_row(vec![
            Cell::new(&outcome.entry.platform_name),
            Cell::new(outcome.entry.artifact_name()),
            status.add_attribute(Attribute::Bold),
            size.set_alignment(CellAlignment::Right),
            Cell::new(format!("{:.1}s", outcome.duration.as_secs_f64()))
                .set_alignment(CellAlignment::Right),
        ]);
    }
    table
}

/// Print the summary, then the error of every failed job to stderr.
pub fn print_summary(report: &RunReport) {
    if let Some(commit) = &report.commit {
        println!("Commit: {commit}");
    }
    println!("{}", summary_table(report));
    let failures = report.failures();
    if failures.is_empty() {
        return;
    }
    eprintln!("Errors:");
    for outcome in failures {
        if let Err(e) = &outcome.result {
            eprintln!("- {}: {e}", outcome.entry.platform_name);
        }
    }
}
