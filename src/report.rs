//! Terminal rendering of requirement reports.

use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use crate::requirements::{join_ports, Grade, Measurement, RequirementReport};

const UNITS: [&str; 6] = ["B", "KiB", "MiB", "GiB", "TiB", "PiB"];

/// Format a byte count with the largest binary unit that keeps the value >= 1.
#[allow(clippy::cast_precision_loss, clippy::arithmetic_side_effects)]
pub fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let mut value = bytes as f64;
    let mut unit = 0usize;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.2} {}", UNITS[unit])
}

/// Colour associated with a grade.
pub fn grade_color(grade: Grade) -> Color {
    match grade {
        Grade::Insufficient => Color::Red,
        Grade::Acceptable => Color::Yellow,
        Grade::Recommended => Color::Green,
    }
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label).add_attribute(Attribute::Bold)
}

fn render_value(measurement: &Measurement, value: u64) -> String {
    if measurement.resource.is_bytes() {
        format_bytes(value)
    } else {
        value.to_string()
    }
}

/// Build the requirements table: one row per resource plus a ports row.
pub fn requirements_table(report: &RequirementReport) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            header_cell(""),
            header_cell("Required"),
            header_cell("Expected"),
            header_cell("Actual"),
        ]);

    for m in &report.measurements {
        table.add_row(vec![
            Cell::new(m.resource.label()),
            Cell::new(render_value(m, m.required)).set_alignment(CellAlignment::Right),
            Cell::new(render_value(m, m.expected)).set_alignment(CellAlignment::Right),
            Cell::new(render_value(m, m.actual))
                .set_alignment(CellAlignment::Right)
                .fg(grade_color(m.grade))
                .add_attribute(Attribute::Bold),
        ]);
    }

    let port_cell = if report.ports.unavailable.is_empty() {
        Cell::new("Ok").fg(Color::Green)
    } else {
        Cell::new(join_ports(&report.ports.unavailable)).fg(Color::Red)
    };
    table.add_row(vec![
        Cell::new("ports"),
        Cell::new(join_ports(&report.ports.required)),
        Cell::new("-"),
        port_cell.add_attribute(Attribute::Bold),
    ]);

    table
}

/// Print the requirements table to stdout.
pub fn print_requirements(report: &RequirementReport) {
    println!("{}", requirements_table(report));
}
