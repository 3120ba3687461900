//! Deterministic Table Summaries
//!
//! Text renderings of loaded tables that need no model: the fallback summary
//! returned when the agent cannot answer, the compact overview attached to
//! error messages, and the profile the agent is primed with.

use std::collections::BTreeMap;

use crate::models::Table;

/// Rows shown in the fallback summary.
pub const SUMMARY_SAMPLE_ROWS: usize = 5;

/// Rows shown per table in an error overview.
const OVERVIEW_SAMPLE_ROWS: usize = 3;

/// Columns listed per table in an error overview.
const OVERVIEW_MAX_COLUMNS: usize = 10;

fn shape_line(table: &Table) -> String {
    format!("{} rows, {} columns", table.row_count(), table.column_count())
}

/// Summary of one table: shape, columns, numeric statistics and the first
/// five rows.
pub fn table_summary(name: &str, table: &Table) -> String {
    let mut parts = vec![
        format!("## Summary of {}", name),
        format!("* Shape: {}", shape_line(table)),
        format!("* Columns: {}", table.columns().join(", ")),
    ];

    if let Some(stats) = table.describe() {
        parts.push("\n### Basic Statistics for Numeric Columns:".to_string());
        parts.push(stats);
    }

    parts.push(format!("\n### Sample Data (First {} rows):", SUMMARY_SAMPLE_ROWS));
    parts.push(table.head(SUMMARY_SAMPLE_ROWS));
    parts.push("\n".to_string());

    parts.join("\n")
}

/// Fallback summary over every table, in key order.
pub fn fallback_summary(tables: &BTreeMap<String, Table>) -> String {
    tables
        .iter()
        .map(|(name, table)| table_summary(name, table))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Compact listing used when an analysis error is reported.
pub fn table_overview(tables: &BTreeMap<String, Table>) -> String {
    let mut lines = Vec::new();
    for (name, table) in tables {
        lines.push(format!("- {}: {}", name, shape_line(table)));
        let columns: Vec<&str> = table
            .columns()
            .iter()
            .take(OVERVIEW_MAX_COLUMNS)
            .map(String::as_str)
            .collect();
        lines.push(format!("  Columns: {}", columns.join(", ")));
        lines.push(format!("  Sample data:\n{}", table.head(OVERVIEW_SAMPLE_ROWS)));
    }
    lines.join("\n")
}

/// Shape, columns and statistics of one table, without sample rows.
pub fn table_profile(table: &Table) -> String {
    let mut profile = format!(
        "Shape: {}\nColumns: {}\n",
        shape_line(table),
        table.columns().join(", ")
    );
    if let Some(stats) = table.describe() {
        profile.push_str("Statistics:\n");
        profile.push_str(&stats);
        profile.push('\n');
    }
    profile
}
