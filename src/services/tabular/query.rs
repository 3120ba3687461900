//! Query Preparation
//!
//! Checks a query against the conversation's upload history and rewrites it
//! so the agent works on the in-memory tables instead of reaching for disk.

use super::loader::{base_file_name, table_belongs_to};

/// Words that make a query about "the data" without naming a table.
const GENERIC_TABLE_TERMS: &[&str] = &[
    "csv",
    "excel",
    "xlsx",
    "xls",
    "spreadsheet",
    "workbook",
    "worksheet",
    "sheet",
    "dataframe",
    "table",
    "file",
];

/// First previously uploaded file the query names that has no table any more.
///
/// Names of files still held are blanked out of the query first, so an
/// evicted name that is a substring of a loaded one never matches.
pub fn find_unavailable_file(query: &str, table_keys: &[String], upload_history: &[String]) -> Option<String> {
    let mut query_lower = query.to_lowercase();
    for key in table_keys {
        let held = base_file_name(key).to_lowercase();
        if !held.trim().is_empty() {
            query_lower = query_lower.replace(&held, " ");
        }
    }

    upload_history
        .iter()
        .filter(|name| !name.trim().is_empty())
        .filter(|name| query_lower.contains(&name.to_lowercase()))
        .find(|name| !table_keys.iter().any(|key| table_belongs_to(key, name)))
        .cloned()
}

/// Table keys the query names, directly or through their file name.
pub fn mentioned_tables(query: &str, table_keys: &[String]) -> Vec<String> {
    let query_lower = query.to_lowercase();
    table_keys
        .iter()
        .filter(|key| {
            query_lower.contains(&key.to_lowercase())
                || query_lower.contains(&base_file_name(key).to_lowercase())
        })
        .cloned()
        .collect()
}

fn mentions_generic_term(query: &str) -> bool {
    let query_lower = query.to_lowercase();
    GENERIC_TABLE_TERMS.iter().any(|term| query_lower.contains(term))
}

fn quoted_list(keys: &[String]) -> String {
    keys.iter()
        .map(|k| format!("'{}'", k))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Prefix the query with instructions naming the loaded tables.
///
/// - a query naming a table is pinned to that table
/// - a generic data question, or any question over several tables, gets the
///   list of available tables
/// - otherwise the query is passed through unchanged
pub fn rewrite_query(query: &str, table_keys: &[String]) -> String {
    let mentioned = mentioned_tables(query, table_keys);

    if !mentioned.is_empty() {
        let subject = if mentioned.len() == 1 {
            format!("The dataframe for '{}' is", mentioned[0])
        } else {
            format!("The dataframes for {} are", quoted_list(&mentioned))
        };
        return format!(
            "{} ALREADY LOADED. DO NOT try to load the file from disk.\n\
             Instead, use the dataframe that is already available to you.\n\n\
             Analyze this dataframe to answer: {}",
            subject, query
        );
    }

    if !table_keys.is_empty() && (mentions_generic_term(query) || table_keys.len() > 1) {
        return format!(
            "Available dataframes: {}\n\
             DO NOT try to load any files from disk - the data is already loaded.\n\n{}",
            quoted_list(table_keys),
            query
        );
    }

    query.to_string()
}

/// Whether an agent answer is unusable and should be replaced by a summary.
pub fn needs_fallback(answer: &str) -> bool {
    answer.trim().is_empty()
        || answer.contains("I don't have access to")
        || answer.to_lowercase().contains("not find")
}
