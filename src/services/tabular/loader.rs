//! Table Loader
//!
//! Parses a located file into named tables. The source is always copied to a
//! fresh `safe_<ts>_<name>` scratch file first and parsed from that copy.

use std::fs;
use std::path::{Path, PathBuf};

use calamine::{open_workbook_auto, Data, Reader};

use super::error::{TabularError, TabularResult};
use crate::models::{CellValue, FileKind, FileRecord, Table};
use crate::utils::paths::{safe_copy_name, unix_timestamp};

/// Encodings tried for delimited text, in priority order.
const ENCODINGS: &[&str] = &["utf-8", "latin-1", "iso-8859-1"];

/// Delimiters tried for each encoding, in priority order.
const DELIMITERS: &[u8] = b",;\t|";

/// Tables parsed from one file, keyed and ordered as produced.
#[derive(Debug, Clone)]
pub struct LoadedFile {
    /// The scratch copy the tables were parsed from
    pub scratch_path: PathBuf,
    pub tables: Vec<(String, Table)>,
}

/// Key of one worksheet's table.
pub fn sheet_table_key(file_name: &str, sheet: &str) -> String {
    format!("{} [Sheet: {}]", file_name, sheet)
}

/// Whether `key` names the table of `file_name` or one of its sheets.
pub fn table_belongs_to(key: &str, file_name: &str) -> bool {
    key == file_name
        || key
            .strip_prefix(file_name)
            .map(|rest| rest.starts_with(" [Sheet:"))
            .unwrap_or(false)
}

/// File name part of a table key (drops the sheet qualifier).
pub fn base_file_name(key: &str) -> &str {
    key.split(" [Sheet:").next().unwrap_or(key)
}

fn delimiter_label(delimiter: u8) -> String {
    match delimiter {
        b'\t' => "\\t".to_string(),
        other => (other as char).to_string(),
    }
}

fn decode(bytes: &[u8], encoding: &str) -> Result<String, String> {
    match encoding {
        "utf-8" => {
            let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
            String::from_utf8(bytes.to_vec()).map_err(|e| e.to_string())
        }
        // Every byte maps to the code point of the same value
        _ => Ok(bytes.iter().map(|&b| b as char).collect()),
    }
}

fn parse_delimited(text: &str, delimiter: u8) -> Result<Table, csv::Error> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader.headers()?.iter().map(|h| h.to_string()).collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(CellValue::parse).collect());
    }

    Ok(Table::new(headers, rows))
}

fn cell_from_data(cell: &Data) -> CellValue {
    match cell {
        Data::Empty | Data::Error(_) => CellValue::Null,
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Float(f) => CellValue::Number(*f),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::String(s) => CellValue::text(s),
        other => CellValue::Text(other.to_string()),
    }
}

fn header_from_data(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        other => other.to_string(),
    }
}

/// Parses files into tables through scratch copies.
#[derive(Debug, Clone)]
pub struct TableLoader {
    scratch_dir: PathBuf,
}

impl TableLoader {
    pub fn new(scratch_dir: impl Into<PathBuf>) -> Self {
        Self {
            scratch_dir: scratch_dir.into(),
        }
    }

    /// Load every table in `record.path`.
    pub fn load(&self, record: &FileRecord) -> TabularResult<LoadedFile> {
        tracing::info!(
            "[Loader] Loading '{}' ({}) from {}",
            record.name,
            record.kind.as_str(),
            record.path.display()
        );

        if let FileKind::Other(kind) = &record.kind {
            return Err(TabularError::unsupported(&record.name, kind));
        }

        let scratch_path = self.make_scratch_copy(record)?;

        let parsed = match record.kind {
            FileKind::DelimitedText => self
                .load_delimited(record, &scratch_path)
                .map(|table| vec![(record.name.clone(), table)]),
            _ => self.load_workbook(record, &scratch_path),
        };

        let tables = match parsed {
            Ok(tables) => tables,
            Err(e) => {
                if scratch_path != record.path {
                    discard_scratch_copy(&scratch_path);
                }
                return Err(e);
            }
        };

        Ok(LoadedFile {
            scratch_path,
            tables,
        })
    }

    fn make_scratch_copy(&self, record: &FileRecord) -> TabularResult<PathBuf> {
        if !record.path.is_file() {
            return Err(TabularError::file_not_found(&record.name));
        }

        let scratch_path = self
            .scratch_dir
            .join(safe_copy_name(unix_timestamp(), &record.name));
        if scratch_path == record.path {
            return Ok(scratch_path);
        }

        fs::copy(&record.path, &scratch_path).map_err(|e| {
            TabularError::unparsable(
                &record.name,
                vec![format!("Failed to create scratch copy: {}", e)],
            )
        })?;
        tracing::info!("[Loader] Created safe copy of '{}' at {}", record.name, scratch_path.display());

        Ok(scratch_path)
    }

    /// Try each encoding × delimiter, accepting the first parse with more
    /// than one column. A single-column parse is kept as a last resort.
    fn load_delimited(&self, record: &FileRecord, path: &Path) -> TabularResult<Table> {
        let bytes = fs::read(path)
            .map_err(|e| TabularError::unparsable(&record.name, vec![e.to_string()]))?;

        let mut errors: Vec<String> = Vec::new();
        let mut single_column: Option<Table> = None;

        for encoding in ENCODINGS {
            let text = match decode(&bytes, encoding) {
                Ok(text) => text,
                Err(e) => {
                    errors.push(format!("Failed with {}: {}", encoding, e));
                    continue;
                }
            };

            for &delimiter in DELIMITERS {
                match parse_delimited(&text, delimiter) {
                    Ok(table) if table.column_count() > 1 => {
                        tracing::info!(
                            "[Loader] Loaded '{}' with encoding {} and delimiter '{}': {} rows x {} columns",
                            record.name,
                            encoding,
                            delimiter_label(delimiter),
                            table.row_count(),
                            table.column_count()
                        );
                        return Ok(table);
                    }
                    Ok(table) if table.column_count() == 1 => {
                        single_column.get_or_insert(table);
                    }
                    Ok(_) => errors.push(format!(
                        "Failed with {}/{}: No columns to parse from file",
                        encoding,
                        delimiter_label(delimiter)
                    )),
                    Err(e) => errors.push(format!(
                        "Failed with {}/{}: {}",
                        encoding,
                        delimiter_label(delimiter),
                        e
                    )),
                }
            }
        }

        match single_column {
            Some(table) => {
                tracing::warn!("[Loader] '{}' parsed as a single column", record.name);
                Ok(table)
            }
            None => Err(TabularError::unparsable(&record.name, errors)),
        }
    }

    /// One table per sheet; a lone sheet is keyed by the file name.
    fn load_workbook(&self, record: &FileRecord, path: &Path) -> TabularResult<Vec<(String, Table)>> {
        let mut workbook = open_workbook_auto(path).map_err(|e| {
            TabularError::unparsable(&record.name, vec![format!("Error accessing workbook: {}", e)])
        })?;

        let sheet_names: Vec<String> = workbook.sheet_names().to_vec();
        tracing::info!(
            "[Loader] Workbook '{}' contains {} sheets: {:?}",
            record.name,
            sheet_names.len(),
            sheet_names
        );

        if sheet_names.is_empty() {
            return Err(TabularError::unparsable(&record.name, vec!["Workbook has no sheets".to_string()]));
        }

        let single = sheet_names.len() == 1;
        let mut tables = Vec::with_capacity(sheet_names.len());
        let mut errors = Vec::new();

        for sheet in &sheet_names {
            let range = match workbook.worksheet_range(sheet) {
                Ok(range) => range,
                Err(e) => {
                    tracing::error!("[Loader] Error reading sheet '{}' in {}: {}", sheet, record.name, e);
                    errors.push(format!("Sheet '{}': {}", sheet, e));
                    continue;
                }
            };

            let mut rows = range.rows();
            let headers: Vec<String> = rows
                .next()
                .map(|row| row.iter().map(header_from_data).collect())
                .unwrap_or_default();
            let body: Vec<Vec<CellValue>> = rows
                .map(|row| row.iter().map(cell_from_data).collect())
                .collect();
            let table = Table::new(headers, body);

            tracing::info!(
                "[Loader] Sheet '{}' loaded: {} rows x {} columns",
                sheet,
                table.row_count(),
                table.column_count()
            );

            let key = if single {
                record.name.clone()
            } else {
                sheet_table_key(&record.name, sheet)
            };
            tables.push((key, table));
        }

        if tables.is_empty() {
            return Err(TabularError::unparsable(&record.name, errors));
        }
        Ok(tables)
    }
}

/// A copy that failed to parse must not be picked up by a later locate.
fn discard_scratch_copy(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        tracing::warn!("[Loader] Failed to remove scratch copy {}: {}", path.display(), e);
    }
}
