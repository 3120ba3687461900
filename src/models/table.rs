//! Table Model
//!
//! In-memory two-dimensional dataset produced from one delimited file or one
//! worksheet, plus the descriptive helpers used by the fallback summary and
//! by the reasoning agent's priming context.

use std::collections::HashSet;
use std::fmt;

/// Markers normalized to `CellValue::Null` when reading delimited text.
const NA_MARKERS: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// Longest cell text shown when rendering a table.
const MAX_CELL_WIDTH: usize = 50;

/// A single scalar cell.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
}

impl CellValue {
    /// Interpret raw text read from a delimited file.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if NA_MARKERS.contains(&trimmed) {
            return CellValue::Null;
        }
        if let Ok(n) = trimmed.parse::<f64>() {
            return CellValue::Number(n);
        }
        if trimmed.eq_ignore_ascii_case("true") {
            return CellValue::Bool(true);
        }
        if trimmed.eq_ignore_ascii_case("false") {
            return CellValue::Bool(false);
        }
        CellValue::Text(raw.to_string())
    }

    /// Text cell from a typed source (workbooks): markers become null, but
    /// numeric-looking text stays text.
    pub fn text(raw: &str) -> Self {
        if NA_MARKERS.contains(&raw.trim()) {
            CellValue::Null
        } else {
            CellValue::Text(raw.to_string())
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) if !n.is_nan() => Some(*n),
            _ => None,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Null => write!(f, "NaN"),
            CellValue::Bool(true) => write!(f, "True"),
            CellValue::Bool(false) => write!(f, "False"),
            CellValue::Number(n) => write!(f, "{}", format_number(*n)),
            CellValue::Text(s) => write!(f, "{}", s),
        }
    }
}

fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

/// Trim headers, name blank ones `Unnamed: <i>` and suffix duplicates `.1`, `.2`, ...
pub fn normalize_headers(raw: Vec<String>) -> Vec<String> {
    let mut taken: HashSet<String> = HashSet::new();
    let mut out = Vec::with_capacity(raw.len());

    for (i, header) in raw.into_iter().enumerate() {
        let trimmed = header.trim();
        let base = if trimmed.is_empty() {
            format!("Unnamed: {}", i)
        } else {
            trimmed.to_string()
        };

        let mut name = base.clone();
        let mut suffix = 0;
        while taken.contains(&name) {
            suffix += 1;
            name = format!("{}.{}", base, suffix);
        }
        taken.insert(name.clone());
        out.push(name);
    }

    out
}

/// Descriptive statistics for one numeric column.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnStats {
    pub count: usize,
    pub mean: f64,
    /// Sample standard deviation; `None` with fewer than two values
    pub std: Option<f64>,
    pub min: f64,
    pub q25: f64,
    pub q50: f64,
    pub q75: f64,
    pub max: f64,
}

impl ColumnStats {
    fn from_values(mut values: Vec<f64>) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        values.sort_by(|a, b| a.total_cmp(b));

        let count = values.len();
        let mean = values.iter().sum::<f64>() / count as f64;
        let std = if count > 1 {
            let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (count - 1) as f64;
            Some(var.sqrt())
        } else {
            None
        };

        Some(Self {
            count,
            mean,
            std,
            min: values[0],
            q25: quantile(&values, 0.25),
            q50: quantile(&values, 0.5),
            q75: quantile(&values, 0.75),
            max: values[count - 1],
        })
    }
}

/// Linear-interpolated quantile over sorted, non-empty values.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

/// A named two-dimensional dataset.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<CellValue>>,
}

impl Table {
    /// Build a table; headers are normalized and rows padded or cut to the
    /// header width.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<CellValue>>) -> Self {
        let columns = normalize_headers(columns);
        let width = columns.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, CellValue::Null);
                row
            })
            .collect();
        Self { columns, rows }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<CellValue>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Indices of columns whose non-null values are all numbers (at least one).
    pub fn numeric_columns(&self) -> Vec<usize> {
        (0..self.columns.len())
            .filter(|&idx| {
                let mut seen_number = false;
                for row in &self.rows {
                    match &row[idx] {
                        CellValue::Null => {}
                        CellValue::Number(_) => seen_number = true,
                        _ => return false,
                    }
                }
                seen_number
            })
            .collect()
    }

    /// Statistics for the column at `idx`, if it holds any numbers.
    pub fn column_stats(&self, idx: usize) -> Option<ColumnStats> {
        let values: Vec<f64> = self
            .rows
            .iter()
            .filter_map(|row| row.get(idx).and_then(CellValue::as_number))
            .collect();
        ColumnStats::from_values(values)
    }

    /// Render count/mean/std/min/quartiles/max for every numeric column.
    ///
    /// Returns `None` when the table has no numeric column.
    pub fn describe(&self) -> Option<String> {
        let numeric: Vec<(usize, ColumnStats)> = self
            .numeric_columns()
            .into_iter()
            .filter_map(|idx| self.column_stats(idx).map(|s| (idx, s)))
            .collect();
        if numeric.is_empty() {
            return None;
        }

        let header: Vec<String> = numeric.iter().map(|(idx, _)| self.columns[*idx].clone()).collect();
        let labels = ["count", "mean", "std", "min", "25%", "50%", "75%", "max"];
        let index: Vec<String> = labels.iter().map(|l| l.to_string()).collect();

        let fixed = |v: f64| format!("{:.6}", v);
        let body: Vec<Vec<String>> = labels
            .iter()
            .map(|label| {
                numeric
                    .iter()
                    .map(|(_, s)| match *label {
                        "count" => fixed(s.count as f64),
                        "mean" => fixed(s.mean),
                        "std" => s.std.map(fixed).unwrap_or_else(|| "NaN".to_string()),
                        "min" => fixed(s.min),
                        "25%" => fixed(s.q25),
                        "50%" => fixed(s.q50),
                        "75%" => fixed(s.q75),
                        _ => fixed(s.max),
                    })
                    .collect()
            })
            .collect();

        Some(render_grid(&header, &index, &body))
    }

    /// Render the first `n` rows as an aligned text grid with a row index.
    pub fn head(&self, n: usize) -> String {
        if self.columns.is_empty() {
            return "Empty table (no columns)".to_string();
        }
        let shown: Vec<&Vec<CellValue>> = self.rows.iter().take(n).collect();
        let index: Vec<String> = (0..shown.len()).map(|i| i.to_string()).collect();
        let body: Vec<Vec<String>> = shown
            .iter()
            .map(|row| row.iter().map(|cell| truncate_cell(&cell.to_string())).collect())
            .collect();
        render_grid(&self.columns, &index, &body)
    }

    /// The header and first `limit` rows as comma-separated text.
    pub fn to_csv_text(&self, limit: usize) -> String {
        self.write_csv(limit).unwrap_or_default()
    }

    fn write_csv(&self, limit: usize) -> Result<String, csv::Error> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(&self.columns)?;
        for row in self.rows.iter().take(limit) {
            writer.write_record(row.iter().map(|cell| match cell {
                CellValue::Null => String::new(),
                other => other.to_string(),
            }))?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|e| csv::Error::from(e.into_error()))?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

fn truncate_cell(text: &str) -> String {
    if text.chars().count() <= MAX_CELL_WIDTH {
        return text.to_string();
    }
    let cut: String = text.chars().take(MAX_CELL_WIDTH - 3).collect();
    format!("{}...", cut)
}

/// Right-aligned columns, left-aligned index, two spaces between columns.
fn render_grid(header: &[String], index: &[String], body: &[Vec<String>]) -> String {
    let index_width = index.iter().map(|s| s.chars().count()).max().unwrap_or(0);
    let mut widths: Vec<usize> = header.iter().map(|h| h.chars().count()).collect();
    for row in body {
        for (i, cell) in row.iter().enumerate() {
            if let Some(w) = widths.get_mut(i) {
                *w = (*w).max(cell.chars().count());
            }
        }
    }

    let mut lines = Vec::with_capacity(body.len() + 1);

    let mut line = " ".repeat(index_width);
    for (h, w) in header.iter().zip(&widths) {
        line.push_str("  ");
        line.push_str(&format!("{:>width$}", h, width = *w));
    }
    lines.push(line);

    for (label, row) in index.iter().zip(body) {
        let mut line = format!("{:<width$}", label, width = index_width);
        for (cell, w) in row.iter().zip(&widths) {
            line.push_str("  ");
            line.push_str(&format!("{:>width$}", cell, width = *w));
        }
        lines.push(line);
    }

    lines.join("\n")
}
