//! File Record Models
//!
//! Metadata for uploaded artifacts and their classification.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Declared kind of a tabular file.
///
/// Serialized as the short type tag stored in the conversation registry
/// (`"csv"`, `"excel"`); unknown tags round-trip through `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FileKind {
    DelimitedText,
    Workbook,
    Other(String),
}

impl FileKind {
    pub fn as_str(&self) -> &str {
        match self {
            FileKind::DelimitedText => "csv",
            FileKind::Workbook => "excel",
            FileKind::Other(tag) => tag,
        }
    }
}

impl From<String> for FileKind {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "csv" => FileKind::DelimitedText,
            "excel" => FileKind::Workbook,
            _ => FileKind::Other(tag),
        }
    }
}

impl From<FileKind> for String {
    fn from(kind: FileKind) -> String {
        kind.as_str().to_string()
    }
}

/// One uploaded artifact tracked in a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    pub name: String,
    pub path: PathBuf,
    #[serde(rename = "type")]
    pub kind: FileKind,
}

impl FileRecord {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>, kind: FileKind) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            kind,
        }
    }

    /// Same record pointing at a different physical path.
    pub fn with_path(&self, path: &Path) -> Self {
        Self {
            name: self.name.clone(),
            path: path.to_path_buf(),
            kind: self.kind.clone(),
        }
    }
}

/// Routing category of an uploaded file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileCategory {
    DelimitedText,
    Workbook,
    Image,
    Document,
    Other,
}

const WORKBOOK_EXTENSIONS: &[&str] = &["xlsx", "xls", "xlsm"];
const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "bmp", "webp"];
const DOCUMENT_EXTENSIONS: &[&str] = &["pdf", "doc", "docx", "txt", "md", "html", "json"];

impl FileCategory {
    /// Classify by extension (case-insensitive).
    pub fn from_file_name(name: &str) -> Self {
        let ext = Path::new(name)
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        if ext == "csv" {
            FileCategory::DelimitedText
        } else if WORKBOOK_EXTENSIONS.contains(&ext.as_str()) {
            FileCategory::Workbook
        } else if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
            FileCategory::Image
        } else if DOCUMENT_EXTENSIONS.contains(&ext.as_str()) {
            FileCategory::Document
        } else {
            FileCategory::Other
        }
    }

    /// The tabular kind for categories handled by the table store.
    pub fn file_kind(&self) -> Option<FileKind> {
        match self {
            FileCategory::DelimitedText => Some(FileKind::DelimitedText),
            FileCategory::Workbook => Some(FileKind::Workbook),
            _ => None,
        }
    }

    pub fn is_tabular(&self) -> bool {
        self.file_kind().is_some()
    }
}
