//! Upload Staging
//!
//! Writes uploaded bytes into the scratch directory under the staged-upload
//! naming convention so the file locator can find them later.

use std::fs;
use std::path::Path;

use crate::models::{FileCategory, FileKind, FileRecord};
use crate::utils::error::{AppError, AppResult};
use crate::utils::paths::{ensure_dir, staged_file_name, unix_timestamp};

/// Last path component of an uploaded name; rejects names without one.
fn upload_base_name(name: &str) -> AppResult<String> {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name).trim();
    if base.is_empty() || base == "." || base == ".." {
        return Err(AppError::validation(format!("Invalid file name: '{}'", name)));
    }
    Ok(base.to_string())
}

/// Stage `bytes` as `pandas_agent_<ts>_<name>` and describe the result.
pub fn stage_upload(scratch_dir: &Path, name: &str, bytes: &[u8]) -> AppResult<(FileRecord, FileCategory)> {
    let name = upload_base_name(name)?;
    let category = FileCategory::from_file_name(&name);
    let kind = category.file_kind().unwrap_or_else(|| {
        let ext = Path::new(&name)
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        FileKind::Other(ext)
    });

    ensure_dir(scratch_dir)?;
    let path = scratch_dir.join(staged_file_name(unix_timestamp(), &name));
    fs::write(&path, bytes)?;

    tracing::info!(
        "[Staging] Staged '{}' ({} bytes) at {}",
        name,
        bytes.len(),
        path.display()
    );

    Ok((FileRecord::new(name, path, kind), category))
}
