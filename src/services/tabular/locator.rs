//! File Locator
//!
//! Finds the physical file behind a logical upload name. Uploads are staged
//! under several prefixes during their lifetime, so when the declared path
//! is gone the scratch directory is searched in tiers:
//!
//! 1. staged uploads (`pandas_agent_*`) containing the name
//! 2. loader copies (`safe_*`) containing the sanitized name
//! 3. any entry ending with the name
//! 4. entries containing at least half of the name's tokens
//!
//! The first non-empty tier wins; within a tier the most recently created
//! entry is taken.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use super::error::{TabularError, TabularResult};
use crate::utils::paths::{sanitize_file_name, SAFE_COPY_PREFIX, STAGED_PREFIX};

#[derive(Debug)]
struct Candidate {
    path: PathBuf,
    created: SystemTime,
}

fn created_at(path: &Path) -> SystemTime {
    fs::metadata(path)
        .and_then(|m| m.created().or_else(|_| m.modified()))
        .unwrap_or(SystemTime::UNIX_EPOCH)
}

fn newest(candidates: Vec<Candidate>) -> Option<PathBuf> {
    candidates
        .into_iter()
        .max_by_key(|c| c.created)
        .map(|c| c.path)
}

/// Tokens of length > 2 from the lowercased name, split on `_`, `.`, `-`
/// and whitespace.
fn name_tokens(name_lower: &str) -> Vec<&str> {
    name_lower
        .split(|c: char| c == '_' || c == '.' || c == '-' || c.is_whitespace())
        .filter(|part| part.chars().count() > 2)
        .collect()
}

/// Tiered search over a scratch directory.
#[derive(Debug, Clone)]
pub struct FileLocator {
    scratch_dir: PathBuf,
}

impl FileLocator {
    pub fn new(scratch_dir: impl Into<PathBuf>) -> Self {
        Self {
            scratch_dir: scratch_dir.into(),
        }
    }

    pub fn scratch_dir(&self) -> &Path {
        &self.scratch_dir
    }

    /// Resolve `name` to an existing path.
    ///
    /// The declared path wins when it exists; otherwise the tiered search
    /// runs, then a last look for loader copies by sanitized-name glob.
    pub fn locate(&self, name: &str, declared: Option<&Path>) -> TabularResult<PathBuf> {
        if let Some(path) = declared.filter(|p| p.exists()) {
            return Ok(path.to_path_buf());
        }

        if let Some(found) = self.search(name) {
            tracing::info!("[Locator] Found alternative path for '{}': {}", name, found.display());
            return Ok(found);
        }

        if let Some(copy) = self.find_safe_copy(name) {
            tracing::info!("[Locator] Found safe copy for '{}': {}", name, copy.display());
            return Ok(copy);
        }

        tracing::error!(
            "[Locator] File path for '{}' is invalid or does not exist (path: {})",
            name,
            declared.map(|p| p.display().to_string()).unwrap_or_default()
        );
        Err(TabularError::file_not_found(name))
    }

    /// Run the tiered match over the scratch directory.
    pub fn search(&self, name: &str) -> Option<PathBuf> {
        if name.trim().is_empty() {
            return None;
        }

        let entries = match fs::read_dir(&self.scratch_dir) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::error!(
                    "[Locator] Error reading scratch directory {}: {}",
                    self.scratch_dir.display(),
                    e
                );
                return None;
            }
        };

        let name_lower = name.to_lowercase();
        let clean_lower = sanitize_file_name(name).to_lowercase();
        let tokens = name_tokens(&name_lower);

        let mut staged = Vec::new();
        let mut safe_copies = Vec::new();
        let mut suffixed = Vec::new();
        let mut partial: Vec<(Candidate, usize)> = Vec::new();

        for entry in entries.flatten() {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let entry_lower = entry.file_name().to_string_lossy().to_lowercase();
            // Supersession backups are never served
            if entry_lower.ends_with(".bak") {
                continue;
            }
            let candidate = Candidate {
                created: created_at(&path),
                path,
            };

            if entry_lower.starts_with(STAGED_PREFIX) && entry_lower.contains(&name_lower) {
                staged.push(candidate);
            } else if entry_lower.starts_with(SAFE_COPY_PREFIX) && entry_lower.contains(&clean_lower) {
                safe_copies.push(candidate);
            } else if entry_lower.ends_with(&name_lower) {
                suffixed.push(candidate);
            } else {
                let score = tokens.iter().filter(|t| entry_lower.contains(*t)).count();
                if score > 0 && score >= tokens.len() / 2 {
                    partial.push((candidate, score));
                }
            }
        }

        newest(staged)
            .or_else(|| newest(safe_copies))
            .or_else(|| newest(suffixed))
            .or_else(|| {
                partial
                    .into_iter()
                    .max_by(|(a, sa), (b, sb)| sa.cmp(sb).then(a.created.cmp(&b.created)))
                    .map(|(c, _)| c.path)
            })
    }

    /// Newest `safe_*_<sanitized name>` in the scratch directory.
    pub fn find_safe_copy(&self, name: &str) -> Option<PathBuf> {
        let dir = glob::Pattern::escape(&self.scratch_dir.to_string_lossy());
        let pattern = format!("{}/{}*_{}", dir, SAFE_COPY_PREFIX, sanitize_file_name(name));

        let paths = match glob::glob(&pattern) {
            Ok(paths) => paths,
            Err(e) => {
                tracing::error!("[Locator] Error looking for safe copies: {}", e);
                return None;
            }
        };

        newest(
            paths
                .filter_map(Result::ok)
                .filter(|p| p.is_file())
                .map(|path| Candidate {
                    created: created_at(&path),
                    path,
                })
                .collect(),
        )
    }
}
