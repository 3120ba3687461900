//! Conversation Table Store
//!
//! Owns every conversation's session and enforces the retention rules:
//! at most `max_files` files per conversation, oldest evicted first, and a
//! re-upload under an existing name supersedes the old file.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;

use super::error::TabularError;
use super::loader::TableLoader;
use super::locator::FileLocator;
use super::session::ConversationSession;
use crate::models::{FileRecord, Table};
use crate::utils::paths::backup_path;

/// Default number of files retained per conversation.
pub const DEFAULT_MAX_FILES: usize = 3;

/// Result of adding one file to a conversation.
#[derive(Debug, Default)]
pub struct AddFileOutcome {
    /// Tables now served for the file; stale tables when a reload failed
    pub tables: Option<Vec<(String, Table)>>,
    /// Why the file could not be loaded (never set while stale tables are served)
    pub error: Option<TabularError>,
    /// Files evicted to make room
    pub evicted: Vec<String>,
}

impl AddFileOutcome {
    fn served(tables: Vec<(String, Table)>) -> Self {
        Self {
            tables: Some(tables),
            ..Default::default()
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.tables.is_some()
    }
}

fn remove_file_logged(path: &Path, reason: &str) {
    if !path.exists() {
        return;
    }
    match fs::remove_file(path) {
        Ok(()) => tracing::info!("[TableStore] Deleted {} file: {}", reason, path.display()),
        Err(e) => tracing::warn!("[TableStore] Could not delete {} file {}: {}", reason, path.display(), e),
    }
}

fn backup_and_remove(path: &Path) {
    if !path.exists() {
        return;
    }
    let backup = backup_path(path);
    match fs::copy(path, &backup) {
        Ok(_) => tracing::info!("[TableStore] Created backup of old file: {}", backup.display()),
        Err(e) => tracing::warn!("[TableStore] Failed to create backup of {}: {}", path.display(), e),
    }
    remove_file_logged(path, "superseded");
}

/// Per-conversation table state, keyed by conversation id.
pub struct ConversationTableStore {
    sessions: DashMap<String, Arc<Mutex<ConversationSession>>>,
    locator: FileLocator,
    loader: TableLoader,
    max_files: usize,
}

impl ConversationTableStore {
    pub fn new(scratch_dir: impl Into<PathBuf>, max_files: usize) -> Self {
        let scratch_dir = scratch_dir.into();
        Self {
            sessions: DashMap::new(),
            locator: FileLocator::new(scratch_dir.clone()),
            loader: TableLoader::new(scratch_dir),
            max_files: max_files.max(1),
        }
    }

    pub fn max_files(&self) -> usize {
        self.max_files
    }

    pub fn scratch_dir(&self) -> &Path {
        self.locator.scratch_dir()
    }

    /// Session handle for `conversation_id`, created on first use.
    pub fn session(&self, conversation_id: &str) -> Arc<Mutex<ConversationSession>> {
        let entry = self
            .sessions
            .entry(conversation_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(ConversationSession::default())));
        Arc::clone(entry.value())
    }

    pub fn has_session(&self, conversation_id: &str) -> bool {
        self.sessions.contains_key(conversation_id)
    }

    /// Current file names of a conversation, oldest first.
    pub async fn file_names(&self, conversation_id: &str) -> Vec<String> {
        match self.sessions.get(conversation_id).map(|s| Arc::clone(s.value())) {
            Some(session) => session.lock().await.file_names(),
            None => Vec::new(),
        }
    }

    /// Current file records of a conversation, oldest first.
    pub async fn files(&self, conversation_id: &str) -> Vec<FileRecord> {
        match self.sessions.get(conversation_id).map(|s| Arc::clone(s.value())) {
            Some(session) => session.lock().await.files().to_vec(),
            None => Vec::new(),
        }
    }

    /// Current table keys of a conversation.
    pub async fn table_keys(&self, conversation_id: &str) -> Vec<String> {
        match self.sessions.get(conversation_id).map(|s| Arc::clone(s.value())) {
            Some(session) => session.lock().await.table_keys(),
            None => Vec::new(),
        }
    }

    /// Add (or refresh) one file in a conversation.
    pub async fn add_file(&self, conversation_id: &str, record: FileRecord) -> AddFileOutcome {
        let session = self.session(conversation_id);
        let mut session = session.lock().await;
        self.add_file_to_session(conversation_id, &mut session, record)
    }

    /// Add a file to an already locked session.
    pub fn add_file_to_session(
        &self,
        conversation_id: &str,
        session: &mut ConversationSession,
        record: FileRecord,
    ) -> AddFileOutcome {
        let name = record.name.clone();

        let located = match self.locator.locate(&name, Some(&record.path)) {
            Ok(path) => path,
            Err(e) => return Self::stale_or_error(session, &name, e),
        };

        // Same name resolving to the tracked source: nothing changed
        if session.tracked_path(&name) == Some(&located) {
            let tables = session.tables_for(&name);
            if !tables.is_empty() {
                tracing::info!(
                    "[TableStore] File '{}' already loaded for conversation {}",
                    name,
                    conversation_id
                );
                return AddFileOutcome::served(tables);
            }
        }

        let mut evicted = Vec::new();
        if session.position(&name).is_none() {
            while session.files().len() >= self.max_files {
                let Some((old, old_path)) = session.evict_oldest() else {
                    break;
                };
                tracing::info!(
                    "[TableStore] Removing oldest file '{}' from conversation {} to stay within the {}-file limit",
                    old.name,
                    conversation_id,
                    self.max_files
                );
                remove_file_logged(&old_path, "evicted");
                if old.path != old_path {
                    remove_file_logged(&old.path, "evicted scratch");
                }
                evicted.push(old.name);
            }
        }

        let loaded = match self.loader.load(&record.with_path(&located)) {
            Ok(loaded) => loaded,
            Err(e) => {
                let mut outcome = Self::stale_or_error(session, &name, e);
                outcome.evicted = evicted;
                return outcome;
            }
        };

        let stored = record.with_path(&loaded.scratch_path);
        if let Some((old, old_path)) = session.install(stored, located.clone(), loaded.tables.clone()) {
            tracing::info!(
                "[TableStore] Replacing file '{}' in conversation {}",
                old.name,
                conversation_id
            );
            if old_path != located {
                backup_and_remove(&old_path);
            }
            if old.path != loaded.scratch_path && old.path != old_path {
                remove_file_logged(&old.path, "superseded scratch");
            }
        }

        tracing::info!(
            "[TableStore] Loaded '{}' into conversation {} ({} table(s), {} file(s) held)",
            name,
            conversation_id,
            loaded.tables.len(),
            session.files().len()
        );

        AddFileOutcome {
            tables: Some(loaded.tables),
            error: None,
            evicted,
        }
    }

    fn stale_or_error(session: &ConversationSession, name: &str, error: TabularError) -> AddFileOutcome {
        let stale = session.tables_for(name);
        if stale.is_empty() {
            tracing::error!("[TableStore] Failed to load '{}': {}", name, error);
            return AddFileOutcome {
                tables: None,
                error: Some(error),
                evicted: Vec::new(),
            };
        }
        tracing::warn!(
            "[TableStore] Failed to reload '{}', serving previously loaded tables: {}",
            name,
            error
        );
        AddFileOutcome::served(stale)
    }

    /// Drop a conversation and its scratch files.
    pub async fn remove_conversation(&self, conversation_id: &str) -> bool {
        let Some((_, session)) = self.sessions.remove(conversation_id) else {
            return false;
        };
        let session = session.lock().await;
        for record in session.files() {
            remove_file_logged(&record.path, "conversation scratch");
        }
        tracing::info!("[TableStore] Removed conversation {}", conversation_id);
        true
    }
}
