//! Conversation Session
//!
//! Everything one conversation holds: its tables, the files they came from
//! (oldest first), the tracked path of each file, the cached agent and the
//! names of every file ever uploaded.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use super::agent::ReasoningAgent;
use super::loader::table_belongs_to;
use crate::models::{FileRecord, Table};

/// Per-conversation table state.
///
/// `files` and `file_paths` are parallel and ordered by insertion; the front
/// is the eviction candidate.
#[derive(Default)]
pub struct ConversationSession {
    tables: BTreeMap<String, Table>,
    files: Vec<FileRecord>,
    file_paths: Vec<PathBuf>,
    agent: Option<Arc<dyn ReasoningAgent>>,
    upload_history: Vec<String>,
}

impl ConversationSession {
    pub fn tables(&self) -> &BTreeMap<String, Table> {
        &self.tables
    }

    pub fn table_keys(&self) -> Vec<String> {
        self.tables.keys().cloned().collect()
    }

    pub fn files(&self) -> &[FileRecord] {
        &self.files
    }

    pub fn file_names(&self) -> Vec<String> {
        self.files.iter().map(|f| f.name.clone()).collect()
    }

    pub fn upload_history(&self) -> &[String] {
        &self.upload_history
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.files.iter().position(|f| f.name == name)
    }

    /// Tracked path of `name`, if the file is present.
    pub fn tracked_path(&self, name: &str) -> Option<&PathBuf> {
        self.position(name).and_then(|idx| self.file_paths.get(idx))
    }

    /// Tables produced by `name` (the file's own key or its sheet keys).
    pub fn tables_for(&self, name: &str) -> Vec<(String, Table)> {
        self.tables
            .iter()
            .filter(|(key, _)| table_belongs_to(key, name))
            .map(|(key, table)| (key.clone(), table.clone()))
            .collect()
    }

    pub fn agent(&self) -> Option<Arc<dyn ReasoningAgent>> {
        self.agent.clone()
    }

    pub fn set_agent(&mut self, agent: Arc<dyn ReasoningAgent>) {
        self.agent = Some(agent);
    }

    fn remove_tables_of(&mut self, name: &str) {
        self.tables.retain(|key, _| !table_belongs_to(key, name));
    }

    fn remove_at(&mut self, idx: usize) -> (FileRecord, PathBuf) {
        let record = self.files.remove(idx);
        let path = if idx < self.file_paths.len() {
            self.file_paths.remove(idx)
        } else {
            record.path.clone()
        };
        self.remove_tables_of(&record.name);
        self.agent = None;
        (record, path)
    }

    /// Remove the oldest file and its tables.
    pub fn evict_oldest(&mut self) -> Option<(FileRecord, PathBuf)> {
        if self.files.is_empty() {
            return None;
        }
        Some(self.remove_at(0))
    }

    /// Insert a freshly loaded file at the back of the queue.
    ///
    /// A file already present under the same name is removed first and
    /// returned so the caller can clean up its disk state.
    pub fn install(
        &mut self,
        record: FileRecord,
        tracked_path: PathBuf,
        tables: Vec<(String, Table)>,
    ) -> Option<(FileRecord, PathBuf)> {
        let superseded = self.position(&record.name).map(|idx| self.remove_at(idx));

        if !self.upload_history.contains(&record.name) {
            self.upload_history.push(record.name.clone());
        }
        self.files.push(record);
        self.file_paths.push(tracked_path);
        self.tables.extend(tables);
        self.agent = None;

        superseded
    }
}
