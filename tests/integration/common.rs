//! Shared fixtures: files on disk, workbook packages, scripted agents and an
//! in-memory assistant platform.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use analyst_gateway::models::{AppConfig, FileKind, FileRecord, Table};
use analyst_gateway::services::platform::{AssistantPlatform, NewMessage, PlatformMessage};
use analyst_gateway::services::tabular::{
    AgentBuilder, AgentInput, AgentOutput, ReasoningAgent, TabularError, TabularResult,
};
use analyst_gateway::state::AppState;
use analyst_gateway::utils::error::AppResult;

// ============================================================================
// Files
// ============================================================================

/// Write a staged CSV upload and return its record.
pub fn staged_csv(dir: &Path, name: &str, body: &str) -> FileRecord {
    let path = dir.join(format!("pandas_agent_1700000000_{}", name));
    fs::write(&path, body).unwrap();
    FileRecord::new(name, path, FileKind::DelimitedText)
}

fn column_letter(mut idx: usize) -> String {
    let mut letters = Vec::new();
    loop {
        letters.push((b'A' + (idx % 26) as u8) as char);
        if idx < 26 {
            break;
        }
        idx = idx / 26 - 1;
    }
    letters.iter().rev().collect()
}

fn sheet_xml(rows: &[Vec<&str>]) -> String {
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>"#,
    );
    for (r, row) in rows.iter().enumerate() {
        xml.push_str(&format!(r#"<row r="{}">"#, r + 1));
        for (c, value) in row.iter().enumerate() {
            let cell_ref = format!("{}{}", column_letter(c), r + 1);
            if value.parse::<f64>().is_ok() {
                xml.push_str(&format!(r#"<c r="{}"><v>{}</v></c>"#, cell_ref, value));
            } else {
                xml.push_str(&format!(
                    r#"<c r="{}" t="inlineStr"><is><t>{}</t></is></c>"#,
                    cell_ref, value
                ));
            }
        }
        xml.push_str("</row>");
    }
    xml.push_str("</sheetData></worksheet>");
    xml
}

/// Write a minimal `.xlsx` package with one worksheet per entry.
pub fn write_workbook(path: &Path, sheets: &[(&str, Vec<Vec<&str>>)]) {
    let mut zip = zip::ZipWriter::new(File::create(path).unwrap());
    let options = zip::write::SimpleFileOptions::default();

    let mut content_types = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>"#,
    );
    let mut workbook = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets>"#,
    );
    let mut rels = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
    );

    for (i, (name, _)) in sheets.iter().enumerate() {
        let n = i + 1;
        content_types.push_str(&format!(
            r#"<Override PartName="/xl/worksheets/sheet{}.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>"#,
            n
        ));
        workbook.push_str(&format!(r#"<sheet name="{}" sheetId="{}" r:id="rId{}"/>"#, name, n, n));
        rels.push_str(&format!(
            r#"<Relationship Id="rId{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet{}.xml"/>"#,
            n, n
        ));
    }
    content_types.push_str("</Types>");
    workbook.push_str("</sheets></workbook>");
    rels.push_str("</Relationships>");

    let mut parts: Vec<(String, String)> = vec![
        ("[Content_Types].xml".to_string(), content_types),
        (
            "_rels/.rels".to_string(),
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#.to_string(),
        ),
        ("xl/workbook.xml".to_string(), workbook),
        ("xl/_rels/workbook.xml.rels".to_string(), rels),
    ];
    for (i, (_, rows)) in sheets.iter().enumerate() {
        parts.push((format!("xl/worksheets/sheet{}.xml", i + 1), sheet_xml(rows)));
    }

    for (name, body) in parts {
        zip.start_file(name, options).unwrap();
        zip.write_all(body.as_bytes()).unwrap();
    }
    zip.finish().unwrap();
}

/// Write a staged workbook upload and return its record.
pub fn staged_workbook(dir: &Path, name: &str, sheets: &[(&str, Vec<Vec<&str>>)]) -> FileRecord {
    let path = dir.join(format!("pandas_agent_1700000000_{}", name));
    write_workbook(&path, sheets);
    FileRecord::new(name, path, FileKind::Workbook)
}

/// Names of the regular files in `dir`.
pub fn dir_entries(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .flatten()
        .map(|e| e.file_name().to_string_lossy().to_string())
        .collect();
    names.sort();
    names
}

// ============================================================================
// Scripted agents
// ============================================================================

/// What a scripted agent does when called.
#[derive(Clone)]
pub enum Script {
    Answer(String),
    Fail(String),
    /// `run` fails, `invoke` answers
    InvokeOnly(String),
}

pub struct ScriptedAgent {
    script: Script,
    queries: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl ReasoningAgent for ScriptedAgent {
    async fn run(&self, query: &str) -> TabularResult<String> {
        self.queries.lock().unwrap().push(query.to_string());
        match &self.script {
            Script::Answer(answer) => Ok(answer.clone()),
            Script::Fail(msg) => Err(TabularError::agent_failed(msg.clone())),
            Script::InvokeOnly(_) => Err(TabularError::agent_failed("run() is not supported")),
        }
    }

    async fn invoke(&self, input: AgentInput) -> TabularResult<AgentOutput> {
        self.queries.lock().unwrap().push(input.input);
        match &self.script {
            Script::Answer(answer) | Script::InvokeOnly(answer) => Ok(AgentOutput {
                output: answer.clone(),
            }),
            Script::Fail(msg) => Err(TabularError::agent_failed(msg.clone())),
        }
    }
}

pub struct ScriptedBuilder {
    script: Script,
    pub builds: AtomicUsize,
    pub queries: Arc<Mutex<Vec<String>>>,
    pub table_sets: Mutex<Vec<Vec<String>>>,
}

impl ScriptedBuilder {
    pub fn new(script: Script) -> Arc<Self> {
        Arc::new(Self {
            script,
            builds: AtomicUsize::new(0),
            queries: Arc::new(Mutex::new(Vec::new())),
            table_sets: Mutex::new(Vec::new()),
        })
    }

    pub fn answering(answer: &str) -> Arc<Self> {
        Self::new(Script::Answer(answer.to_string()))
    }

    pub fn build_count(&self) -> usize {
        self.builds.load(Ordering::SeqCst)
    }

    pub fn last_query(&self) -> Option<String> {
        self.queries.lock().unwrap().last().cloned()
    }
}

impl AgentBuilder for ScriptedBuilder {
    fn build(&self, tables: &BTreeMap<String, Table>) -> TabularResult<Arc<dyn ReasoningAgent>> {
        if tables.is_empty() {
            return Err(TabularError::agent_unavailable("No dataframes available for analysis"));
        }
        self.builds.fetch_add(1, Ordering::SeqCst);
        self.table_sets
            .lock()
            .unwrap()
            .push(tables.keys().cloned().collect());
        Ok(Arc::new(ScriptedAgent {
            script: self.script.clone(),
            queries: Arc::clone(&self.queries),
        }))
    }
}

// ============================================================================
// In-memory platform
// ============================================================================

/// Assistant platform keeping one message list per thread.
#[derive(Default)]
pub struct MemoryPlatform {
    threads: Mutex<BTreeMap<String, Vec<PlatformMessage>>>,
    next_id: AtomicUsize,
}

impl MemoryPlatform {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Messages of a thread, oldest first.
    pub fn messages(&self, thread_id: &str) -> Vec<PlatformMessage> {
        self.threads
            .lock()
            .unwrap()
            .get(thread_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn messages_of_type(&self, thread_id: &str, kind: &str) -> Vec<PlatformMessage> {
        self.messages(thread_id)
            .into_iter()
            .filter(|m| m.metadata_type() == Some(kind))
            .collect()
    }
}

#[async_trait]
impl AssistantPlatform for MemoryPlatform {
    async fn list_messages(&self, thread_id: &str) -> AppResult<Vec<PlatformMessage>> {
        let mut messages = self.messages(thread_id);
        messages.reverse();
        Ok(messages)
    }

    async fn create_message(&self, thread_id: &str, message: NewMessage) -> AppResult<PlatformMessage> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let created = PlatformMessage {
            id: format!("msg_{}", id),
            role: message.role,
            content: message.content,
            metadata: message.metadata,
        };
        self.threads
            .lock()
            .unwrap()
            .entry(thread_id.to_string())
            .or_default()
            .push(created.clone());
        Ok(created)
    }

    async fn delete_message(&self, thread_id: &str, message_id: &str) -> AppResult<()> {
        if let Some(messages) = self.threads.lock().unwrap().get_mut(thread_id) {
            messages.retain(|m| m.id != message_id);
        }
        Ok(())
    }
}

// ============================================================================
// Application state
// ============================================================================

pub fn test_config(scratch_dir: &Path) -> AppConfig {
    AppConfig {
        bind_addr: "127.0.0.1:0".to_string(),
        scratch_dir: PathBuf::from(scratch_dir),
        progress_tick_ms: 5,
        ..Default::default()
    }
}

pub fn test_state(
    scratch_dir: &Path,
    builder: Arc<ScriptedBuilder>,
    platform: Arc<MemoryPlatform>,
) -> AppState {
    AppState::with_components(test_config(scratch_dir), builder, platform).unwrap()
}
