//! Conversation File Registry
//!
//! The hosted platform has no key-value store, so the tabular files of a
//! thread are recorded in a hidden metadata message. The same module posts
//! the file-awareness and analysis-response messages.

use super::client::{AssistantPlatform, NewMessage, PlatformMessage};
use crate::models::{FileKind, FileRecord};
use crate::utils::error::AppResult;

pub const REGISTRY_MESSAGE_TYPE: &str = "pandas_agent_files";
pub const FILE_AWARENESS_TYPE: &str = "file_awareness";
pub const ANALYSIS_RESPONSE_TYPE: &str = "pandas_agent_response";

const REGISTRY_CONTENT: &str = "PANDAS_AGENT_FILES_INFO (DO NOT DISPLAY TO USER)";

fn registry_messages(messages: &[PlatformMessage]) -> impl Iterator<Item = &PlatformMessage> {
    messages
        .iter()
        .filter(|m| m.metadata_type() == Some(REGISTRY_MESSAGE_TYPE))
}

/// Files recorded for `thread_id`; empty when none or on any failure.
pub async fn load_registry(platform: &dyn AssistantPlatform, thread_id: &str) -> Vec<FileRecord> {
    if !platform.is_enabled() {
        return Vec::new();
    }

    let messages = match platform.list_messages(thread_id).await {
        Ok(messages) => messages,
        Err(e) => {
            tracing::warn!("[Registry] Could not list messages of thread {}: {}", thread_id, e);
            return Vec::new();
        }
    };

    let Some(raw) = registry_messages(&messages)
        .next()
        .and_then(|m| m.metadata.get("files"))
    else {
        return Vec::new();
    };

    match serde_json::from_str::<Vec<FileRecord>>(raw) {
        Ok(files) => files,
        Err(e) => {
            tracing::warn!("[Registry] Ignoring malformed file registry on thread {}: {}", thread_id, e);
            Vec::new()
        }
    }
}

/// Replace the registry message of `thread_id` with `files`.
pub async fn save_registry(platform: &dyn AssistantPlatform, thread_id: &str, files: &[FileRecord]) -> AppResult<()> {
    if !platform.is_enabled() {
        return Ok(());
    }

    match platform.list_messages(thread_id).await {
        Ok(messages) => {
            for old in registry_messages(&messages) {
                if let Err(e) = platform.delete_message(thread_id, &old.id).await {
                    tracing::warn!("[Registry] Could not delete old registry message {}: {}", old.id, e);
                }
            }
        }
        Err(e) => tracing::warn!("[Registry] Could not list messages of thread {}: {}", thread_id, e),
    }

    let message = NewMessage::user(REGISTRY_CONTENT)
        .with_metadata("type", REGISTRY_MESSAGE_TYPE)
        .with_metadata("files", serde_json::to_string(files)?);
    platform.create_message(thread_id, message).await?;

    tracing::info!("[Registry] Saved {} file(s) for thread {}", files.len(), thread_id);
    Ok(())
}

/// Add `record` to the registry, replacing an entry of the same name.
pub async fn register_file(platform: &dyn AssistantPlatform, thread_id: &str, record: &FileRecord) -> AppResult<()> {
    if !platform.is_enabled() {
        return Ok(());
    }

    let mut files = load_registry(platform, thread_id).await;
    files.retain(|f| f.name != record.name);
    files.push(record.clone());
    save_registry(platform, thread_id, &files).await
}

/// Drop `names` from the registry; no-op when none of them is recorded.
pub async fn unregister_files(platform: &dyn AssistantPlatform, thread_id: &str, names: &[String]) -> AppResult<()> {
    if !platform.is_enabled() || names.is_empty() {
        return Ok(());
    }

    let mut files = load_registry(platform, thread_id).await;
    let before = files.len();
    files.retain(|f| !names.contains(&f.name));
    if files.len() == before {
        return Ok(());
    }
    save_registry(platform, thread_id, &files).await
}

/// Text telling the assistant how to work with an uploaded tabular file.
pub fn file_awareness_text(record: &FileRecord) -> String {
    let kind_note = match record.kind {
        FileKind::DelimitedText => " This is a CSV file.",
        FileKind::Workbook => " This is an Excel file with potentially multiple sheets.",
        FileKind::Other(_) => "",
    };
    format!(
        "FILE INFORMATION: A file named '{}' of type '{}' has been uploaded and processed. \
         This file is available for analysis using the pandas agent.{}\n\n\
         IMPORTANT: You MUST use the pandas_agent tool for ANY request that mentions this file \
         or asks about data analysis. This includes requests for summaries, statistics, \
         counts, trends or any question about the file's contents.\n\n\
         NEVER try to answer questions about this file from memory - ALWAYS use the pandas_agent tool.",
        record.name,
        record.kind.as_str(),
        kind_note
    )
}

/// Post the file-awareness message for `record`.
pub async fn post_file_awareness(platform: &dyn AssistantPlatform, thread_id: &str, record: &FileRecord) -> AppResult<()> {
    if !platform.is_enabled() {
        return Ok(());
    }
    let message = NewMessage::user(file_awareness_text(record))
        .with_metadata("type", FILE_AWARENESS_TYPE)
        .with_metadata("processed_file", record.name.clone());
    platform.create_message(thread_id, message).await?;
    Ok(())
}

/// Append an analysis answer to the thread.
pub async fn post_analysis_response(
    platform: &dyn AssistantPlatform,
    thread_id: &str,
    operation_id: &str,
    response: &str,
) -> AppResult<()> {
    if !platform.is_enabled() {
        return Ok(());
    }
    let message = NewMessage::user(format!("[PANDAS AGENT RESPONSE]: {}", response))
        .with_metadata("type", ANALYSIS_RESPONSE_TYPE)
        .with_metadata("operation_id", operation_id);
    platform.create_message(thread_id, message).await?;
    Ok(())
}
