//! Per-project JSON documents and the other JSON artifacts
//!
//! A project lives at `projects/{topic}/{topic}.json`, the topic sanitized
//! into a single path component. When that path already holds a different
//! project (two topics sanitizing to the same label), the project id is
//! appended: `projects/{topic}_{id}/{topic}_{id}.json`.
//!
//! Loading decodes into the typed document and fails with
//! [`SynthError::SchemaMismatch`] when the file does not have the expected
//! shape.

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::fs;

use org_synth_sdk::log_warning;

use crate::error::SynthError;
use crate::synth::types::ProjectDocument;

/// Turn a topic into a single safe path component
pub fn sanitize_topic(topic: &str) -> String {
    let cleaned: String = topic
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    let cleaned = cleaned.trim_matches(|c: char| c == '.' || c.is_whitespace());
    if cleaned.is_empty() {
        "untitled_project".to_string()
    } else {
        cleaned.to_string()
    }
}

pub fn project_path(projects_dir: &Path, topic: &str) -> PathBuf {
    let name = sanitize_topic(topic);
    projects_dir.join(&name).join(format!("{}.json", name))
}

/// Where a project with `identifier` may live: the plain topic path first,
/// then the id-suffixed one used on collision
pub fn project_paths(projects_dir: &Path, topic: &str, identifier: &str) -> [PathBuf; 2] {
    let name = sanitize_topic(topic);
    [
        project_path(projects_dir, topic),
        project_path(projects_dir, &format!("{}_{}", name, identifier)),
    ]
}

/// Serialize `value` as pretty JSON, creating parent directories
pub async fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json)
        .await
        .with_context(|| format!("Failed to write: {}", path.display()))
}

/// Read and decode a JSON artifact; a decode failure is a schema mismatch
pub async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read: {}", path.display()))?;
    serde_json::from_str(&content)
        .map_err(|e| SynthError::schema(path.display().to_string(), e.to_string()).into())
}

/// Identifier of the project stored at `path`, if it holds a loadable one
async fn stored_identifier(path: &Path) -> Option<String> {
    if !path.exists() {
        return None;
    }
    load_project(path).await.ok().map(|d| d.identifier())
}

/// Write a project document to its topic path; returns the path.
///
/// A different project already at the topic path is left alone and this
/// one goes to the id-suffixed path instead.
pub async fn save_project(projects_dir: &Path, document: &ProjectDocument) -> Result<PathBuf> {
    let identifier = document.identifier();
    let [plain, suffixed] = project_paths(projects_dir, document.topic(), &identifier);
    let path = match stored_identifier(&plain).await {
        Some(other) if other != identifier => {
            log_warning!(
                "{} already holds {}, saving {} to {}",
                plain.display(),
                other,
                identifier,
                suffixed.display()
            );
            suffixed
        }
        _ => plain,
    };
    write_json(&path, document).await?;
    Ok(path)
}

/// Overwrite a project document in place
pub async fn store_project(path: &Path, document: &ProjectDocument) -> Result<()> {
    write_json(path, document).await
}

pub async fn load_project(path: &Path) -> Result<ProjectDocument> {
    let document: ProjectDocument = read_json(path).await?;
    match (&document.project_info, &document.sub_topic_info) {
        (Some(_), None) | (None, Some(_)) => Ok(document),
        (None, None) => Err(SynthError::schema(
            path.display().to_string(),
            "neither project_info nor sub_topic_info present",
        )
        .into()),
        (Some(_), Some(_)) => Err(SynthError::schema(
            path.display().to_string(),
            "both project_info and sub_topic_info present",
        )
        .into()),
    }
}

/// Every `{dir}/*/*.json` under `projects_dir` except the summary report, sorted
pub async fn find_project_files(projects_dir: &Path, summary_file: &str) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    if !projects_dir.exists() {
        return Ok(files);
    }

    let mut dirs = fs::read_dir(projects_dir).await?;
    while let Some(entry) = dirs.next_entry().await? {
        let dir = entry.path();
        if !dir.is_dir() {
            continue;
        }
        let mut inner = fs::read_dir(&dir).await?;
        while let Some(file) = inner.next_entry().await? {
            let path = file.path();
            let is_json = path.extension().map(|e| e == "json").unwrap_or(false);
            let is_summary = path.file_name().map(|n| n == summary_file).unwrap_or(false);
            if path.is_file() && is_json && !is_summary {
                files.push(path);
            }
        }
    }
    files.sort();
    Ok(files)
}
