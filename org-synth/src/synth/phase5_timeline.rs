//! Phase 5: Timeline assignment
//!
//! Loads every project document, asks for one deadline per subtask and
//! writes the deadlines back into the same file. Unlike the earlier phases
//! an invalid timeline is fatal for its project: the document is left
//! untouched and the project is reported as failed. Other projects still run.

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use org_synth_sdk::{log_file_saved, log_found, log_info, log_state_file, log_warning};

use crate::config::{SynthConfig, TimelineWindow};
use crate::synth::documents::{find_project_files, load_project, store_project, write_json};
use crate::synth::phase4_pipeline::CallBudget;
use crate::synth::prompts;
use crate::synth::summary::{build_timeline_report, TimelineProjectReport, TimelineReport};
use crate::synth::types::{DeadlineAssignment, ProjectDocument};
use crate::synth::validate::{check_date, enforce, validate_timeline, OnViolation};
use crate::workflow_utils::{execute_task, CallSpec, ExtractMode, RetryingCaller, TaskContext};

#[derive(Debug, Deserialize)]
struct TimelineResponse {
    task_timeline: Vec<DeadlineAssignment>,
    #[serde(default)]
    timeline_summary: Option<Value>,
}

/// Write each entry's deadline into the matching subtask; returns the
/// number of subtasks updated. Entries that fail to parse are skipped, so
/// call this only with a validated timeline.
pub fn apply_deadlines(
    document: &mut ProjectDocument,
    timeline: &[DeadlineAssignment],
    window: &TimelineWindow,
) -> usize {
    let deadlines: HashMap<u32, _> = timeline
        .iter()
        .filter_map(|entry| {
            let id = entry.subtask_id?;
            let date = check_date(entry.deadline.as_deref()?, window).ok()?;
            Some((id, date))
        })
        .collect();

    let mut updated = 0;
    for subtask in document.members.iter_mut().flat_map(|m| m.subtasks.iter_mut()) {
        if let Some(&date) = deadlines.get(&subtask.subtask_id) {
            subtask.deadline = Some(date);
            updated += 1;
        }
    }
    updated
}

fn base_report(document: &ProjectDocument) -> TimelineProjectReport {
    let info = document.sub_topic_info.as_ref();
    TimelineProjectReport {
        project_name: document.topic().to_string(),
        sub_topic_id: info.map(|i| i.sub_topic_id.clone()),
        parent_topic_id: info.map(|i| i.parent_topic_id.clone()),
        total_subtasks: document.total_subtasks(),
        ..Default::default()
    }
}

/// Schedule one project and store it.
///
/// Fails with [`crate::error::SynthError::ConstraintViolation`] when the
/// returned timeline does not validate; the file is not written then.
pub async fn schedule_project(
    caller: &RetryingCaller,
    window: &TimelineWindow,
    path: &Path,
    mut document: ProjectDocument,
) -> Result<TimelineProjectReport> {
    let mut report = base_report(&document);
    if document.fully_scheduled() {
        report.success = true;
        report.skipped = true;
        report.assigned_tasks = report.total_subtasks;
        return Ok(report);
    }

    let task_id = document.identifier();
    let prompt = prompts::timeline(&document, window);
    let response: TimelineResponse = caller
        .call(CallSpec {
            task_id: &task_id,
            system: prompts::TIMELINE_EXPERT,
            prompt: &prompt,
            mode: ExtractMode::BraceSpan,
        })
        .await?;

    let validation = validate_timeline(&document, &response.task_timeline, window);
    for warning in &validation.warnings {
        log_warning!("{}: {}", task_id, warning);
    }
    enforce(
        &format!("timeline {}", task_id),
        &validation.to_validation(),
        OnViolation::Abort,
    )?;

    let updated = apply_deadlines(&mut document, &response.task_timeline, window);
    store_project(path, &document).await?;
    log_file_saved!(path.display());

    report.success = true;
    report.assigned_tasks = updated;
    report.validation = Some(validation);
    report.timeline_summary = response.timeline_summary;
    Ok(report)
}

/// Load every project document up front; a file with the wrong shape
/// aborts the phase before any request is made
async fn load_all(config: &SynthConfig) -> Result<Vec<(PathBuf, ProjectDocument)>> {
    let dir = config.output.projects_path();
    let files = find_project_files(&dir, &config.output.projects_summary_file).await?;
    let mut documents = Vec::with_capacity(files.len());
    for path in files {
        let document = load_project(&path)
            .await
            .with_context(|| format!("Failed to load project: {}", path.display()))?;
        documents.push((path, document));
    }
    Ok(documents)
}

/// Run Phase 5 over every project on disk; returns the report
pub async fn run(config: &SynthConfig, caller: &RetryingCaller) -> Result<TimelineReport> {
    let window = &config.timeline;
    let documents = load_all(config).await?;
    if documents.is_empty() {
        log_warning!(
            "No project documents under {}",
            config.output.projects_path().display()
        );
    }
    log_found!(documents.len(), "project documents");

    let total = documents.len();
    let mut reports = Vec::with_capacity(total);
    for (idx, (path, document)) in documents.into_iter().enumerate() {
        let task_id = document.identifier();
        let name = document.topic().to_string();
        let budget = CallBudget::start(caller);
        let path = &path;

        let result = execute_task(
            task_id.clone(),
            format!("Assign deadlines: {}", name),
            TaskContext::new(5, idx + 1, total),
            move || async move {
                let report = schedule_project(caller, window, path, document).await?;
                let summary = if report.skipped {
                    "already scheduled, skipped".to_string()
                } else {
                    format!("{} deadlines assigned", report.assigned_tasks)
                };
                Ok::<_, anyhow::Error>((report, summary))
            },
        )
        .await;

        reports.push(match result {
            Ok(mut report) => {
                report.api_calls = budget.used(caller);
                report
            }
            Err(e) => TimelineProjectReport::failed(name, format!("{:#}", e), budget.used(caller)),
        });
    }

    let report = build_timeline_report(window, reports);
    log_info!(
        "Timeline: {} succeeded, {} failed, {} skipped",
        report.statistics.successful_projects,
        report.statistics.failed_projects,
        report.statistics.skipped_projects
    );
    let path = config.output.timeline_report_path();
    write_json(&path, &report).await?;
    log_file_saved!(path.display());
    log_state_file!(5, path.display(), "Timeline assignment report");
    Ok(report)
}
