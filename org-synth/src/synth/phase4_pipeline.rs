//! Stages shared by both project variants
//!
//! Style adjustment, attaching assigned subtasks to members, local subtask
//! numbering and assembling the final document.

use anyhow::Result;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;

use org_synth_sdk::{log_file_saved, log_info, log_state_file, log_warning};

use crate::config::SynthConfig;
use crate::synth::documents::write_json;
use crate::synth::prompts;
use crate::synth::summary::{build_projects_summary, FailedProject};
use crate::synth::types::{
    Adjustments, ProjectDocument, ProjectInfo, ProjectMember, ProjectMetadata, RankDistribution,
    StyleVector, SubTopicInfo, Subtask, TeamComposition,
};
use crate::synth::validate::{
    enforce, validate_styles, validate_task_assignment, AssignmentCheck, OnViolation,
};
use crate::workflow_utils::{CallSpec, ExtractMode, RetryingCaller};

/// Document header, one per variant
#[derive(Debug, Clone)]
pub enum ProjectHeader {
    Chain(ProjectInfo),
    SubTopic(SubTopicInfo),
}

/// Documents written by a Phase 4 run and the projects it gave up on
#[derive(Debug, Default)]
pub struct ProjectRun {
    pub documents: Vec<ProjectDocument>,
    pub failed: Vec<FailedProject>,
}

impl ProjectRun {
    /// Write `summary_report.json`; returns its path
    pub async fn write_summary(&self, config: &SynthConfig) -> Result<PathBuf> {
        let summary = build_projects_summary(&self.documents, &self.failed);
        let path = config.output.projects_summary_path();
        write_json(&path, &summary).await?;
        log_file_saved!(path.display());
        log_state_file!(4, path.display(), "Projects summary report");
        log_info!(
            "{} project(s) written, {} failed, {} API attempts",
            summary.total_projects,
            self.failed.len(),
            summary.total_api_calls
        );
        Ok(path)
    }
}

/// Attempts consumed by one project, whether it succeeds or not
#[derive(Debug, Clone, Copy)]
pub struct CallBudget {
    start: usize,
}

impl CallBudget {
    pub fn start(caller: &RetryingCaller) -> Self {
        Self {
            start: caller.attempts_made(),
        }
    }

    pub fn used(&self, caller: &RetryingCaller) -> usize {
        caller.attempts_made().saturating_sub(self.start)
    }
}

#[derive(Debug, Deserialize)]
struct StyleAdjustmentResponse {
    adjusted_styles: Vec<AdjustedStyle>,
}

#[derive(Debug, Deserialize)]
struct AdjustedStyle {
    user_name: String,
    adjusted_style: StyleVector,
}

/// Replace the style of every returned member; the rest keep theirs.
/// `original_communication_style` is never touched. Returns the number of
/// members updated.
pub fn apply_style_adjustments(
    team: &mut [ProjectMember],
    adjusted: impl IntoIterator<Item = (String, StyleVector)>,
) -> usize {
    let mut updated = 0;
    for (name, style) in adjusted {
        match team.iter_mut().find(|m| m.user_name == name.trim()) {
            Some(member) => {
                member.communication_style = style;
                updated += 1;
            }
            None => log_warning!("Style adjustment for unknown member '{}' ignored", name),
        }
    }
    updated
}

/// Ask for project-specific styles and apply them
pub async fn adjust_styles(
    caller: &RetryingCaller,
    task_id: &str,
    topic: &str,
    description: &str,
    team: &mut [ProjectMember],
) -> Result<bool> {
    let prompt = prompts::style_adjustment(topic, description, team);
    let response: StyleAdjustmentResponse = caller
        .call(CallSpec {
            task_id,
            system: prompts::ORG_BEHAVIOR_EXPERT,
            prompt: &prompt,
            mode: ExtractMode::Strict,
        })
        .await?;

    let updated = apply_style_adjustments(
        team,
        response
            .adjusted_styles
            .into_iter()
            .map(|a| (a.user_name, a.adjusted_style)),
    );
    if updated < team.len() {
        log_info!(
            "Styles adjusted for {}/{} members, the rest unchanged",
            updated,
            team.len()
        );
    }

    enforce(
        "adjusted communication styles",
        &validate_styles(
            team.iter()
                .map(|m| (m.user_name.as_str(), Some(&m.communication_style))),
        ),
        OnViolation::Warn,
    )?;
    Ok(updated > 0)
}

/// Attach per-member subtask lists to the team.
///
/// Completeness is checked against the response entries before attaching,
/// so entries for non-members show up as extra. Those entries are dropped.
pub fn attach_assignments(
    team: &mut [ProjectMember],
    assigned: Vec<(String, Vec<Subtask>)>,
    min_per_member: usize,
) -> Result<AssignmentCheck> {
    let check = validate_task_assignment(
        team,
        assigned.iter().map(|(name, tasks)| (name.as_str(), tasks.len())),
        min_per_member,
    );
    enforce("task assignment", &check.validation, OnViolation::Warn)?;

    let index: HashMap<String, usize> = team
        .iter()
        .enumerate()
        .map(|(i, m)| (m.user_name.clone(), i))
        .collect();
    for (name, tasks) in assigned {
        if let Some(&i) = index.get(name.trim()) {
            team[i].subtasks.extend(tasks);
        }
    }
    Ok(check)
}

/// Number subtasks 1..K walking members in order; returns K
pub fn assign_subtask_ids(team: &mut [ProjectMember]) -> u32 {
    let mut next = 0;
    for subtask in team.iter_mut().flat_map(|m| m.subtasks.iter_mut()) {
        next += 1;
        subtask.subtask_id = next;
    }
    next
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub fn build_document(
    header: ProjectHeader,
    members: Vec<ProjectMember>,
    generation_method: &str,
    adjustments: Adjustments,
    api_calls: usize,
) -> ProjectDocument {
    let total_subtasks: usize = members.iter().map(|m| m.subtasks.len()).sum();
    let avg = if members.is_empty() {
        0.0
    } else {
        round2(total_subtasks as f64 / members.len() as f64)
    };
    let (project_info, sub_topic_info) = match header {
        ProjectHeader::Chain(info) => (Some(info), None),
        ProjectHeader::SubTopic(info) => (None, Some(info)),
    };

    ProjectDocument {
        project_info,
        sub_topic_info,
        team_composition: TeamComposition {
            total_members: members.len(),
            rank_distribution: RankDistribution::of(members.iter().map(|m| &m.rank)),
        },
        members,
        metadata: ProjectMetadata {
            total_subtasks,
            avg_subtasks_per_member: avg,
            generation_method: generation_method.to_string(),
            adjustments_made: adjustments,
            api_calls,
        },
    }
}
