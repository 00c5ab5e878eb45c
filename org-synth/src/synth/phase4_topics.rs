//! Phase 4, topic-driven variant
//!
//! Major topics are generated once and split into sub-topics; each sub-topic
//! becomes its own project with a freshly selected team, generated subtasks
//! and a second call assigning those subtasks to members.
//!
//! `major_topics.json` and `sub_topics.json` are reused when present, and a
//! sub-topic whose document is already on disk is not generated again.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use org_synth_sdk::{
    log_debug, log_file_saved, log_found, log_info, log_state_file, log_task_progress, log_warning,
};

use crate::config::SynthConfig;
use crate::synth::documents::{load_project, project_paths, read_json, save_project, write_json};
use crate::synth::phase4_pipeline::{
    adjust_styles, assign_subtask_ids, attach_assignments, build_document, CallBudget,
    ProjectHeader, ProjectRun,
};
use crate::synth::prompts::{self, SubtaskDraft};
use crate::synth::store::{read_employees, StoreStage};
use crate::synth::summary::FailedProject;
use crate::synth::types::{
    Adjustments, Employee, MajorTopic, Phase, ProjectDocument, ProjectMember, SubTopic,
    SubTopicInfo, Subtask,
};
use crate::synth::validate::{enforce, validate_team, OnViolation};
use crate::workflow_utils::{execute_task, CallSpec, ExtractMode, RetryingCaller, TaskContext};

pub const GENERATION_METHOD: &str = "topic_driven";

#[derive(Debug, Deserialize)]
struct MajorTopicsResponse {
    major_topics: Vec<TopicDraft>,
}

#[derive(Debug, Deserialize)]
struct TopicDraft {
    topic: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct SubTopicsResponse {
    sub_topics: Vec<SubTopicDraft>,
}

#[derive(Debug, Deserialize)]
struct SubTopicDraft {
    topic: String,
    description: String,
    #[serde(default)]
    reasoning: String,
}

#[derive(Debug, Deserialize)]
struct TeamSelectionResponse {
    selected_members: Vec<SelectedMember>,
    #[serde(default)]
    team_summary: String,
}

#[derive(Debug, Deserialize)]
struct SelectedMember {
    user_name: String,
    #[serde(default)]
    selection_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SubtaskGenerationResponse {
    subtasks: Vec<GeneratedSubtask>,
}

#[derive(Debug, Deserialize)]
struct GeneratedSubtask {
    subtask: String,
    #[serde(default)]
    phase: Option<String>,
    #[serde(default)]
    required_skills: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct SubtaskAssignmentResponse {
    task_assignments: Vec<AssignedTasks>,
}

#[derive(Debug, Deserialize)]
struct AssignedTasks {
    user_name: String,
    #[serde(default)]
    assigned_subtasks: Vec<AssignedSubtask>,
}

#[derive(Debug, Deserialize)]
struct AssignedSubtask {
    subtask: String,
    #[serde(default)]
    phase: Option<String>,
    #[serde(default)]
    required_skills: Vec<String>,
    #[serde(default)]
    assignment_reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MajorTopicsFile {
    pub major_topics: Vec<MajorTopic>,
    pub total: usize,
    pub generated_at: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubTopicsFile {
    pub sub_topics: Vec<SubTopic>,
    pub total: usize,
    pub generated_at: String,
}

pub fn major_topic_id(n: usize) -> String {
    format!("MAJOR_{:03}", n)
}

pub fn sub_topic_id(major: usize, n: usize) -> String {
    format!("SUB_{}_{:03}", major, n)
}

/// Map a model-supplied phase label; unknown labels become `None`
fn parse_phase(owner: &str, label: Option<&str>) -> Option<Phase> {
    let label = label?;
    let phase = Phase::from_label(label);
    if phase.is_none() {
        log_warning!("{}: unknown phase '{}'", owner, label);
    }
    phase
}

async fn load_or_generate_major_topics(
    config: &SynthConfig,
    caller: &RetryingCaller,
) -> Result<Vec<MajorTopic>> {
    let path = config.output.major_topics_path();
    if path.exists() {
        let file: MajorTopicsFile = read_json(&path).await?;
        log_info!("Loaded {} major topics from {}", file.major_topics.len(), path.display());
        return Ok(file.major_topics);
    }

    let prompt = prompts::major_topics(config.projects.num_major_topics, &config.organization.teams);
    let response: MajorTopicsResponse = caller
        .call(CallSpec {
            task_id: "major_topics",
            system: prompts::PROJECT_EXPERT,
            prompt: &prompt,
            mode: ExtractMode::Strict,
        })
        .await
        .context("Major topic generation failed")?;

    let now = chrono::Local::now().to_rfc3339();
    let topics: Vec<MajorTopic> = response
        .major_topics
        .into_iter()
        .enumerate()
        .map(|(i, t)| MajorTopic {
            major_topic_id: major_topic_id(i + 1),
            topic: t.topic,
            description: t.description,
            generated_at: now.clone(),
        })
        .collect();
    if topics.len() != config.projects.num_major_topics {
        log_warning!(
            "Got {} major topics, asked for {}",
            topics.len(),
            config.projects.num_major_topics
        );
    }

    let file = MajorTopicsFile {
        total: topics.len(),
        major_topics: topics,
        generated_at: now,
    };
    write_json(&path, &file).await?;
    log_file_saved!(path.display());
    log_state_file!(4, path.display(), "Major topics");
    Ok(file.major_topics)
}

/// Sub-topics for every major topic, generating those not on disk yet.
/// The file is rewritten after each major topic. A major topic whose
/// request fails is skipped.
async fn load_or_generate_sub_topics(
    config: &SynthConfig,
    caller: &RetryingCaller,
    majors: &[MajorTopic],
) -> Result<Vec<SubTopic>> {
    let path = config.output.sub_topics_path();
    let mut file: SubTopicsFile = if path.exists() {
        read_json(&path).await?
    } else {
        SubTopicsFile::default()
    };

    let count = config.projects.sub_topics_per_major;
    for (idx, major) in majors.iter().enumerate() {
        if file
            .sub_topics
            .iter()
            .any(|s| s.parent_topic_id == major.major_topic_id)
        {
            continue;
        }

        let prompt = prompts::sub_topics(major, count);
        let response: SubTopicsResponse = match caller
            .call(CallSpec {
                task_id: &major.major_topic_id,
                system: prompts::PROJECT_EXPERT,
                prompt: &prompt,
                mode: ExtractMode::Strict,
            })
            .await
        {
            Ok(response) => response,
            Err(e) => {
                log_warning!("Skipping {}: {}", major.major_topic_id, e);
                continue;
            }
        };

        let now = chrono::Local::now().to_rfc3339();
        file.sub_topics.extend(
            response
                .sub_topics
                .into_iter()
                .enumerate()
                .map(|(i, s)| SubTopic {
                    sub_topic_id: sub_topic_id(idx + 1, i + 1),
                    parent_topic_id: major.major_topic_id.clone(),
                    topic: s.topic,
                    description: s.description,
                    reasoning: s.reasoning,
                    generated_at: now.clone(),
                }),
        );
        file.total = file.sub_topics.len();
        file.generated_at = now;
        write_json(&path, &file).await?;
        log_found!(file.total, "sub-topics so far");
    }

    log_state_file!(4, path.display(), "Sub-topics");
    Ok(file.sub_topics)
}

/// Team = requested names that exist in the pool, in response order
fn select_team(selected: Vec<SelectedMember>, pool: &[Employee]) -> Vec<ProjectMember> {
    let by_name: HashMap<&str, &Employee> = pool.iter().map(|e| (e.name.as_str(), e)).collect();
    let mut team: Vec<ProjectMember> = Vec::with_capacity(selected.len());
    for choice in selected {
        let name = choice.user_name.trim();
        let Some(employee) = by_name.get(name) else {
            log_debug!("Selected '{}' is not an employee, dropped", name);
            continue;
        };
        if team.iter().any(|m| m.user_name == name) {
            continue;
        }
        let mut member = ProjectMember::from_employee(employee);
        member.selection_reason = choice.selection_reason;
        team.push(member);
    }
    team
}

async fn generate_sub_topic_project(
    config: &SynthConfig,
    caller: &RetryingCaller,
    pool: &[Employee],
    sub_topic: &SubTopic,
    siblings: Vec<String>,
    budget: CallBudget,
) -> Result<ProjectDocument> {
    let task_id = sub_topic.sub_topic_id.as_str();
    let bounds = &config.projects.sub_topic_team_size;

    let prompt = prompts::team_selection(sub_topic, pool, bounds);
    let selection: TeamSelectionResponse = caller
        .call(CallSpec {
            task_id,
            system: prompts::PROJECT_EXPERT,
            prompt: &prompt,
            mode: ExtractMode::Strict,
        })
        .await?;
    if !selection.team_summary.is_empty() {
        log_info!("Team: {}", selection.team_summary);
    }
    let mut members = select_team(selection.selected_members, pool);
    if members.is_empty() {
        bail!("no known employees selected for {}", sub_topic.sub_topic_id);
    }
    enforce("sub-topic team", &validate_team(&members, bounds), OnViolation::Warn)?;
    log_task_progress!(task_id, format!("{} members selected", members.len()));

    let style_adjusted = adjust_styles(
        caller,
        task_id,
        &sub_topic.topic,
        &sub_topic.description,
        &mut members,
    )
    .await?;

    let min = config.projects.min_subtasks_per_member;
    let prompt = prompts::subtask_generation(sub_topic, &members, members.len() * min);
    let generated: SubtaskGenerationResponse = caller
        .call(CallSpec {
            task_id,
            system: prompts::PROJECT_EXPERT,
            prompt: &prompt,
            mode: ExtractMode::Strict,
        })
        .await?;
    let drafts: Vec<SubtaskDraft> = generated
        .subtasks
        .into_iter()
        .map(|s| SubtaskDraft {
            phase: parse_phase(task_id, s.phase.as_deref()),
            subtask: s.subtask,
            required_skills: s.required_skills,
        })
        .collect();
    log_found!(drafts.len(), "subtasks");
    log_task_progress!(task_id, format!("{} subtasks generated", drafts.len()));

    let prompt = prompts::subtask_assignment(sub_topic, &members, &drafts, min);
    let assignment: SubtaskAssignmentResponse = caller
        .call(CallSpec {
            task_id,
            system: prompts::PROJECT_EXPERT,
            prompt: &prompt,
            mode: ExtractMode::Strict,
        })
        .await?;
    let assigned = assignment
        .task_assignments
        .into_iter()
        .map(|a| {
            let tasks = a
                .assigned_subtasks
                .into_iter()
                .map(|t| Subtask {
                    subtask_id: 0,
                    phase: parse_phase(task_id, t.phase.as_deref()),
                    subtask: t.subtask,
                    required_skills: t.required_skills,
                    communication_requirements: None,
                    assignment_reason: t.assignment_reason,
                    deadline: None,
                })
                .collect();
            (a.user_name.trim().to_string(), tasks)
        })
        .collect();
    attach_assignments(&mut members, assigned, min)?;
    assign_subtask_ids(&mut members);

    let info = SubTopicInfo {
        sub_topic_id: sub_topic.sub_topic_id.clone(),
        parent_topic_id: sub_topic.parent_topic_id.clone(),
        topic: sub_topic.topic.clone(),
        description: sub_topic.description.clone(),
        related_projects: siblings,
        generated_at: chrono::Local::now().to_rfc3339(),
    };
    let adjustments = Adjustments {
        communication_style_adjusted: style_adjusted,
        ..Adjustments::default()
    };
    Ok(build_document(
        ProjectHeader::SubTopic(info),
        members,
        GENERATION_METHOD,
        adjustments,
        budget.used(caller),
    ))
}

/// Ids of the other sub-topics under the same major topic
fn sibling_ids(all: &[SubTopic], sub_topic: &SubTopic) -> Vec<String> {
    all.iter()
        .filter(|s| s.parent_topic_id == sub_topic.parent_topic_id)
        .filter(|s| s.sub_topic_id != sub_topic.sub_topic_id)
        .map(|s| s.sub_topic_id.clone())
        .collect()
}

/// The saved document of `sub_topic`, looked up at both of its possible paths
async fn existing_document(projects_dir: &Path, sub_topic: &SubTopic) -> Option<ProjectDocument> {
    for path in project_paths(projects_dir, &sub_topic.topic, &sub_topic.sub_topic_id) {
        if !path.exists() {
            continue;
        }
        match load_project(&path).await {
            Ok(document) if document.identifier() == sub_topic.sub_topic_id => {
                return Some(document)
            }
            Ok(_) => {}
            Err(e) => {
                log_warning!("{} exists but cannot be loaded: {:#}", path.display(), e);
            }
        }
    }
    None
}

/// Run the topic-driven variant over the Phase 3 roster
pub async fn run(config: &SynthConfig, caller: &RetryingCaller) -> Result<ProjectRun> {
    let source = config.output.styles_path();
    let pool = read_employees(&source, StoreStage::WithStyles)?;
    if pool.is_empty() {
        bail!("no employees in {}", source.display());
    }
    log_found!(pool.len(), "employees");

    let majors = load_or_generate_major_topics(config, caller).await?;
    let sub_topics = load_or_generate_sub_topics(config, caller, &majors).await?;
    log_found!(sub_topics.len(), "sub-topics");

    let projects_dir = config.output.projects_path();
    let total = sub_topics.len();
    let mut run = ProjectRun::default();

    for (idx, sub_topic) in sub_topics.iter().enumerate() {
        if let Some(document) = existing_document(&projects_dir, sub_topic).await {
            log_info!(
                "[{}/{}] {} already generated, skipping",
                idx + 1,
                total,
                sub_topic.sub_topic_id
            );
            run.documents.push(document);
            continue;
        }

        let budget = CallBudget::start(caller);
        let siblings = sibling_ids(&sub_topics, sub_topic);
        let pool = &pool;
        let projects_dir = &projects_dir;
        let result = execute_task(
            sub_topic.sub_topic_id.clone(),
            format!("{} ({})", sub_topic.topic, sub_topic.parent_topic_id),
            TaskContext::new(4, idx + 1, total),
            move || async move {
                let document =
                    generate_sub_topic_project(config, caller, pool, sub_topic, siblings, budget)
                        .await?;
                let path = save_project(projects_dir, &document).await?;
                let summary = format!(
                    "{} members, {} subtasks -> {}",
                    document.members.len(),
                    document.metadata.total_subtasks,
                    path.display()
                );
                Ok::<_, anyhow::Error>((document, summary))
            },
        )
        .await;

        match result {
            Ok(document) => run.documents.push(document),
            Err(e) => run.failed.push(FailedProject {
                project_id: sub_topic.sub_topic_id.clone(),
                error: format!("{:#}", e),
                api_calls: budget.used(caller),
            }),
        }
    }

    run.write_summary(config).await?;
    Ok(run)
}
