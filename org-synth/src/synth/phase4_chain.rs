//! Phase 4, chain variant
//!
//! Projects are generated one after another, each team derived from the
//! previous one. Project 1 starts from a team sampled at random by rank.
//! A project that fails is skipped and the next one builds on the last
//! project that succeeded (or starts from a fresh sample if none has).

use anyhow::{bail, Result};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::Deserialize;
use std::collections::HashMap;

use org_synth_sdk::{log_found, log_info, log_task_progress, log_warning};

use crate::config::{RankCounts, SynthConfig};
use crate::synth::documents::save_project;
use crate::synth::phase4_pipeline::{
    adjust_styles, assign_subtask_ids, attach_assignments, build_document, CallBudget,
    ProjectHeader, ProjectRun,
};
use crate::synth::prompts::{self, ProjectHistory};
use crate::synth::reconcile::{compute_delta, reconcile, resolve_team, Delta};
use crate::synth::store::{read_employees, StoreStage};
use crate::synth::summary::FailedProject;
use crate::synth::types::{
    Adjustments, Employee, ProjectDocument, ProjectInfo, ProjectMember, Rank, Subtask,
};
use crate::synth::validate::{enforce, validate_team, OnViolation};
use crate::workflow_utils::{execute_task, CallSpec, ExtractMode, RetryingCaller, TaskContext};

pub const GENERATION_METHOD: &str = "chain";

#[derive(Debug, Deserialize)]
struct TopicResponse {
    project_topic: String,
    project_description: String,
}

#[derive(Debug, Deserialize)]
struct MemberAdjustmentResponse {
    member_adjustments: MemberAdjustments,
}

#[derive(Debug, Deserialize)]
struct MemberAdjustments {
    #[serde(default)]
    keep_members: Vec<String>,
    #[serde(default)]
    add_members: Vec<NamedReason>,
    #[serde(default)]
    remove_members: Vec<NamedReason>,
}

#[derive(Debug, Deserialize)]
struct NamedReason {
    user_name: String,
    #[serde(default)]
    reason: String,
}

#[derive(Debug, Deserialize)]
struct TaskBreakdownResponse {
    task_assignments: Vec<MemberTasks>,
}

#[derive(Debug, Deserialize)]
struct MemberTasks {
    user_name: String,
    #[serde(default)]
    subtasks: Vec<GeneratedTask>,
}

#[derive(Debug, Deserialize)]
struct GeneratedTask {
    subtask: String,
    #[serde(default)]
    required_skills: Vec<String>,
    #[serde(default)]
    communication_requirements: Option<String>,
}

/// Sample the first team: `composition` members of each rank, at random.
/// A rank with too few employees contributes all it has.
pub fn sample_first_team<'p>(
    pool: &'p [Employee],
    composition: &RankCounts,
    rng: &mut StdRng,
) -> Vec<&'p Employee> {
    let mut team = Vec::with_capacity(composition.total());
    for rank in Rank::ALL {
        let candidates: Vec<&Employee> = pool.iter().filter(|e| e.rank == rank).collect();
        let wanted = composition.get(rank);
        if candidates.len() < wanted {
            log_warning!(
                "Only {} rank-{} employee(s) available, wanted {}",
                candidates.len(),
                rank,
                wanted
            );
        }
        team.extend(candidates.choose_multiple(rng, wanted).copied());
    }
    team
}

/// Apply the model's member adjustment to `previous`.
///
/// The new team is (keep ∪ add) restricted to the pool. The delta the model
/// declared is reconciled against the one actually applied; disagreements
/// are logged.
fn adjust_members(
    previous: &[ProjectMember],
    adjustments: MemberAdjustments,
    pool: &[Employee],
) -> (Vec<ProjectMember>, Delta) {
    let add_names: Vec<String> = adjustments
        .add_members
        .iter()
        .map(|a| a.user_name.trim().to_string())
        .collect();
    let (team, unknown) = resolve_team(&adjustments.keep_members, &add_names, pool);
    for name in &unknown {
        log_warning!("'{}' is not an employee, ignored", name);
    }

    let requested = Delta::new(
        add_names.iter().cloned(),
        adjustments
            .remove_members
            .iter()
            .map(|r| r.user_name.trim().to_string()),
    );
    let actual = compute_delta(
        previous.iter().map(|m| m.user_name.as_str()),
        team.iter().map(|e| e.name.as_str()),
    );
    let reconciliation = reconcile(&requested, &actual);
    for mismatch in &reconciliation.mismatches {
        log_warning!("Member adjustment mismatch, {}", mismatch);
    }
    for removed in &adjustments.remove_members {
        if reconciliation.delta.removed.contains(removed.user_name.trim()) {
            log_info!("  - {}: {}", removed.user_name.trim(), removed.reason);
        }
    }

    let reasons: HashMap<&str, &str> = adjustments
        .add_members
        .iter()
        .map(|a| (a.user_name.trim(), a.reason.as_str()))
        .collect();
    let members = team
        .into_iter()
        .map(|employee| {
            let mut member = ProjectMember::from_employee(employee);
            if reconciliation.delta.added.contains(&employee.name) {
                member.selection_reason = reasons.get(employee.name.as_str()).map(|r| r.to_string());
            }
            member
        })
        .collect();
    (members, reconciliation.delta)
}

fn to_subtasks(tasks: Vec<GeneratedTask>) -> Vec<Subtask> {
    tasks
        .into_iter()
        .map(|t| Subtask {
            subtask_id: 0,
            subtask: t.subtask,
            phase: None,
            required_skills: t.required_skills,
            communication_requirements: t.communication_requirements,
            assignment_reason: None,
            deadline: None,
        })
        .collect()
}

/// Where the team of the next project comes from
enum TeamSource<'a> {
    Sampled(Vec<&'a Employee>),
    Previous(&'a ProjectDocument),
}

#[allow(clippy::too_many_arguments)]
async fn generate_project(
    config: &SynthConfig,
    caller: &RetryingCaller,
    pool: &[Employee],
    number: u32,
    source: TeamSource<'_>,
    history: &[ProjectHistory<'_>],
    related_projects: Vec<u32>,
    budget: CallBudget,
) -> Result<ProjectDocument> {
    let by_name: HashMap<&str, &Employee> = pool.iter().map(|e| (e.name.as_str(), e)).collect();
    let current: Vec<ProjectMember> = match &source {
        TeamSource::Sampled(team) => team.iter().map(|e| ProjectMember::from_employee(e)).collect(),
        // Fresh snapshot of the previous team: pool styles, no subtasks
        TeamSource::Previous(doc) => doc
            .members
            .iter()
            .filter_map(|m| by_name.get(m.user_name.as_str()))
            .map(|e| ProjectMember::from_employee(e))
            .collect(),
    };
    if current.is_empty() {
        bail!("project {} has no team to start from", number);
    }

    let task_id = format!("project_{}", number);
    let prompt = prompts::project_topic(number, &current, history);
    let topic: TopicResponse = caller
        .call(CallSpec {
            task_id: &task_id,
            system: prompts::PROJECT_EXPERT,
            prompt: &prompt,
            mode: ExtractMode::Strict,
        })
        .await?;
    log_info!("Topic: {}", topic.project_topic);
    log_task_progress!(task_id, format!("topic: {}", topic.project_topic));

    let mut adjustments = Adjustments::default();
    let mut members = match source {
        TeamSource::Sampled(_) => current,
        TeamSource::Previous(_) => {
            let prompt = prompts::member_adjustment(
                &topic.project_topic,
                &topic.project_description,
                &current,
                pool,
                &config.projects.team_size,
            );
            let response: MemberAdjustmentResponse = caller
                .call(CallSpec {
                    task_id: &task_id,
                    system: prompts::PROJECT_EXPERT,
                    prompt: &prompt,
                    mode: ExtractMode::Strict,
                })
                .await?;
            let (members, delta) = adjust_members(&current, response.member_adjustments, pool);
            if members.is_empty() {
                bail!("member adjustment left project {} without a team", number);
            }
            adjustments.members_added = delta.added.into_iter().collect();
            adjustments.members_removed = delta.removed.into_iter().collect();
            members
        }
    };
    enforce(
        "project team",
        &validate_team(&members, &config.projects.team_size),
        OnViolation::Warn,
    )?;

    adjustments.communication_style_adjusted = adjust_styles(
        caller,
        &task_id,
        &topic.project_topic,
        &topic.project_description,
        &mut members,
    )
    .await?;

    let min = config.projects.min_subtasks_per_member;
    let prompt = prompts::task_breakdown(
        &topic.project_topic,
        &topic.project_description,
        &members,
        min,
    );
    let breakdown: TaskBreakdownResponse = caller
        .call(CallSpec {
            task_id: &task_id,
            system: prompts::PROJECT_EXPERT,
            prompt: &prompt,
            mode: ExtractMode::Strict,
        })
        .await?;
    let assigned = breakdown
        .task_assignments
        .into_iter()
        .map(|a| (a.user_name.trim().to_string(), to_subtasks(a.subtasks)))
        .collect();
    attach_assignments(&mut members, assigned, min)?;
    assign_subtask_ids(&mut members);

    let info = ProjectInfo {
        project_number: number,
        project_topic: topic.project_topic,
        project_description: topic.project_description,
        related_projects,
        generated_at: chrono::Local::now().to_rfc3339(),
    };
    Ok(build_document(
        ProjectHeader::Chain(info),
        members,
        GENERATION_METHOD,
        adjustments,
        budget.used(caller),
    ))
}

/// Run the chain variant over the Phase 3 roster
pub async fn run(config: &SynthConfig, caller: &RetryingCaller, rng: &mut StdRng) -> Result<ProjectRun> {
    let source = config.output.styles_path();
    let pool = read_employees(&source, StoreStage::WithStyles)?;
    if pool.is_empty() {
        bail!("no employees in {}", source.display());
    }
    log_found!(pool.len(), "employees");

    let projects_dir = config.output.projects_path();
    let total = config.projects.num_projects;
    let mut run = ProjectRun::default();

    for n in 1..=total {
        let number = n as u32;
        let history: Vec<ProjectHistory> = run
            .documents
            .iter()
            .filter_map(|d| d.project_info.as_ref())
            .map(|info| ProjectHistory {
                project_number: info.project_number,
                topic: &info.project_topic,
                description: &info.project_description,
            })
            .collect();
        let related: Vec<u32> = history.iter().map(|h| h.project_number).collect();
        let team_source = match run.documents.last() {
            Some(previous) => TeamSource::Previous(previous),
            None => {
                if n > 1 {
                    log_info!("No successful project yet, sampling a fresh team");
                }
                TeamSource::Sampled(sample_first_team(&pool, &config.projects.first_team, rng))
            }
        };

        let budget = CallBudget::start(caller);
        let pool = &pool;
        let history = &history;
        let projects_dir = &projects_dir;
        let result = execute_task(
            format!("project_{}", number),
            format!("Generate project {}/{}", n, total),
            TaskContext::new(4, n, total),
            move || async move {
                let document = generate_project(
                    config,
                    caller,
                    pool,
                    number,
                    team_source,
                    history,
                    related,
                    budget,
                )
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
                project_id: format!("project_{}", number),
                error: format!("{:#}", e),
                api_calls: budget.used(caller),
            }),
        }
    }

    run.write_summary(config).await?;
    Ok(run)
}
