//! Common test utilities for synthesis tests

use std::path::PathBuf;
use std::sync::Arc;

use org_synth::config::SynthConfig;
use org_synth::llm::ScriptedClient;
use org_synth::synth::phase4_pipeline::{build_document, ProjectHeader};
use org_synth::synth::style_universe::neutral_style;
use org_synth::synth::types::*;
use org_synth::workflow_utils::{RetryPolicy, RetryingCaller};

/// Create a fresh temporary directory for testing
pub fn create_temp_dir(name: &str) -> PathBuf {
    let temp_dir = std::env::temp_dir().join(format!(
        "org_synth_test_{}_{}",
        name,
        uuid::Uuid::new_v4().simple()
    ));
    std::fs::create_dir_all(&temp_dir).unwrap();
    temp_dir
}

/// Clean up temporary directory
pub fn cleanup_temp_dir(path: &PathBuf) {
    if path.exists() {
        std::fs::remove_dir_all(path).ok();
    }
}

/// Default configuration writing under `dir`, with no pauses between
/// batches or retries
pub fn test_config(dir: &PathBuf) -> SynthConfig {
    let mut config = SynthConfig::default();
    config.output.dir = dir.clone();
    config.generation.batch_pause_secs = 0.0;
    config.generation.retry_delay_secs = 0.0;
    config
}

/// Caller over a scripted client with `attempts` tries per call
pub fn scripted_caller(client: &Arc<ScriptedClient>, attempts: usize) -> RetryingCaller {
    RetryingCaller::new(client.clone(), RetryPolicy::immediate(attempts))
}

pub fn sample_employee(name: &str, rank: Rank) -> Employee {
    Employee {
        name: name.to_string(),
        user_id: format!("u_{}", name),
        team: if rank == Rank::Executive {
            "管理层".to_string()
        } else {
            "技术研发部".to_string()
        },
        dept_id: "d0001".to_string(),
        rank,
        title: match rank {
            Rank::Executive => "首席执行官",
            Rank::Director => "技术总监",
            Rank::Staff => "后端工程师",
        }
        .to_string(),
        hard_skills: Vec::new(),
        communication_style: Some(neutral_style()),
    }
}

/// Roster with the given number of employees per rank, named `员工01`, `员工02`, ...
pub fn sample_roster(rank_1: usize, rank_2: usize, rank_3: usize) -> Vec<Employee> {
    let ranks = std::iter::repeat(Rank::Executive)
        .take(rank_1)
        .chain(std::iter::repeat(Rank::Director).take(rank_2))
        .chain(std::iter::repeat(Rank::Staff).take(rank_3));
    ranks
        .enumerate()
        .map(|(i, rank)| sample_employee(&format!("员工{:02}", i + 1), rank))
        .collect()
}

pub fn sample_member(name: &str, rank: Rank) -> ProjectMember {
    ProjectMember::from_employee(&sample_employee(name, rank))
}

pub fn sample_subtask(id: u32, phase: Phase) -> Subtask {
    Subtask {
        subtask_id: id,
        subtask: format!("子任务{}", id),
        phase: Some(phase),
        required_skills: vec!["Python".to_string()],
        communication_requirements: None,
        assignment_reason: None,
        deadline: None,
    }
}

/// Chain project with one staff member per entry of `subtasks_per_member`;
/// subtasks are numbered 1..K in member order
pub fn sample_document(topic: &str, subtasks_per_member: &[u32]) -> ProjectDocument {
    let mut next = 0;
    let members = subtasks_per_member
        .iter()
        .enumerate()
        .map(|(i, &count)| {
            let mut member = sample_member(&format!("成员{}", i + 1), Rank::Staff);
            member.subtasks = (0..count)
                .map(|_| {
                    next += 1;
                    sample_subtask(next, Phase::DevelopmentImplementation)
                })
                .collect();
            member
        })
        .collect();

    let header = ProjectHeader::Chain(ProjectInfo {
        project_number: 1,
        project_topic: topic.to_string(),
        project_description: format!("{}的项目描述", topic),
        related_projects: Vec::new(),
        generated_at: "2025-01-01T00:00:00+08:00".to_string(),
    });
    build_document(header, members, "chain", Adjustments::default(), 3)
}
