//! End-to-end tests for the chain variant of project generation

use super::common::*;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;

use org_synth::config::{RankCounts, SynthConfig};
use org_synth::llm::ScriptedClient;
use org_synth::synth::documents::{load_project, project_path};
use org_synth::synth::phase4_chain::run;
use org_synth::synth::store::{write_employees, StoreStage};
use org_synth::synth::types::Employee;

/// Eight employees stored as the Phase 3 output; the first team is all of them
fn chain_setup(dir: &PathBuf, projects: usize) -> (SynthConfig, Vec<Employee>) {
    let mut config = test_config(dir);
    config.projects.num_projects = projects;
    config.projects.first_team = RankCounts {
        rank_1: 1,
        rank_2: 2,
        rank_3: 5,
    };
    config.projects.min_subtasks_per_member = 1;

    let pool = sample_roster(1, 2, 5);
    write_employees(&config.output.styles_path(), &pool, StoreStage::WithStyles).unwrap();
    (config, pool)
}

fn topic_response(topic: &str) -> String {
    format!(
        r#"{{"project_topic": "{}", "project_description": "{}的建设与上线"}}"#,
        topic, topic
    )
}

fn no_style_changes() -> String {
    r#"{"adjusted_styles": []}"#.to_string()
}

fn breakdown_response(names: &[&str]) -> String {
    let entries: Vec<String> = names
        .iter()
        .map(|name| {
            format!(
                r#"{{"user_name": "{}", "subtasks": [{{"subtask": "{}负责的模块", "required_skills": ["Python"]}}]}}"#,
                name, name
            )
        })
        .collect();
    format!("```json\n{{\"task_assignments\": [{}]}}\n```", entries.join(", "))
}

fn drop_member_response(keep: &[&str], removed: &str) -> String {
    let keep: Vec<String> = keep.iter().map(|n| format!("\"{}\"", n)).collect();
    format!(
        r#"{{"member_adjustments": {{"keep_members": [{}], "add_members": [], "remove_members": [{{"user_name": "{}", "reason": "转岗"}}]}}}}"#,
        keep.join(", "),
        removed
    )
}

fn names(pool: &[Employee]) -> Vec<&str> {
    pool.iter().map(|e| e.name.as_str()).collect()
}

// ============================================================================
// Failure and continuation
// ============================================================================

#[tokio::test]
async fn test_failed_project_is_skipped_and_chain_continues() {
    let dir = create_temp_dir("chain_skip");
    let (config, pool) = chain_setup(&dir, 3);
    let everyone = names(&pool);
    let kept = &everyone[..7];

    let client = Arc::new(ScriptedClient::new([
        // Project 1: topic, styles, breakdown
        topic_response("智能客服平台"),
        no_style_changes(),
        breakdown_response(&everyone),
        // Project 2: topic, then an unusable member adjustment
        topic_response("废弃的项目"),
        "抱歉，无法完成。".to_string(),
        // Project 3 builds on project 1: topic, adjustment, styles, breakdown
        topic_response("客服知识库"),
        drop_member_response(kept, everyone[7]),
        no_style_changes(),
        breakdown_response(kept),
    ]));
    let caller = scripted_caller(&client, 1);
    let mut rng = StdRng::seed_from_u64(42);

    let result = run(&config, &caller, &mut rng).await.unwrap();

    assert_eq!(client.call_count(), 9);
    assert_eq!(client.remaining(), 0);
    assert_eq!(result.documents.len(), 2);
    assert_eq!(result.failed.len(), 1);
    assert_eq!(result.failed[0].project_id, "project_2");
    assert_eq!(result.failed[0].api_calls, 2);

    let first = &result.documents[0];
    assert_eq!(first.metadata.api_calls, 3);
    assert_eq!(first.members.len(), 8);

    let third = &result.documents[1];
    let info = third.project_info.as_ref().unwrap();
    assert_eq!(info.project_number, 3);
    assert_eq!(info.related_projects, vec![1]);
    assert_eq!(third.metadata.api_calls, 4);
    assert_eq!(third.metadata.adjustments_made.members_removed, vec![everyone[7]]);
    assert!(third.metadata.adjustments_made.members_added.is_empty());

    // The team of project 3 comes from project 1, minus the removed member
    let previous: BTreeSet<&str> = first.members.iter().map(|m| m.user_name.as_str()).collect();
    let current: BTreeSet<&str> = third.members.iter().map(|m| m.user_name.as_str()).collect();
    assert_eq!(current.len(), 7);
    assert!(current.is_subset(&previous));

    // Only successful projects appear in the history shown to the model
    let prompts = client.prompts();
    assert!(prompts[5].contains("Project 1：智能客服平台"));
    assert!(!prompts[5].contains("废弃的项目"));

    assert!(project_path(&config.output.projects_path(), "智能客服平台").exists());
    assert!(!project_path(&config.output.projects_path(), "废弃的项目").exists());
    let saved = load_project(&project_path(&config.output.projects_path(), "客服知识库"))
        .await
        .unwrap();
    assert_eq!(&saved, third);

    let summary: serde_json::Value = serde_json::from_str(
        &std::fs::read_to_string(config.output.projects_summary_path()).unwrap(),
    )
    .unwrap();
    assert_eq!(summary["total_projects"], 2);
    assert_eq!(summary["total_api_calls"], 9);
    assert_eq!(summary["failed_projects"][0]["project_id"], "project_2");
    assert_eq!(summary["projects_summary"][1]["related_projects"][0], "project_1");
    cleanup_temp_dir(&dir);
}

#[tokio::test]
async fn test_failed_first_project_resamples_team() {
    let dir = create_temp_dir("chain_resample");
    let (config, pool) = chain_setup(&dir, 2);
    let everyone = names(&pool);

    let client = Arc::new(ScriptedClient::new([
        // Project 1 fails on its task breakdown
        topic_response("数据中台"),
        no_style_changes(),
        "{\"task_assignments\": ".to_string(),
        // Project 2 has no predecessor, so no member adjustment call
        topic_response("数据治理"),
        no_style_changes(),
        breakdown_response(&everyone),
    ]));
    let caller = scripted_caller(&client, 1);
    let mut rng = StdRng::seed_from_u64(7);

    let result = run(&config, &caller, &mut rng).await.unwrap();

    assert_eq!(client.call_count(), 6);
    assert_eq!(result.failed.len(), 1);
    assert_eq!(result.failed[0].api_calls, 3);
    assert_eq!(result.documents.len(), 1);

    let second = &result.documents[0];
    let info = second.project_info.as_ref().unwrap();
    assert_eq!(info.project_number, 2);
    assert!(info.related_projects.is_empty());
    assert_eq!(second.metadata.api_calls, 3);
    assert_eq!(second.members.len(), 8);
    assert!(client.prompts()[3].contains("无（这是第一个项目）"));
    cleanup_temp_dir(&dir);
}

#[tokio::test]
async fn test_retried_call_counts_toward_project() {
    let dir = create_temp_dir("chain_retry");
    let (config, pool) = chain_setup(&dir, 1);
    let everyone = names(&pool);

    let client = Arc::new(ScriptedClient::new([
        "not json".to_string(),
        topic_response("营销自动化"),
        no_style_changes(),
        breakdown_response(&everyone),
    ]));
    let caller = scripted_caller(&client, 2);
    let mut rng = StdRng::seed_from_u64(1);

    let result = run(&config, &caller, &mut rng).await.unwrap();

    assert!(result.failed.is_empty());
    assert_eq!(result.documents[0].metadata.api_calls, 4);
    assert_eq!(result.documents[0].metadata.total_subtasks, 8);
    cleanup_temp_dir(&dir);
}
