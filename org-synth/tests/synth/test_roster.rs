//! Tests for batched roster generation

use super::common::*;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::PathBuf;
use std::sync::Arc;

use org_synth::config::{RankCounts, SynthConfig};
use org_synth::llm::ScriptedClient;
use org_synth::synth::phase1_employees::{generate_employees, run};
use org_synth::synth::store::{read_employees, StoreStage};
use org_synth::synth::types::Rank;

/// Six people in two teams: one executive, one director per team, three
/// staff. The first batch holds the three leaders, the second the staff.
fn small_org(dir: &PathBuf) -> SynthConfig {
    let mut config = test_config(dir);
    config.organization.teams = vec!["研发部".to_string(), "市场部".to_string()];
    config.organization.total_employees = 6;
    config.organization.rank_counts = RankCounts {
        rank_1: 1,
        rank_2: 2,
        rank_3: 3,
    };
    config.generation.employee_batch_size = 3;
    config
}

fn employee_json(name: &str, team: &str, rank: u8, title: &str) -> String {
    format!(
        r#"{{"name": "{}", "team": "{}", "rank": {}, "title": "{}"}}"#,
        name, team, rank, title
    )
}

fn leaders_batch() -> String {
    format!(
        "```json\n{{\"employees\": [{}, {}, {}]}}\n```",
        employee_json("周总", "研发部", 1, "首席执行官"),
        employee_json("张伟", "研发部", 2, "研发总监"),
        employee_json("李娜", "市场部", 2, "市场总监"),
    )
}

/// Staff batch whose second entry reuses a leader's name
fn staff_batch() -> String {
    format!(
        r#"{{"employees": [{}, {}, {}]}}"#,
        employee_json("王芳", "研发部", 3, "后端工程师"),
        employee_json("张伟", "市场部", 3, "市场专员"),
        employee_json("陈杰", "研发部", 3, "测试工程师"),
    )
}

// ============================================================================
// Batches
// ============================================================================

#[tokio::test]
async fn test_first_batch_carries_the_leaders() {
    let dir = create_temp_dir("roster_leaders");
    let config = small_org(&dir);
    let client = Arc::new(ScriptedClient::new([leaders_batch(), staff_batch()]));
    let caller = scripted_caller(&client, 1);

    let (employees, _) = generate_employees(&config, &caller, StdRng::seed_from_u64(11))
        .await
        .unwrap();

    assert_eq!(client.call_count(), 2);
    let prompts = client.prompts();
    assert!(prompts[0].contains("1 名 Rank 1"));
    assert!(prompts[0].contains("2 名 Rank 2"));
    assert!(!prompts[1].contains("Rank 1"));
    assert!(prompts[1].contains("3 名 Rank 3"));

    let ranks: Vec<Rank> = employees.iter().map(|e| e.rank).collect();
    assert_eq!(
        ranks,
        vec![
            Rank::Executive,
            Rank::Director,
            Rank::Director,
            Rank::Staff,
            Rank::Staff,
            Rank::Staff
        ]
    );
    // The executive always carries the executive team label
    assert_eq!(employees[0].team, config.organization.executive_team);
    cleanup_temp_dir(&dir);
}

#[tokio::test]
async fn test_later_prompts_list_names_in_use() {
    let dir = create_temp_dir("roster_names");
    let config = small_org(&dir);
    let client = Arc::new(ScriptedClient::new([leaders_batch(), staff_batch()]));
    let caller = scripted_caller(&client, 1);

    generate_employees(&config, &caller, StdRng::seed_from_u64(3))
        .await
        .unwrap();

    let prompts = client.prompts();
    assert!(prompts[0].contains("已生成的员工姓名（不得重复）：无"));
    assert!(prompts[1].contains("周总, 张伟, 李娜"));
    cleanup_temp_dir(&dir);
}

#[tokio::test]
async fn test_cross_batch_collision_is_renamed() {
    let dir = create_temp_dir("roster_collision");
    let config = small_org(&dir);
    let client = Arc::new(ScriptedClient::new([leaders_batch(), staff_batch()]));
    let caller = scripted_caller(&client, 1);

    let (employees, _) = generate_employees(&config, &caller, StdRng::seed_from_u64(5))
        .await
        .unwrap();

    assert_eq!(employees.len(), 6);
    assert_eq!(employees.iter().filter(|e| e.name == "张伟").count(), 1);
    assert_eq!(employees[1].name, "张伟");
    let renamed = &employees[4];
    assert_ne!(renamed.name, "张伟");
    assert_eq!(renamed.title, "市场专员");
    assert_eq!(renamed.team, "市场部");
    assert!(!renamed.user_id.is_empty());
    cleanup_temp_dir(&dir);
}

// ============================================================================
// Run
// ============================================================================

#[tokio::test]
async fn test_run_writes_validated_roster() {
    let dir = create_temp_dir("roster_run");
    let config = small_org(&dir);
    let client = Arc::new(ScriptedClient::new([leaders_batch(), staff_batch()]));
    let caller = scripted_caller(&client, 1);

    let (employees, _, path) = run(&config, &caller, StdRng::seed_from_u64(9))
        .await
        .unwrap();

    assert_eq!(path, config.output.roster_path());
    let stored = read_employees(&path, StoreStage::Roster).unwrap();
    assert_eq!(stored, employees);

    let research: Vec<_> = stored.iter().filter(|e| e.team == "研发部").collect();
    assert!(research.len() >= 2);
    assert!(research.iter().all(|e| e.dept_id == research[0].dept_id));
    assert!(stored
        .iter()
        .all(|e| e.user_id.len() == config.organization.user_id_length));
    cleanup_temp_dir(&dir);
}

#[tokio::test]
async fn test_exhausted_batch_writes_no_roster() {
    let dir = create_temp_dir("roster_exhausted");
    let config = small_org(&dir);
    // Batch 2 has no scripted answer left
    let client = Arc::new(ScriptedClient::new([leaders_batch()]));
    let caller = scripted_caller(&client, 2);

    let result = run(&config, &caller, StdRng::seed_from_u64(1)).await;

    assert!(result.is_err());
    assert_eq!(client.call_count(), 3);
    assert!(!config.output.roster_path().exists());
    cleanup_temp_dir(&dir);
}
