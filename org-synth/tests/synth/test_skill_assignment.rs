//! Tests for batched hard-skill assignment

use super::common::*;
use std::collections::HashSet;
use std::sync::Arc;

use org_synth::llm::ScriptedClient;
use org_synth::synth::phase2_skills::assign_skills;
use org_synth::synth::types::{Employee, Proficiency, Rank};
use org_synth::synth::validate::validate_skill_assignments;

const UNIVERSE: [&str; 10] = [
    "Python",
    "Java",
    "SQL",
    "Docker",
    "Kubernetes",
    "React",
    "数据分析",
    "项目管理",
    "机器学习",
    "产品设计",
];

fn universe() -> Vec<String> {
    UNIVERSE.iter().map(|s| s.to_string()).collect()
}

/// Skills for one employee: first one strong, enough to sit inside the
/// default bounds for the rank. Staff also get one skill outside the universe.
fn skills_json(employee: &Employee) -> String {
    let count = match employee.rank {
        Rank::Executive => 6,
        Rank::Director => 5,
        Rank::Staff => 3,
    };
    let mut items: Vec<String> = UNIVERSE[..count]
        .iter()
        .enumerate()
        .map(|(i, skill)| {
            let level = if i == 0 { "Strong" } else { "medium" };
            format!(r#"{{"skill": "{}", "level": "{}"}}"#, skill, level)
        })
        .collect();
    if employee.rank == Rank::Staff {
        items.push(r#"{"skill": "Rust", "level": "strong"}"#.to_string());
    }
    format!(
        r#"{{"name": "{}", "hard_skills": [{}]}}"#,
        employee.name,
        items.join(", ")
    )
}

fn batch_response(batch: &[Employee], extra: Option<&str>) -> String {
    let mut entries: Vec<String> = batch.iter().map(skills_json).collect();
    if let Some(name) = extra {
        entries.push(format!(
            r#"{{"name": "{}", "hard_skills": [{{"skill": "SQL", "level": "low"}}]}}"#,
            name
        ));
    }
    format!("```json\n{{\"assignments\": [{}]}}\n```", entries.join(", "))
}

// ============================================================================
// Batched assignment
// ============================================================================

#[tokio::test]
async fn test_twenty_employees_in_four_batches() {
    let dir = create_temp_dir("skills_batches");
    let mut config = test_config(&dir);
    config.generation.skill_batch_size = 5;

    let employees = sample_roster(1, 2, 17);
    let responses: Vec<String> = employees
        .chunks(5)
        .map(|batch| batch_response(batch, None))
        .collect();
    let client = Arc::new(ScriptedClient::new(responses));
    let caller = scripted_caller(&client, 3);

    let result = assign_skills(&config, &caller, employees, &universe())
        .await
        .unwrap();

    assert_eq!(client.call_count(), 4);
    assert_eq!(result.len(), 20);

    let allowed: HashSet<&str> = UNIVERSE.iter().copied().collect();
    for employee in &result {
        let bounds = config.skills.count_by_rank.for_rank(employee.rank);
        assert!(
            bounds.contains(employee.hard_skills.len()),
            "{} has {} skills",
            employee.name,
            employee.hard_skills.len()
        );
        assert!(employee
            .hard_skills
            .iter()
            .all(|s| allowed.contains(s.skill.as_str())));
        assert_eq!(employee.hard_skills[0].proficiency, Proficiency::Strong);
    }

    let validation =
        validate_skill_assignments(&result, &universe(), &config.skills.count_by_rank);
    assert!(validation.passed, "{:?}", validation.errors);

    cleanup_temp_dir(&dir);
}

#[tokio::test]
async fn test_names_outside_batch_are_dropped() {
    let dir = create_temp_dir("skills_outsiders");
    let mut config = test_config(&dir);
    config.generation.skill_batch_size = 5;

    let employees = sample_roster(0, 0, 5);
    let client = Arc::new(ScriptedClient::new([batch_response(
        &employees,
        Some("路人甲"),
    )]));
    let caller = scripted_caller(&client, 1);

    let result = assign_skills(&config, &caller, employees, &universe())
        .await
        .unwrap();

    assert_eq!(result.len(), 5);
    assert!(result.iter().all(|e| e.name != "路人甲"));
    assert!(result.iter().all(|e| e.hard_skills.len() == 3));
    cleanup_temp_dir(&dir);
}

#[tokio::test]
async fn test_malformed_batch_is_retried() {
    let dir = create_temp_dir("skills_retry");
    let mut config = test_config(&dir);
    config.generation.skill_batch_size = 5;

    let employees = sample_roster(0, 1, 2);
    let client = Arc::new(ScriptedClient::new([
        "I cannot answer that.".to_string(),
        batch_response(&employees, None),
    ]));
    let caller = scripted_caller(&client, 3);

    let result = assign_skills(&config, &caller, employees, &universe())
        .await
        .unwrap();

    assert_eq!(client.call_count(), 2);
    assert_eq!(caller.attempts_made(), 2);
    assert!(result.iter().all(|e| !e.hard_skills.is_empty()));
    cleanup_temp_dir(&dir);
}

#[tokio::test]
async fn test_exhausted_batch_aborts_assignment() {
    let dir = create_temp_dir("skills_exhausted");
    let config = test_config(&dir);

    let employees = sample_roster(0, 0, 3);
    let client = Arc::new(ScriptedClient::new(["not json", "still not json"]));
    let caller = scripted_caller(&client, 2);

    let result = assign_skills(&config, &caller, employees, &universe()).await;
    assert!(result.is_err());
    assert_eq!(client.call_count(), 2);
    cleanup_temp_dir(&dir);
}
