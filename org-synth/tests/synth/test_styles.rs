//! Tests for communication style assignment

use super::common::*;
use std::sync::Arc;

use org_synth::llm::ScriptedClient;
use org_synth::synth::phase3_styles::{assign_styles, run};
use org_synth::synth::store::{read_employees, write_employees, StoreStage};
use org_synth::synth::style_universe::neutral_style;
use org_synth::synth::types::{Employee, StyleVector};

fn style_entry(name: &str, style: &StyleVector) -> String {
    format!(
        r#"{{"name": "{}", "communication_style": {}, "reasoning": "职级推断"}}"#,
        name,
        serde_json::to_string(style).unwrap()
    )
}

fn style_response(employees: &[&Employee]) -> String {
    let entries: Vec<String> = employees
        .iter()
        .map(|e| style_entry(&e.name, &neutral_style()))
        .collect();
    format!("{{\"assignments\": [{}]}}", entries.join(", "))
}

/// Neutral style with one dimension set to a label no dimension allows
fn off_vocabulary_style() -> StyleVector {
    let mut style = neutral_style();
    if let Some(value) = style.values_mut().next() {
        *value = "Loud".to_string();
    }
    style
}

fn without_styles(mut employees: Vec<Employee>) -> Vec<Employee> {
    for employee in employees.iter_mut() {
        employee.communication_style = None;
    }
    employees
}

// ============================================================================
// Assignment
// ============================================================================

#[tokio::test]
async fn test_styles_assigned_per_batch() {
    let dir = create_temp_dir("styles_batches");
    let mut config = test_config(&dir);
    config.generation.style_batch_size = 2;

    let employees = without_styles(sample_roster(1, 1, 2));
    let refs: Vec<&Employee> = employees.iter().collect();
    let client = Arc::new(ScriptedClient::new([
        style_response(&refs[..2]),
        // An outsider entry is dropped
        format!(
            "{{\"assignments\": [{}, {}, {}]}}",
            style_entry(&refs[2].name, &neutral_style()),
            style_entry(&refs[3].name, &neutral_style()),
            style_entry("路人甲", &neutral_style())
        ),
    ]));
    let caller = scripted_caller(&client, 1);

    let (result, errors) = assign_styles(&config, &caller, employees.clone())
        .await
        .unwrap();

    assert_eq!(client.call_count(), 2);
    assert!(errors.is_empty(), "{:?}", errors);
    assert_eq!(result.len(), 4);
    assert!(result
        .iter()
        .all(|e| e.communication_style == Some(neutral_style())));
    // The second prompt only describes the second batch
    let prompts = client.prompts();
    assert!(prompts[1].contains(&refs[2].name));
    assert!(!prompts[1].contains(&refs[0].name));
    cleanup_temp_dir(&dir);
}

// ============================================================================
// Run
// ============================================================================

#[tokio::test]
async fn test_run_writes_styles_and_report() {
    let dir = create_temp_dir("styles_run");
    let mut config = test_config(&dir);
    config.generation.style_batch_size = 3;

    let employees = without_styles(sample_roster(1, 1, 3));
    write_employees(&config.output.skills_path(), &employees, StoreStage::WithSkills).unwrap();

    let refs: Vec<&Employee> = employees.iter().collect();
    let client = Arc::new(ScriptedClient::new([
        format!(
            "{{\"assignments\": [{}, {}, {}]}}",
            style_entry(&refs[0].name, &neutral_style()),
            style_entry(&refs[1].name, &off_vocabulary_style()),
            style_entry(&refs[2].name, &neutral_style())
        ),
        // The last employee gets no style
        style_response(&refs[3..4]),
    ]));
    let caller = scripted_caller(&client, 1);

    let result = run(&config, &caller).await.unwrap();
    assert_eq!(result.len(), 5);
    assert!(result[4].communication_style.is_none());

    let universe: serde_json::Value = serde_json::from_str(
        &std::fs::read_to_string(config.output.style_universe_path()).unwrap(),
    )
    .unwrap();
    assert_eq!(universe["total_dimensions"], 8);

    let stored = read_employees(&config.output.styles_path(), StoreStage::WithStyles).unwrap();
    assert_eq!(stored.len(), 5);
    assert_eq!(stored[0].communication_style, Some(neutral_style()));
    // Out-of-vocabulary vectors are still stored; the report carries the error
    assert_eq!(stored[1].communication_style, Some(off_vocabulary_style()));
    assert_eq!(stored[4].communication_style, Some(StyleVector::new()));

    let report: serde_json::Value = serde_json::from_str(
        &std::fs::read_to_string(config.output.style_report_path()).unwrap(),
    )
    .unwrap();
    assert_eq!(report["summary"]["total_employees"], 5);
    assert_eq!(report["summary"]["assigned_employees"], 4);
    assert_eq!(report["summary"]["total_batches"], 2);
    assert_eq!(report["summary"]["success_rate"], "80.0%");
    assert_eq!(report["validation"]["all_employees_assigned"], false);
    assert_eq!(report["validation"]["missing_assignments"], 1);
    let errors: Vec<&str> = report["validation"]["errors"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|e| e.as_str())
        .collect();
    assert!(errors.iter().any(|e| e.contains("'Loud'")));
    assert!(errors
        .iter()
        .any(|e| e.starts_with(&refs[4].name) && e.contains("no communication style")));
    cleanup_temp_dir(&dir);
}

#[tokio::test]
async fn test_run_needs_skills_store() {
    let dir = create_temp_dir("styles_missing");
    let config = test_config(&dir);
    let client = Arc::new(ScriptedClient::default());
    let caller = scripted_caller(&client, 1);

    let result = run(&config, &caller).await;
    assert!(result.is_err());
    assert_eq!(client.call_count(), 0);
    assert!(!config.output.styles_path().exists());
    cleanup_temp_dir(&dir);
}
