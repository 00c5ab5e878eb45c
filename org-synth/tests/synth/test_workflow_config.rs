//! Tests for configuration layering and workflow orchestration

use super::common::*;
use std::path::PathBuf;
use std::sync::Arc;

use org_synth::llm::ScriptedClient;
use org_synth::synth::workflow::{run_synthesis_workflow, ProjectVariant, WorkflowConfig};

fn write_config(dir: &PathBuf, yaml: &str) -> PathBuf {
    let path = dir.join("config.yaml");
    std::fs::write(&path, yaml).unwrap();
    path
}

// ============================================================================
// Configuration
// ============================================================================

#[test]
fn test_yaml_overlays_defaults_and_cli_wins() {
    let dir = create_temp_dir("config_overlay");
    let path = write_config(
        &dir,
        r#"
generation:
  max_retries: 3
  skill_batch_size: 25
projects:
  num_projects: 7
timeline:
  start: 2025-03-01
  end: 2025-09-30
"#,
    );

    let workflow = WorkflowConfig {
        config_file: Some(path),
        projects: Some(2),
        output_dir: Some(dir.join("out")),
        ..Default::default()
    };
    let synth = workflow.load_synth_config().unwrap();

    assert_eq!(synth.generation.max_retries, 3);
    assert_eq!(synth.generation.skill_batch_size, 25);
    assert_eq!(synth.generation.style_batch_size, 10);
    assert_eq!(synth.projects.num_projects, 2);
    assert_eq!(synth.timeline.start.to_string(), "2025-03-01");
    assert_eq!(synth.output.dir, dir.join("out"));
    assert_eq!(synth.organization.total_employees, 300);
    cleanup_temp_dir(&dir);
}

#[test]
fn test_inconsistent_config_rejected_when_strict() {
    let dir = create_temp_dir("config_strict");
    let path = write_config(&dir, "organization:\n  total_employees: 20\n");

    let workflow = WorkflowConfig {
        config_file: Some(path.clone()),
        ..Default::default()
    };
    let err = workflow.load_synth_config().unwrap_err();
    assert!(format!("{}", err).contains("total_employees"));

    let lenient = write_config(
        &dir,
        "organization:\n  total_employees: 20\ngeneration:\n  strict_validation: false\n",
    );
    let workflow = WorkflowConfig {
        config_file: Some(lenient),
        ..Default::default()
    };
    assert!(workflow.load_synth_config().is_ok());
    cleanup_temp_dir(&dir);
}

#[test]
fn test_unparseable_config_file() {
    let dir = create_temp_dir("config_bad");
    let path = write_config(&dir, "generation: [1, 2");
    let workflow = WorkflowConfig {
        config_file: Some(path),
        ..Default::default()
    };
    assert!(workflow.load_synth_config().is_err());
    cleanup_temp_dir(&dir);
}

// ============================================================================
// Orchestration
// ============================================================================

#[tokio::test]
async fn test_timeline_only_run_over_empty_output() {
    let dir = create_temp_dir("workflow_timeline");
    let synth = test_config(&dir);
    let workflow = WorkflowConfig {
        phases: vec![5],
        ..Default::default()
    };
    let client = Arc::new(ScriptedClient::default());

    run_synthesis_workflow(&workflow, &synth, client.clone())
        .await
        .unwrap();

    assert_eq!(client.call_count(), 0);
    let report: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(synth.output.timeline_report_path()).unwrap())
            .unwrap();
    assert_eq!(report["total_projects"], 0);
    cleanup_temp_dir(&dir);
}

#[tokio::test]
async fn test_missing_input_fails_the_phase() {
    let dir = create_temp_dir("workflow_missing");
    let synth = test_config(&dir);
    let workflow = WorkflowConfig {
        phases: vec![4],
        variant: ProjectVariant::Topics,
        ..Default::default()
    };
    let client = Arc::new(ScriptedClient::default());

    let err = run_synthesis_workflow(&workflow, &synth, client.clone())
        .await
        .unwrap_err();
    assert!(format!("{:#}", err).contains("Phase 4"));
    assert_eq!(client.call_count(), 0);
    cleanup_temp_dir(&dir);
}
