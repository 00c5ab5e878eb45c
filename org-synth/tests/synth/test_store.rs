//! Tests for the employee store and project documents on disk

use super::common::*;

use org_synth::error::SynthError;
use org_synth::synth::documents::{find_project_files, load_project, project_path, save_project, write_json};
use org_synth::synth::store::{read_employees, write_employees, EmployeeTable, StoreStage};
use org_synth::synth::types::{HardSkill, Proficiency, Rank};

// ============================================================================
// Employee store
// ============================================================================

#[test]
fn test_store_round_trip_with_styles() {
    let dir = create_temp_dir("store_styles");
    let path = dir.join("employees_with_communicationstyle.db");

    let mut employees = sample_roster(1, 2, 3);
    employees[3].hard_skills = vec![
        HardSkill::new("Python", Proficiency::Strong),
        HardSkill::new("数据分析", Proficiency::Low),
    ];
    write_employees(&path, &employees, StoreStage::WithStyles).unwrap();

    let loaded = read_employees(&path, StoreStage::WithStyles).unwrap();
    assert_eq!(loaded, employees);
    assert_eq!(loaded[0].rank, Rank::Executive);
    cleanup_temp_dir(&dir);
}

#[test]
fn test_roster_file_lacks_skill_column() {
    let dir = create_temp_dir("store_columns");
    let path = dir.join("employees.db");

    let mut employees = sample_roster(1, 1, 1);
    for e in employees.iter_mut() {
        e.communication_style = None;
    }
    write_employees(&path, &employees, StoreStage::Roster).unwrap();

    let err = read_employees(&path, StoreStage::WithSkills).unwrap_err();
    let schema = err.downcast_ref::<SynthError>();
    assert!(matches!(schema, Some(SynthError::SchemaMismatch { .. })));

    let roster = read_employees(&path, StoreStage::Roster).unwrap();
    assert_eq!(roster, employees);
    cleanup_temp_dir(&dir);
}

#[test]
fn test_stage_files_carry_the_column_headers() {
    let dir = create_temp_dir("store_headers");
    let config = test_config(&dir);
    let employees = sample_roster(1, 1, 1);

    let stages = [
        (config.output.roster_path(), StoreStage::Roster, "employees.db"),
        (config.output.skills_path(), StoreStage::WithSkills, "employees_with_hardskills.db"),
        (
            config.output.styles_path(),
            StoreStage::WithStyles,
            "employees_with_communicationstyle.db",
        ),
    ];
    let mut expected = vec!["Name", "User_ID", "Team", "Dept_ID", "Rank", "Title"];
    for (path, stage, file_name) in stages {
        assert!(path.ends_with(file_name));
        write_employees(&path, &employees, stage).unwrap();

        if stage == StoreStage::WithSkills {
            expected.push("Hard_Skills");
        } else if stage == StoreStage::WithStyles {
            expected.push("Communication_Style");
        }
        let mut columns: Vec<String> = EmployeeTable::open_existing(&path)
            .unwrap()
            .columns()
            .unwrap()
            .into_iter()
            .collect();
        columns.sort();
        let mut wanted: Vec<String> = expected.iter().map(|c| c.to_string()).collect();
        wanted.sort();
        assert_eq!(columns, wanted, "{}", file_name);
    }
    cleanup_temp_dir(&dir);
}

#[test]
fn test_missing_store_is_an_error() {
    let dir = create_temp_dir("store_missing");
    assert!(read_employees(&dir.join("absent.db"), StoreStage::Roster).is_err());
    cleanup_temp_dir(&dir);
}

// ============================================================================
// Project documents
// ============================================================================

#[tokio::test]
async fn test_project_saved_under_sanitized_topic() {
    let dir = create_temp_dir("documents_path");
    let doc = sample_document("AI/ML 平台: 第一期", &[2, 3]);

    let path = save_project(&dir, &doc).await.unwrap();
    assert_eq!(path, project_path(&dir, doc.topic()));
    assert!(path.ends_with("AI_ML 平台_ 第一期/AI_ML 平台_ 第一期.json"));

    let loaded = load_project(&path).await.unwrap();
    assert_eq!(loaded, doc);
    cleanup_temp_dir(&dir);
}

#[tokio::test]
async fn test_find_skips_summary_and_rejects_bad_shape() {
    let dir = create_temp_dir("documents_find");
    save_project(&dir, &sample_document("项目甲", &[1])).await.unwrap();
    save_project(&dir, &sample_document("项目乙", &[1])).await.unwrap();
    write_json(&dir.join("项目乙").join("summary_report.json"), &serde_json::json!({"total": 2}))
        .await
        .unwrap();
    let broken = dir.join("损坏").join("损坏.json");
    write_json(&broken, &serde_json::json!({"members": "oops"}))
        .await
        .unwrap();

    let files = find_project_files(&dir, "summary_report.json").await.unwrap();
    assert_eq!(files.len(), 3);
    assert!(files.iter().all(|p| !p.ends_with("summary_report.json")));

    let err = load_project(&broken).await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<SynthError>(),
        Some(SynthError::SchemaMismatch { .. })
    ));
    cleanup_temp_dir(&dir);
}
