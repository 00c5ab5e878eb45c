//! End-to-end tests for the topic-driven variant of project generation

use super::common::*;
use std::path::PathBuf;
use std::sync::Arc;

use org_synth::config::SynthConfig;
use org_synth::llm::ScriptedClient;
use org_synth::synth::documents::{read_json, save_project, write_json};
use org_synth::synth::phase4_pipeline::{build_document, ProjectHeader};
use org_synth::synth::phase4_topics::{run, MajorTopicsFile, SubTopicsFile, GENERATION_METHOD};
use org_synth::synth::store::{write_employees, StoreStage};
use org_synth::synth::types::*;

const TEAM: [&str; 4] = ["员工01", "员工02", "员工04", "员工05"];

fn major(n: usize, topic: &str) -> MajorTopic {
    MajorTopic {
        major_topic_id: format!("MAJOR_{:03}", n),
        topic: topic.to_string(),
        description: format!("{}相关的业务方向", topic),
        generated_at: "2025-01-01T00:00:00+08:00".to_string(),
    }
}

fn sub(major: usize, n: usize, topic: &str) -> SubTopic {
    SubTopic {
        sub_topic_id: format!("SUB_{}_{:03}", major, n),
        parent_topic_id: format!("MAJOR_{:03}", major),
        topic: topic.to_string(),
        description: format!("{}的落地实施", topic),
        reasoning: String::new(),
        generated_at: "2025-01-01T00:00:00+08:00".to_string(),
    }
}

/// Two major topics on disk; only the first already has its sub-topics,
/// and the first of those already has a document
async fn topics_setup(dir: &PathBuf) -> (SynthConfig, ProjectDocument) {
    let mut config = test_config(dir);
    config.projects.num_major_topics = 2;
    config.projects.sub_topics_per_major = 2;
    config.projects.min_subtasks_per_member = 1;

    let pool = sample_roster(1, 2, 5);
    write_employees(&config.output.styles_path(), &pool, StoreStage::WithStyles).unwrap();

    let majors = vec![major(1, "智能客服"), major(2, "数据平台")];
    write_json(
        &config.output.major_topics_path(),
        &MajorTopicsFile {
            total: majors.len(),
            major_topics: majors,
            generated_at: "2025-01-01T00:00:00+08:00".to_string(),
        },
    )
    .await
    .unwrap();

    let subs = vec![sub(1, 1, "客服机器人"), sub(1, 2, "工单分派")];
    write_json(
        &config.output.sub_topics_path(),
        &SubTopicsFile {
            total: subs.len(),
            sub_topics: subs,
            generated_at: "2025-01-01T00:00:00+08:00".to_string(),
        },
    )
    .await
    .unwrap();

    let header = ProjectHeader::SubTopic(SubTopicInfo {
        sub_topic_id: "SUB_1_001".to_string(),
        parent_topic_id: "MAJOR_001".to_string(),
        topic: "客服机器人".to_string(),
        description: "客服机器人的落地实施".to_string(),
        related_projects: vec!["SUB_1_002".to_string()],
        generated_at: "2025-01-01T00:00:00+08:00".to_string(),
    });
    let mut member = sample_member("员工03", Rank::Director);
    member.subtasks = vec![sample_subtask(1, Phase::StrategyPlanning)];
    let existing = build_document(header, vec![member], GENERATION_METHOD, Adjustments::default(), 4);
    save_project(&config.output.projects_path(), &existing)
        .await
        .unwrap();

    (config, existing)
}

fn selection_response(names: &[&str]) -> String {
    let members: Vec<String> = names
        .iter()
        .map(|n| format!(r#"{{"user_name": "{}", "selection_reason": "技能匹配"}}"#, n))
        .collect();
    format!(
        r#"{{"selected_members": [{}], "team_summary": "跨部门小组"}}"#,
        members.join(", ")
    )
}

fn no_style_changes() -> String {
    r#"{"adjusted_styles": []}"#.to_string()
}

fn generation_response() -> String {
    let subtasks: Vec<String> = (1..=TEAM.len())
        .map(|i| {
            format!(
                r#"{{"subtask": "任务{}", "phase": "Development & Implementation", "required_skills": ["Python"]}}"#,
                i
            )
        })
        .collect();
    format!("{{\"subtasks\": [{}]}}", subtasks.join(", "))
}

fn assignment_response() -> String {
    let entries: Vec<String> = TEAM
        .iter()
        .enumerate()
        .map(|(i, name)| {
            format!(
                r#"{{"user_name": "{}", "assigned_subtasks": [{{"subtask": "任务{}", "phase": "Development & Implementation", "required_skills": ["Python"], "assignment_reason": "经验匹配"}}]}}"#,
                name,
                i + 1
            )
        })
        .collect();
    format!("```json\n{{\"task_assignments\": [{}]}}\n```", entries.join(", "))
}

/// Team selection, styles, subtask generation, subtask assignment
fn project_script() -> Vec<String> {
    vec![
        selection_response(&TEAM),
        no_style_changes(),
        generation_response(),
        assignment_response(),
    ]
}

// ============================================================================
// Reuse and resume
// ============================================================================

#[tokio::test]
async fn test_persisted_topics_and_documents_are_reused() {
    let dir = create_temp_dir("topics_reuse");
    let (config, existing) = topics_setup(&dir).await;

    let mut script = vec![r#"{"sub_topics": [
        {"topic": "数据湖建设", "description": "统一存储", "reasoning": "基础设施"},
        {"topic": "指标体系", "description": "统一口径"}
    ]}"#
        .to_string()];
    script.extend(project_script());
    script.extend(project_script());
    // The last sub-topic selects nobody from the roster
    script.push(selection_response(&["查无此人"]));
    let client = Arc::new(ScriptedClient::new(script));
    let caller = scripted_caller(&client, 1);

    let result = run(&config, &caller).await.unwrap();

    assert_eq!(client.call_count(), 10);
    assert_eq!(client.remaining(), 0);
    let prompts = client.prompts();
    // No major topic call; the first call generates sub-topics for MAJOR_002
    assert!(prompts[0].contains("重点主题「数据平台」"));
    assert!(prompts.iter().all(|p| !p.contains("子主题「客服机器人」")));
    assert!(prompts[1].contains("子主题「工单分派」"));

    let subs: SubTopicsFile = read_json(&config.output.sub_topics_path()).await.unwrap();
    let ids: Vec<&str> = subs.sub_topics.iter().map(|s| s.sub_topic_id.as_str()).collect();
    assert_eq!(ids, vec!["SUB_1_001", "SUB_1_002", "SUB_2_001", "SUB_2_002"]);
    assert_eq!(subs.total, 4);

    assert_eq!(result.documents.len(), 3);
    assert_eq!(result.documents[0], existing);

    let generated = &result.documents[1];
    assert_eq!(generated.identifier(), "SUB_1_002");
    assert_eq!(generated.metadata.api_calls, 4);
    assert_eq!(generated.metadata.total_subtasks, 4);
    assert_eq!(generated.members.len(), 4);
    let info = generated.sub_topic_info.as_ref().unwrap();
    assert_eq!(info.related_projects, vec!["SUB_1_001"]);
    assert_eq!(result.documents[2].identifier(), "SUB_2_001");

    assert_eq!(result.failed.len(), 1);
    assert_eq!(result.failed[0].project_id, "SUB_2_002");
    assert_eq!(result.failed[0].api_calls, 1);

    let summary: serde_json::Value = serde_json::from_str(
        &std::fs::read_to_string(config.output.projects_summary_path()).unwrap(),
    )
    .unwrap();
    assert_eq!(summary["total_projects"], 3);
    assert_eq!(summary["total_api_calls"], 4 + 4 + 4 + 1);
    cleanup_temp_dir(&dir);
}

#[tokio::test]
async fn test_resume_generates_only_missing_documents() {
    let dir = create_temp_dir("topics_resume");
    let (config, _) = topics_setup(&dir).await;

    let mut script = vec![r#"{"sub_topics": [
        {"topic": "数据湖建设", "description": "统一存储"},
        {"topic": "指标体系", "description": "统一口径"}
    ]}"#
        .to_string()];
    script.extend(project_script());
    script.extend(project_script());
    script.push(selection_response(&["查无此人"]));
    let first = Arc::new(ScriptedClient::new(script));
    run(&config, &scripted_caller(&first, 1)).await.unwrap();

    // Second run: only SUB_2_002 is missing
    let second = Arc::new(ScriptedClient::new(project_script()));
    let result = run(&config, &scripted_caller(&second, 1)).await.unwrap();

    assert_eq!(second.call_count(), 4);
    assert!(second.prompts()[0].contains("子主题「指标体系」"));
    assert!(result.failed.is_empty());
    let ids: Vec<String> = result.documents.iter().map(|d| d.identifier()).collect();
    assert_eq!(ids, vec!["SUB_1_001", "SUB_1_002", "SUB_2_001", "SUB_2_002"]);
    assert_eq!(result.documents[3].metadata.api_calls, 4);
    let info = result.documents[3].sub_topic_info.as_ref().unwrap();
    assert_eq!(info.related_projects, vec!["SUB_2_001"]);
    cleanup_temp_dir(&dir);
}

#[tokio::test]
async fn test_sub_topic_with_colliding_label_is_not_skipped() {
    let dir = create_temp_dir("topics_collision");
    let (config, _) = topics_setup(&dir).await;

    // Both sub-topics of MAJOR_002 sanitize to the same label
    let mut script = vec![r#"{"sub_topics": [
        {"topic": "客服/机器人", "description": "同名不同义"},
        {"topic": "客服:机器人", "description": "同名不同义"}
    ]}"#
        .to_string()];
    // SUB_1_002, SUB_2_001, SUB_2_002
    for _ in 0..3 {
        script.extend(project_script());
    }
    let client = Arc::new(ScriptedClient::new(script));
    let result = run(&config, &scripted_caller(&client, 1)).await.unwrap();

    assert_eq!(client.call_count(), 13);
    assert!(result.failed.is_empty());
    let ids: Vec<String> = result.documents.iter().map(|d| d.identifier()).collect();
    assert_eq!(ids, vec!["SUB_1_001", "SUB_1_002", "SUB_2_001", "SUB_2_002"]);
    let projects = config.output.projects_path();
    assert!(projects.join("客服_机器人").join("客服_机器人.json").exists());
    assert!(projects
        .join("客服_机器人_SUB_2_002")
        .join("客服_机器人_SUB_2_002.json")
        .exists());
    cleanup_temp_dir(&dir);
}
