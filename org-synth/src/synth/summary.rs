//! Aggregate reports written at the end of phases 3, 4 and 5
//!
//! Reports are derived data. Nothing reads them back.

use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

use crate::config::TimelineWindow;
use crate::synth::style_universe::STYLE_DIMENSIONS;
use crate::synth::types::{ProjectDocument, Rank, StyleVector};
use crate::synth::validate::TimelineValidation;

const TOP_SKILLS: usize = 20;
const UNKNOWN_LABEL: &str = "Unknown";

/// Dimension name to label to count
pub type StyleDistribution = BTreeMap<String, BTreeMap<String, usize>>;

/// Count labels per fixed dimension; a missing dimension counts as `Unknown`
pub fn style_distribution<'a>(styles: impl IntoIterator<Item = &'a StyleVector>) -> StyleDistribution {
    let mut distribution: StyleDistribution = STYLE_DIMENSIONS
        .iter()
        .map(|d| (d.dimension.to_string(), BTreeMap::new()))
        .collect();

    for style in styles {
        for (dimension, counts) in distribution.iter_mut() {
            let label = style
                .get(dimension)
                .map(String::as_str)
                .unwrap_or(UNKNOWN_LABEL);
            *counts.entry(label.to_string()).or_insert(0) += 1;
        }
    }
    distribution
}

// ============================================================================
// Phase 3: style assignment report
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct StyleReportSummary {
    pub total_employees: usize,
    pub assigned_employees: usize,
    pub batch_size: usize,
    pub total_batches: usize,
    pub execution_time_seconds: f64,
    pub success_rate: String,
    pub start_time: String,
    pub end_time: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct StyleReportValidation {
    pub all_employees_assigned: bool,
    pub missing_assignments: usize,
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StyleReport {
    pub summary: StyleReportSummary,
    pub dimension_distribution: StyleDistribution,
    pub validation: StyleReportValidation,
}

pub fn success_rate(done: usize, total: usize) -> String {
    if total == 0 {
        "0%".to_string()
    } else {
        format!("{:.1}%", done as f64 / total as f64 * 100.0)
    }
}

// ============================================================================
// Phase 4: projects summary
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectEntry {
    pub project_id: String,
    pub project_topic: String,
    pub team_size: usize,
    pub total_subtasks: usize,
    pub related_projects: Vec<String>,
    pub api_calls: usize,
}

/// A project that was abandoned, with the attempts it consumed
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailedProject {
    pub project_id: String,
    pub error: String,
    pub api_calls: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmployeeParticipation {
    pub projects_participated: Vec<String>,
    pub total_tasks: usize,
    pub rank: Rank,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkillUsage {
    pub skill: String,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProjectsSummary {
    pub generation_time: String,
    pub total_projects: usize,
    pub total_tasks: usize,
    pub total_unique_employees: usize,
    pub total_api_calls: usize,
    pub projects_summary: Vec<ProjectEntry>,
    pub failed_projects: Vec<FailedProject>,
    pub employee_participation: BTreeMap<String, EmployeeParticipation>,
    /// Most used skills, most frequent first
    pub skill_usage_frequency: Vec<SkillUsage>,
    pub communication_style_distribution: StyleDistribution,
}

fn related_ids(document: &ProjectDocument) -> Vec<String> {
    match (&document.project_info, &document.sub_topic_info) {
        (Some(info), _) => info
            .related_projects
            .iter()
            .map(|n| format!("project_{}", n))
            .collect(),
        (None, Some(info)) => info.related_projects.clone(),
        (None, None) => Vec::new(),
    }
}

pub fn build_projects_summary(
    projects: &[ProjectDocument],
    failed: &[FailedProject],
) -> ProjectsSummary {
    let mut participation: BTreeMap<String, EmployeeParticipation> = BTreeMap::new();
    let mut skill_counts: HashMap<&str, usize> = HashMap::new();

    for project in projects {
        let id = project.identifier();
        for member in &project.members {
            let entry = participation
                .entry(member.user_name.clone())
                .or_insert_with(|| EmployeeParticipation {
                    projects_participated: Vec::new(),
                    total_tasks: 0,
                    rank: member.rank,
                });
            entry.projects_participated.push(id.clone());
            entry.total_tasks += member.subtasks.len();

            for skill in &member.hard_skills {
                *skill_counts.entry(skill.skill.as_str()).or_insert(0) += 1;
            }
        }
    }

    let mut skill_usage: Vec<SkillUsage> = skill_counts
        .into_iter()
        .map(|(skill, count)| SkillUsage {
            skill: skill.to_string(),
            count,
        })
        .collect();
    skill_usage.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.skill.cmp(&b.skill)));
    skill_usage.truncate(TOP_SKILLS);

    let projects_summary: Vec<ProjectEntry> = projects
        .iter()
        .map(|p| ProjectEntry {
            project_id: p.identifier(),
            project_topic: p.topic().to_string(),
            team_size: p.members.len(),
            total_subtasks: p.metadata.total_subtasks,
            related_projects: related_ids(p),
            api_calls: p.metadata.api_calls,
        })
        .collect();

    let total_api_calls = projects_summary.iter().map(|p| p.api_calls).sum::<usize>()
        + failed.iter().map(|f| f.api_calls).sum::<usize>();

    ProjectsSummary {
        generation_time: chrono::Local::now().to_rfc3339(),
        total_projects: projects.len(),
        total_tasks: projects.iter().map(|p| p.metadata.total_subtasks).sum(),
        total_unique_employees: participation.len(),
        total_api_calls,
        projects_summary,
        failed_projects: failed.to_vec(),
        employee_participation: participation,
        skill_usage_frequency: skill_usage,
        communication_style_distribution: style_distribution(
            projects
                .iter()
                .flat_map(|p| p.members.iter().map(|m| &m.communication_style)),
        ),
    }
}

// ============================================================================
// Phase 5: timeline report
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct TimelineConfigEntry {
    pub start_date: String,
    pub end_date: String,
}

/// Outcome for one project file
#[derive(Debug, Clone, Default, Serialize)]
pub struct TimelineProjectReport {
    pub project_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub_topic_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_topic_id: Option<String>,
    pub success: bool,
    /// Already fully scheduled; left untouched
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub skipped: bool,
    pub total_subtasks: usize,
    pub assigned_tasks: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation: Option<TimelineValidation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeline_summary: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub api_calls: usize,
}

impl TimelineProjectReport {
    pub fn failed(project_name: impl Into<String>, error: impl Into<String>, api_calls: usize) -> Self {
        Self {
            project_name: project_name.into(),
            error: Some(error.into()),
            api_calls,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TimelineStatistics {
    pub total_tasks_processed: usize,
    pub successful_projects: usize,
    pub failed_projects: usize,
    pub skipped_projects: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct TimelineReport {
    pub generation_time: String,
    pub total_projects: usize,
    pub timeline_config: TimelineConfigEntry,
    pub projects: Vec<TimelineProjectReport>,
    pub statistics: TimelineStatistics,
}

pub fn build_timeline_report(
    window: &TimelineWindow,
    projects: Vec<TimelineProjectReport>,
) -> TimelineReport {
    let succeeded = || projects.iter().filter(|p| p.success && !p.skipped);
    let statistics = TimelineStatistics {
        total_tasks_processed: succeeded().map(|p| p.total_subtasks).sum(),
        successful_projects: succeeded().count(),
        failed_projects: projects.iter().filter(|p| !p.success).count(),
        skipped_projects: projects.iter().filter(|p| p.skipped).count(),
    };

    TimelineReport {
        generation_time: chrono::Local::now().to_rfc3339(),
        total_projects: projects.len(),
        timeline_config: TimelineConfigEntry {
            start_date: window.start.to_string(),
            end_date: window.end.to_string(),
        },
        projects,
        statistics,
    }
}
