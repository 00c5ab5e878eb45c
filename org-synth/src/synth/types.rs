//! Data structures shared by every phase

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Employees
// ============================================================================

/// Seniority level; serialized as 1, 2 or 3
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Rank {
    Executive = 1,
    Director = 2,
    Staff = 3,
}

impl Rank {
    pub const ALL: [Rank; 3] = [Rank::Executive, Rank::Director, Rank::Staff];

    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Leaders are ranks 1 and 2
    pub fn is_leader(self) -> bool {
        self != Rank::Staff
    }
}

impl TryFrom<u8> for Rank {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Rank::Executive),
            2 => Ok(Rank::Director),
            3 => Ok(Rank::Staff),
            other => Err(format!("rank must be 1, 2 or 3, got {}", other)),
        }
    }
}

impl From<Rank> for u8 {
    fn from(rank: Rank) -> u8 {
        rank.as_u8()
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u8())
    }
}

/// Skill proficiency level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Proficiency {
    Strong,
    Medium,
    Low,
}

impl Proficiency {
    pub fn as_str(self) -> &'static str {
        match self {
            Proficiency::Strong => "strong",
            Proficiency::Medium => "medium",
            Proficiency::Low => "low",
        }
    }
}

impl FromStr for Proficiency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "strong" => Ok(Proficiency::Strong),
            "medium" => Ok(Proficiency::Medium),
            "low" => Ok(Proficiency::Low),
            other => Err(format!("unknown proficiency '{}'", other)),
        }
    }
}

impl fmt::Display for Proficiency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HardSkill {
    pub skill: String,
    pub proficiency: Proficiency,
}

impl HardSkill {
    pub fn new(skill: impl Into<String>, proficiency: Proficiency) -> Self {
        Self {
            skill: skill.into(),
            proficiency,
        }
    }
}

/// Communication-style vector: dimension name to label
pub type StyleVector = BTreeMap<String, String>;

/// One row of the employee store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Employee {
    pub name: String,
    pub user_id: String,
    pub team: String,
    pub dept_id: String,
    pub rank: Rank,
    pub title: String,
    #[serde(default)]
    pub hard_skills: Vec<HardSkill>,
    #[serde(default)]
    pub communication_style: Option<StyleVector>,
}

// ============================================================================
// Projects
// ============================================================================

/// Fixed, ordered project lifecycle stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Phase {
    #[serde(rename = "Strategy & Planning")]
    StrategyPlanning,
    #[serde(rename = "Design & Architecture")]
    DesignArchitecture,
    #[serde(rename = "Development & Implementation")]
    DevelopmentImplementation,
    #[serde(rename = "Testing & Optimization")]
    TestingOptimization,
    #[serde(rename = "Deployment & Launch")]
    DeploymentLaunch,
}

impl Phase {
    pub const ALL: [Phase; 5] = [
        Phase::StrategyPlanning,
        Phase::DesignArchitecture,
        Phase::DevelopmentImplementation,
        Phase::TestingOptimization,
        Phase::DeploymentLaunch,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Phase::StrategyPlanning => "Strategy & Planning",
            Phase::DesignArchitecture => "Design & Architecture",
            Phase::DevelopmentImplementation => "Development & Implementation",
            Phase::TestingOptimization => "Testing & Optimization",
            Phase::DeploymentLaunch => "Deployment & Launch",
        }
    }

    /// Match a model-supplied label, ignoring case and a leading "Phase N:"
    pub fn from_label(label: &str) -> Option<Phase> {
        let label = label.trim();
        let label = match label.split_once(':') {
            Some((prefix, rest)) if prefix.trim().to_lowercase().starts_with("phase") => rest.trim(),
            _ => label,
        };
        let wanted = label.to_lowercase().replace(" and ", " & ");
        Phase::ALL
            .into_iter()
            .find(|p| p.label().to_lowercase() == wanted)
            .or_else(|| {
                // Bare first word, e.g. "Testing"
                Phase::ALL.into_iter().find(|p| {
                    p.label()
                        .split_whitespace()
                        .next()
                        .map(|w| w.eq_ignore_ascii_case(&wanted))
                        .unwrap_or(false)
                })
            })
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Subtask {
    pub subtask_id: u32,
    pub subtask: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<Phase>,
    #[serde(default)]
    pub required_skills: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub communication_requirements: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignment_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectMember {
    pub user_name: String,
    pub user_id: String,
    pub team: String,
    pub title: String,
    pub rank: Rank,
    pub hard_skills: Vec<HardSkill>,
    /// Style in effect for this project (adjusted when adjustment ran)
    pub communication_style: StyleVector,
    /// Style snapshot taken before any adjustment
    pub original_communication_style: StyleVector,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selection_reason: Option<String>,
    #[serde(default)]
    pub subtasks: Vec<Subtask>,
}

impl ProjectMember {
    /// Team snapshot of an employee; both style fields start equal
    pub fn from_employee(employee: &Employee) -> Self {
        let style = employee.communication_style.clone().unwrap_or_default();
        Self {
            user_name: employee.name.clone(),
            user_id: employee.user_id.clone(),
            team: employee.team.clone(),
            title: employee.title.clone(),
            rank: employee.rank,
            hard_skills: employee.hard_skills.clone(),
            original_communication_style: style.clone(),
            communication_style: style,
            selection_reason: None,
            subtasks: Vec::new(),
        }
    }
}

/// Header of a chain-variant project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectInfo {
    pub project_number: u32,
    pub project_topic: String,
    pub project_description: String,
    pub related_projects: Vec<u32>,
    pub generated_at: String,
}

/// Header of a topics-variant project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SubTopicInfo {
    pub sub_topic_id: String,
    pub parent_topic_id: String,
    pub topic: String,
    pub description: String,
    pub related_projects: Vec<String>,
    pub generated_at: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RankDistribution {
    pub rank_1: usize,
    pub rank_2: usize,
    pub rank_3: usize,
}

impl RankDistribution {
    pub fn of<'a>(ranks: impl IntoIterator<Item = &'a Rank>) -> Self {
        let mut dist = Self::default();
        for rank in ranks {
            match rank {
                Rank::Executive => dist.rank_1 += 1,
                Rank::Director => dist.rank_2 += 1,
                Rank::Staff => dist.rank_3 += 1,
            }
        }
        dist
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TeamComposition {
    pub total_members: usize,
    pub rank_distribution: RankDistribution,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Adjustments {
    #[serde(default)]
    pub members_added: Vec<String>,
    #[serde(default)]
    pub members_removed: Vec<String>,
    #[serde(default)]
    pub communication_style_adjusted: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectMetadata {
    pub total_subtasks: usize,
    pub avg_subtasks_per_member: f64,
    pub generation_method: String,
    pub adjustments_made: Adjustments,
    /// Generation attempts spent on this project, retries included
    #[serde(default)]
    pub api_calls: usize,
}

/// One project file; exactly one of the two headers is present
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_info: Option<ProjectInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_topic_info: Option<SubTopicInfo>,
    pub team_composition: TeamComposition,
    pub members: Vec<ProjectMember>,
    pub metadata: ProjectMetadata,
}

impl ProjectDocument {
    /// Topic label from whichever header is present
    pub fn topic(&self) -> &str {
        match (&self.project_info, &self.sub_topic_info) {
            (Some(info), _) => &info.project_topic,
            (None, Some(info)) => &info.topic,
            (None, None) => "",
        }
    }

    pub fn description(&self) -> &str {
        match (&self.project_info, &self.sub_topic_info) {
            (Some(info), _) => &info.project_description,
            (None, Some(info)) => &info.description,
            (None, None) => "",
        }
    }

    /// Stable identifier: project number or sub-topic id
    pub fn identifier(&self) -> String {
        match (&self.project_info, &self.sub_topic_info) {
            (Some(info), _) => format!("project_{}", info.project_number),
            (None, Some(info)) => info.sub_topic_id.clone(),
            (None, None) => String::new(),
        }
    }

    pub fn subtasks(&self) -> impl Iterator<Item = (&ProjectMember, &Subtask)> {
        self.members
            .iter()
            .flat_map(|m| m.subtasks.iter().map(move |s| (m, s)))
    }

    pub fn total_subtasks(&self) -> usize {
        self.members.iter().map(|m| m.subtasks.len()).sum()
    }

    /// True when there is at least one subtask and every subtask has a deadline
    pub fn fully_scheduled(&self) -> bool {
        self.total_subtasks() > 0 && self.subtasks().all(|(_, s)| s.deadline.is_some())
    }
}

// ============================================================================
// Topics
// ============================================================================

/// A broad business theme, decomposed into sub-topics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MajorTopic {
    pub major_topic_id: String,
    pub topic: String,
    pub description: String,
    pub generated_at: String,
}

/// One sub-topic; each becomes its own project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SubTopic {
    pub sub_topic_id: String,
    pub parent_topic_id: String,
    pub topic: String,
    pub description: String,
    #[serde(default)]
    pub reasoning: String,
    pub generated_at: String,
}

/// One deadline proposed for one subtask
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeadlineAssignment {
    #[serde(default)]
    pub subtask_id: Option<u32>,
    #[serde(default)]
    pub user_name: Option<String>,
    /// Raw `YYYY-MM-DD` text; parsed during validation
    #[serde(default)]
    pub deadline: Option<String>,
    #[serde(default)]
    pub phase: Option<String>,
    #[serde(default)]
    pub reasoning: Option<String>,
}
