//! Configuration records
//!
//! [`SynthConfig`] carries every tunable constant the phases consume. It is
//! built once at process start (defaults, optionally overlaid by a YAML file)
//! and passed by reference into each phase. [`ApiConfig`] carries the
//! generation endpoint credentials and parameters, read from the environment.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::synth::types::Rank;

// ============================================================================
// Generation endpoint
// ============================================================================

pub const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";
pub const DEFAULT_MODEL: &str = "google/gemini-2.5-pro";

/// OpenAI-compatible endpoint settings
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl ApiConfig {
    /// Build from `OPENAI_API_KEY` (required), `OPENAI_BASE_URL` and
    /// `OPENAI_MODEL` (optional). Call `dotenv::dotenv()` first to pick up
    /// a `.env` file.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .context("OPENAI_API_KEY environment variable is not set")?;
        if api_key.trim().is_empty() {
            anyhow::bail!("OPENAI_API_KEY is empty");
        }
        let base_url =
            std::env::var("OPENAI_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let model = std::env::var("OPENAI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            model,
            temperature: 1.0,
            max_tokens: 32_000,
        })
    }
}

// ============================================================================
// Pipeline configuration
// ============================================================================

/// Inclusive `[min, max]` count bound
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountRange {
    pub min: usize,
    pub max: usize,
}

impl CountRange {
    pub const fn new(min: usize, max: usize) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, n: usize) -> bool {
        n >= self.min && n <= self.max
    }
}

/// One count per rank
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankCounts {
    pub rank_1: usize,
    pub rank_2: usize,
    pub rank_3: usize,
}

impl RankCounts {
    pub fn get(&self, rank: Rank) -> usize {
        match rank {
            Rank::Executive => self.rank_1,
            Rank::Director => self.rank_2,
            Rank::Staff => self.rank_3,
        }
    }

    pub fn total(&self) -> usize {
        self.rank_1 + self.rank_2 + self.rank_3
    }
}

/// Skill-count bounds per rank
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillCountByRank {
    pub rank_1: CountRange,
    pub rank_2: CountRange,
    pub rank_3: CountRange,
}

impl SkillCountByRank {
    pub fn for_rank(&self, rank: Rank) -> CountRange {
        match rank {
            Rank::Executive => self.rank_1,
            Rank::Director => self.rank_2,
            Rank::Staff => self.rank_3,
        }
    }
}

/// Team size and seniority floor for one project
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamSizeBounds {
    pub min: usize,
    pub max: usize,
    pub rank_1_min: usize,
    pub rank_2_min: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrganizationConfig {
    pub total_employees: usize,
    pub teams: Vec<String>,
    /// Team label carried by the rank-1 member
    pub executive_team: String,
    pub rank_counts: RankCounts,
    pub user_id_length: usize,
    pub dept_id_length: usize,
    pub id_alphabet: String,
}

impl Default for OrganizationConfig {
    fn default() -> Self {
        let teams: Vec<String> = [
            "技术研发部",
            "市场部",
            "产品设计部",
            "销售部",
            "运营部",
            "财务部",
            "人力资源部",
        ]
        .iter()
        .map(|t| t.to_string())
        .collect();

        Self {
            total_employees: 300,
            rank_counts: RankCounts {
                rank_1: 1,
                rank_2: teams.len(),
                rank_3: 300 - 1 - teams.len(),
            },
            teams,
            executive_team: "高层管理".to_string(),
            user_id_length: 8,
            dept_id_length: 5,
            id_alphabet: "abcdefghijklmnopqrstuvwxyz0123456789".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub max_retries: usize,
    pub retry_delay_secs: f64,
    /// Pause between consecutive batches
    pub batch_pause_secs: f64,
    pub employee_batch_size: usize,
    pub skill_batch_size: usize,
    pub style_batch_size: usize,
    /// Abort Phase 1 when the roster fails validation
    pub strict_validation: bool,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_retries: 10,
            retry_delay_secs: 2.0,
            batch_pause_secs: 0.5,
            employee_batch_size: 20,
            skill_batch_size: 10,
            style_batch_size: 10,
            strict_validation: true,
        }
    }
}

impl GenerationConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs_f64(self.retry_delay_secs.max(0.0))
    }

    pub fn batch_pause(&self) -> Duration {
        Duration::from_secs_f64(self.batch_pause_secs.max(0.0))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SkillConfig {
    pub count_by_rank: SkillCountByRank,
    pub universe_size: CountRange,
}

impl Default for SkillConfig {
    fn default() -> Self {
        Self {
            count_by_rank: SkillCountByRank {
                rank_1: CountRange::new(6, 10),
                rank_2: CountRange::new(5, 8),
                rank_3: CountRange::new(3, 6),
            },
            universe_size: CountRange::new(40, 60),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    /// Number of projects in the chain variant
    pub num_projects: usize,
    /// Composition of the randomly sampled first chain team
    pub first_team: RankCounts,
    /// Team bounds for chain projects
    pub team_size: TeamSizeBounds,
    pub num_major_topics: usize,
    pub sub_topics_per_major: usize,
    /// Team bounds for sub-topic projects
    pub sub_topic_team_size: TeamSizeBounds,
    pub min_subtasks_per_member: usize,
    pub seed: Option<u64>,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            num_projects: 10,
            first_team: RankCounts {
                rank_1: 1,
                rank_2: 2,
                rank_3: 12,
            },
            team_size: TeamSizeBounds {
                min: 8,
                max: 20,
                rank_1_min: 1,
                rank_2_min: 1,
            },
            num_major_topics: 20,
            sub_topics_per_major: 3,
            sub_topic_team_size: TeamSizeBounds {
                min: 20,
                max: 60,
                rank_1_min: 1,
                rank_2_min: 1,
            },
            min_subtasks_per_member: 5,
            seed: None,
        }
    }
}

/// Date window every deadline must fall in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl Default for TimelineWindow {
    fn default() -> Self {
        Self {
            start: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap_or(NaiveDate::MIN),
            end: NaiveDate::from_ymd_opt(2025, 12, 31).unwrap_or(NaiveDate::MAX),
        }
    }
}

impl TimelineWindow {
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }
}

/// File names of every artifact, relative to `dir`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputLayout {
    pub dir: PathBuf,
    pub roster_file: String,
    pub skills_file: String,
    pub styles_file: String,
    pub skill_universe_file: String,
    pub style_universe_file: String,
    pub style_report_file: String,
    pub projects_dir: String,
    pub major_topics_file: String,
    pub sub_topics_file: String,
    pub projects_summary_file: String,
    pub timeline_report_file: String,
}

impl Default for OutputLayout {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("output"),
            roster_file: "employees.db".to_string(),
            skills_file: "employees_with_hardskills.db".to_string(),
            styles_file: "employees_with_communicationstyle.db".to_string(),
            skill_universe_file: "skill_universe.json".to_string(),
            style_universe_file: "communicationstyle_universe.json".to_string(),
            style_report_file: "communication_style_assignment_report.json".to_string(),
            projects_dir: "projects".to_string(),
            major_topics_file: "major_topics.json".to_string(),
            sub_topics_file: "sub_topics.json".to_string(),
            projects_summary_file: "summary_report.json".to_string(),
            timeline_report_file: "timeline_assignment_report.json".to_string(),
        }
    }
}

impl OutputLayout {
    pub fn roster_path(&self) -> PathBuf {
        self.dir.join(&self.roster_file)
    }

    pub fn skills_path(&self) -> PathBuf {
        self.dir.join(&self.skills_file)
    }

    pub fn styles_path(&self) -> PathBuf {
        self.dir.join(&self.styles_file)
    }

    pub fn skill_universe_path(&self) -> PathBuf {
        self.dir.join(&self.skill_universe_file)
    }

    pub fn style_universe_path(&self) -> PathBuf {
        self.dir.join(&self.style_universe_file)
    }

    pub fn style_report_path(&self) -> PathBuf {
        self.dir.join(&self.style_report_file)
    }

    pub fn projects_path(&self) -> PathBuf {
        self.dir.join(&self.projects_dir)
    }

    pub fn major_topics_path(&self) -> PathBuf {
        self.projects_path().join(&self.major_topics_file)
    }

    pub fn sub_topics_path(&self) -> PathBuf {
        self.projects_path().join(&self.sub_topics_file)
    }

    pub fn projects_summary_path(&self) -> PathBuf {
        self.projects_path().join(&self.projects_summary_file)
    }

    pub fn timeline_report_path(&self) -> PathBuf {
        self.dir.join(&self.timeline_report_file)
    }
}

/// Every tunable constant consumed by the pipeline
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthConfig {
    pub organization: OrganizationConfig,
    pub generation: GenerationConfig,
    pub skills: SkillConfig,
    pub projects: ProjectConfig,
    pub timeline: TimelineWindow,
    pub output: OutputLayout,
}

impl SynthConfig {
    /// Load defaults overlaid with the sections present in a YAML file
    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_yaml_str(&content)
            .with_context(|| format!("Failed to parse config YAML from: {}", path.display()))
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Number of leader records (rank 1 and rank 2) the roster must hold
    pub fn leader_count(&self) -> usize {
        self.organization.rank_counts.rank_1 + self.organization.rank_counts.rank_2
    }

    /// Report internal inconsistencies; empty when the config is usable
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        let org = &self.organization;

        if org.teams.is_empty() {
            errors.push("at least one team is required".to_string());
        }
        if org.rank_counts.total() != org.total_employees {
            errors.push(format!(
                "rank counts sum to {} but total_employees is {}",
                org.rank_counts.total(),
                org.total_employees
            ));
        }
        if org.rank_counts.rank_2 != org.teams.len() {
            errors.push(format!(
                "rank-2 count ({}) must equal the number of teams ({})",
                org.rank_counts.rank_2,
                org.teams.len()
            ));
        }
        if self.leader_count() >= org.total_employees {
            errors.push("leader count must be below total_employees".to_string());
        }
        if org.id_alphabet.is_empty() || org.user_id_length == 0 || org.dept_id_length == 0 {
            errors.push("id alphabet and id lengths must be non-empty".to_string());
        }

        let gen = &self.generation;
        if gen.max_retries == 0 {
            errors.push("max_retries must be at least 1".to_string());
        }
        for (name, size) in [
            ("employee_batch_size", gen.employee_batch_size),
            ("skill_batch_size", gen.skill_batch_size),
            ("style_batch_size", gen.style_batch_size),
        ] {
            if size == 0 {
                errors.push(format!("{} must be at least 1", name));
            }
        }

        let ranges = [
            ("skills.count_by_rank.rank_1", self.skills.count_by_rank.rank_1),
            ("skills.count_by_rank.rank_2", self.skills.count_by_rank.rank_2),
            ("skills.count_by_rank.rank_3", self.skills.count_by_rank.rank_3),
            ("skills.universe_size", self.skills.universe_size),
        ];
        for (name, range) in ranges {
            if range.min > range.max {
                errors.push(format!("{}: min {} > max {}", name, range.min, range.max));
            }
        }
        for (name, bounds) in [
            ("projects.team_size", self.projects.team_size),
            ("projects.sub_topic_team_size", self.projects.sub_topic_team_size),
        ] {
            if bounds.min > bounds.max {
                errors.push(format!("{}: min {} > max {}", name, bounds.min, bounds.max));
            }
        }

        if self.timeline.start > self.timeline.end {
            errors.push(format!(
                "timeline start {} is after end {}",
                self.timeline.start, self.timeline.end
            ));
        }

        errors
    }
}
