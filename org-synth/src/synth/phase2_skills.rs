//! Phase 2: Hard skills
//!
//! Builds (or loads from cache) the skill universe from the distinct job
//! titles, then assigns skills to employees in batches. Assignments are
//! filtered locally: entries for names outside the batch, skills outside the
//! universe and unknown proficiency levels are dropped with a warning.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;

use org_synth_sdk::{log_file_saved, log_found, log_info, log_state_file, log_warning};

use crate::config::SynthConfig;
use crate::synth::documents::{read_json, write_json};
use crate::synth::prompts;
use crate::synth::store::{is_storable_skill, read_employees, write_employees, StoreStage};
use crate::synth::types::{Employee, HardSkill};
use crate::synth::validate::{
    enforce, validate_skill_assignments, validate_skill_universe, OnViolation,
};
use crate::workflow_utils::{fold_batches, plan_batches, CallSpec, ExtractMode, RetryingCaller};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillCategory {
    pub category: String,
    pub skills: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct SkillUniverseResponse {
    skill_universe: Vec<SkillCategory>,
}

/// Cached universe file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillUniverseFile {
    pub skill_universe: Vec<SkillCategory>,
    pub all_skills: Vec<String>,
    pub total_skills: usize,
    pub generated_at: String,
}

#[derive(Debug, Deserialize)]
struct SkillAssignmentResponse {
    assignments: Vec<GeneratedAssignment>,
}

#[derive(Debug, Deserialize)]
struct GeneratedAssignment {
    name: String,
    #[serde(default)]
    hard_skills: Vec<GeneratedSkill>,
}

#[derive(Debug, Deserialize)]
struct GeneratedSkill {
    skill: String,
    level: String,
}

/// Distinct titles in first-appearance order
pub fn unique_titles(employees: &[Employee]) -> Vec<String> {
    let mut seen = HashSet::new();
    employees
        .iter()
        .filter(|e| seen.insert(e.title.as_str()))
        .map(|e| e.title.clone())
        .collect()
}

/// Flatten categories into one list, dropping case-insensitive duplicates.
/// Names with a comma cannot round-trip through the employee store and
/// are dropped as well.
pub fn flatten_universe(categories: &[SkillCategory]) -> Vec<String> {
    let mut seen = HashSet::new();
    categories
        .iter()
        .flat_map(|c| c.skills.iter())
        .map(|s| s.trim())
        .filter(|s| {
            if is_storable_skill(s) {
                return true;
            }
            log_warning!("Skill '{}' contains a comma, dropped from the universe", s);
            false
        })
        .filter(|s| !s.is_empty() && seen.insert(s.to_lowercase()))
        .map(str::to_string)
        .collect()
}

/// Load the cached universe, or generate and cache it
pub async fn load_or_generate_universe(
    config: &SynthConfig,
    caller: &RetryingCaller,
    titles: &[String],
) -> Result<Vec<String>> {
    let path = config.output.skill_universe_path();
    if path.exists() {
        let cached: SkillUniverseFile = read_json(&path).await?;
        log_info!(
            "Loaded {} skills from cache: {}",
            cached.all_skills.len(),
            path.display()
        );
        return Ok(cached
            .all_skills
            .into_iter()
            .filter(|s| is_storable_skill(s))
            .collect());
    }

    let prompt = prompts::skill_universe(
        titles,
        &config.organization.teams,
        config.skills.universe_size,
    );
    let response: SkillUniverseResponse = caller
        .call(CallSpec {
            task_id: "skill_universe",
            system: prompts::SKILL_EXPERT,
            prompt: &prompt,
            mode: ExtractMode::Strict,
        })
        .await
        .context("Skill universe generation failed")?;

    let all_skills = flatten_universe(&response.skill_universe);
    enforce(
        "skill universe",
        &validate_skill_universe(&all_skills, config.skills.universe_size),
        OnViolation::Warn,
    )?;

    let file = SkillUniverseFile {
        total_skills: all_skills.len(),
        all_skills,
        skill_universe: response.skill_universe,
        generated_at: chrono::Local::now().to_rfc3339(),
    };
    write_json(&path, &file).await?;
    log_file_saved!(path.display());
    log_state_file!(2, path.display(), "Skill universe cache");
    Ok(file.all_skills)
}

/// Keep the skills of one response entry that are in the universe and
/// carry a known level; spelling is normalized to the universe's
fn accept_skills(
    owner: &str,
    generated: Vec<GeneratedSkill>,
    universe: &HashMap<String, &String>,
) -> Vec<HardSkill> {
    let mut skills = Vec::with_capacity(generated.len());
    for item in generated {
        let Some(canonical) = universe.get(&item.skill.trim().to_lowercase()) else {
            log_warning!("{}: skill '{}' not in the universe, dropped", owner, item.skill);
            continue;
        };
        match item.level.trim().to_lowercase().parse() {
            Ok(proficiency) => skills.push(HardSkill::new(canonical.as_str(), proficiency)),
            Err(e) => log_warning!("{}: {} for '{}', dropped", owner, e, item.skill),
        }
    }
    skills
}

/// Assign skills to every employee in batches of the configured size
pub async fn assign_skills(
    config: &SynthConfig,
    caller: &RetryingCaller,
    mut employees: Vec<Employee>,
    universe: &[String],
) -> Result<Vec<Employee>> {
    let plan = plan_batches(employees.len(), config.generation.skill_batch_size, None);
    let lookup: HashMap<String, &String> =
        universe.iter().map(|s| (s.to_lowercase(), s)).collect();
    let roster = &employees;
    let lookup = &lookup;
    let bounds = &config.skills.count_by_rank;

    let (merged, ()) = fold_batches(
        2,
        &plan,
        config.generation.batch_pause(),
        (),
        |entry: &(String, Vec<HardSkill>)| entry.0.clone(),
        move |ctx, ()| async move {
            let batch: Vec<&Employee> = roster[ctx.range.clone()].iter().collect();
            let prompt = prompts::skill_assignment(&batch, universe, bounds);
            let task_id = format!("skills_batch_{}", ctx.batch_number);
            let response: SkillAssignmentResponse = caller
                .call(CallSpec {
                    task_id: &task_id,
                    system: prompts::SKILL_EXPERT,
                    prompt: &prompt,
                    mode: ExtractMode::Strict,
                })
                .await?;

            let names: HashSet<&str> = batch.iter().map(|e| e.name.as_str()).collect();
            let mut entries = Vec::with_capacity(response.assignments.len());
            for assignment in response.assignments {
                let name = assignment.name.trim().to_string();
                if !names.contains(name.as_str()) {
                    log_warning!("'{}' is not in batch {}, dropped", name, ctx.batch_number);
                    continue;
                }
                let skills = accept_skills(&name, assignment.hard_skills, lookup);
                entries.push((name, skills));
            }
            Ok::<_, anyhow::Error>((entries, ()))
        },
    )
    .await
    .context("Skill assignment aborted")?;

    if merged.len() != employees.len() {
        log_warning!(
            "Skills assigned to {}/{} employees",
            merged.len(),
            employees.len()
        );
    }

    for employee in employees.iter_mut() {
        if let Some((_, skills)) = merged.get(&employee.name) {
            employee.hard_skills = skills.clone();
        }
    }
    Ok(employees)
}

/// Run Phase 2 from the roster file; returns the employees with skills
pub async fn run(config: &SynthConfig, caller: &RetryingCaller) -> Result<Vec<Employee>> {
    let employees = load_roster(&config.output.roster_path())?;
    log_found!(employees.len(), "employees");

    let titles = unique_titles(&employees);
    log_found!(titles.len(), "distinct titles");

    let universe = load_or_generate_universe(config, caller, &titles).await?;
    let employees = assign_skills(config, caller, employees, &universe).await?;

    enforce(
        "skill assignment",
        &validate_skill_assignments(&employees, &universe, &config.skills.count_by_rank),
        OnViolation::Warn,
    )?;

    let path = config.output.skills_path();
    write_employees(&path, &employees, StoreStage::WithSkills)?;
    log_file_saved!(path.display());
    log_state_file!(2, path.display(), "Employees with hard skills");
    Ok(employees)
}

fn load_roster(path: &Path) -> Result<Vec<Employee>> {
    read_employees(path, StoreStage::Roster)
        .with_context(|| format!("Phase 2 needs the Phase 1 roster at {}", path.display()))
}
