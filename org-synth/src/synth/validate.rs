//! Constraint validators
//!
//! Every check is a pure function returning diagnostics; none of them log or
//! fail. The call site chooses the severity through [`enforce`] and an
//! [`OnViolation`] policy.

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fmt::Display;

use org_synth_sdk::{log_constraint_violation, log_error, log_warning};

use crate::config::{CountRange, SkillCountByRank, SynthConfig, TeamSizeBounds, TimelineWindow};
use crate::error::SynthError;
use crate::synth::style_universe::{self, STYLE_DIMENSIONS};
use crate::synth::types::{
    DeadlineAssignment, Employee, Phase, Proficiency, ProjectDocument, ProjectMember, Rank,
    StyleVector,
};

/// Outcome of one check
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Validation {
    pub passed: bool,
    pub errors: Vec<String>,
}

impl Validation {
    pub fn ok() -> Self {
        Self {
            passed: true,
            errors: Vec::new(),
        }
    }

    pub fn from_errors(errors: Vec<String>) -> Self {
        Self {
            passed: errors.is_empty(),
            errors,
        }
    }

    /// Combine two results; passes only when both pass
    pub fn merge(mut self, other: Validation) -> Self {
        self.errors.extend(other.errors);
        self.passed = self.passed && other.passed;
        self
    }
}

/// What the call site does with a failed check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnViolation {
    /// Log the diagnostics and continue
    Warn,
    /// Log the diagnostics and return [`SynthError::ConstraintViolation`]
    Abort,
}

/// Apply `policy` to a validation result
pub fn enforce(check: &str, validation: &Validation, policy: OnViolation) -> Result<(), SynthError> {
    if validation.passed {
        return Ok(());
    }
    let fatal = policy == OnViolation::Abort;
    log_constraint_violation!(check, validation.errors, fatal);

    const SHOWN: usize = 10;
    for error in validation.errors.iter().take(SHOWN) {
        if fatal {
            log_error!("[{}] {}", check, error);
        } else {
            log_warning!("[{}] {}", check, error);
        }
    }
    if validation.errors.len() > SHOWN {
        log_warning!(
            "[{}] ... {} more",
            check,
            validation.errors.len() - SHOWN
        );
    }

    match policy {
        OnViolation::Warn => Ok(()),
        OnViolation::Abort => Err(SynthError::ConstraintViolation {
            check: check.to_string(),
            errors: validation.errors.clone(),
        }),
    }
}

// ============================================================================
// Generic checks
// ============================================================================

/// Values occurring more than once, compared case-insensitively
pub fn duplicates<'a>(values: impl IntoIterator<Item = &'a str>) -> BTreeSet<String> {
    let mut seen = HashSet::new();
    let mut dups = BTreeSet::new();
    for value in values {
        let key = value.trim().to_lowercase();
        if !seen.insert(key.clone()) {
            dups.insert(key);
        }
    }
    dups
}

pub fn check_unique<'a>(what: &str, values: impl IntoIterator<Item = &'a str>) -> Validation {
    let dups = duplicates(values);
    if dups.is_empty() {
        Validation::ok()
    } else {
        Validation::from_errors(vec![format!(
            "duplicate {}: {}",
            what,
            dups.into_iter().collect::<Vec<_>>().join(", ")
        )])
    }
}

/// Count entities per key and compare with the expected counts
pub fn check_quota<K>(
    what: &str,
    keys: impl IntoIterator<Item = K>,
    expected: &BTreeMap<K, usize>,
) -> Validation
where
    K: Ord + Display,
{
    let mut actual: BTreeMap<K, usize> = BTreeMap::new();
    for key in keys {
        *actual.entry(key).or_insert(0) += 1;
    }

    let errors = expected
        .iter()
        .filter_map(|(key, &want)| {
            let got = actual.get(key).copied().unwrap_or(0);
            (got != want).then(|| format!("{} {}: expected {}, got {}", what, key, want, got))
        })
        .collect();
    Validation::from_errors(errors)
}

pub fn check_range(entity: &str, what: &str, count: usize, range: CountRange) -> Option<String> {
    (!range.contains(count)).then(|| {
        format!(
            "{}: {} count {} outside [{}, {}]",
            entity, what, count, range.min, range.max
        )
    })
}

/// Values not present in `allowed`, in input order
pub fn non_members<'a>(
    values: impl IntoIterator<Item = &'a str>,
    allowed: &HashSet<&str>,
) -> Vec<&'a str> {
    values.into_iter().filter(|v| !allowed.contains(v)).collect()
}

/// Expected ids absent from the result, and result ids never expected
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Coverage<K: Ord> {
    pub missing: BTreeSet<K>,
    pub extra: BTreeSet<K>,
}

impl<K: Ord> Coverage<K> {
    pub fn complete(&self) -> bool {
        self.missing.is_empty() && self.extra.is_empty()
    }
}

pub fn coverage<K: Ord>(
    expected: impl IntoIterator<Item = K>,
    actual: impl IntoIterator<Item = K>,
) -> Coverage<K> {
    let mut extra: BTreeSet<K> = actual.into_iter().collect();
    let mut missing = BTreeSet::new();
    for key in expected {
        if !extra.remove(&key) {
            missing.insert(key);
        }
    }
    Coverage { missing, extra }
}

/// Parse a `YYYY-MM-DD` date and check it lies inside `window`
pub fn check_date(raw: &str, window: &TimelineWindow) -> Result<NaiveDate, String> {
    let date = NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| format!("deadline '{}' is not a YYYY-MM-DD date", raw))?;
    if !window.contains(date) {
        return Err(format!(
            "deadline {} outside [{}, {}]",
            date, window.start, window.end
        ));
    }
    Ok(date)
}

/// A scheduled subtask as seen by the ordering check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledTask {
    pub subtask_id: u32,
    pub phase: Phase,
    pub owner_rank: Rank,
    pub deadline: NaiveDate,
}

/// Within each owner rank, no task of an earlier phase may be due after a
/// task of a later phase. One message per offending (rank, phase, phase).
pub fn ordering_violations(tasks: &[ScheduledTask]) -> Vec<String> {
    let mut by_rank: BTreeMap<Rank, BTreeMap<Phase, Vec<&ScheduledTask>>> = BTreeMap::new();
    for task in tasks {
        by_rank
            .entry(task.owner_rank)
            .or_default()
            .entry(task.phase)
            .or_default()
            .push(task);
    }

    let mut violations = Vec::new();
    for (rank, phases) in &by_rank {
        let phases: Vec<_> = phases.iter().collect();
        for (i, (early_phase, early)) in phases.iter().enumerate() {
            let Some(latest) = early.iter().max_by_key(|t| t.deadline) else {
                continue;
            };
            for (late_phase, late) in &phases[i + 1..] {
                if let Some(earliest) = late.iter().min_by_key(|t| t.deadline) {
                    if latest.deadline > earliest.deadline {
                        violations.push(format!(
                            "rank {}: subtask {} ({}) due {} after subtask {} ({}) due {}",
                            rank,
                            latest.subtask_id,
                            early_phase,
                            latest.deadline,
                            earliest.subtask_id,
                            late_phase,
                            earliest.deadline
                        ));
                    }
                }
            }
        }
    }
    violations
}

// ============================================================================
// Phase 1: roster
// ============================================================================

pub fn validate_employees(employees: &[Employee], config: &SynthConfig) -> Validation {
    let org = &config.organization;
    let mut errors = Vec::new();

    if employees.len() != org.total_employees {
        errors.push(format!(
            "employee count: expected {}, got {}",
            org.total_employees,
            employees.len()
        ));
    }

    let mut result = Validation::from_errors(errors)
        .merge(check_unique("names", employees.iter().map(|e| e.name.as_str())))
        .merge(check_unique(
            "user ids",
            employees.iter().map(|e| e.user_id.as_str()),
        ));

    let expected: BTreeMap<Rank, usize> = Rank::ALL
        .into_iter()
        .map(|r| (r, org.rank_counts.get(r)))
        .collect();
    result = result.merge(check_quota("rank", employees.iter().map(|e| e.rank), &expected));

    let mut errors = Vec::new();
    for team in &org.teams {
        let members: Vec<_> = employees.iter().filter(|e| &e.team == team).collect();
        if members.is_empty() {
            errors.push(format!("team '{}' has no employees", team));
            continue;
        }
        let directors = members.iter().filter(|e| e.rank == Rank::Director).count();
        if directors != 1 {
            errors.push(format!(
                "team '{}' has {} rank-2 members, expected exactly 1",
                team, directors
            ));
        }
    }

    for (i, e) in employees.iter().enumerate() {
        let fields = [
            ("name", &e.name),
            ("user_id", &e.user_id),
            ("team", &e.team),
            ("dept_id", &e.dept_id),
            ("title", &e.title),
        ];
        if let Some((field, _)) = fields.iter().find(|(_, v)| v.trim().is_empty()) {
            errors.push(format!("record {} is missing {}", i + 1, field));
        }
    }

    result.merge(Validation::from_errors(errors))
}

// ============================================================================
// Phase 2: skills
// ============================================================================

/// Generic label and its versioned or vendor-qualified variant
pub const PARENT_CHILD_SKILLS: [(&str, &str); 4] = [
    ("python", "python3"),
    ("java", "java8"),
    ("javascript", "js"),
    ("excel", "microsoft excel"),
];

pub fn mutual_exclusivity(skills: &[String]) -> Validation {
    let mut result = check_unique("skills", skills.iter().map(String::as_str));

    let lowered: HashSet<String> = skills.iter().map(|s| s.trim().to_lowercase()).collect();
    let errors = PARENT_CHILD_SKILLS
        .iter()
        .filter(|(parent, child)| lowered.contains(*parent) && lowered.contains(*child))
        .map(|(parent, child)| format!("parent/child skills: {} and {}", parent, child))
        .collect();
    result = result.merge(Validation::from_errors(errors));
    result
}

pub fn validate_skill_universe(skills: &[String], size: CountRange) -> Validation {
    let errors = check_range("skill universe", "skill", skills.len(), size)
        .into_iter()
        .collect();
    Validation::from_errors(errors).merge(mutual_exclusivity(skills))
}

pub fn validate_skill_assignments(
    employees: &[Employee],
    universe: &[String],
    bounds: &SkillCountByRank,
) -> Validation {
    let allowed: HashSet<&str> = universe.iter().map(String::as_str).collect();
    let mut errors = Vec::new();

    for e in employees {
        if e.hard_skills.is_empty() {
            errors.push(format!("{}: no skills assigned", e.name));
            continue;
        }
        if let Some(msg) = check_range(&e.name, "skill", e.hard_skills.len(), bounds.for_rank(e.rank)) {
            errors.push(msg);
        }
        for skill in non_members(e.hard_skills.iter().map(|s| s.skill.as_str()), &allowed) {
            errors.push(format!("{}: skill '{}' not in the skill universe", e.name, skill));
        }
        let mut seen = HashSet::new();
        if e.hard_skills.iter().any(|s| !seen.insert(s.skill.as_str())) {
            errors.push(format!("{}: duplicate skills", e.name));
        }
        if !e.hard_skills.iter().any(|s| s.proficiency == Proficiency::Strong) {
            errors.push(format!("{}: no strong skill", e.name));
        }
    }
    Validation::from_errors(errors)
}

// ============================================================================
// Phase 3 and 4: communication styles
// ============================================================================

/// Problems with one style vector: missing, unknown or out-of-vocabulary keys
pub fn style_errors(owner: &str, style: &StyleVector) -> Vec<String> {
    let mut errors = Vec::new();
    for dim in STYLE_DIMENSIONS.iter() {
        match style.get(dim.dimension) {
            None => errors.push(format!("{}: missing dimension {}", owner, dim.dimension)),
            Some(value) if !dim.allows(value) => errors.push(format!(
                "{}: {} value '{}' not one of {}",
                owner,
                dim.dimension,
                value,
                dim.labels().join("/")
            )),
            Some(_) => {}
        }
    }
    for key in style.keys() {
        if style_universe::dimension(key).is_none() {
            errors.push(format!("{}: unknown dimension {}", owner, key));
        }
    }
    errors
}

pub fn validate_styles<'a>(
    styles: impl IntoIterator<Item = (&'a str, Option<&'a StyleVector>)>,
) -> Validation {
    let mut errors = Vec::new();
    for (owner, style) in styles {
        match style {
            Some(style) => errors.extend(style_errors(owner, style)),
            None => errors.push(format!("{}: no communication style", owner)),
        }
    }
    Validation::from_errors(errors)
}

// ============================================================================
// Phase 4: teams and task assignment
// ============================================================================

pub fn validate_team(members: &[ProjectMember], bounds: &TeamSizeBounds) -> Validation {
    let mut errors = Vec::new();
    let size = members.len();
    if size < bounds.min || size > bounds.max {
        errors.push(format!(
            "team size {} outside [{}, {}]",
            size, bounds.min, bounds.max
        ));
    }
    let count = |rank: Rank| members.iter().filter(|m| m.rank == rank).count();
    if count(Rank::Executive) < bounds.rank_1_min {
        errors.push(format!(
            "team needs at least {} rank-1 member(s), has {}",
            bounds.rank_1_min,
            count(Rank::Executive)
        ));
    }
    if count(Rank::Director) < bounds.rank_2_min {
        errors.push(format!(
            "team needs at least {} rank-2 member(s), has {}",
            bounds.rank_2_min,
            count(Rank::Director)
        ));
    }
    Validation::from_errors(errors)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssignmentCheck {
    pub validation: Validation,
    pub coverage: Coverage<String>,
}

/// Completeness of a task assignment against the team.
///
/// `assigned` yields (member name, subtask count) per response entry.
pub fn validate_task_assignment<'a>(
    team: &[ProjectMember],
    assigned: impl IntoIterator<Item = (&'a str, usize)>,
    min_per_member: usize,
) -> AssignmentCheck {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for (name, n) in assigned {
        *counts.entry(name).or_insert(0) += n;
    }

    let cov = coverage(
        team.iter().map(|m| m.user_name.clone()),
        counts.keys().map(|k| k.to_string()),
    );

    let mut errors = Vec::new();
    for name in &cov.missing {
        errors.push(format!("{}: no subtasks assigned", name));
    }
    for name in &cov.extra {
        errors.push(format!("{}: assigned subtasks but not on the team", name));
    }
    for member in team {
        if let Some(&n) = counts.get(member.user_name.as_str()) {
            if n < min_per_member {
                errors.push(format!(
                    "{}: {} subtasks, minimum is {}",
                    member.user_name, n, min_per_member
                ));
            }
        }
    }

    AssignmentCheck {
        validation: Validation::from_errors(errors),
        coverage: cov,
    }
}

// ============================================================================
// Phase 5: timeline
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TimelineValidation {
    pub valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub missing_tasks: BTreeSet<u32>,
    pub extra_tasks: BTreeSet<u32>,
    pub total_subtasks: usize,
    pub assigned_tasks: usize,
}

impl TimelineValidation {
    pub fn to_validation(&self) -> Validation {
        Validation {
            passed: self.valid,
            errors: self.errors.clone(),
        }
    }
}

pub fn validate_timeline(
    document: &ProjectDocument,
    timeline: &[DeadlineAssignment],
    window: &TimelineWindow,
) -> TimelineValidation {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    let total_subtasks = document.total_subtasks();
    let assigned_tasks = timeline.len();
    if assigned_tasks != total_subtasks {
        errors.push(format!(
            "task count mismatch: expected {}, got {}",
            total_subtasks, assigned_tasks
        ));
    }

    let owners: HashMap<u32, (Rank, Option<Phase>)> = document
        .subtasks()
        .map(|(m, s)| (s.subtask_id, (m.rank, s.phase)))
        .collect();

    let mut assigned_ids = BTreeSet::new();
    let mut duplicate_ids = BTreeSet::new();
    let mut scheduled = Vec::new();

    for entry in timeline {
        let Some(id) = entry.subtask_id else {
            errors.push("timeline entry without subtask_id".to_string());
            continue;
        };
        if !assigned_ids.insert(id) {
            duplicate_ids.insert(id);
        }
        let Some(raw) = entry.deadline.as_deref().filter(|d| !d.trim().is_empty()) else {
            errors.push(format!("subtask {}: missing deadline", id));
            continue;
        };
        match check_date(raw, window) {
            Ok(deadline) => {
                if let Some(&(owner_rank, doc_phase)) = owners.get(&id) {
                    let phase = doc_phase.or_else(|| entry.phase.as_deref().and_then(Phase::from_label));
                    if let Some(phase) = phase {
                        scheduled.push(ScheduledTask {
                            subtask_id: id,
                            phase,
                            owner_rank,
                            deadline,
                        });
                    }
                }
            }
            Err(msg) => errors.push(format!("subtask {}: {}", id, msg)),
        }
    }

    if !duplicate_ids.is_empty() {
        errors.push(format!("duplicate subtask ids: {:?}", duplicate_ids));
    }

    let cov = coverage(owners.keys().copied(), assigned_ids.iter().copied());
    if !cov.missing.is_empty() {
        errors.push(format!("subtasks without a deadline: {:?}", cov.missing));
    }
    if !cov.extra.is_empty() {
        warnings.push(format!("subtask ids not in the project: {:?}", cov.extra));
    }

    warnings.extend(ordering_violations(&scheduled));

    TimelineValidation {
        valid: errors.is_empty(),
        errors,
        warnings,
        missing_tasks: cov.missing,
        extra_tasks: cov.extra,
        total_subtasks,
        assigned_tasks,
    }
}
