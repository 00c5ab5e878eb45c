//! Phase 3: Communication styles
//!
//! Writes the fixed style universe, then asks the model for one style
//! vector per employee in batches and records an assignment report.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashSet;
use std::time::Instant;

use org_synth_sdk::{log_file_saved, log_found, log_state_file, log_warning};

use crate::config::SynthConfig;
use crate::synth::documents::write_json;
use crate::synth::prompts;
use crate::synth::store::{read_employees, write_employees, StoreStage};
use crate::synth::style_universe::StyleUniverseDocument;
use crate::synth::summary::{
    style_distribution, success_rate, StyleReport, StyleReportSummary, StyleReportValidation,
};
use crate::synth::types::{Employee, StyleVector};
use crate::synth::validate::{enforce, style_errors, validate_styles, OnViolation};
use crate::workflow_utils::{fold_batches, plan_batches, CallSpec, ExtractMode, RetryingCaller};

#[derive(Debug, Deserialize)]
struct StyleAssignmentResponse {
    assignments: Vec<GeneratedStyle>,
}

#[derive(Debug, Deserialize)]
struct GeneratedStyle {
    name: String,
    communication_style: StyleVector,
}

/// Assign a style vector to every employee in batches.
///
/// Returns the employees and the style errors found along the way. A vector
/// with errors is still stored; the errors go to the report.
pub async fn assign_styles(
    config: &SynthConfig,
    caller: &RetryingCaller,
    mut employees: Vec<Employee>,
) -> Result<(Vec<Employee>, Vec<String>)> {
    let plan = plan_batches(employees.len(), config.generation.style_batch_size, None);
    let roster = &employees;

    let (merged, errors) = fold_batches(
        3,
        &plan,
        config.generation.batch_pause(),
        Vec::new(),
        |entry: &(String, StyleVector)| entry.0.clone(),
        move |ctx, mut errors: Vec<String>| async move {
            let batch: Vec<&Employee> = roster[ctx.range.clone()].iter().collect();
            let prompt = prompts::style_assignment(&batch);
            let task_id = format!("styles_batch_{}", ctx.batch_number);
            let response: StyleAssignmentResponse = caller
                .call(CallSpec {
                    task_id: &task_id,
                    system: prompts::ORG_BEHAVIOR_EXPERT,
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
                errors.extend(style_errors(&name, &assignment.communication_style));
                entries.push((name, assignment.communication_style));
            }
            Ok::<_, anyhow::Error>((entries, errors))
        },
    )
    .await
    .context("Communication style assignment aborted")?;

    for employee in employees.iter_mut() {
        if let Some((_, style)) = merged.get(&employee.name) {
            employee.communication_style = Some(style.clone());
        }
    }
    Ok((employees, errors))
}

pub fn build_report(
    employees: &[Employee],
    batch_size: usize,
    total_batches: usize,
    started: (chrono::DateTime<chrono::Local>, Instant),
    errors: Vec<String>,
) -> StyleReport {
    let assigned = employees
        .iter()
        .filter(|e| e.communication_style.is_some())
        .count();
    let missing = employees.len() - assigned;

    StyleReport {
        summary: StyleReportSummary {
            total_employees: employees.len(),
            assigned_employees: assigned,
            batch_size,
            total_batches,
            execution_time_seconds: started.1.elapsed().as_secs_f64(),
            success_rate: success_rate(assigned, employees.len()),
            start_time: started.0.to_rfc3339(),
            end_time: chrono::Local::now().to_rfc3339(),
        },
        dimension_distribution: style_distribution(
            employees.iter().filter_map(|e| e.communication_style.as_ref()),
        ),
        validation: StyleReportValidation {
            all_employees_assigned: missing == 0,
            missing_assignments: missing,
            errors,
        },
    }
}

/// Run Phase 3 from the skills file; returns the employees with styles
pub async fn run(config: &SynthConfig, caller: &RetryingCaller) -> Result<Vec<Employee>> {
    let started = (chrono::Local::now(), Instant::now());

    let source = config.output.skills_path();
    let employees = read_employees(&source, StoreStage::WithSkills).with_context(|| {
        format!("Phase 3 needs the Phase 2 output at {}", source.display())
    })?;
    log_found!(employees.len(), "employees");

    let universe_path = config.output.style_universe_path();
    write_json(&universe_path, &StyleUniverseDocument::new()).await?;
    log_file_saved!(universe_path.display());
    log_state_file!(3, universe_path.display(), "Communication style universe");

    let (employees, mut errors) = assign_styles(config, caller, employees).await?;

    let missing: Vec<String> = employees
        .iter()
        .filter(|e| e.communication_style.is_none())
        .map(|e| format!("{}: no communication style", e.name))
        .collect();
    errors.extend(missing);
    enforce(
        "communication styles",
        &validate_styles(
            employees
                .iter()
                .map(|e| (e.name.as_str(), e.communication_style.as_ref())),
        ),
        OnViolation::Warn,
    )?;

    let batch_size = config.generation.style_batch_size;
    let total_batches = plan_batches(employees.len(), batch_size, None).len();
    let report = build_report(&employees, batch_size, total_batches, started, errors);
    let report_path = config.output.style_report_path();
    write_json(&report_path, &report).await?;
    log_file_saved!(report_path.display());

    let path = config.output.styles_path();
    write_employees(&path, &employees, StoreStage::WithStyles)?;
    log_file_saved!(path.display());
    log_state_file!(3, path.display(), "Employees with communication styles");
    Ok(employees)
}
