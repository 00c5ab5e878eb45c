//! Workflow orchestration for org dataset synthesis
//!
//! Runs the selected phases in order. Every phase reads the artifact the
//! previous one wrote to the output directory, so a run can start at any
//! phase whose inputs are already on disk.
//!
//! The primary entry point is [`run_synthesis_workflow`].

use anyhow::{Context, Result};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::fs;

use org_synth_sdk::{
    log_phase_complete, log_phase_complete_console, log_phase_failed, log_phase_start,
    log_phase_start_console, log_warning,
};

use crate::config::SynthConfig;
use crate::llm::ChatClient;
use crate::synth::{
    phase1_employees, phase2_skills, phase3_styles, phase4_chain, phase4_topics, phase5_timeline,
};
use crate::workflow_utils::{RetryPolicy, RetryingCaller};

const TOTAL_PHASES: usize = 5;

/// Phase 4 project generation strategy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum ProjectVariant {
    /// Each project's team is adjusted from the previous project's
    #[default]
    Chain,
    /// Major topics split into sub-topics, each with a freshly selected team
    Topics,
}

/// Configuration for the synthesis workflow
///
/// # Examples
///
/// ```no_run
/// use org_synth::synth::workflow::{ProjectVariant, WorkflowConfig};
///
/// // Projects and timelines only, over a roster already on disk
/// let config = WorkflowConfig {
///     phases: vec![4, 5],
///     variant: ProjectVariant::Topics,
///     ..Default::default()
/// };
/// ```
#[derive(Debug, Clone)]
pub struct WorkflowConfig {
    /// Which phases to execute (1-5)
    pub phases: Vec<u32>,
    pub variant: ProjectVariant,
    /// YAML file overlaying the default configuration
    pub config_file: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    /// Chain variant project count
    pub projects: Option<usize>,
    pub seed: Option<u64>,
    /// Directory of canned responses; no network when set
    pub dry_run: Option<PathBuf>,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            phases: vec![1, 2, 3, 4, 5],
            variant: ProjectVariant::Chain,
            config_file: None,
            output_dir: None,
            projects: None,
            seed: None,
            dry_run: None,
        }
    }
}

impl WorkflowConfig {
    /// Build the synthesis configuration: defaults, then the YAML file, then
    /// the command-line overrides
    pub fn load_synth_config(&self) -> Result<SynthConfig> {
        let mut synth = match &self.config_file {
            Some(path) => SynthConfig::from_yaml_file(path)?,
            None => SynthConfig::default(),
        };
        if let Some(dir) = &self.output_dir {
            synth.output.dir = dir.clone();
        }
        if let Some(n) = self.projects {
            synth.projects.num_projects = n;
        }
        if self.seed.is_some() {
            synth.projects.seed = self.seed;
        }

        let problems = synth.validate();
        if !problems.is_empty() {
            if synth.generation.strict_validation {
                anyhow::bail!("Inconsistent configuration:\n  {}", problems.join("\n  "));
            }
            for problem in &problems {
                log_warning!("Configuration: {}", problem);
            }
        }
        Ok(synth)
    }
}

/// Seeded when `seed` is set, from OS entropy otherwise
pub fn seeded_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

fn phase_failed(phase: usize, name: &str, error: anyhow::Error) -> anyhow::Error {
    log_phase_failed!(phase, name, format!("{:#}", error));
    error.context(format!("Phase {} ({}) failed", phase, name))
}

/// Run the selected phases in order
///
/// # Errors
///
/// Returns an error when a phase cannot produce its output file: an employee
/// batch exhausted its retries, a required input file is missing or has the
/// wrong shape, or a strict validation failed. Individual project and
/// timeline failures are reported in the phase summaries instead.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use org_synth::config::{ApiConfig, SynthConfig};
/// use org_synth::llm::OpenAiClient;
/// use org_synth::synth::workflow::{run_synthesis_workflow, WorkflowConfig};
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = WorkflowConfig::default();
/// let synth = SynthConfig::default();
/// let client = Arc::new(OpenAiClient::new(ApiConfig::from_env()?));
/// run_synthesis_workflow(&config, &synth, client).await?;
/// # Ok(())
/// # }
/// ```
pub async fn run_synthesis_workflow(
    config: &WorkflowConfig,
    synth: &SynthConfig,
    client: Arc<dyn ChatClient>,
) -> Result<()> {
    fs::create_dir_all(&synth.output.dir)
        .await
        .with_context(|| format!("Failed to create {}", synth.output.dir.display()))?;

    let caller = RetryingCaller::new(client, RetryPolicy::from(&synth.generation));
    let mut rng = seeded_rng(synth.projects.seed);

    // Phase 1: Employee roster
    if config.phases.contains(&1) {
        let name = "Employee Roster";
        log_phase_start!(1, name, TOTAL_PHASES);
        log_phase_start_console!(1, name, "Generating employees in batches");

        let (_, next_rng, _) = phase1_employees::run(synth, &caller, rng)
            .await
            .map_err(|e| phase_failed(1, name, e))?;
        rng = next_rng;

        log_phase_complete!(1, name);
        log_phase_complete_console!(1);
    }

    // Phase 2: Hard skills
    if config.phases.contains(&2) {
        let name = "Hard Skills";
        log_phase_start!(2, name, TOTAL_PHASES);
        log_phase_start_console!(2, name, "Building the skill universe and assigning skills");

        phase2_skills::run(synth, &caller)
            .await
            .map_err(|e| phase_failed(2, name, e))?;

        log_phase_complete!(2, name);
        log_phase_complete_console!(2);
    }

    // Phase 3: Communication styles
    if config.phases.contains(&3) {
        let name = "Communication Styles";
        log_phase_start!(3, name, TOTAL_PHASES);
        log_phase_start_console!(3, name, "Assigning communication styles");

        phase3_styles::run(synth, &caller)
            .await
            .map_err(|e| phase_failed(3, name, e))?;

        log_phase_complete!(3, name);
        log_phase_complete_console!(3);
    }

    // Phase 4: Projects
    if config.phases.contains(&4) {
        let name = "Projects";
        log_phase_start!(4, name, TOTAL_PHASES);

        let run = match config.variant {
            ProjectVariant::Chain => {
                log_phase_start_console!(4, name, "Chain of projects with adjusted teams");
                phase4_chain::run(synth, &caller, &mut rng).await
            }
            ProjectVariant::Topics => {
                log_phase_start_console!(4, name, "Topic-driven projects");
                phase4_topics::run(synth, &caller).await
            }
        }
        .map_err(|e| phase_failed(4, name, e))?;

        if run.documents.is_empty() && !run.failed.is_empty() {
            return Err(phase_failed(
                4,
                name,
                anyhow::anyhow!("all {} project(s) failed", run.failed.len()),
            ));
        }

        log_phase_complete!(4, name);
        log_phase_complete_console!(4);
    }

    // Phase 5: Timeline
    if config.phases.contains(&5) {
        let name = "Timeline";
        log_phase_start!(5, name, TOTAL_PHASES);
        log_phase_start_console!(5, name, "Assigning a deadline to every subtask");

        phase5_timeline::run(synth, &caller)
            .await
            .map_err(|e| phase_failed(5, name, e))?;

        log_phase_complete!(5, name);
        log_phase_complete_console!(5);
    }

    Ok(())
}
