//! CLI argument parsing for the synthesis workflow

use clap::Parser;
use std::path::PathBuf;

use crate::synth::workflow::{ProjectVariant, WorkflowConfig};

/// Org dataset synthesis CLI arguments
#[derive(Parser, Debug, Clone)]
#[command(
    name = "org-synth",
    about = "Synthesize an organization dataset: roster, skills, styles, projects, timelines"
)]
pub struct Args {
    /// Comma-separated phases to execute (1=roster, 2=skills, 3=styles, 4=projects, 5=timeline)
    #[arg(long, default_value = "1,2,3,4,5", value_parser = validate_phases)]
    pub phases: String,

    /// Project generation variant for Phase 4
    #[arg(long, value_enum, default_value_t = ProjectVariant::Chain)]
    pub variant: ProjectVariant,

    /// Output directory (overrides the config file)
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// YAML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Number of projects in the chain variant
    #[arg(long)]
    pub projects: Option<usize>,

    /// Seed for local randomness (ids, names, first team)
    #[arg(long)]
    pub seed: Option<u64>,

    /// Replay canned responses from this directory instead of calling the API
    #[arg(long, value_name = "DIR")]
    pub dry_run: Option<PathBuf>,
}

/// Check a comma-separated phase list; every entry must be 1..=5
pub fn validate_phases(raw: &str) -> Result<String, String> {
    let mut count = 0;
    for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        match part.parse::<u32>() {
            Ok(n) if (1..=5).contains(&n) => count += 1,
            _ => return Err(format!("invalid phase '{}', expected 1-5", part)),
        }
    }
    if count == 0 {
        return Err("no phases given".to_string());
    }
    Ok(raw.to_string())
}

impl Args {
    /// Parse the comma-separated phases string into a sorted, de-duplicated Vec<u32>
    pub fn parse_phases(&self) -> Vec<u32> {
        let mut phases: Vec<u32> = self
            .phases
            .split(',')
            .filter_map(|p| p.trim().parse().ok())
            .filter(|n| (1..=5).contains(n))
            .collect();
        phases.sort_unstable();
        phases.dedup();
        phases
    }
}

impl From<Args> for WorkflowConfig {
    fn from(args: Args) -> Self {
        let phases = args.parse_phases();
        WorkflowConfig {
            phases,
            variant: args.variant,
            config_file: args.config,
            output_dir: args.output_dir,
            projects: args.projects,
            seed: args.seed,
            dry_run: args.dry_run,
        }
    }
}
