/*
┌─────────────────────────────────────────────────────────────────────────────┐
│                          ORG DATASET SYNTHESIS                               │
└─────────────────────────────────────────────────────────────────────────────┘

  Phase 1: EMPLOYEE ROSTER          -> employees.db
  Phase 2: HARD SKILLS              -> skill_universe.json, employees_with_hardskills.db
  Phase 3: COMMUNICATION STYLES     -> communicationstyle_universe.json,
                                       employees_with_communicationstyle.db
  Phase 4: PROJECTS (chain|topics)  -> projects/{topic}/{topic}.json, projects/summary_report.json
  Phase 5: TIMELINE                 -> deadlines written into each project,
                                       timeline_assignment_report.json

EXAMPLE COMMANDS:

  # Full run
  org-synth --config synth.yaml --output-dir output

  # Topic-driven projects and timelines over an existing roster
  org-synth --phases 4,5 --variant topics --output-dir output

  # Offline run replaying canned responses
  org-synth --phases 1 --dry-run fixtures/responses --seed 42

*/

use clap::Parser;
use std::sync::Arc;

use org_synth::config::ApiConfig;
use org_synth::llm::{ChatClient, OpenAiClient, ScriptedClient};
use org_synth::synth::{cli::Args, run_synthesis_workflow, WorkflowConfig};
use org_synth_sdk::log_info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();

    let config: WorkflowConfig = args.into();
    let synth = config.load_synth_config()?;

    let client: Arc<dyn ChatClient> = match &config.dry_run {
        Some(dir) => {
            let client = ScriptedClient::from_dir(dir)?;
            log_info!("Dry run: {} canned responses from {}", client.remaining(), dir.display());
            Arc::new(client)
        }
        None => {
            let api = ApiConfig::from_env()?;
            log_info!("Model: {} via {}", api.model, api.base_url);
            Arc::new(OpenAiClient::new(api))
        }
    };

    run_synthesis_workflow(&config, &synth, client).await
}
