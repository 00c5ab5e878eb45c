//! Org dataset synthesis
//!
//! Five phases, each reading the artifact the previous one wrote:
//! employee roster, hard skills, communication styles, projects (chain or
//! topic-driven) and subtask timelines.

pub mod types;
pub mod style_universe;
pub mod validate;
pub mod reconcile;
pub mod store;
pub mod documents;
pub mod summary;
pub mod prompts;
pub mod phase1_employees;
pub mod phase2_skills;
pub mod phase3_styles;
pub mod phase4_pipeline;
pub mod phase4_chain;
pub mod phase4_topics;
pub mod phase5_timeline;
pub mod cli;
pub mod workflow;

// Re-export commonly used types
pub use types::{Employee, Phase, ProjectDocument, ProjectMember, Rank, Subtask};
pub use workflow::{run_synthesis_workflow, ProjectVariant, WorkflowConfig};
