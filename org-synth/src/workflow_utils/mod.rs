//! Workflow utilities shared by every generation phase
//!
//! - **extract**: JSON extraction from raw model responses
//! - **retry**: bounded retries around one generation call
//! - **batch**: sequential batch orchestration with an accumulator
//! - **task**: task-level logging and execution

pub mod batch;
pub mod extract;
pub mod retry;
pub mod task;

// Re-export commonly used types and functions
pub use batch::{fold_batches, plan_batches, BatchContext, MergedBatches};
pub use extract::{extract_json, parse_response, ExtractMode};
pub use retry::{CallSpec, RetryPolicy, RetryingCaller};
pub use task::{execute_task, TaskContext};
