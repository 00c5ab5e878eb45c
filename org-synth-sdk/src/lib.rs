use serde::{Deserialize, Serialize};

/// Structured logging events emitted by pipeline phases
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PipelineLog {
    /// Phase started
    PhaseStarted {
        phase: usize,
        name: String,
        total_phases: usize,
    },
    /// Phase completed
    PhaseCompleted {
        phase: usize,
        name: String,
    },
    /// Phase failed
    PhaseFailed {
        phase: usize,
        name: String,
        error: String,
    },
    /// One batch of a batch orchestration started
    BatchStarted {
        phase: usize,
        batch: usize,
        total_batches: usize,
        items: usize,
    },
    /// Batch merged into the running result
    BatchCompleted {
        phase: usize,
        batch: usize,
        merged: usize,
    },
    /// Batch failed; the orchestration is abandoned
    BatchFailed {
        phase: usize,
        batch: usize,
        error: String,
    },
    /// Task started (one project, one sub-topic, one timeline)
    TaskStarted {
        phase: usize,
        task_id: String,
        description: String,
        total_tasks: Option<usize>,
    },
    /// Task progress update
    TaskProgress {
        task_id: String,
        message: String,
    },
    /// Task completed
    TaskCompleted {
        task_id: String,
        result: Option<String>,
    },
    /// Task failed
    TaskFailed {
        task_id: String,
        error: String,
    },
    /// A generation call failed and will be retried (or has run out of attempts)
    CallRetry {
        task_id: String,
        attempt: usize,
        max_attempts: usize,
        error: String,
    },
    /// A validator reported violations
    ConstraintViolation {
        check: String,
        errors: Vec<String>,
        fatal: bool,
    },
    /// State file created (intermediate outputs)
    StateFileCreated {
        phase: usize,
        file_path: String,
        description: String,
    },
}

/// Prefix marking event lines on stderr
pub const EVENT_PREFIX: &str = "__SYNTH_EVENT__:";

impl PipelineLog {
    /// Emit this log event to stderr as a single prefixed JSON line
    pub fn emit(&self) {
        if let Some(line) = self.to_line() {
            use std::io::Write;
            eprintln!("{}", line);
            let _ = std::io::stderr().flush();
        }
    }

    /// Render the event line without writing it
    pub fn to_line(&self) -> Option<String> {
        serde_json::to_string(self)
            .ok()
            .map(|json| format!("{}{}", EVENT_PREFIX, json))
    }

    /// Parse an event line produced by [`PipelineLog::emit`]
    pub fn from_line(line: &str) -> Option<Self> {
        let json = line.strip_prefix(EVENT_PREFIX)?;
        serde_json::from_str(json).ok()
    }
}

/// Helper macros for structured logging
#[macro_export]
macro_rules! log_phase_start {
    ($phase:expr, $name:expr, $total:expr) => {
        $crate::PipelineLog::PhaseStarted {
            phase: $phase,
            name: $name.to_string(),
            total_phases: $total,
        }
        .emit();
    };
}

#[macro_export]
macro_rules! log_phase_complete {
    ($phase:expr, $name:expr) => {
        $crate::PipelineLog::PhaseCompleted {
            phase: $phase,
            name: $name.to_string(),
        }
        .emit();
    };
}

#[macro_export]
macro_rules! log_phase_failed {
    ($phase:expr, $name:expr, $error:expr) => {
        $crate::PipelineLog::PhaseFailed {
            phase: $phase,
            name: $name.to_string(),
            error: $error.to_string(),
        }
        .emit();
    };
}

#[macro_export]
macro_rules! log_batch_event_start {
    ($phase:expr, $batch:expr, $total:expr, $items:expr) => {
        $crate::PipelineLog::BatchStarted {
            phase: $phase,
            batch: $batch,
            total_batches: $total,
            items: $items,
        }
        .emit();
    };
}

#[macro_export]
macro_rules! log_batch_event_complete {
    ($phase:expr, $batch:expr, $merged:expr) => {
        $crate::PipelineLog::BatchCompleted {
            phase: $phase,
            batch: $batch,
            merged: $merged,
        }
        .emit();
    };
}

#[macro_export]
macro_rules! log_batch_event_failed {
    ($phase:expr, $batch:expr, $error:expr) => {
        $crate::PipelineLog::BatchFailed {
            phase: $phase,
            batch: $batch,
            error: $error.to_string(),
        }
        .emit();
    };
}

#[macro_export]
macro_rules! log_task_start {
    ($phase:expr, $task_id:expr, $desc:expr) => {
        $crate::PipelineLog::TaskStarted {
            phase: $phase,
            task_id: $task_id.to_string(),
            description: $desc.to_string(),
            total_tasks: None,
        }
        .emit();
    };
    ($phase:expr, $task_id:expr, $desc:expr, $total:expr) => {
        $crate::PipelineLog::TaskStarted {
            phase: $phase,
            task_id: $task_id.to_string(),
            description: $desc.to_string(),
            total_tasks: Some($total),
        }
        .emit();
    };
}

#[macro_export]
macro_rules! log_task_progress {
    ($task_id:expr, $msg:expr) => {
        $crate::PipelineLog::TaskProgress {
            task_id: $task_id.to_string(),
            message: $msg.to_string(),
        }
        .emit();
    };
}

#[macro_export]
macro_rules! log_task_complete {
    ($task_id:expr) => {
        $crate::PipelineLog::TaskCompleted {
            task_id: $task_id.to_string(),
            result: None,
        }
        .emit();
    };
    ($task_id:expr, $result:expr) => {
        $crate::PipelineLog::TaskCompleted {
            task_id: $task_id.to_string(),
            result: Some($result.to_string()),
        }
        .emit();
    };
}

#[macro_export]
macro_rules! log_task_failed {
    ($task_id:expr, $error:expr) => {
        $crate::PipelineLog::TaskFailed {
            task_id: $task_id.to_string(),
            error: $error.to_string(),
        }
        .emit();
    };
}

#[macro_export]
macro_rules! log_call_retry {
    ($task_id:expr, $attempt:expr, $max:expr, $error:expr) => {
        $crate::PipelineLog::CallRetry {
            task_id: $task_id.to_string(),
            attempt: $attempt,
            max_attempts: $max,
            error: $error.to_string(),
        }
        .emit();
    };
}

#[macro_export]
macro_rules! log_constraint_violation {
    ($check:expr, $errors:expr, $fatal:expr) => {
        $crate::PipelineLog::ConstraintViolation {
            check: $check.to_string(),
            errors: $errors.to_vec(),
            fatal: $fatal,
        }
        .emit();
    };
}

#[macro_export]
macro_rules! log_state_file {
    ($phase:expr, $path:expr, $desc:expr) => {
        $crate::PipelineLog::StateFileCreated {
            phase: $phase,
            file_path: $path.to_string(),
            description: $desc.to_string(),
        }
        .emit();
    };
}

// ============================================================================
// Console Logging Macros
// ============================================================================
// Colored console output for operators, complementing the structured
// PipelineLog events on stderr.
// ============================================================================

/// Logs the start of a pipeline phase with a header and description.
///
/// # Example
/// ```
/// use org_synth_sdk::log_phase_start_console;
/// log_phase_start_console!(2, "Hard Skills", "Assign skills from the skill universe");
/// ```
///
/// Outputs:
/// ```text
/// ═══ PHASE 2: Hard Skills ═══
/// Assign skills from the skill universe
/// ```
#[macro_export]
macro_rules! log_phase_start_console {
    ($phase:expr, $title:expr, $description:expr) => {
        println!("\x1b[1;36m═══ PHASE {}: {} ═══\x1b[0m", $phase, $title);
        println!("\x1b[36m{}\x1b[0m", $description);
    };
}

/// Logs the completion of a pipeline phase.
///
/// # Example
/// ```
/// use org_synth_sdk::log_phase_complete_console;
/// log_phase_complete_console!(2);
/// ```
#[macro_export]
macro_rules! log_phase_complete_console {
    ($phase:expr) => {
        println!("\x1b[32m✓ Phase {} complete\x1b[0m", $phase);
    };
}

/// Logs the start of a batch.
///
/// # Example
/// ```
/// use org_synth_sdk::log_batch_start;
/// log_batch_start!(2, 15, 20);
/// ```
///
/// Outputs:
/// ```text
/// → Batch 2/15 (20 items)
/// ```
#[macro_export]
macro_rules! log_batch_start {
    ($batch_num:expr, $total_batches:expr, $num_items:expr) => {
        println!(
            "\x1b[36m→ Batch {}/{} ({} items)\x1b[0m",
            $batch_num, $total_batches, $num_items
        );
    };
}

/// Logs the completion of a batch.
///
/// # Example
/// ```
/// use org_synth_sdk::log_batch_complete;
/// log_batch_complete!(2);
/// ```
#[macro_export]
macro_rules! log_batch_complete {
    ($batch_num:expr) => {
        println!("\x1b[32m✓ Batch {} complete\x1b[0m", $batch_num);
    };
}

/// Logs progress of an operation.
///
/// # Example
/// ```
/// use org_synth_sdk::log_progress;
/// log_progress!(40, 300, "employees");
/// ```
///
/// Outputs:
/// ```text
/// Progress: 40/300 employees
/// ```
#[macro_export]
macro_rules! log_progress {
    ($current:expr, $total:expr, $item_type:expr) => {
        println!(
            "\x1b[36mProgress: {}/{} {}\x1b[0m",
            $current, $total, $item_type
        );
    };
}

/// Logs the number of items found.
///
/// # Example
/// ```
/// use org_synth_sdk::log_found;
/// log_found!(12, "project files");
/// ```
#[macro_export]
macro_rules! log_found {
    ($count:expr, $item_type:expr) => {
        println!("\x1b[36mFound {} {}\x1b[0m", $count, $item_type);
    };
}

/// Logs an informational message.
///
/// # Example
/// ```
/// use org_synth_sdk::log_info;
/// log_info!("Loading skill universe cache...");
/// let count = 42;
/// log_info!("Loaded {} skills", count);
/// ```
#[macro_export]
macro_rules! log_info {
    ($message:expr) => {
        println!("\x1b[36mℹ {}\x1b[0m", $message);
    };
    ($fmt:expr, $($arg:tt)*) => {
        println!("\x1b[36mℹ {}\x1b[0m", format!($fmt, $($arg)*));
    };
}

/// Logs a warning message.
///
/// # Example
/// ```
/// use org_synth_sdk::log_warning;
/// log_warning!("Team size below minimum");
/// ```
///
/// Outputs:
/// ```text
/// ⚠ Warning: Team size below minimum
/// ```
#[macro_export]
macro_rules! log_warning {
    ($message:expr) => {
        println!("\x1b[33m⚠ Warning: {}\x1b[0m", $message);
    };
    ($fmt:expr, $($arg:tt)*) => {
        println!("\x1b[33m⚠ Warning: {}\x1b[0m", format!($fmt, $($arg)*));
    };
}

/// Logs an error message.
///
/// # Example
/// ```
/// use org_synth_sdk::log_error;
/// log_error!("Batch {} failed", 3);
/// ```
#[macro_export]
macro_rules! log_error {
    ($message:expr) => {
        println!("\x1b[31m✗ {}\x1b[0m", $message);
    };
    ($fmt:expr, $($arg:tt)*) => {
        println!("\x1b[31m✗ {}\x1b[0m", format!($fmt, $($arg)*));
    };
}

/// Logs that a file has been saved.
///
/// # Example
/// ```
/// use org_synth_sdk::log_file_saved;
/// log_file_saved!("output/employees.db");
/// ```
///
/// Outputs:
/// ```text
/// ✓ Saved: output/employees.db
/// ```
#[macro_export]
macro_rules! log_file_saved {
    ($path:expr) => {
        println!("\x1b[32m✓ Saved: {}\x1b[0m", $path);
    };
}

/// Logs a debug message.
///
/// # Example
/// ```
/// use org_synth_sdk::log_debug;
/// log_debug!("Response length: {} chars", 1234);
/// ```
#[macro_export]
macro_rules! log_debug {
    ($message:expr) => {
        println!("\x1b[2m[DEBUG] {}\x1b[0m", $message);
    };
    ($fmt:expr, $($arg:tt)*) => {
        println!("\x1b[2m[DEBUG] {}\x1b[0m", format!($fmt, $($arg)*));
    };
}

// ============================================================================
// End of Console Logging Macros
// ============================================================================
