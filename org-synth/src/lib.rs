// Typed error taxonomy
pub mod error;

// Configuration record and API credentials
pub mod config;

// Generation endpoint clients
pub mod llm;

// Extraction, retries, batch orchestration, task logging
pub mod workflow_utils;

// Synthesis phases
pub mod synth;
