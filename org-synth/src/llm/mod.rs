//! Generation endpoint seam
//!
//! - `ChatClient`: one system + user exchange returning the assistant text
//! - `OpenAiClient`: OpenAI-compatible chat completions over HTTP
//! - `ScriptedClient`: replays queued responses, for tests and dry runs

pub mod client;
pub mod mock;

pub use client::{ChatClient, OpenAiClient};
pub use mock::ScriptedClient;
