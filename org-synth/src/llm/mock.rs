//! Scripted client: replays queued responses in order.
//!
//! Used by tests and by `--dry-run`, where the queue is filled from a
//! directory of canned response files. Every prompt it receives is recorded.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::error::SynthError;
use crate::llm::ChatClient;

#[derive(Debug, Default)]
pub struct ScriptedClient {
    script: Mutex<VecDeque<Result<String, SynthError>>>,
    prompts: Mutex<Vec<String>>,
    calls: AtomicUsize,
}

impl ScriptedClient {
    /// Client answering each call with the next response text
    pub fn new<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_results(responses.into_iter().map(|r| Ok(r.into())))
    }

    /// Client answering each call with the next scripted outcome
    pub fn with_results<I>(results: I) -> Self
    where
        I: IntoIterator<Item = Result<String, SynthError>>,
    {
        Self {
            script: Mutex::new(results.into_iter().collect()),
            prompts: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Load every file of `dir` in file-name order as one response each
    pub fn from_dir(dir: &Path) -> anyhow::Result<Self> {
        let mut files: Vec<_> = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file())
            .collect();
        files.sort();

        let mut responses = Vec::with_capacity(files.len());
        for path in files {
            responses.push(std::fs::read_to_string(&path)?);
        }
        Ok(Self::new(responses))
    }

    /// Append a response to the end of the script
    pub fn push(&self, response: impl Into<String>) {
        lock(&self.script).push_back(Ok(response.into()));
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn remaining(&self) -> usize {
        lock(&self.script).len()
    }

    /// User prompts received so far, in call order
    pub fn prompts(&self) -> Vec<String> {
        lock(&self.prompts).clone()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl ChatClient for ScriptedClient {
    async fn complete(&self, _system: &str, user: &str) -> Result<String, SynthError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        lock(&self.prompts).push(user.to_string());
        lock(&self.script)
            .pop_front()
            .unwrap_or_else(|| Err(SynthError::Transport("script exhausted".to_string())))
    }
}
