//! OpenAI-compatible chat completions client

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::ApiConfig;
use crate::error::SynthError;

/// One request/response exchange with the generation endpoint.
///
/// Implementations return the assistant message text untouched; cleanup and
/// parsing belong to the extractor.
#[async_trait]
pub trait ChatClient: Send + Sync {
    async fn complete(&self, system: &str, user: &str) -> Result<String, SynthError>;
}

#[derive(Debug, Serialize)]
struct RequestMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct RequestBody<'a> {
    model: &'a str,
    messages: Vec<RequestMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ResponseBody {
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    #[serde(default)]
    total_tokens: u64,
}

#[derive(Debug)]
pub struct OpenAiClient {
    config: ApiConfig,
    http: reqwest::Client,
}

impl OpenAiClient {
    pub fn new(config: ApiConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    fn completions_url(&self) -> String {
        format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        )
    }

    fn build_body<'a>(&'a self, system: &'a str, user: &'a str) -> RequestBody<'a> {
        RequestBody {
            model: &self.config.model,
            messages: vec![
                RequestMessage {
                    role: "system",
                    content: system,
                },
                RequestMessage {
                    role: "user",
                    content: user,
                },
            ],
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        }
    }
}

#[async_trait]
impl ChatClient for OpenAiClient {
    async fn complete(&self, system: &str, user: &str) -> Result<String, SynthError> {
        let url = self.completions_url();
        let body = self.build_body(system, user);

        let res = self
            .http
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| SynthError::Transport(e.to_string()))?;

        let status = res.status();
        let text = res
            .text()
            .await
            .map_err(|e| SynthError::Transport(e.to_string()))?;
        if !status.is_success() {
            return Err(SynthError::Transport(format!(
                "HTTP {}: {}",
                status.as_u16(),
                crate::error::preview(&text)
            )));
        }

        let parsed: ResponseBody = serde_json::from_str(&text)
            .map_err(|e| SynthError::malformed(format!("invalid completion envelope: {}", e), &text))?;

        if let Some(usage) = &parsed.usage {
            org_synth_sdk::log_debug!(
                "Response received ({} tokens used)",
                usage.total_tokens
            );
        }

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or_else(|| SynthError::malformed("completion has no message content", &text))
    }
}
