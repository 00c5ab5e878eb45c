//! Tests for response extraction and the retrying caller

use super::common::*;
use serde::Deserialize;
use std::sync::Arc;

use org_synth::error::SynthError;
use org_synth::llm::ScriptedClient;
use org_synth::workflow_utils::{extract_json, parse_response, CallSpec, ExtractMode};

#[derive(Debug, Deserialize, PartialEq)]
struct Topics {
    topics: Vec<String>,
}

fn spec(mode: ExtractMode) -> CallSpec<'static> {
    CallSpec {
        task_id: "topics",
        system: "system",
        prompt: "prompt",
        mode,
    }
}

// ============================================================================
// Extraction
// ============================================================================

#[test]
fn test_fenced_response_with_raw_newlines() {
    let raw = "```json\n{\"topics\": [\"多行\n标题\", \"B\"]}\n```";
    let parsed: Topics = parse_response(raw, ExtractMode::Strict).unwrap();
    assert_eq!(parsed.topics, vec!["多行标题", "B"]);
}

#[test]
fn test_brace_span_tolerates_prose() {
    let raw = "Sure! Here you go: {\"topics\": [\"A\"]} Hope this helps.";
    assert!(extract_json(raw, ExtractMode::Strict).is_err());
    let value = extract_json(raw, ExtractMode::BraceSpan).unwrap();
    assert_eq!(value["topics"][0], "A");
}

#[test]
fn test_wrong_shape_is_malformed() {
    let err = parse_response::<Topics>("{\"items\": []}", ExtractMode::Strict).unwrap_err();
    assert!(matches!(err, SynthError::MalformedResponse { .. }));
    assert!(err.is_retryable());
}

// ============================================================================
// Retries
// ============================================================================

#[tokio::test]
async fn test_retries_until_parseable() {
    let client = Arc::new(ScriptedClient::with_results(vec![
        Err(SynthError::Transport("timeout".to_string())),
        Ok("no json here".to_string()),
        Ok("{\"topics\": [\"A\", \"B\"]}".to_string()),
    ]));
    let caller = scripted_caller(&client, 5);

    let parsed: Topics = caller.call(spec(ExtractMode::Strict)).await.unwrap();
    assert_eq!(parsed.topics.len(), 2);
    assert_eq!(client.call_count(), 3);
    assert_eq!(caller.attempts_made(), 3);
}

#[tokio::test]
async fn test_exhausted_retries_report_attempts() {
    let client = Arc::new(ScriptedClient::new(["nope", "nope", "nope"]));
    let caller = scripted_caller(&client, 3);

    let err = caller
        .call::<Topics>(spec(ExtractMode::BraceSpan))
        .await
        .unwrap_err();
    match err {
        SynthError::ExhaustedRetries { attempts, last } => {
            assert_eq!(attempts, 3);
            assert!(matches!(*last, SynthError::MalformedResponse { .. }));
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(client.remaining(), 0);
}
