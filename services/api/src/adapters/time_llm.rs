//! services/api/src/adapters/time_llm.rs
//!
//! Adapters for the `TimeParsingService` port: one that asks an OpenAI-compatible
//! LLM to resolve free text such as "tomorrow 7pm", and a strict fallback that
//! only understands literal timestamps.

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::{
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use exam_prep_core::ports::{PortError, PortResult, TimeParsingService};
use tracing::debug;

const SYSTEM_INSTRUCTIONS: &str = "You convert natural-language reminder times into timestamps. \
You are given the current time and a description of when a reminder should fire. \
Respond with ONLY a single RFC 3339 timestamp in UTC (for example 2025-01-24T07:00:00Z). \
If the description does not name a point in time, respond with exactly: UNKNOWN";

/// Parses the strict formats shared by both adapters: RFC 3339, or
/// `YYYY-MM-DD HH:MM[:SS]` read as UTC.
pub fn parse_timestamp(text: &str) -> PortResult<DateTime<Utc>> {
    let cleaned = text.trim().trim_matches(|c| c == '"' || c == '`' || c == '\'');
    if let Ok(at) = DateTime::parse_from_rfc3339(cleaned) {
        return Ok(at.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(cleaned, format) {
            return Ok(naive.and_utc());
        }
    }
    Err(PortError::Unexpected(format!("'{cleaned}' is not a timestamp")))
}

//=========================================================================================
// The LLM Adapter
//=========================================================================================

/// An adapter that implements `TimeParsingService` using an OpenAI-compatible LLM.
#[derive(Clone)]
pub struct OpenAiTimeAdapter {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiTimeAdapter {
    /// Creates a new `OpenAiTimeAdapter`.
    pub fn new(client: Client<OpenAIConfig>, model: String) -> Self {
        Self { client, model }
    }
}

#[async_trait]
impl TimeParsingService for OpenAiTimeAdapter {
    async fn parse_time(&self, text: &str, now: DateTime<Utc>) -> PortResult<DateTime<Utc>> {
        // Literal timestamps need no round-trip.
        if let Ok(at) = parse_timestamp(text) {
            return Ok(at);
        }

        let messages = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(SYSTEM_INSTRUCTIONS)
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(format!(
                    "CURRENT TIME: {}\n\nREMINDER TIME: {}",
                    now.to_rfc3339(),
                    text
                ))
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into(),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .temperature(0.0)
            .n(1)
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e: OpenAIError| match e {
                OpenAIError::ApiError(api) if api.code.as_deref() == Some("invalid_api_key") => {
                    PortError::Unauthorized
                }
                other => PortError::Unexpected(other.to_string()),
            })?;

        let answer = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| {
                PortError::Unexpected("Time parsing LLM returned no content.".to_string())
            })?;
        debug!(text, answer = %answer.trim(), "Time parsing LLM answered");

        if answer.trim().eq_ignore_ascii_case("UNKNOWN") {
            return Err(PortError::NotFound(format!("no point in time in '{text}'")));
        }
        parse_timestamp(&answer)
    }
}

//=========================================================================================
// The Strict Fallback
//=========================================================================================

/// Used when no LLM is configured. Accepts only the formats of `parse_timestamp`.
#[derive(Clone, Copy, Default)]
pub struct Rfc3339TimeParser;

#[async_trait]
impl TimeParsingService for Rfc3339TimeParser {
    async fn parse_time(&self, text: &str, _now: DateTime<Utc>) -> PortResult<DateTime<Utc>> {
        parse_timestamp(text)
    }
}
