//! Gemini streaming chat adapter.
//!
//! Posts to `models/<model>:streamGenerateContent?alt=sse` and normalizes
//! each SSE chunk into [`ChatEvent`]s. Function calls arrive whole, so no
//! argument accumulation is needed; calls without an id get one synthesized.

use std::collections::VecDeque;
use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::chat::{ChatEvent, ChatEventStream, ChatProvider, ChatRequest, Content, ContentRole, FinishReason, Part};
use crate::config::ChatConfig;
use crate::error::{AssistantError, Result};
use crate::tools::{ToolCall, ToolDeclaration};

use super::sse::SseLineParser;

/// Header carrying the API key.
pub const API_KEY_HEADER: &str = "x-goog-api-key";

/// Streaming chat against the Gemini REST API.
#[derive(Debug, Clone)]
pub struct GeminiChatProvider {
    client: reqwest::Client,
    api_base: String,
    model: String,
    api_key: String,
}

impl GeminiChatProvider {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_base: crate::config::DEFAULT_API_BASE.to_owned(),
            model: model.into(),
            api_key: api_key.into(),
        }
    }

    /// Build from the `[chat]` section, reading the key from the environment.
    ///
    /// # Errors
    ///
    /// Returns [`AssistantError::AuthError`] when the key variable is unset.
    pub fn from_config(config: &ChatConfig) -> Result<Self> {
        Ok(Self::new(config.api_key()?, config.model.clone()).with_api_base(config.api_base.clone()))
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Full streaming URL.
    pub fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:streamGenerateContent?alt=sse",
            self.api_base.trim_end_matches('/'),
            self.model
        )
    }

    /// Request body for a chat request.
    pub fn build_body(request: &ChatRequest) -> Value {
        let mut body = json!({
            "contents": request.history.iter().map(content_to_wire).collect::<Vec<_>>(),
        });
        if !request.system_instruction.trim().is_empty() {
            body["systemInstruction"] = json!({
                "parts": [{ "text": request.system_instruction }],
            });
        }
        if !request.tools.is_empty() {
            body["tools"] = json!([{
                "functionDeclarations": request.tools.iter().map(declaration_to_wire).collect::<Vec<_>>(),
            }]);
        }
        body
    }

    fn map_http_error(status: reqwest::StatusCode, body: &str) -> AssistantError {
        let message = extract_error_message(body);
        match status.as_u16() {
            401 | 403 => AssistantError::AuthError(format!("Gemini authentication failed: {message}")),
            429 => AssistantError::RequestError(format!("Gemini rate limited: {message}")),
            code => AssistantError::ProviderError(format!("Gemini HTTP {code}: {message}")),
        }
    }
}

#[async_trait]
impl ChatProvider for GeminiChatProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn stream(&self, request: &ChatRequest) -> Result<ChatEventStream> {
        let body = Self::build_body(request);
        tracing::debug!(
            model = %self.model,
            contents = request.history.len(),
            tools = request.tools.len(),
            "starting gemini stream"
        );

        let response = self
            .client
            .post(self.endpoint())
            .header(API_KEY_HEADER, &self.api_key)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AssistantError::TimeoutError(format!("Gemini request timed out: {e}"))
                } else {
                    AssistantError::RequestError(format!("Gemini request failed: {e}"))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(Self::map_http_error(status, &body_text));
        }

        Ok(Box::pin(create_event_stream(response.bytes_stream())))
    }
}

fn content_to_wire(content: &Content) -> Value {
    let role = match content.role {
        ContentRole::User => "user",
        ContentRole::Model => "model",
    };
    let parts: Vec<Value> = content
        .parts
        .iter()
        .map(|part| match part {
            Part::Text { text } => json!({ "text": text }),
            Part::FunctionCall { id, name, args } => json!({
                "functionCall": { "id": id, "name": name, "args": args },
            }),
            Part::FunctionResponse { id, name, response } => json!({
                "functionResponse": { "id": id, "name": name, "response": response },
            }),
        })
        .collect();
    json!({ "role": role, "parts": parts })
}

fn declaration_to_wire(decl: &ToolDeclaration) -> Value {
    json!({
        "name": decl.name,
        "description": decl.description,
        "parameters": decl.parameters,
    })
}

fn extract_error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .and_then(|e| e.get("message"))
                .and_then(|m| m.as_str())
                .map(String::from)
        })
        .unwrap_or_else(|| body.to_string())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StreamChunk {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<WirePart>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WirePart {
    text: Option<String>,
    #[serde(default)]
    thought: bool,
    function_call: Option<WireFunctionCall>,
}

#[derive(Debug, Deserialize)]
struct WireFunctionCall {
    id: Option<String>,
    name: String,
    #[serde(default)]
    args: Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

/// Translate one SSE `data:` payload into events.
pub(crate) fn parse_chunk(data: &str) -> Vec<ChatEvent> {
    let chunk: StreamChunk = match serde_json::from_str(data) {
        Ok(chunk) => chunk,
        Err(e) => {
            return vec![ChatEvent::StreamError {
                error: format!("malformed stream chunk: {e}"),
            }];
        }
    };

    if let Some(err) = chunk.error {
        return vec![ChatEvent::StreamError { error: err.message }];
    }

    let mut events = Vec::new();
    let Some(candidate) = chunk.candidates.into_iter().next() else {
        if let Some(reason) = chunk.prompt_feedback.and_then(|f| f.block_reason) {
            tracing::warn!(block_reason = %reason, "prompt blocked");
            events.push(ChatEvent::StreamEnd {
                finish_reason: FinishReason::ContentFilter,
            });
        }
        return events;
    };

    for part in candidate.content.map(|c| c.parts).unwrap_or_default() {
        if let Some(call) = part.function_call {
            let id = call
                .id
                .filter(|id| !id.is_empty())
                .unwrap_or_else(ToolCall::synthesize_id);
            let args = if call.args.is_object() { call.args } else { json!({}) };
            events.push(ChatEvent::FunctionCall(ToolCall::new(id, call.name, args)));
        } else if let Some(text) = part.text
            && !part.thought
            && !text.is_empty()
        {
            events.push(ChatEvent::TextDelta { text });
        }
    }

    if let Some(reason) = candidate.finish_reason {
        events.push(ChatEvent::StreamEnd {
            finish_reason: FinishReason::from_gemini(&reason),
        });
    }
    events
}

struct StreamState {
    byte_stream: Pin<Box<dyn Stream<Item = std::result::Result<Bytes, reqwest::Error>> + Send>>,
    parser: SseLineParser,
    buffer: VecDeque<ChatEvent>,
    exhausted: bool,
    finished: bool,
}

impl StreamState {
    fn queue_data(&mut self, data: &str) {
        self.buffer.extend(parse_chunk(data));
    }
}

fn create_event_stream(
    byte_stream: impl Stream<Item = std::result::Result<Bytes, reqwest::Error>> + Send + 'static,
) -> impl Stream<Item = ChatEvent> + Send {
    futures_util::stream::unfold(
        StreamState {
            byte_stream: Box::pin(byte_stream),
            parser: SseLineParser::new(),
            buffer: VecDeque::new(),
            exhausted: false,
            finished: false,
        },
        |mut state| async move {
            loop {
                if state.finished {
                    return None;
                }

                if let Some(event) = state.buffer.pop_front() {
                    if matches!(event, ChatEvent::StreamEnd { .. } | ChatEvent::StreamError { .. }) {
                        state.finished = true;
                    }
                    return Some((event, state));
                }

                if state.exhausted {
                    // Body closed without a finish reason.
                    state.finished = true;
                    return Some((ChatEvent::end(), state));
                }

                match state.byte_stream.next().await {
                    Some(Ok(chunk)) => {
                        for sse_event in state.parser.push(&chunk) {
                            if !sse_event.is_done() {
                                state.queue_data(&sse_event.data);
                            }
                        }
                    }
                    Some(Err(e)) => {
                        state.finished = true;
                        let err = ChatEvent::StreamError {
                            error: format!("stream read error: {e}"),
                        };
                        return Some((err, state));
                    }
                    None => {
                        state.exhausted = true;
                        if let Some(sse_event) = state.parser.flush()
                            && !sse_event.is_done()
                        {
                            state.queue_data(&sse_event.data);
                        }
                    }
                }
            }
        },
    )
}
