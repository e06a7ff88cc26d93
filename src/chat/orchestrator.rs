//! Streaming turn orchestrator for text chat.
//!
//! [`ChatSession`] drives one user turn at a time through the [`TurnPhase`]
//! machine:
//!
//! - **Streaming**: text deltas grow a single assistant [`Turn`]; the first
//!   function call is captured, later ones are ignored.
//! - **ToolExecuting**: the call runs through the tool registry. A failed
//!   result annotates the turn and ends it without another model request.
//! - **FollowUpStreaming**: a successful result is sent back as a synthetic
//!   function-response turn and the same assistant turn is refilled. A
//!   product card from `find_and_open_product` is attached once text flows.
//!   Any further function call ends the turn.
//!
//! Overlapping sends are rejected with [`AssistantError::Busy`], every chunk
//! read is bounded by the configured idle timeout and [`ChatSession::close`]
//! cancels in-flight work without waiting for it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use futures_util::StreamExt;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::config::ChatConfig;
use crate::error::{AssistantError, Result};
use crate::observability::SPAN_CHAT_TURN;
use crate::store::ProductSummary;
use crate::tools::{self, ToolCall, ToolContext, ToolKind, ToolRegistry, ToolResult};
use crate::transcript::{Role, SharedTranscript, Turn};

use super::content::Content;
use super::events::{ChatEvent, FinishReason};
use super::phase::TurnPhase;
use super::provider::{ChatEventStream, ChatProvider, ChatRequest};

/// Turn text used when the model finished without saying anything.
pub const NO_TEXT_PLACEHOLDER: &str = "Assistant responded without text";

/// What a completed turn produced.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnOutcome {
    /// Id of the assistant turn in the transcript.
    pub turn_id: String,
    /// Final assistant text, including any failure note.
    pub text: String,
    pub tool_call: Option<ToolCall>,
    pub tool_result: Option<ToolResult>,
    pub product_card: Option<ProductSummary>,
}

/// Text chat with at most one tool round-trip per user turn.
pub struct ChatSession {
    provider: Arc<dyn ChatProvider>,
    registry: ToolRegistry,
    context: ToolContext,
    system_instruction: String,
    stream_timeout: Option<Duration>,
    transcript: SharedTranscript,
    history: Mutex<Vec<Content>>,
    busy: AtomicBool,
    phase: watch::Sender<TurnPhase>,
    cancel: Mutex<CancellationToken>,
}

impl std::fmt::Debug for ChatSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatSession")
            .field("provider", &self.provider.name())
            .field("tools", &self.registry.names())
            .field("phase", &self.phase())
            .finish()
    }
}

#[derive(Default)]
struct Streamed {
    text: String,
    call: Option<ToolCall>,
    /// Product card still waiting for text when the stream ended.
    unattached_card: Option<ProductSummary>,
    finish_reason: Option<FinishReason>,
}

/// Resets the busy flag and phase when a turn ends, however it ends.
struct TurnGuard<'a> {
    busy: &'a AtomicBool,
    phase: &'a watch::Sender<TurnPhase>,
}

impl Drop for TurnGuard<'_> {
    fn drop(&mut self) {
        self.phase.send_replace(TurnPhase::Idle);
        self.busy.store(false, Ordering::Release);
    }
}

impl ChatSession {
    /// Create a session. The system instruction is fixed for its lifetime.
    pub fn new(
        provider: Arc<dyn ChatProvider>,
        registry: ToolRegistry,
        context: ToolContext,
        system_instruction: impl Into<String>,
    ) -> Self {
        let (phase, _) = watch::channel(TurnPhase::Idle);
        Self {
            provider,
            registry,
            context,
            system_instruction: system_instruction.into(),
            stream_timeout: ChatConfig::default().stream_timeout(),
            transcript: SharedTranscript::new(),
            history: Mutex::new(Vec::new()),
            busy: AtomicBool::new(false),
            phase,
            cancel: Mutex::new(CancellationToken::new()),
        }
    }

    /// Create a session from the `[chat]` config section.
    pub fn from_config(
        provider: Arc<dyn ChatProvider>,
        registry: ToolRegistry,
        context: ToolContext,
        config: &ChatConfig,
    ) -> Self {
        Self::new(provider, registry, context, config.system_instruction.clone())
            .with_stream_timeout(config.stream_timeout())
    }

    /// Idle timeout between stream chunks. `None` waits forever.
    pub fn with_stream_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.stream_timeout = timeout;
        self
    }

    /// Use an existing transcript handle (for example one the UI already
    /// subscribed to).
    pub fn with_transcript(mut self, transcript: SharedTranscript) -> Self {
        self.transcript = transcript;
        self
    }

    /// A fresh session with a different system instruction.
    ///
    /// Provider, tools, store context and timeout carry over; transcript and
    /// history start empty.
    pub fn with_system_instruction(&self, instruction: impl Into<String>) -> Self {
        Self::new(
            Arc::clone(&self.provider),
            self.registry.clone(),
            self.context.clone(),
            instruction,
        )
        .with_stream_timeout(self.stream_timeout)
    }

    pub fn transcript(&self) -> &SharedTranscript {
        &self.transcript
    }

    pub fn system_instruction(&self) -> &str {
        &self.system_instruction
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn phase(&self) -> TurnPhase {
        *self.phase.borrow()
    }

    /// Observe phase changes.
    pub fn subscribe_phase(&self) -> watch::Receiver<TurnPhase> {
        self.phase.subscribe()
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Copy of the conversation history sent to the provider.
    pub fn history(&self) -> Vec<Content> {
        self.lock_history().clone()
    }

    /// Send a user message and drive the turn to completion.
    ///
    /// # Errors
    ///
    /// - [`AssistantError::Busy`] if another turn is in flight
    /// - [`AssistantError::Cancelled`] if [`close`](Self::close) was called
    /// - [`AssistantError::TimeoutError`] if the stream went quiet
    /// - provider and stream errors otherwise
    ///
    /// On error the assistant turn keeps whatever text it had.
    pub async fn send(&self, text: &str) -> Result<TurnOutcome> {
        let text = text.trim();
        if text.is_empty() {
            return Err(AssistantError::RequestError("message is empty".into()));
        }
        let _guard = self.begin_turn()?;
        let token = self.current_token();
        let history_mark = self.lock_history().len();

        self.transcript.append(Turn::new(Role::User, text));
        self.record(&token, Content::user_text(text));
        let turn_id = self.transcript.append(Turn::new(Role::Assistant, ""));

        let span = tracing::info_span!(
            SPAN_CHAT_TURN,
            turn_id = %turn_id,
            provider = self.provider.name()
        );
        let result = self.run_turn(&turn_id, &token).instrument(span).await;
        if let Err(e) = &result {
            tracing::error!(
                turn_id = %turn_id,
                error_code = e.code(),
                error = %e,
                "chat turn failed"
            );
            // Drop the half-finished exchange.
            self.rollback_history(&token, history_mark);
        }
        result
    }

    /// Cancel any in-flight turn and forget the conversation.
    pub fn close(&self) {
        let previous = {
            let mut guard = self.cancel.lock().unwrap_or_else(|e| e.into_inner());
            std::mem::replace(&mut *guard, CancellationToken::new())
        };
        previous.cancel();
        self.lock_history().clear();
        self.transcript.clear();
        tracing::info!("chat closed");
    }

    async fn run_turn(&self, turn_id: &str, token: &CancellationToken) -> Result<TurnOutcome> {
        self.set_phase(TurnPhase::Streaming);
        let stream = self.open_stream(token).await?;
        let first = self.consume(stream, turn_id, token, None, false).await?;

        let Some(call) = first.call else {
            let text = if first.text.is_empty() {
                self.transcript.update(turn_id, |turn| {
                    turn.text = NO_TEXT_PLACEHOLDER.to_owned();
                });
                NO_TEXT_PLACEHOLDER.to_owned()
            } else {
                first.text
            };
            self.record(token, Content::model_text(text.clone()));
            self.set_phase(TurnPhase::Done);
            return Ok(TurnOutcome {
                turn_id: turn_id.to_owned(),
                text,
                tool_call: None,
                tool_result: None,
                product_card: None,
            });
        };

        self.set_phase(TurnPhase::ToolExecuting);
        tracing::info!(tool_name = %call.name, call_id = %call.id, "executing tool call");
        self.record(token, Content::model_call(&first.text, &call));
        self.transcript.update(turn_id, |turn| {
            turn.function_call = Some(call.clone());
        });

        let result = tokio::select! {
            _ = token.cancelled() => return Err(cancelled()),
            result = tools::execute(&self.registry, &call, &self.context) => result,
        };
        self.record(token, Content::function_response(&call, &result));

        if !result.success {
            let note = failure_note(&call.name, &result.detail);
            let text = self
                .transcript
                .update(turn_id, |turn| {
                    if !turn.text.is_empty() {
                        turn.text.push_str("\n\n");
                    }
                    turn.text.push_str(&note);
                })
                .map(|turn| turn.text)
                .unwrap_or(note);
            tracing::info!(tool_name = %call.name, "tool failed; turn ends without follow-up");
            self.set_phase(TurnPhase::Done);
            return Ok(TurnOutcome {
                turn_id: turn_id.to_owned(),
                text,
                tool_call: Some(call),
                tool_result: Some(result),
                product_card: None,
            });
        }

        self.set_phase(TurnPhase::FollowUpStreaming);
        let card = match ToolKind::from_name(&call.name) {
            Some(ToolKind::FindAndOpenProduct) => result.product_card().cloned(),
            _ => None,
        };
        self.transcript.update(turn_id, |turn| {
            turn.text.clear();
            turn.product_card = None;
        });

        let stream = self.open_stream(token).await?;
        let follow_up = self
            .consume(stream, turn_id, token, card.clone(), true)
            .await?;

        if let Some(pending) = follow_up.unattached_card {
            self.transcript.update(turn_id, |turn| {
                turn.product_card = Some(pending);
            });
        }
        let mut text = follow_up.text;
        if text.is_empty() && card.is_none() {
            self.transcript.update(turn_id, |turn| {
                turn.text = NO_TEXT_PLACEHOLDER.to_owned();
            });
            text = NO_TEXT_PLACEHOLDER.to_owned();
        }
        if !text.is_empty() {
            self.record(token, Content::model_text(text.clone()));
        }

        self.set_phase(TurnPhase::Done);
        Ok(TurnOutcome {
            turn_id: turn_id.to_owned(),
            text,
            tool_call: Some(call),
            tool_result: Some(result),
            product_card: card,
        })
    }

    async fn open_stream(&self, token: &CancellationToken) -> Result<ChatEventStream> {
        let request = ChatRequest {
            system_instruction: self.system_instruction.clone(),
            history: self.history(),
            tools: self.registry.declarations().to_vec(),
        };
        tokio::select! {
            _ = token.cancelled() => Err(cancelled()),
            stream = self.provider.stream(&request) => stream,
        }
    }

    /// Read a stream to its end, folding text into the turn.
    ///
    /// In a follow-up pass, `card` is attached with the first text delta and
    /// a function call ends the pass.
    async fn consume(
        &self,
        mut stream: ChatEventStream,
        turn_id: &str,
        token: &CancellationToken,
        mut card: Option<ProductSummary>,
        follow_up: bool,
    ) -> Result<Streamed> {
        let mut out = Streamed::default();
        loop {
            let next = tokio::select! {
                _ = token.cancelled() => return Err(cancelled()),
                next = self.next_event(&mut stream) => next?,
            };
            let Some(event) = next else {
                break;
            };
            match event {
                ChatEvent::TextDelta { text } => {
                    if text.is_empty() {
                        continue;
                    }
                    out.text.push_str(&text);
                    let attach = card.take();
                    self.transcript.update(turn_id, |turn| {
                        turn.text.push_str(&text);
                        if let Some(attach) = attach {
                            turn.product_card = Some(attach);
                        }
                    });
                }
                ChatEvent::FunctionCall(call) if follow_up => {
                    tracing::warn!(
                        tool_name = %call.name,
                        "function call during follow-up; stopping after one round-trip"
                    );
                    break;
                }
                ChatEvent::FunctionCall(call) => {
                    if out.call.is_some() {
                        tracing::warn!(tool_name = %call.name, "ignoring additional function call");
                        continue;
                    }
                    out.call = Some(call);
                }
                ChatEvent::StreamEnd { finish_reason } => {
                    out.finish_reason = Some(finish_reason);
                    break;
                }
                ChatEvent::StreamError { error } => {
                    return Err(AssistantError::StreamError(error));
                }
            }
        }
        if let Some(reason) = out.finish_reason
            && reason != FinishReason::Stop
        {
            tracing::debug!(finish_reason = %reason, "stream finished early");
        }
        out.unattached_card = card;
        Ok(out)
    }

    async fn next_event(&self, stream: &mut ChatEventStream) -> Result<Option<ChatEvent>> {
        match self.stream_timeout {
            Some(limit) => tokio::time::timeout(limit, stream.next())
                .await
                .map_err(|_| {
                    AssistantError::TimeoutError(format!(
                        "no stream data for {} ms",
                        limit.as_millis()
                    ))
                }),
            None => Ok(stream.next().await),
        }
    }

    fn begin_turn(&self) -> Result<TurnGuard<'_>> {
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::warn!("send rejected: a turn is already in flight");
            return Err(AssistantError::Busy("a turn is already in flight".into()));
        }
        Ok(TurnGuard {
            busy: &self.busy,
            phase: &self.phase,
        })
    }

    fn set_phase(&self, phase: TurnPhase) {
        tracing::debug!(phase = %phase, "turn phase");
        self.phase.send_replace(phase);
    }

    fn current_token(&self) -> CancellationToken {
        self.cancel
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn lock_history(&self) -> MutexGuard<'_, Vec<Content>> {
        self.history.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Append to history unless the turn was cancelled.
    ///
    /// The token is checked under the history lock, so a concurrent `close`
    /// either sees this entry and clears it or this call sees the cancel.
    fn record(&self, token: &CancellationToken, content: Content) {
        let mut history = self.lock_history();
        if !token.is_cancelled() {
            history.push(content);
        }
    }

    fn rollback_history(&self, token: &CancellationToken, mark: usize) {
        let mut history = self.lock_history();
        if !token.is_cancelled() {
            history.truncate(mark);
        }
    }
}

fn cancelled() -> AssistantError {
    AssistantError::Cancelled("chat was closed".into())
}

fn failure_note(tool_name: &str, detail: &str) -> String {
    format!("(Could not complete {tool_name}: {detail})")
}
