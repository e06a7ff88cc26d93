//! Live duplex audio session.
//!
//! One receive task per connection handles every server message in order:
//! setup acknowledgement, resumption handles, audio playback, interruption,
//! transcription deltas and tool calls. Microphone frames are forwarded by a
//! separate task while recording.

use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::config::LiveConfig;
use crate::error::{AssistantError, Result};
use crate::observability::SPAN_LIVE_SESSION;
use crate::tools::{self, ToolContext, ToolKind, ToolRegistry};
use crate::transcript::{Role, SharedTranscript, Turn};

use super::capture::{CaptureDevice, Recorder};
use super::pcm::{decode_pcm16, encode_pcm16, pcm_mime, rate_from_mime};
use super::playback::{AudioOutput, PlaybackScheduler};
use super::protocol::{
    Blob, ClientContent, ClientMessage, FunctionResponse, RealtimeInput, ServerContent, ServerMessage, Setup,
    ToolResponse, WireFunctionCall,
};
use super::transport::{LiveConnector, TransportEvent};

/// Connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LiveState {
    #[default]
    Idle,
    /// Setup sent, waiting for `setupComplete`.
    Connecting,
    Open,
    /// Stopped locally or closed by the server. Can be started again.
    Closed,
}

impl LiveState {
    pub fn is_active(self) -> bool {
        matches!(self, Self::Connecting | Self::Open)
    }
}

/// A live voice conversation.
///
/// Wrap in an [`Arc`] to start it; call [`stop`](Self::stop) to end it.
pub struct LiveSession {
    config: LiveConfig,
    connector: Arc<dyn LiveConnector>,
    registry: ToolRegistry,
    context: ToolContext,
    system_instruction: String,
    transcript: SharedTranscript,
    playback: PlaybackScheduler,
    recorder: Option<Recorder>,
    handle: Mutex<Option<String>>,
    state: watch::Sender<LiveState>,
    outbound: Mutex<Option<mpsc::UnboundedSender<ClientMessage>>>,
    cancel: Mutex<CancellationToken>,
}

impl std::fmt::Debug for LiveSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveSession")
            .field("model", &self.config.model)
            .field("state", &self.state())
            .field("resumable", &self.resumption_handle().is_some())
            .finish()
    }
}

impl LiveSession {
    pub fn new(
        config: LiveConfig,
        connector: Arc<dyn LiveConnector>,
        registry: ToolRegistry,
        context: ToolContext,
        output: Arc<dyn AudioOutput>,
    ) -> Self {
        let (state, _) = watch::channel(LiveState::Idle);
        Self {
            config,
            connector,
            registry,
            context,
            system_instruction: String::new(),
            transcript: SharedTranscript::new(),
            playback: PlaybackScheduler::new(output),
            recorder: None,
            handle: Mutex::new(None),
            state,
            outbound: Mutex::new(None),
            cancel: Mutex::new(CancellationToken::new()),
        }
    }

    pub fn with_system_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.system_instruction = instruction.into();
        self
    }

    /// Enable recording from `device` at the configured input rate and frame
    /// size.
    pub fn with_capture(mut self, device: Arc<dyn CaptureDevice>) -> Self {
        self.recorder = Some(Recorder::new(
            device,
            self.config.input_sample_rate,
            self.config.frame_size,
        ));
        self
    }

    pub fn with_transcript(mut self, transcript: SharedTranscript) -> Self {
        self.transcript = transcript;
        self
    }

    /// Resume a previous server session on the next start.
    pub fn with_resumption_handle(self, handle: Option<String>) -> Self {
        *self.lock_handle() = handle;
        self
    }

    pub fn transcript(&self) -> &SharedTranscript {
        &self.transcript
    }

    pub fn playback(&self) -> &PlaybackScheduler {
        &self.playback
    }

    pub fn state(&self) -> LiveState {
        *self.state.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<LiveState> {
        self.state.subscribe()
    }

    /// Latest resumable handle from the server. Survives [`stop`](Self::stop).
    pub fn resumption_handle(&self) -> Option<String> {
        self.lock_handle().clone()
    }

    pub fn is_recording(&self) -> bool {
        self.recorder.as_ref().is_some_and(Recorder::is_recording)
    }

    /// Connect and start the receive task. No-op while already active.
    ///
    /// # Errors
    ///
    /// - connector errors; the state returns to [`LiveState::Closed`]
    /// - [`AssistantError::Cancelled`] when [`stop`](Self::stop) ran while
    ///   connecting; the new connection is dropped
    pub async fn start(self: &Arc<Self>) -> Result<()> {
        let claimed = self.state.send_if_modified(|state| {
            if state.is_active() {
                false
            } else {
                *state = LiveState::Connecting;
                true
            }
        });
        if !claimed {
            tracing::debug!("start ignored: live session already active");
            return Ok(());
        }

        let handle = self.resumption_handle();
        let resuming = handle.is_some();
        let setup = Setup::new(
            &self.config,
            &self.system_instruction,
            self.registry.declarations(),
            handle,
        );

        // Replace the token before connecting so a concurrent stop() cancels
        // this attempt.
        let token = {
            let mut current = self.lock_cancel();
            current.cancel();
            *current = CancellationToken::new();
            current.clone()
        };

        let connection = match self.connector.connect(setup).await {
            Ok(connection) => connection,
            Err(e) => {
                tracing::error!(error_code = e.code(), error = %e, "live connect failed");
                if !token.is_cancelled() {
                    self.state.send_replace(LiveState::Closed);
                }
                return Err(e);
            }
        };

        {
            let mut outbound = self.lock_outbound();
            if token.is_cancelled() || self.state() != LiveState::Connecting {
                tracing::info!("live session stopped while connecting; dropping connection");
                return Err(AssistantError::Cancelled("stopped while connecting".into()));
            }
            *outbound = Some(connection.outbound);
        }

        let span = tracing::info_span!(SPAN_LIVE_SESSION, model = %self.config.model, resuming);
        tokio::spawn(
            Arc::clone(self)
                .receive_loop(connection.inbound, token)
                .instrument(span),
        );
        tracing::info!(resuming, "live session started");
        Ok(())
    }

    /// End the session. The resumption handle is kept.
    pub fn stop(&self) {
        self.lock_cancel().cancel();
        self.stop_recording();
        self.playback.interrupt();
        self.lock_outbound().take();
        self.state.send_replace(LiveState::Closed);
        tracing::info!("live session stopped");
    }

    /// Start streaming microphone frames. Returns `false` if already
    /// recording.
    ///
    /// # Errors
    ///
    /// - [`AssistantError::AudioError`] without a capture device, or when the
    ///   device fails to open
    /// - [`AssistantError::SessionError`] when not connected
    pub fn start_recording(self: &Arc<Self>) -> Result<bool> {
        let Some(recorder) = &self.recorder else {
            return Err(AssistantError::AudioError("no capture device configured".into()));
        };
        if self.lock_outbound().is_none() {
            return Err(not_connected());
        }

        let (frames, mut rx) = mpsc::unbounded_channel::<Vec<f32>>();
        if !recorder.start(frames)? {
            return Ok(false);
        }

        let session = Arc::clone(self);
        let token = self.lock_cancel().clone();
        tokio::spawn(async move {
            loop {
                let frame = tokio::select! {
                    _ = token.cancelled() => break,
                    frame = rx.recv() => frame,
                };
                let Some(frame) = frame else {
                    break;
                };
                if let Err(e) = session.send_audio_frame(&frame) {
                    tracing::debug!(error = %e, "audio forwarding stopped");
                    break;
                }
            }
        });
        Ok(true)
    }

    /// Stop the microphone. Returns `false` when it was not recording.
    pub fn stop_recording(&self) -> bool {
        self.recorder.as_ref().is_some_and(Recorder::stop)
    }

    /// Send one PCM frame as realtime input.
    ///
    /// # Errors
    ///
    /// [`AssistantError::SessionError`] when not connected.
    pub fn send_audio_frame(&self, samples: &[f32]) -> Result<()> {
        self.send(ClientMessage::RealtimeInput(RealtimeInput {
            audio: Blob {
                data: encode_pcm16(samples),
                mime_type: pcm_mime(self.config.input_sample_rate),
            },
        }))
    }

    /// Send typed text as a complete user turn and record it.
    ///
    /// # Errors
    ///
    /// [`AssistantError::RequestError`] for blank text,
    /// [`AssistantError::SessionError`] when not connected.
    pub fn send_text(&self, text: &str) -> Result<()> {
        let text = text.trim();
        if text.is_empty() {
            return Err(AssistantError::RequestError("message is empty".into()));
        }
        self.send(ClientMessage::ClientContent(ClientContent::user_text(text)))?;
        self.transcript.append(Turn::new(Role::User, text));
        Ok(())
    }

    fn send(&self, msg: ClientMessage) -> Result<()> {
        let outbound = self.lock_outbound();
        let Some(sender) = outbound.as_ref() else {
            return Err(not_connected());
        };
        sender
            .send(msg)
            .map_err(|_| AssistantError::SessionError("live channel closed".into()))
    }

    async fn receive_loop(
        self: Arc<Self>,
        mut inbound: mpsc::UnboundedReceiver<TransportEvent>,
        token: CancellationToken,
    ) {
        loop {
            let event = tokio::select! {
                _ = token.cancelled() => return,
                event = inbound.recv() => event,
            };
            match event {
                Some(TransportEvent::Message(msg)) => self.handle_message(msg, &token).await,
                Some(TransportEvent::Closed { reason }) => {
                    tracing::info!(reason = reason.as_deref().unwrap_or("none"), "server closed live session");
                    break;
                }
                Some(TransportEvent::Error(e)) => {
                    tracing::error!(error_code = crate::error::error_codes::SESSION_ERROR, error = %e, "live transport failed");
                    break;
                }
                None => break,
            }
        }

        // Closed from the far side; local stop already cleaned up otherwise.
        // The cancel lock orders this against a restart installing a new
        // connection.
        let current = self.lock_cancel();
        if !token.is_cancelled() {
            token.cancel();
            self.stop_recording();
            self.playback.interrupt();
            self.lock_outbound().take();
            self.state.send_replace(LiveState::Closed);
        }
        drop(current);
    }

    async fn handle_message(&self, msg: ServerMessage, token: &CancellationToken) {
        if msg.setup_complete.is_some() {
            self.state.send_replace(LiveState::Open);
            tracing::info!("live session ready");
        }
        if let Some(update) = &msg.session_resumption_update
            && let Some(handle) = update.usable_handle()
        {
            *self.lock_handle() = Some(handle.to_owned());
            tracing::debug!("resumption handle updated");
        }
        if let Some(go_away) = &msg.go_away {
            tracing::warn!(
                time_left = go_away.time_left.as_deref().unwrap_or("unknown"),
                "server will close the live session soon"
            );
        }
        if let Some(content) = msg.server_content {
            self.handle_content(content);
        }
        if let Some(tool_call) = msg.tool_call {
            self.handle_tool_calls(tool_call.function_calls, token).await;
        }
    }

    fn handle_content(&self, content: ServerContent) {
        if content.interrupted {
            self.playback.interrupt();
            tracing::info!("model output interrupted");
        }

        if let Some(text) = content.input_transcription.and_then(|t| t.text)
            && !text.is_empty()
        {
            self.transcript.coalesce_live(Role::User, &text);
        }
        if let Some(text) = content.output_transcription.and_then(|t| t.text)
            && !text.is_empty()
        {
            self.transcript.coalesce_live(Role::Assistant, &text);
        }

        let parts = content.model_turn.map(|turn| turn.parts).unwrap_or_default();
        for blob in parts.into_iter().filter_map(|part| part.inline_data) {
            if !blob.mime_type.starts_with("audio/") {
                continue;
            }
            let rate = rate_from_mime(&blob.mime_type).unwrap_or(self.config.output_sample_rate);
            let scheduled = decode_pcm16(&blob.data).and_then(|samples| self.playback.enqueue(samples, rate));
            if let Err(e) = scheduled {
                tracing::warn!(error_code = e.code(), error = %e, "dropping audio chunk");
            }
        }

        if content.turn_complete {
            tracing::debug!("model turn complete");
        }
    }

    async fn handle_tool_calls(&self, calls: Vec<WireFunctionCall>, token: &CancellationToken) {
        let mut responses = Vec::with_capacity(calls.len());
        for wire in &calls {
            let call = wire.to_tool_call();
            self.transcript.append(
                Turn::new(Role::Log, format!("Tool call: {} {}", call.name, call.args))
                    .with_function_call(call.clone()),
            );

            let result = tokio::select! {
                _ = token.cancelled() => return,
                result = tools::execute(&self.registry, &call, &self.context) => result,
            };

            if ToolKind::from_name(&call.name) == Some(ToolKind::FindAndOpenProduct)
                && let Some(card) = result.product_card()
            {
                self.transcript
                    .append(Turn::new(Role::Assistant, card.name.clone()).with_product_card(card.clone()));
            }
            responses.push(FunctionResponse::new(&call, &result));
        }

        if responses.is_empty() {
            return;
        }
        if let Err(e) = self.send(ClientMessage::ToolResponse(ToolResponse {
            function_responses: responses,
        })) {
            tracing::warn!(error_code = e.code(), error = %e, "could not send tool response");
        }
    }

    fn lock_handle(&self) -> MutexGuard<'_, Option<String>> {
        self.handle.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_outbound(&self) -> MutexGuard<'_, Option<mpsc::UnboundedSender<ClientMessage>>> {
        self.outbound.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_cancel(&self) -> MutexGuard<'_, CancellationToken> {
        self.cancel.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn not_connected() -> AssistantError {
    AssistantError::SessionError("live session is not connected".into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn active_states() {
        assert!(!LiveState::Idle.is_active());
        assert!(LiveState::Connecting.is_active());
        assert!(LiveState::Open.is_active());
        assert!(!LiveState::Closed.is_active());
    }
}
