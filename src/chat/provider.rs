//! Chat provider trait.
//!
//! Adapters turn a [`ChatRequest`] into a stream of [`ChatEvent`]s; the
//! orchestrator never sees the wire format.

use std::pin::Pin;

use async_trait::async_trait;
use futures_util::Stream;

use crate::error::Result;
use crate::tools::ToolDeclaration;

use super::content::Content;
use super::events::ChatEvent;

/// A boxed stream of normalized chat events.
pub type ChatEventStream = Pin<Box<dyn Stream<Item = ChatEvent> + Send>>;

/// Everything a provider needs for one streamed generation.
#[derive(Debug, Clone, Default)]
pub struct ChatRequest {
    pub system_instruction: String,
    pub history: Vec<Content>,
    pub tools: Vec<ToolDeclaration>,
}

/// A streaming chat backend.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Short provider name for logs (e.g. `"gemini"`).
    fn name(&self) -> &str;

    /// Start a streamed generation.
    ///
    /// # Errors
    ///
    /// Errors returned here happen before any event is produced (connection,
    /// authentication, HTTP status). Failures after the stream starts arrive
    /// as [`ChatEvent::StreamError`].
    async fn stream(&self, request: &ChatRequest) -> Result<ChatEventStream>;
}
