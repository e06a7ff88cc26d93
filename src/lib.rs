//! Storefront assistant: the conversational core of a shopping assistant
//! embedded in an online store.
//!
//! Two conversation modes share one set of client-side tools:
//!
//! - **Text chat** ([`chat::ChatSession`]): streamed responses with at most
//!   one tool round-trip per user turn
//! - **Live voice** ([`live::LiveSession`]): duplex PCM audio over a
//!   WebSocket with server-side transcription and tool calls
//!
//! Tools ([`tools`]) search the catalog, drive the storefront router, edit the
//! cart, start checkout, toggle the theme and compare products. They touch
//! store state only through [`store::StoreAccessors`]. Every user-visible
//! message is a [`transcript::Turn`] published on a [`transcript::SharedTranscript`].
//!
//! # Architecture
//!
//! ```text
//! ChatSession ──> ChatProvider (GeminiChatProvider, SSE)
//!      │
//!      └──> tools::execute ──> StoreAccessors / CheckoutService
//!      ┌──────────┘
//! LiveSession ──> LiveConnector (WsLiveConnector) + PlaybackScheduler
//!
//! Visualizer ──> ImageGenerator (GeminiImageGenerator)
//! ```

pub mod chat;
pub mod config;
pub mod error;
pub mod live;
pub mod observability;
pub mod prompt;
pub mod providers;
pub mod store;
pub mod tools;
pub mod transcript;
pub mod visualize;

pub use chat::{ChatSession, TurnOutcome, TurnPhase};
pub use config::AssistantConfig;
pub use error::{AssistantError, Result};
pub use live::{LiveSession, LiveState};
pub use store::{StoreAccessors, StoreSnapshot};
pub use tools::{ToolContext, ToolRegistry};
pub use transcript::{Role, SharedTranscript, Turn, TranscriptEvent};
pub use visualize::Visualizer;
