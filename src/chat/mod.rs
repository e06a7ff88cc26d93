//! Text chat: provider abstraction, history and the turn orchestrator.

pub mod content;
pub mod events;
pub mod orchestrator;
pub mod phase;
pub mod provider;

pub use content::{Content, ContentRole, Part};
pub use events::{ChatEvent, FinishReason};
pub use orchestrator::{ChatSession, NO_TEXT_PLACEHOLDER, TurnOutcome};
pub use phase::TurnPhase;
pub use provider::{ChatEventStream, ChatProvider, ChatRequest};
