//! Structured tracing for the assistant.
//!
//! Span names and field keys are shared constants so log consumers can rely
//! on stable names:
//!
//! ```text
//! storefront.chat.turn
//!   └─> storefront.tool.execute
//! storefront.live.session
//!   └─> storefront.tool.execute
//! storefront.visualize
//! ```

use tracing_subscriber::EnvFilter;

/// Span for one user-initiated chat turn.
pub const SPAN_CHAT_TURN: &str = "storefront.chat.turn";

/// Span for a single tool execution.
pub const SPAN_TOOL_EXECUTE: &str = "storefront.tool.execute";

/// Span covering a live duplex session.
pub const SPAN_LIVE_SESSION: &str = "storefront.live.session";

/// Span for one visualization request.
pub const SPAN_VISUALIZE: &str = "storefront.visualize";

/// Tool name field.
pub const FIELD_TOOL_NAME: &str = "tool_name";

/// Assistant turn id field.
pub const FIELD_TURN_ID: &str = "turn_id";

/// Orchestrator phase field.
pub const FIELD_PHASE: &str = "phase";

/// Model identifier field.
pub const FIELD_MODEL: &str = "model";

/// Stable error code field.
pub const FIELD_ERROR_CODE: &str = "error_code";

/// Install a global fmt subscriber writing to stderr.
///
/// `RUST_LOG` takes precedence; `fallback` (for example the
/// `[logging] filter` config value) is used when it is unset or invalid.
/// Calling this more than once is harmless: later calls leave the first
/// subscriber in place.
pub fn init_tracing(fallback: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::try_new(fallback).unwrap_or_else(|_| EnvFilter::new("info")));

    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .try_init();
}
