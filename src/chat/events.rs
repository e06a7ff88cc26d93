//! Normalized streaming events for chat providers.
//!
//! Providers translate their wire format into [`ChatEvent`]s:
//!
//! ```text
//! TextDelta* → StreamEnd
//! TextDelta* → FunctionCall → StreamEnd
//! ... → StreamError
//! ```

use crate::tools::ToolCall;

/// One normalized streaming event.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatEvent {
    /// A chunk of generated text.
    TextDelta { text: String },

    /// A complete function call with parsed arguments.
    FunctionCall(ToolCall),

    /// Stream finished normally.
    StreamEnd { finish_reason: FinishReason },

    /// Stream failed mid-way.
    StreamError { error: String },
}

impl ChatEvent {
    pub fn text(text: impl Into<String>) -> Self {
        Self::TextDelta { text: text.into() }
    }

    pub fn end() -> Self {
        Self::StreamEnd {
            finish_reason: FinishReason::Stop,
        }
    }
}

/// Why the model stopped generating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    Stop,
    Length,
    /// Blocked by safety or recitation filters.
    ContentFilter,
    Other,
}

impl FinishReason {
    /// Map a Gemini `finishReason` value.
    pub fn from_gemini(reason: &str) -> Self {
        match reason {
            "STOP" => Self::Stop,
            "MAX_TOKENS" => Self::Length,
            "SAFETY" | "RECITATION" | "BLOCKLIST" | "PROHIBITED_CONTENT" | "SPII" => {
                Self::ContentFilter
            }
            _ => Self::Other,
        }
    }
}

impl std::fmt::Display for FinishReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stop => write!(f, "stop"),
            Self::Length => write!(f, "length"),
            Self::ContentFilter => write!(f, "content_filter"),
            Self::Other => write!(f, "other"),
        }
    }
}
