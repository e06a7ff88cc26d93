//! Error types for the storefront assistant.
//!
//! Each error variant carries a stable error code (SCREAMING_SNAKE_CASE)
//! that is included in the Display output and accessible via [`AssistantError::code()`].
//! Codes are part of the public API contract and will not change.
//!
//! Tool executors never produce these errors: expected failures (product not
//! found, missing store context) are reported as
//! [`ToolResult`](crate::tools::ToolResult) values instead.

/// Stable error codes for programmatic error handling.
///
/// These codes never change and form part of the public API contract.
/// Use these for distinguishing errors rather than parsing Display output.
pub mod error_codes {
    /// Invalid or missing configuration.
    pub const CONFIG_INVALID: &str = "CONFIG_INVALID";

    /// Authentication failed (invalid/missing API key).
    pub const AUTH_FAILED: &str = "AUTH_FAILED";

    /// Request to the model provider failed.
    pub const REQUEST_FAILED: &str = "REQUEST_FAILED";

    /// Streaming response encountered an error.
    pub const STREAM_FAILED: &str = "STREAM_FAILED";

    /// Request or stream read timed out.
    pub const TIMEOUT_ERROR: &str = "TIMEOUT_ERROR";

    /// Provider-specific error not covered by other variants.
    pub const PROVIDER_ERROR: &str = "PROVIDER_ERROR";

    /// Live session transport or lifecycle error.
    pub const SESSION_ERROR: &str = "SESSION_ERROR";

    /// A turn is already in flight.
    pub const BUSY: &str = "BUSY";

    /// The operation was cancelled by closing the chat.
    pub const CANCELLED: &str = "CANCELLED";

    /// Audio capture, decode or playback error.
    pub const AUDIO_ERROR: &str = "AUDIO_ERROR";

    /// Image generation failed.
    pub const GENERATION_FAILED: &str = "GENERATION_FAILED";

    /// Checkout session creation failed.
    pub const CHECKOUT_FAILED: &str = "CHECKOUT_FAILED";
}

/// Errors produced by the assistant orchestration layer.
///
/// Each variant includes a stable error code accessible via [`AssistantError::code()`].
/// The Display impl formats as `[CODE] message`.
#[derive(Debug, thiserror::Error)]
pub enum AssistantError {
    /// Invalid or missing configuration.
    #[error("[{}] {}", error_codes::CONFIG_INVALID, .0)]
    ConfigError(String),

    /// Authentication failed (invalid/missing API key).
    #[error("[{}] {}", error_codes::AUTH_FAILED, .0)]
    AuthError(String),

    /// Request to the model provider failed.
    #[error("[{}] {}", error_codes::REQUEST_FAILED, .0)]
    RequestError(String),

    /// Streaming response encountered an error.
    #[error("[{}] {}", error_codes::STREAM_FAILED, .0)]
    StreamError(String),

    /// Request or stream read timed out.
    #[error("[{}] {}", error_codes::TIMEOUT_ERROR, .0)]
    TimeoutError(String),

    /// Provider-specific error not covered by other variants.
    #[error("[{}] {}", error_codes::PROVIDER_ERROR, .0)]
    ProviderError(String),

    /// Live session transport or lifecycle error.
    #[error("[{}] {}", error_codes::SESSION_ERROR, .0)]
    SessionError(String),

    /// A turn is already in flight.
    #[error("[{}] {}", error_codes::BUSY, .0)]
    Busy(String),

    /// The operation was cancelled.
    #[error("[{}] {}", error_codes::CANCELLED, .0)]
    Cancelled(String),

    /// Audio capture, decode or playback error.
    #[error("[{}] {}", error_codes::AUDIO_ERROR, .0)]
    AudioError(String),

    /// Image generation failed.
    #[error("[{}] {}", error_codes::GENERATION_FAILED, .0)]
    GenerationError(String),

    /// Checkout session creation failed.
    #[error("[{}] {}", error_codes::CHECKOUT_FAILED, .0)]
    CheckoutError(String),
}

impl AssistantError {
    /// Returns the stable error code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            Self::ConfigError(_) => error_codes::CONFIG_INVALID,
            Self::AuthError(_) => error_codes::AUTH_FAILED,
            Self::RequestError(_) => error_codes::REQUEST_FAILED,
            Self::StreamError(_) => error_codes::STREAM_FAILED,
            Self::TimeoutError(_) => error_codes::TIMEOUT_ERROR,
            Self::ProviderError(_) => error_codes::PROVIDER_ERROR,
            Self::SessionError(_) => error_codes::SESSION_ERROR,
            Self::Busy(_) => error_codes::BUSY,
            Self::Cancelled(_) => error_codes::CANCELLED,
            Self::AudioError(_) => error_codes::AUDIO_ERROR,
            Self::GenerationError(_) => error_codes::GENERATION_FAILED,
            Self::CheckoutError(_) => error_codes::CHECKOUT_FAILED,
        }
    }

    /// Returns the inner message without the code prefix.
    pub fn message(&self) -> &str {
        match self {
            Self::ConfigError(m)
            | Self::AuthError(m)
            | Self::RequestError(m)
            | Self::StreamError(m)
            | Self::TimeoutError(m)
            | Self::ProviderError(m)
            | Self::SessionError(m)
            | Self::Busy(m)
            | Self::Cancelled(m)
            | Self::AudioError(m)
            | Self::GenerationError(m)
            | Self::CheckoutError(m) => m,
        }
    }

    /// Returns true if this error represents a transient failure.
    ///
    /// The orchestrators never retry on their own; this is a hint for
    /// callers deciding whether to offer a "try again" affordance.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::ConfigError(_) | Self::AuthError(_) => false,
            Self::RequestError(_)
            | Self::StreamError(_)
            | Self::TimeoutError(_)
            | Self::ProviderError(_)
            | Self::SessionError(_) => true,
            // The in-flight turn will finish; resending afterwards is fine.
            Self::Busy(_) => true,
            Self::Cancelled(_) | Self::AudioError(_) => false,
            Self::GenerationError(_) | Self::CheckoutError(_) => true,
        }
    }
}

/// Convenience alias for assistant results.
pub type Result<T> = std::result::Result<T, AssistantError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_code() {
        let err = AssistantError::ConfigError("missing model".into());
        assert_eq!(err.code(), "CONFIG_INVALID");
    }

    #[test]
    fn busy_error_code() {
        let err = AssistantError::Busy("turn in flight".into());
        assert_eq!(err.code(), "BUSY");
    }

    #[test]
    fn timeout_error_code() {
        let err = AssistantError::TimeoutError("no chunk for 60s".into());
        assert_eq!(err.code(), "TIMEOUT_ERROR");
    }

    #[test]
    fn display_includes_code_prefix() {
        let err = AssistantError::GenerationError("quota exhausted".into());
        let display = format!("{err}");
        assert!(display.starts_with("[GENERATION_FAILED]"));
        assert!(display.contains("quota exhausted"));
    }

    #[test]
    fn message_returns_inner_text() {
        let err = AssistantError::CheckoutError("stripe unavailable".into());
        assert_eq!(err.message(), "stripe unavailable");
    }

    #[test]
    fn all_codes_are_screaming_snake_case() {
        let errors: Vec<AssistantError> = vec![
            AssistantError::ConfigError("x".into()),
            AssistantError::AuthError("x".into()),
            AssistantError::RequestError("x".into()),
            AssistantError::StreamError("x".into()),
            AssistantError::TimeoutError("x".into()),
            AssistantError::ProviderError("x".into()),
            AssistantError::SessionError("x".into()),
            AssistantError::Busy("x".into()),
            AssistantError::Cancelled("x".into()),
            AssistantError::AudioError("x".into()),
            AssistantError::GenerationError("x".into()),
            AssistantError::CheckoutError("x".into()),
        ];
        for err in &errors {
            let code = err.code();
            assert!(
                code.chars().all(|c| c.is_ascii_uppercase() || c == '_'),
                "code {code:?} is not SCREAMING_SNAKE_CASE"
            );
        }
    }

    #[test]
    fn retryable_classification() {
        assert!(!AssistantError::AuthError("x".into()).is_retryable());
        assert!(!AssistantError::Cancelled("x".into()).is_retryable());
        assert!(AssistantError::StreamError("x".into()).is_retryable());
        assert!(AssistantError::TimeoutError("x".into()).is_retryable());
    }

    #[test]
    fn error_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<AssistantError>();
    }
}
