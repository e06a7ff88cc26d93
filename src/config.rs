//! Configuration types for the storefront assistant.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{AssistantError, Result};

/// Default Gemini REST endpoint.
pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com";

/// Default live (bidirectional) WebSocket endpoint.
pub const DEFAULT_LIVE_WS_URL: &str = "wss://generativelanguage.googleapis.com/ws/google.ai.generativelanguage.v1beta.GenerativeService.BidiGenerateContent";

/// Top-level configuration for the assistant.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistantConfig {
    /// Text chat (streaming turn orchestrator) settings.
    pub chat: ChatConfig,
    /// Live duplex audio session settings.
    pub live: LiveConfig,
    /// Product visualization settings.
    pub visualize: VisualizeConfig,
    /// Checkout session endpoint.
    pub checkout: CheckoutConfig,
    /// Log filter settings.
    pub logging: LoggingConfig,
}

/// Text chat configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Model used for streaming chat.
    pub model: String,
    /// REST API base URL.
    pub api_base: String,
    /// Name of the environment variable holding the API key.
    pub api_key_env: String,
    /// Maximum idle time between two stream chunks before the turn fails.
    ///
    /// `0` disables the timeout.
    pub stream_timeout_secs: u64,
    /// Knowledge base / system instruction given to the model.
    ///
    /// Fixed for the lifetime of a session; a new instruction means a new
    /// session.
    pub system_instruction: String,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            model: "gemini-2.0-flash".to_owned(),
            api_base: DEFAULT_API_BASE.to_owned(),
            api_key_env: "GEMINI_API_KEY".to_owned(),
            stream_timeout_secs: 60,
            system_instruction: String::new(),
        }
    }
}

impl ChatConfig {
    /// Replace the system instruction.
    pub fn with_system_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.system_instruction = instruction.into();
        self
    }

    /// Set the idle stream timeout.
    pub fn with_stream_timeout_secs(mut self, secs: u64) -> Self {
        self.stream_timeout_secs = secs;
        self
    }

    /// Idle stream timeout, or `None` when disabled.
    pub fn stream_timeout(&self) -> Option<std::time::Duration> {
        (self.stream_timeout_secs > 0)
            .then(|| std::time::Duration::from_secs(self.stream_timeout_secs))
    }

    /// Read the API key from the configured environment variable.
    ///
    /// # Errors
    ///
    /// Returns [`AssistantError::AuthError`] when the variable is unset or empty.
    pub fn api_key(&self) -> Result<String> {
        read_api_key(&self.api_key_env)
    }
}

/// Live duplex session configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LiveConfig {
    /// Model used for the live session.
    pub model: String,
    /// WebSocket endpoint.
    pub ws_url: String,
    /// Name of the environment variable holding the API key.
    pub api_key_env: String,
    /// Prebuilt voice used for spoken responses.
    pub voice_name: String,
    /// Microphone sample rate sent to the server, in Hz.
    pub input_sample_rate: u32,
    /// Sample rate of audio returned by the server, in Hz.
    pub output_sample_rate: u32,
    /// Samples per captured PCM frame.
    pub frame_size: usize,
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self {
            model: "gemini-2.0-flash-live-001".to_owned(),
            ws_url: DEFAULT_LIVE_WS_URL.to_owned(),
            api_key_env: "GEMINI_API_KEY".to_owned(),
            voice_name: "Zephyr".to_owned(),
            input_sample_rate: 16_000,
            output_sample_rate: 24_000,
            frame_size: 4096,
        }
    }
}

impl LiveConfig {
    /// Read the API key from the configured environment variable.
    ///
    /// # Errors
    ///
    /// Returns [`AssistantError::AuthError`] when the variable is unset or empty.
    pub fn api_key(&self) -> Result<String> {
        read_api_key(&self.api_key_env)
    }
}

/// Product visualization configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VisualizeConfig {
    /// Image-capable model.
    pub model: String,
    /// Instruction sent alongside the two images.
    pub prompt: String,
}

impl Default for VisualizeConfig {
    fn default() -> Self {
        Self {
            model: "gemini-2.0-flash-preview-image-generation".to_owned(),
            prompt: "Show the product from the second image placed naturally in the scene \
                     from the first image. Keep the product's shape, colours and proportions."
                .to_owned(),
        }
    }
}

/// Checkout session service configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckoutConfig {
    /// Endpoint that creates a hosted checkout session. Empty disables checkout.
    pub endpoint: String,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Fallback `EnvFilter` directive when `RUST_LOG` is unset.
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_owned(),
        }
    }
}

impl AssistantConfig {
    /// Parse a configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`AssistantError::ConfigError`] on malformed TOML or when
    /// validation fails.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)
            .map_err(|e| AssistantError::ConfigError(format!("invalid config TOML: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file. A missing file yields defaults.
    ///
    /// # Errors
    ///
    /// Returns [`AssistantError::ConfigError`] if the file exists but cannot
    /// be read, parsed or validated.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "config file not found, using defaults");
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path).map_err(|e| {
            AssistantError::ConfigError(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&text)
    }

    /// Load configuration from [`default_config_path`].
    ///
    /// # Errors
    ///
    /// See [`AssistantConfig::load`].
    pub fn load_default() -> Result<Self> {
        match default_config_path() {
            Some(path) => Self::load(&path),
            None => Ok(Self::default()),
        }
    }

    /// Serialize to TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`AssistantError::ConfigError`] if serialization fails.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| AssistantError::ConfigError(format!("cannot serialize config: {e}")))
    }

    /// Check invariants that serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`AssistantError::ConfigError`] describing the first violation.
    pub fn validate(&self) -> Result<()> {
        if self.chat.model.trim().is_empty() {
            return Err(AssistantError::ConfigError("chat.model must not be empty".into()));
        }
        if self.live.model.trim().is_empty() {
            return Err(AssistantError::ConfigError("live.model must not be empty".into()));
        }
        if self.live.input_sample_rate == 0 || self.live.output_sample_rate == 0 {
            return Err(AssistantError::ConfigError(
                "live sample rates must be greater than zero".into(),
            ));
        }
        if self.live.frame_size == 0 {
            return Err(AssistantError::ConfigError(
                "live.frame_size must be greater than zero".into(),
            ));
        }
        url::Url::parse(&self.chat.api_base).map_err(|e| {
            AssistantError::ConfigError(format!("chat.api_base is not a valid URL: {e}"))
        })?;
        url::Url::parse(&self.live.ws_url).map_err(|e| {
            AssistantError::ConfigError(format!("live.ws_url is not a valid URL: {e}"))
        })?;
        Ok(())
    }
}

/// Default config file location: `<config_dir>/storefront-assistant/config.toml`.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("storefront-assistant").join("config.toml"))
}

fn read_api_key(var: &str) -> Result<String> {
    match std::env::var(var) {
        Ok(key) if !key.trim().is_empty() => Ok(key),
        _ => Err(AssistantError::AuthError(format!(
            "environment variable {var} is not set"
        ))),
    }
}
