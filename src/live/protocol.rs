//! Wire messages of the live (`BidiGenerateContent`) WebSocket.
//!
//! Client messages are externally tagged objects with a single key
//! (`{"setup": {...}}`, `{"realtimeInput": {...}}`). Server messages may carry
//! several keys at once, so [`ServerMessage`] is a struct of optionals.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::config::LiveConfig;
use crate::tools::{ToolCall, ToolDeclaration, ToolResult};

/// Base64 payload plus mime type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Blob {
    pub data: String,
    pub mime_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ClientMessage {
    Setup(Setup),
    RealtimeInput(RealtimeInput),
    ToolResponse(ToolResponse),
    ClientContent(ClientContent),
}

/// First message on a new connection.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Setup {
    /// `models/<name>`.
    pub model: String,
    pub generation_config: GenerationConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<TextContent>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<Value>,
    pub session_resumption: SessionResumption,
    pub input_audio_transcription: Empty,
    pub output_audio_transcription: Empty,
}

impl Setup {
    /// Audio-only setup for `config`, resuming from `handle` when given.
    pub fn new(
        config: &LiveConfig,
        system_instruction: &str,
        tools: &[ToolDeclaration],
        handle: Option<String>,
    ) -> Self {
        let model = if config.model.starts_with("models/") {
            config.model.clone()
        } else {
            format!("models/{}", config.model)
        };
        let tools = if tools.is_empty() {
            Vec::new()
        } else {
            vec![json!({ "functionDeclarations": tools })]
        };
        Self {
            model,
            generation_config: GenerationConfig {
                response_modalities: vec!["AUDIO".to_owned()],
                speech_config: SpeechConfig {
                    voice_config: VoiceConfig {
                        prebuilt_voice_config: PrebuiltVoiceConfig {
                            voice_name: config.voice_name.clone(),
                        },
                    },
                },
            },
            system_instruction: (!system_instruction.trim().is_empty()).then(|| TextContent {
                role: None,
                parts: vec![TextPart {
                    text: system_instruction.to_owned(),
                }],
            }),
            tools,
            session_resumption: SessionResumption { handle },
            input_audio_transcription: Empty {},
            output_audio_transcription: Empty {},
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub response_modalities: Vec<String>,
    pub speech_config: SpeechConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeechConfig {
    pub voice_config: VoiceConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceConfig {
    pub prebuilt_voice_config: PrebuiltVoiceConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrebuiltVoiceConfig {
    pub voice_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionResumption {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub handle: Option<String>,
}

/// Serializes as `{}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Empty {}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    pub parts: Vec<TextPart>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextPart {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RealtimeInput {
    pub audio: Blob,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResponse {
    pub function_responses: Vec<FunctionResponse>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunctionResponse {
    pub id: String,
    pub name: String,
    /// `{"result": <ToolResult>}`.
    pub response: Value,
}

impl FunctionResponse {
    pub fn new(call: &ToolCall, result: &ToolResult) -> Self {
        Self {
            id: call.id.clone(),
            name: call.name.clone(),
            response: json!({ "result": result.to_value() }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientContent {
    pub turns: Vec<TextContent>,
    pub turn_complete: bool,
}

impl ClientContent {
    /// A complete user turn of typed text.
    pub fn user_text(text: impl Into<String>) -> Self {
        Self {
            turns: vec![TextContent {
                role: Some("user".to_owned()),
                parts: vec![TextPart { text: text.into() }],
            }],
            turn_complete: true,
        }
    }
}

/// One server frame. Unknown keys are ignored.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerMessage {
    pub setup_complete: Option<Value>,
    pub server_content: Option<ServerContent>,
    pub tool_call: Option<ToolCallMessage>,
    pub session_resumption_update: Option<SessionResumptionUpdate>,
    pub go_away: Option<GoAway>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerContent {
    pub model_turn: Option<ModelTurn>,
    #[serde(default)]
    pub interrupted: bool,
    #[serde(default)]
    pub turn_complete: bool,
    pub input_transcription: Option<Transcription>,
    pub output_transcription: Option<Transcription>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ModelTurn {
    #[serde(default)]
    pub parts: Vec<ServerPart>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerPart {
    pub inline_data: Option<Blob>,
    pub text: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Transcription {
    pub text: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCallMessage {
    #[serde(default)]
    pub function_calls: Vec<WireFunctionCall>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WireFunctionCall {
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub args: Value,
}

impl WireFunctionCall {
    /// Normalize into a [`ToolCall`], synthesizing a missing id.
    pub fn to_tool_call(&self) -> ToolCall {
        let id = self
            .id
            .clone()
            .filter(|id| !id.is_empty())
            .unwrap_or_else(ToolCall::synthesize_id);
        let args = if self.args.is_object() {
            self.args.clone()
        } else {
            json!({})
        };
        ToolCall::new(id, self.name.clone(), args)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResumptionUpdate {
    pub new_handle: Option<String>,
    #[serde(default)]
    pub resumable: bool,
}

impl SessionResumptionUpdate {
    /// The handle to adopt, if this update carries a usable one.
    pub fn usable_handle(&self) -> Option<&str> {
        self.new_handle
            .as_deref()
            .filter(|h| self.resumable && !h.is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoAway {
    pub time_left: Option<String>,
}
