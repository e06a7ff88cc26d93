//! Provider-neutral conversation history.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::tools::{ToolCall, ToolResult};

/// Author of a history entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentRole {
    User,
    Model,
}

/// One piece of a history entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Part {
    Text {
        text: String,
    },
    FunctionCall {
        id: String,
        name: String,
        args: Value,
    },
    FunctionResponse {
        id: String,
        name: String,
        /// Flat tool result object.
        response: Value,
    },
}

/// One history entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Content {
    pub role: ContentRole,
    pub parts: Vec<Part>,
}

impl Content {
    pub fn user_text(text: impl Into<String>) -> Self {
        Self {
            role: ContentRole::User,
            parts: vec![Part::Text { text: text.into() }],
        }
    }

    pub fn model_text(text: impl Into<String>) -> Self {
        Self {
            role: ContentRole::Model,
            parts: vec![Part::Text { text: text.into() }],
        }
    }

    /// Model turn that requested `call`, preceded by any text it streamed.
    pub fn model_call(text: &str, call: &ToolCall) -> Self {
        let mut parts = Vec::with_capacity(2);
        if !text.is_empty() {
            parts.push(Part::Text {
                text: text.to_owned(),
            });
        }
        parts.push(Part::FunctionCall {
            id: call.id.clone(),
            name: call.name.clone(),
            args: call.args.clone(),
        });
        Self {
            role: ContentRole::Model,
            parts,
        }
    }

    /// Synthetic turn answering `call` with `result`.
    pub fn function_response(call: &ToolCall, result: &ToolResult) -> Self {
        Self {
            role: ContentRole::User,
            parts: vec![Part::FunctionResponse {
                id: call.id.clone(),
                name: call.name.clone(),
                response: result.to_value(),
            }],
        }
    }

    /// Concatenated text parts.
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|p| match p {
                Part::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn model_call_skips_empty_text() {
        let call = ToolCall::new("c1", "toggle_theme", json!({}));
        assert_eq!(Content::model_call("", &call).parts.len(), 1);
        let content = Content::model_call("One moment.", &call);
        assert_eq!(content.parts.len(), 2);
        assert_eq!(content.text(), "One moment.");
    }

    #[test]
    fn function_response_is_user_role_with_flat_result() {
        let call = ToolCall::new("c1", "toggle_theme", json!({}));
        let content = Content::function_response(&call, &ToolResult::failure("nope"));
        assert_eq!(content.role, ContentRole::User);
        match &content.parts[0] {
            Part::FunctionResponse { response, name, .. } => {
                assert_eq!(name, "toggle_theme");
                assert_eq!(response["success"], json!(false));
            }
            _ => unreachable!("expected function response"),
        }
    }
}
