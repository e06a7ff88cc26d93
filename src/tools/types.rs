//! Core tool types shared by both orchestrators.
//!
//! A [`ToolDeclaration`] is what the model sees, a [`ToolCall`] is what it
//! sends back, and a [`ToolResult`] is what an executor produces. Executors
//! never return errors: expected failures are `ToolResult { success: false }`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::store::{ProductSummary, ThemeMode};

/// A function declaration exported to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDeclaration {
    pub name: String,
    pub description: String,
    /// JSON schema object describing the arguments.
    pub parameters: Value,
}

impl ToolDeclaration {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: Value,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }
}

/// A function invocation requested by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    /// Argument object. Anything other than a JSON object is treated as empty.
    #[serde(default)]
    pub args: Value,
}

impl ToolCall {
    pub fn new(id: impl Into<String>, name: impl Into<String>, args: Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            args,
        }
    }

    /// Id for calls whose wire format carries none.
    pub fn synthesize_id() -> String {
        format!("call-{}", uuid::Uuid::new_v4())
    }

    /// Non-empty trimmed string argument.
    ///
    /// Numbers are accepted and rendered as strings, since models sometimes
    /// send numeric product ids.
    pub fn arg_str(&self, key: &str) -> Option<String> {
        match self.args.get(key)? {
            Value::String(s) => {
                let trimmed = s.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_owned())
            }
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    /// Integer argument. Accepts integral floats and numeric strings.
    pub fn arg_i64(&self, key: &str) -> Option<i64> {
        match self.args.get(key)? {
            Value::Number(n) => n.as_i64().or_else(|| {
                n.as_f64()
                    .filter(|f| f.fract() == 0.0 && f.is_finite())
                    .map(|f| f as i64)
            }),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// List of strings. A comma-separated string is split.
    pub fn arg_str_list(&self, key: &str) -> Vec<String> {
        match self.args.get(key) {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|v| match v {
                    Value::String(s) => Some(s.trim().to_owned()),
                    Value::Number(n) => Some(n.to_string()),
                    _ => None,
                })
                .filter(|s| !s.is_empty())
                .collect(),
            Some(Value::String(s)) => s
                .split(',')
                .map(|part| part.trim().to_owned())
                .filter(|part| !part.is_empty())
                .collect(),
            _ => Vec::new(),
        }
    }
}

/// Variant-specific fields of a [`ToolResult`], serialized flat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ToolPayload {
    Product {
        product_found: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        product_data: Option<ProductSummary>,
    },
    Cart {
        product_id: String,
        quantity: u32,
    },
    Navigation {
        path: String,
    },
    Checkout {
        checkout_url: String,
    },
    Theme {
        mode: ThemeMode,
    },
    Comparison {
        products: Vec<ProductSummary>,
    },
}

/// Outcome of one tool execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    pub success: bool,
    /// Human-readable outcome, shown to the model and used in failure notes.
    pub detail: String,
    #[serde(flatten)]
    pub payload: Option<ToolPayload>,
}

impl ToolResult {
    pub fn success(detail: impl Into<String>) -> Self {
        Self {
            success: true,
            detail: detail.into(),
            payload: None,
        }
    }

    pub fn failure(detail: impl Into<String>) -> Self {
        Self {
            success: false,
            detail: detail.into(),
            payload: None,
        }
    }

    pub fn with_payload(mut self, payload: ToolPayload) -> Self {
        self.payload = Some(payload);
        self
    }

    /// The product card carried by a successful lookup.
    pub fn product_card(&self) -> Option<&ProductSummary> {
        match &self.payload {
            Some(ToolPayload::Product {
                product_found: true,
                product_data,
            }) if self.success => product_data.as_ref(),
            _ => None,
        }
    }

    /// Flat JSON object handed back to the model.
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|_| {
            serde_json::json!({ "success": self.success, "detail": self.detail })
        })
    }
}
