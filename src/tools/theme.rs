//! `toggle_theme`.

use crate::store::ThemeMode;

use super::dispatch::ToolContext;
use super::types::{ToolCall, ToolPayload, ToolResult};

pub fn toggle_theme(call: &ToolCall, ctx: &ToolContext) -> ToolResult {
    let accessors = ctx.accessors();
    let mode = match call.arg_str("mode") {
        Some(requested) => match ThemeMode::parse(&requested) {
            Some(mode) => mode,
            None => return ToolResult::failure(format!("Unknown theme mode {requested}")),
        },
        None => accessors.theme_mode().toggled(),
    };
    accessors.set_theme_mode(mode);
    ToolResult::success(format!("Switched to {mode} mode")).with_payload(ToolPayload::Theme { mode })
}
