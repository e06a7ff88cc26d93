//! `navigate_to_page`.

use super::dispatch::{ToolContext, no_store};
use super::types::{ToolCall, ToolPayload, ToolResult};

pub fn navigate_to_page(call: &ToolCall, ctx: &ToolContext) -> ToolResult {
    let Some(store) = ctx.store() else {
        return no_store();
    };
    let Some(page) = call.arg_str("page") else {
        return ToolResult::failure("Missing required argument: page");
    };

    let path = store.page_path(&page);
    ctx.accessors().navigate(&path);
    ToolResult::success(format!("Navigated to {path}")).with_payload(ToolPayload::Navigation { path })
}
