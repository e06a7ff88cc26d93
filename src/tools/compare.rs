//! `compare_products`.

use crate::store::ProductSummary;

use super::dispatch::{ToolContext, no_store};
use super::types::{ToolCall, ToolPayload, ToolResult};

/// Collect summaries for two or more products. Read-only.
pub fn compare_products(call: &ToolCall, ctx: &ToolContext) -> ToolResult {
    let Some(store) = ctx.store() else {
        return no_store();
    };
    let ids = call.arg_str_list("product_ids");
    if ids.is_empty() {
        return ToolResult::failure("Missing required argument: product_ids");
    }

    let mut products: Vec<ProductSummary> = Vec::new();
    let mut missing = Vec::new();
    for id in &ids {
        if products.iter().any(|p| &p.id == id) {
            continue;
        }
        match ctx.lookup_product(store, id) {
            Some(product) => products.push(product.summary()),
            None => missing.push(id.as_str()),
        }
    }

    if products.len() < 2 {
        return ToolResult::failure(format!(
            "Need at least two known products to compare, found {}",
            products.len()
        ));
    }

    let names: Vec<&str> = products.iter().map(|p| p.name.as_str()).collect();
    let mut detail = format!("Comparing {}", names.join(" and "));
    if !missing.is_empty() {
        detail.push_str(&format!("; not found: {}", missing.join(", ")));
    }
    ToolResult::success(detail).with_payload(ToolPayload::Comparison { products })
}
