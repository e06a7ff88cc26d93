//! `find_and_open_product`.

use crate::store::find_product;

use super::dispatch::{ToolContext, no_store};
use super::types::{ToolCall, ToolPayload, ToolResult};

pub fn find_and_open_product(call: &ToolCall, ctx: &ToolContext) -> ToolResult {
    let Some(store) = ctx.store() else {
        return no_store();
    };
    let Some(query) = call.arg_str("query") else {
        return ToolResult::failure("Missing required argument: query");
    };

    let Some(hit) = find_product(&store.products, &query) else {
        tracing::debug!(%query, "no product matched");
        return ToolResult::failure(format!("Product not found for \"{query}\"")).with_payload(
            ToolPayload::Product {
                product_found: false,
                product_data: None,
            },
        );
    };

    let product = ctx
        .lookup_product(store, &hit.id)
        .unwrap_or_else(|| hit.clone());
    let summary = product.summary();
    ctx.accessors().navigate(&store.product_path(&product.id));

    ToolResult::success(format!("Opened the product page for {}", summary.name)).with_payload(
        ToolPayload::Product {
            product_found: true,
            product_data: Some(summary),
        },
    )
}
