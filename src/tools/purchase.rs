//! `initiate_purchase` and the checkout-session seam.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

use super::dispatch::{ToolContext, no_store};
use super::types::{ToolCall, ToolPayload, ToolResult};

/// One purchasable line of a checkout session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckoutItem {
    pub product_id: String,
    pub name: String,
    pub price: f64,
    pub quantity: u32,
}

/// Payload sent to the checkout-session service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckoutRequest {
    pub store_id: String,
    pub merchant_id: String,
    pub items: Vec<CheckoutItem>,
}

/// Creates hosted checkout sessions.
#[async_trait]
pub trait CheckoutService: Send + Sync {
    /// Create a session and return the URL the shopper should be sent to.
    async fn create_session(&self, request: &CheckoutRequest) -> Result<String>;
}

/// Start a purchase.
///
/// With a `product_id` and a configured [`CheckoutService`] a hosted checkout
/// session is created for that product. Otherwise the storefront is routed to
/// its checkout page.
pub async fn initiate_purchase(call: &ToolCall, ctx: &ToolContext) -> ToolResult {
    let Some(store) = ctx.store() else {
        return no_store();
    };

    let product_id = call.arg_str("product_id");
    let (Some(product_id), Some(checkout)) = (product_id, ctx.checkout()) else {
        let path = store.page_path("checkout");
        ctx.accessors().navigate(&path);
        return ToolResult::success("Opened the checkout page")
            .with_payload(ToolPayload::Navigation { path });
    };

    let Some(product) = ctx.lookup_product(store, &product_id) else {
        return ToolResult::failure(format!("Product {product_id} not found"));
    };
    let Some(merchant_id) = store.merchant_id.clone().filter(|m| !m.trim().is_empty()) else {
        return ToolResult::failure("This store cannot take payments yet");
    };

    let quantity = ctx
        .accessors()
        .cart_quantity(&product.id, &store.id)
        .max(1);
    let request = CheckoutRequest {
        store_id: store.id.clone(),
        merchant_id,
        items: vec![CheckoutItem {
            product_id: product.id.clone(),
            name: product.name.clone(),
            price: product.price,
            quantity,
        }],
    };

    match checkout.create_session(&request).await {
        Ok(checkout_url) => {
            tracing::info!(product_id = %product.id, "checkout session created");
            ToolResult::success(format!("Checkout is ready for {}", product.name))
                .with_payload(ToolPayload::Checkout { checkout_url })
        }
        Err(e) => {
            tracing::error!(error_code = e.code(), error = %e, "checkout session failed");
            ToolResult::failure(format!(
                "Checkout is unavailable right now ({})",
                e.code()
            ))
        }
    }
}
