//! Tool execution through the public dispatch entry point, against an
//! in-memory store and a mock checkout service.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::sync::Arc;

use serde_json::json;
use storefront_assistant::providers::HttpCheckoutService;
use storefront_assistant::store::{InMemoryStore, ProductRecord, StoreSnapshot, ThemeMode};
use storefront_assistant::store::StoreAccessors;
use storefront_assistant::tools::{ToolCall, ToolContext, ToolPayload, ToolRegistry, execute};
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn snapshot() -> StoreSnapshot {
    StoreSnapshot::new("s1")
        .with_merchant_id("acct_42")
        .with_products(vec![
            ProductRecord::new("p1", "Linen Shirt").with_price(35.0),
            ProductRecord::new("p2", "Canvas Tote").with_price(18.5),
        ])
}

fn setup() -> (Arc<InMemoryStore>, ToolContext) {
    let snapshot = snapshot();
    let store = Arc::new(InMemoryStore::new(snapshot.clone()));
    let ctx = ToolContext::new(snapshot, store.clone());
    (store, ctx)
}

fn call(name: &str, args: serde_json::Value) -> ToolCall {
    ToolCall::new(ToolCall::synthesize_id(), name, args)
}

// ── Cart ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn repeated_single_adds_share_one_line() {
    let (store, ctx) = setup();
    let registry = ToolRegistry::shopping();

    for _ in 0..3 {
        let result = execute(&registry, &call("add_to_cart", json!({ "product_id": "p1" })), &ctx).await;
        assert!(result.success);
    }

    let lines = store.cart_lines();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].quantity, 3);
}

#[tokio::test]
async fn add_then_update_then_remove() {
    let (store, ctx) = setup();
    let registry = ToolRegistry::shopping();

    let added = execute(
        &registry,
        &call("add_to_cart", json!({ "product_id": "p2", "quantity": 2 })),
        &ctx,
    )
    .await;
    assert_eq!(
        added.payload,
        Some(ToolPayload::Cart { product_id: "p2".into(), quantity: 2 })
    );

    let updated = execute(
        &registry,
        &call("update_cart_quantity", json!({ "product_id": "p2", "quantity": 5 })),
        &ctx,
    )
    .await;
    assert!(updated.success);
    assert_eq!(store.cart_quantity("p2", "s1"), 5);

    let removed = execute(
        &registry,
        &call("update_cart_quantity", json!({ "product_id": "p2", "quantity": 0 })),
        &ctx,
    )
    .await;
    assert!(removed.success);
    assert!(store.cart_lines().is_empty());
}

#[tokio::test]
async fn unknown_product_leaves_cart_untouched() {
    let (store, ctx) = setup();
    let result = execute(
        &ToolRegistry::shopping(),
        &call("add_to_cart", json!({ "product_id": "nope" })),
        &ctx,
    )
    .await;
    assert!(!result.success);
    assert!(store.cart_lines().is_empty());
}

// ── Lookup and routing ────────────────────────────────────────────────

#[tokio::test]
async fn lookup_navigates_to_product_page() {
    let (store, ctx) = setup();
    let result = execute(
        &ToolRegistry::shopping(),
        &call("find_and_open_product", json!({ "query": "tote bag" })),
        &ctx,
    )
    .await;

    assert_eq!(result.product_card().unwrap().id, "p2");
    assert_eq!(store.navigation_history(), vec!["/store/s1/product/p2".to_owned()]);
    assert_eq!(result.to_value()["product_found"], true);
}

#[tokio::test]
async fn comparison_tool_is_not_in_shopping_registry() {
    let (_, ctx) = setup();
    let args = json!({ "product_ids": ["p1", "p2"] });

    let shopping = execute(&ToolRegistry::shopping(), &call("compare_products", args.clone()), &ctx).await;
    assert!(!shopping.success);
    assert_eq!(shopping.detail, "Unknown function compare_products");

    let comparison = execute(&ToolRegistry::comparison(), &call("compare_products", args), &ctx).await;
    assert!(comparison.success);
}

#[tokio::test]
async fn theme_toggle_round_trip() {
    let (store, ctx) = setup();
    let registry = ToolRegistry::shopping();
    assert_eq!(store.theme_mode(), ThemeMode::Light);

    execute(&registry, &call("toggle_theme", json!({})), &ctx).await;
    assert_eq!(store.theme_mode(), ThemeMode::Dark);
    execute(&registry, &call("toggle_theme", json!({})), &ctx).await;
    assert_eq!(store.theme_mode(), ThemeMode::Light);
}

#[tokio::test]
async fn tools_fail_without_store() {
    let store = Arc::new(InMemoryStore::new(snapshot()));
    let ctx = ToolContext::without_store(store.clone());
    let registry = ToolRegistry::shopping();

    for name in ["find_and_open_product", "navigate_to_page", "add_to_cart", "initiate_purchase"] {
        let result = execute(&registry, &call(name, json!({ "product_id": "p1", "query": "shirt", "page": "cart" })), &ctx).await;
        assert!(!result.success, "{name} should fail without a store");
    }
    assert!(store.navigation_history().is_empty());
}

// ── Checkout ──────────────────────────────────────────────────────────

#[tokio::test]
async fn purchase_creates_hosted_checkout_session() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/checkout"))
        .and(body_partial_json(json!({
            "store_id": "s1",
            "merchant_id": "acct_42",
            "items": [{ "product_id": "p1", "name": "Linen Shirt", "quantity": 2 }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "url": "https://pay.example/s/abc" })))
        .expect(1)
        .mount(&server)
        .await;

    let (store, ctx) = setup();
    let ctx = ctx.with_checkout(Arc::new(HttpCheckoutService::new(format!("{}/checkout", server.uri()))));
    let registry = ToolRegistry::shopping();

    execute(&registry, &call("add_to_cart", json!({ "product_id": "p1", "quantity": 2 })), &ctx).await;
    let result = execute(&registry, &call("initiate_purchase", json!({ "product_id": "p1" })), &ctx).await;

    assert!(result.success);
    assert_eq!(
        result.payload,
        Some(ToolPayload::Checkout { checkout_url: "https://pay.example/s/abc".into() })
    );
    assert_eq!(store.cart_quantity("p1", "s1"), 2);
}

#[tokio::test]
async fn checkout_failure_exposes_only_the_code() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/checkout"))
        .respond_with(ResponseTemplate::new(502).set_body_string("sk_live_secret rejected"))
        .mount(&server)
        .await;

    let (_, ctx) = setup();
    let ctx = ctx.with_checkout(Arc::new(HttpCheckoutService::new(format!("{}/checkout", server.uri()))));
    let result = execute(
        &ToolRegistry::shopping(),
        &call("initiate_purchase", json!({ "product_id": "p1" })),
        &ctx,
    )
    .await;

    assert!(!result.success);
    assert!(result.detail.contains("CHECKOUT_FAILED"));
    assert!(!result.detail.contains("sk_live_secret"));
}

#[tokio::test]
async fn purchase_without_service_opens_checkout_page() {
    let (store, ctx) = setup();
    let result = execute(
        &ToolRegistry::shopping(),
        &call("initiate_purchase", json!({ "product_id": "p1" })),
        &ctx,
    )
    .await;

    assert!(result.success);
    assert_eq!(store.current_path().as_deref(), Some("/store/s1/checkout"));
}
