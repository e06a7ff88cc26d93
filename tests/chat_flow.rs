//! End-to-end chat turns: ChatSession + GeminiChatProvider + tools against a
//! mock Gemini endpoint.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::sync::Arc;

use serde_json::json;
use storefront_assistant::chat::{ChatSession, TurnPhase};
use storefront_assistant::config::AssistantConfig;
use storefront_assistant::prompt::assemble_instruction;
use storefront_assistant::providers::GeminiChatProvider;
use storefront_assistant::store::{InMemoryStore, ProductRecord, StoreSnapshot};
use storefront_assistant::tools::{ToolContext, ToolRegistry};
use storefront_assistant::transcript::{Role, TranscriptEvent};
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const STREAM_PATH: &str = "/v1beta/models/gemini-2.0-flash:streamGenerateContent";

fn sse(chunks: &[serde_json::Value]) -> String {
    chunks.iter().map(|c| format!("data: {c}\n\n")).collect()
}

fn snapshot() -> StoreSnapshot {
    StoreSnapshot::new("s1").with_products(vec![
        ProductRecord::new("p1", "Blue Hoodie")
            .with_price(40.0)
            .with_image_url("https://cdn.example/hoodie.png"),
        ProductRecord::new("p2", "Ceramic Mug").with_price(12.0),
    ])
}

fn session(server: &MockServer) -> (Arc<InMemoryStore>, ChatSession) {
    let snapshot = snapshot();
    let store = Arc::new(InMemoryStore::new(snapshot.clone()));
    let provider = GeminiChatProvider::new("k", "gemini-2.0-flash").with_api_base(server.uri());
    let instruction = assemble_instruction(Some(&snapshot), "Free shipping over $50.");
    let session = ChatSession::new(
        Arc::new(provider),
        ToolRegistry::shopping(),
        ToolContext::new(snapshot, store.clone()),
        instruction,
    );
    (store, session)
}

#[tokio::test]
async fn product_lookup_round_trip() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(STREAM_PATH))
        .and(body_string_contains("functionResponse"))
        .respond_with(ResponseTemplate::new(200).set_body_string(sse(&[
            json!({ "candidates": [{ "content": { "parts": [{ "text": "Here is the " }] } }] }),
            json!({ "candidates": [{ "content": { "parts": [{ "text": "Blue Hoodie." }] }, "finishReason": "STOP" }] }),
        ])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(STREAM_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string(sse(&[json!({
            "candidates": [{
                "content": { "parts": [
                    { "functionCall": { "id": "fc-1", "name": "find_and_open_product", "args": { "query": "hoodie" } } }
                ] },
                "finishReason": "STOP"
            }]
        })])))
        .expect(1)
        .mount(&server)
        .await;

    let (store, session) = session(&server);
    let mut events = session.transcript().subscribe();

    let outcome = session.send("Do you have hoodies?").await.unwrap();
    assert_eq!(outcome.text, "Here is the Blue Hoodie.");
    assert_eq!(outcome.product_card.as_ref().unwrap().id, "p1");
    assert_eq!(store.current_path().as_deref(), Some("/store/s1/product/p1"));
    assert_eq!(session.phase(), TurnPhase::Idle);

    let turns = session.transcript().snapshot();
    assert_eq!(turns.len(), 2);
    assert_eq!(turns[1].role, Role::Assistant);
    assert_eq!(
        turns[1].product_card.as_ref().unwrap().image_url.as_deref(),
        Some("https://cdn.example/hoodie.png")
    );

    // One append per turn, then in-place updates only.
    let mut appended = 0;
    while let Ok(event) = events.try_recv() {
        if matches!(event, TranscriptEvent::TurnAppended(_)) {
            appended += 1;
        }
    }
    assert_eq!(appended, 2);

    let received = server.received_requests().await.unwrap();
    assert_eq!(received.len(), 2);
    let first: serde_json::Value = serde_json::from_slice(&received[0].body).unwrap();
    let instruction = first["systemInstruction"]["parts"][0]["text"].as_str().unwrap();
    assert!(instruction.contains("p2: Ceramic Mug"));
    assert!(instruction.contains("Free shipping over $50."));

    let follow_up: serde_json::Value = serde_json::from_slice(&received[1].body).unwrap();
    let contents = follow_up["contents"].as_array().unwrap();
    assert_eq!(contents.len(), 3);
    assert_eq!(contents[1]["parts"][0]["functionCall"]["id"], "fc-1");
    assert_eq!(contents[2]["parts"][0]["functionResponse"]["response"]["product_found"], true);
}

#[tokio::test]
async fn failed_tool_skips_follow_up_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(STREAM_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string(sse(&[json!({
            "candidates": [{
                "content": { "parts": [
                    { "functionCall": { "name": "update_cart_quantity", "args": { "product_id": "p2", "quantity": 3 } } }
                ] },
                "finishReason": "STOP"
            }]
        })])))
        .expect(1)
        .mount(&server)
        .await;

    let (_, session) = session(&server);
    let outcome = session.send("make it three mugs").await.unwrap();
    assert!(!outcome.tool_result.unwrap().success);
    assert!(outcome.text.contains("update_cart_quantity"));
}

#[tokio::test]
async fn http_failure_leaves_turn_and_clears_busy() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(STREAM_PATH))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({ "error": { "message": "boom" } })))
        .mount(&server)
        .await;

    let (_, session) = session(&server);
    let err = session.send("hello").await.unwrap_err();
    assert_eq!(err.code(), "PROVIDER_ERROR");
    assert!(!session.is_busy());
    assert!(session.history().is_empty());

    // Both turns stay visible; the assistant one is empty.
    let turns = session.transcript().snapshot();
    assert_eq!(turns.len(), 2);
    assert!(turns[1].text.is_empty());
}

#[tokio::test]
async fn session_from_toml_config() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(STREAM_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string(sse(&[json!({
            "candidates": [{ "content": { "parts": [{ "text": "Ahoy!" }] }, "finishReason": "STOP" }]
        })])))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("config.toml");
    std::fs::write(
        &file,
        format!(
            "[chat]\nmodel = \"gemini-2.0-flash\"\napi_base = \"{}\"\nstream_timeout_secs = 5\nsystem_instruction = \"Talk like a pirate.\"\n",
            server.uri()
        ),
    )
    .unwrap();
    let config = AssistantConfig::load(&file).unwrap();
    config.validate().unwrap();

    let provider = GeminiChatProvider::new("k", config.chat.model.clone()).with_api_base(config.chat.api_base.clone());
    let store = Arc::new(InMemoryStore::new(snapshot()));
    let session = ChatSession::from_config(
        Arc::new(provider),
        ToolRegistry::shopping(),
        ToolContext::new(snapshot(), store),
        &config.chat,
    );

    assert_eq!(session.system_instruction(), "Talk like a pirate.");
    assert_eq!(session.send("hi").await.unwrap().text, "Ahoy!");
}
