//! End-to-end archive flow against a mocked Bot API: real event
//! classification, real state machine, real Telegram adapter.

use ferry_bot::{Incoming, SessionMachine, TelegramApi};
use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TOKEN: &str = "123:TEST";

fn ok_result(result: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "ok": true, "result": result }))
}

async fn mount_chat(server: &MockServer, raw_id: i64) {
    Mock::given(method("POST"))
        .and(path(format!("/bot{TOKEN}/getChat")))
        .and(body_partial_json(json!({ "chat_id": raw_id })))
        .respond_with(ok_result(json!({ "id": raw_id, "type": "channel" })))
        .mount(server)
        .await;
}

fn text_event(text: &str) -> Incoming {
    Incoming::from_message(&json!({
        "message_id": 1,
        "chat": { "id": 42 },
        "from": { "id": 42, "username": "operator" },
        "text": text
    }))
    .unwrap()
}

fn forward_event(origin_chat_id: i64, origin_message_id: i64) -> Incoming {
    Incoming::from_message(&json!({
        "message_id": 2,
        "chat": { "id": 42 },
        "from": { "id": 42, "username": "operator" },
        "forward_from_chat": { "id": origin_chat_id },
        "forward_from_message_id": origin_message_id,
        "forward_date": 1700000000
    }))
    .unwrap()
}

#[tokio::test]
async fn full_cycle_copies_selection_in_order() {
    let server = MockServer::start().await;

    mount_chat(&server, -1001234).await;
    mount_chat(&server, -1009999).await;

    Mock::given(method("POST"))
        .and(path(format!("/bot{TOKEN}/sendMessage")))
        .respond_with(ok_result(json!({ "message_id": 100 })))
        .mount(&server)
        .await;

    // Two selected messages, copied one by one
    Mock::given(method("POST"))
        .and(path(format!("/bot{TOKEN}/copyMessage")))
        .and(body_partial_json(json!({
            "chat_id": -1009999,
            "from_chat_id": -1001234
        })))
        .respond_with(ok_result(json!({ "message_id": 500 })))
        .expect(2)
        .mount(&server)
        .await;

    let api = Arc::new(TelegramApi::new(TOKEN, server.uri()));
    let machine = SessionMachine::new(api.clone(), api.clone(), api.clone());

    machine.handle(text_event("-1001234")).await;
    machine.handle(forward_event(-1001234, 10)).await;
    machine.handle(forward_event(-1001234, 11)).await;
    machine.handle(text_event("/archive")).await;
    machine.handle(text_event("-1009999")).await;
    // Mock expectations (two copyMessage calls) are verified on drop
}

#[tokio::test]
async fn unresolvable_destination_never_triggers_a_copy() {
    let server = MockServer::start().await;

    mount_chat(&server, -1001234).await;

    Mock::given(method("POST"))
        .and(path(format!("/bot{TOKEN}/getChat")))
        .and(body_partial_json(json!({ "chat_id": -1009999 })))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "ok": false,
            "error_code": 400,
            "description": "Bad Request: chat not found"
        })))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path(format!("/bot{TOKEN}/sendMessage")))
        .respond_with(ok_result(json!({ "message_id": 100 })))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path(format!("/bot{TOKEN}/copyMessage")))
        .respond_with(ok_result(json!({ "message_id": 500 })))
        .expect(0)
        .mount(&server)
        .await;

    let api = Arc::new(TelegramApi::new(TOKEN, server.uri()));
    let machine = SessionMachine::new(api.clone(), api.clone(), api.clone());

    machine.handle(text_event("-1001234")).await;
    machine.handle(forward_event(-1001234, 10)).await;
    machine.handle(text_event("/archive")).await;
    machine.handle(text_event("-1009999")).await;
}
