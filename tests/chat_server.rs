//! Gateway tests for the stateless chat variant, with the upstream
//! completion API faked by wiremock.

use actix_web::http::StatusCode;
use actix_web::{test, web::Data, App};
use serde_json::{json, Value};
use wiremock::matchers::{any, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use chat_relay::completion::CompletionClient;
use chat_relay::config::ChatServerConfig;
use chat_relay::web::{routes, ChatAppState};

fn test_config(base_url: &str) -> ChatServerConfig {
    ChatServerConfig {
        port: 0,
        allowed_origin: "*".to_string(),
        api_key: "test-key".to_string(),
        base_url: base_url.to_string(),
        model: "gpt-4o-mini".to_string(),
        temperature: 0.5,
        max_tokens: 64,
    }
}

fn app_state(base_url: &str) -> Data<ChatAppState> {
    let config = test_config(base_url);
    let client = CompletionClient::new(&config);
    Data::new(ChatAppState { config, client })
}

fn completion_body(content: &str) -> Value {
    json!({
        "id": "chatcmpl-1",
        "object": "chat.completion",
        "model": "gpt-4o-mini",
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": content },
            "finish_reason": "stop",
        }],
        "usage": { "prompt_tokens": 12, "completion_tokens": 4, "total_tokens": 16 },
    })
}

#[actix_web::test]
async fn health_route_reports_status() {
    let upstream = MockServer::start().await;
    let app = test::init_service(
        App::new()
            .app_data(app_state(&upstream.uri()))
            .configure(routes::configure_chat),
    )
    .await;

    let resp = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["status"], "ok");
    assert!(body["timestamp"].is_string());
}

#[actix_web::test]
async fn missing_message_is_rejected_before_any_upstream_call() {
    let upstream = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&upstream)
        .await;

    let app = test::init_service(
        App::new()
            .app_data(app_state(&upstream.uri()))
            .configure(routes::configure_chat),
    )
    .await;

    for body in [json!({}), json!({ "conversationHistory": [] })] {
        let req = test::TestRequest::post()
            .uri("/api/chat")
            .set_json(&body)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "Message is required and must be a string");
    }
}

#[actix_web::test]
async fn non_string_message_is_rejected() {
    let upstream = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&upstream)
        .await;

    let app = test::init_service(
        App::new()
            .app_data(app_state(&upstream.uri()))
            .configure(routes::configure_chat),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/api/chat")
        .set_json(json!({ "message": 42 }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn unmatched_routes_return_404() {
    let upstream = MockServer::start().await;
    let app = test::init_service(
        App::new()
            .app_data(app_state(&upstream.uri()))
            .configure(routes::configure_chat),
    )
    .await;

    let resp = test::call_service(
        &app,
        test::TestRequest::get().uri("/api/unknown").to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "Route not found");
}

#[actix_web::test]
async fn relays_history_and_returns_the_completion() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body("Hello there")))
        .expect(1)
        .mount(&upstream)
        .await;

    let app = test::init_service(
        App::new()
            .app_data(app_state(&upstream.uri()))
            .configure(routes::configure_chat),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/api/chat")
        .set_json(json!({
            "message": "How are you?",
            "conversationHistory": [
                { "role": "user", "content": "Hi" },
                { "role": "assistant", "content": "Hey" },
            ],
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["response"], "Hello there");
    assert_eq!(body["model"], "gpt-4o-mini");
    assert_eq!(body["usage"]["total_tokens"], 16);

    // The upstream request carries the system prompt first, the history
    // verbatim, the new user message last, and the pinned parameters.
    let requests = upstream.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    let sent: Value = serde_json::from_slice(&requests[0].body).unwrap();
    let messages = sent["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 4);
    assert_eq!(messages[0]["role"], "system");
    assert_eq!(messages[1], json!({ "role": "user", "content": "Hi" }));
    assert_eq!(messages[2], json!({ "role": "assistant", "content": "Hey" }));
    assert_eq!(
        messages[3],
        json!({ "role": "user", "content": "How are you?" })
    );
    assert_eq!(sent["model"], "gpt-4o-mini");
    assert_eq!(sent["temperature"], json!(0.5));
    assert_eq!(sent["max_tokens"], 64);
    assert_eq!(sent["top_p"], json!(1.0));
    assert_eq!(sent["frequency_penalty"], json!(0.0));
    assert_eq!(sent["presence_penalty"], json!(0.0));
}

#[actix_web::test]
async fn upstream_error_message_is_passed_through() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(429)
                .set_body_json(json!({ "error": { "message": "Rate limit exceeded" } })),
        )
        .mount(&upstream)
        .await;

    let app = test::init_service(
        App::new()
            .app_data(app_state(&upstream.uri()))
            .configure(routes::configure_chat),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/api/chat")
        .set_json(json!({ "message": "hi" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "Upstream request failed");
    assert_eq!(body["details"], "Rate limit exceeded");
}

#[actix_web::test]
async fn upstream_error_without_a_message_gets_the_fallback() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(500).set_body_string("gateway exploded"))
        .mount(&upstream)
        .await;

    let app = test::init_service(
        App::new()
            .app_data(app_state(&upstream.uri()))
            .configure(routes::configure_chat),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/api/chat")
        .set_json(json!({ "message": "hi" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["details"], "Upstream API error");
}
