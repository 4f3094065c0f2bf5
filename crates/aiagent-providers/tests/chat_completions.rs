//! HTTP behaviour of the chat model and adapters against a mock endpoint.

#![cfg(all(feature = "gemini", feature = "ollama"))]

use std::time::Duration;

use futures::StreamExt;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use aiagent_core::{Error, Message, ProviderError, ProviderOverrides, Settings, TokenUsage};
use aiagent_providers::{
    CallOptions, ChatModel, ChatRequest, LlmProvider, OllamaProvider, ProviderRegistry,
    RetryPolicy,
};

fn completion(content: &str) -> serde_json::Value {
    json!({
        "id": "chatcmpl-1",
        "object": "chat.completion",
        "model": "qwq:32b",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop"
        }],
        "usage": {"prompt_tokens": 9, "completion_tokens": 12, "total_tokens": 21}
    })
}

fn sse_body(frames: &[&str]) -> String {
    frames.iter().map(|f| format!("data: {}\n\n", f)).collect()
}

fn content_frame(text: Option<&str>) -> String {
    json!({"choices": [{"index": 0, "delta": {"content": text}, "finish_reason": null}]}).to_string()
}

fn ollama(server: &MockServer) -> OllamaProvider {
    OllamaProvider::new(
        &Settings::with_secret("s"),
        ProviderOverrides::none().base_url(server.uri()).max_retries(0),
    )
    .unwrap()
}

fn fast_model(server: &MockServer, retries: u32) -> ChatModel {
    let provider = ollama(server);
    let settings = provider.settings().duplicate();
    ChatModel::new(&settings).with_retry_policy(
        RetryPolicy::new(retries).with_delays(Duration::ZERO, Duration::ZERO),
    )
}

#[tokio::test]
async fn test_ainvoke_returns_text() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer ollama"))
        .and(body_partial_json(json!({
            "model": "qwq:32b",
            "temperature": 0.5,
            "stream": false,
            "messages": [{"role": "user", "content": "Hi"}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("Hello there")))
        .expect(1)
        .mount(&server)
        .await;

    let text = ollama(&server)
        .ainvoke("Hi", CallOptions::default())
        .await
        .unwrap();
    assert_eq!(text, "Hello there");
}

#[tokio::test]
async fn test_complete_reports_usage_metadata() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("ok")))
        .mount(&server)
        .await;

    let provider = ollama(&server);
    let response = provider
        .get_model()
        .complete(ChatRequest::from_prompt("Hi"))
        .await
        .unwrap();

    assert_eq!(response.response_metadata["model_name"], "qwq:32b");
    assert_eq!(response.response_metadata["finish_reason"], "stop");
    assert_eq!(response.usage(), TokenUsage::new(9, 12, 21));
}

#[tokio::test]
async fn test_api_error_propagates_unchanged() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_json(json!({"error": {"message": "model not found"}})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let err = ollama(&server)
        .ainvoke("Hi", CallOptions::default())
        .await
        .unwrap_err();

    match err {
        Error::Provider(ProviderError::ApiError {
            status, message, ..
        }) => {
            assert_eq!(status, 400);
            assert_eq!(message, "model not found");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_unauthorized_maps_to_authentication_failed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_string("no"))
        .mount(&server)
        .await;

    let err = ollama(&server)
        .ainvoke("Hi", CallOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Provider(ProviderError::AuthenticationFailed { .. })
    ));
}

#[tokio::test]
async fn test_server_errors_are_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(503).set_body_string("busy"))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("finally")))
        .expect(1)
        .mount(&server)
        .await;

    let response = fast_model(&server, 3)
        .complete(ChatRequest::from_prompt("Hi"))
        .await
        .unwrap();
    assert_eq!(response.content, "finally");
}

#[tokio::test]
async fn test_retries_exhausted_returns_last_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
        .expect(2)
        .mount(&server)
        .await;

    let err = fast_model(&server, 1)
        .complete(ChatRequest::from_prompt("Hi"))
        .await
        .unwrap_err();
    assert!(err.is_transient());
}

#[tokio::test]
async fn test_astream_normalizes_empty_deltas() {
    let server = MockServer::start().await;
    let body = sse_body(&[
        &content_frame(Some("Hello")),
        &content_frame(None),
        &content_frame(Some(" world")),
        r#"{"choices":[],"usage":{"prompt_tokens":1,"completion_tokens":2,"total_tokens":3}}"#,
        "[DONE]",
    ]);

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_partial_json(json!({"stream": true})))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/event-stream")
                .set_body_raw(body, "text/event-stream"),
        )
        .mount(&server)
        .await;

    let stream = ollama(&server)
        .astream("Hi", CallOptions::default())
        .await
        .unwrap();
    let deltas: Vec<String> = stream.map(|d| d.unwrap()).collect().await;

    assert_eq!(deltas, ["Hello", "", " world"]);
}

#[tokio::test]
async fn test_stream_surfaces_tool_call_deltas_and_usage() {
    let server = MockServer::start().await;
    let body = sse_body(&[
        r#"{"choices":[{"delta":{"tool_calls":[{"index":0,"id":"call_1","function":{"name":"how_many_jokes","arguments":""}}]}}]}"#,
        r#"{"choices":[{"delta":{"tool_calls":[{"index":0,"function":{"arguments":"{}"}}]}}]}"#,
        r#"{"choices":[{"delta":{},"finish_reason":"tool_calls"}]}"#,
        r#"{"choices":[],"usage":{"prompt_tokens":4,"completion_tokens":6,"total_tokens":10}}"#,
        "[DONE]",
    ]);

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .mount(&server)
        .await;

    let chunks: Vec<_> = fast_model(&server, 0)
        .stream(ChatRequest::from_prompt("jokes?"))
        .await
        .unwrap()
        .map(|c| c.unwrap())
        .collect()
        .await;

    assert_eq!(chunks.len(), 4);
    assert_eq!(chunks[0].tool_calls[0].id.as_deref(), Some("call_1"));
    assert_eq!(chunks[0].tool_calls[0].name.as_deref(), Some("how_many_jokes"));
    assert_eq!(chunks[1].tool_calls[0].arguments.as_deref(), Some("{}"));
    assert_eq!(chunks[2].finish_reason.as_deref(), Some("tool_calls"));
    assert_eq!(chunks[3].usage, Some(TokenUsage::new(4, 6, 10)));
}

#[tokio::test]
async fn test_generate_aggregates_usage() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("answer")))
        .expect(2)
        .mount(&server)
        .await;

    let provider = ollama(&server);
    let result = provider
        .get_model()
        .generate(&["one".to_string(), "two".to_string()])
        .await
        .unwrap();

    assert_eq!(result.generations.len(), 2);
    assert_eq!(result.generations[1][0].text, "answer");

    let usage = provider.get_token_usage(&json!({"llm_output": result.llm_output}));
    assert_eq!(usage, TokenUsage::new(18, 24, 42));
}

#[tokio::test]
async fn test_gemini_folds_system_messages() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer g-key"))
        .and(body_partial_json(json!({
            "model": "gemini-pro",
            "messages": [{"role": "user", "content": "Be terse.\n\nHi"}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("Hi.")))
        .expect(1)
        .mount(&server)
        .await;

    let provider = ProviderRegistry::builtin()
        .resolve(
            &Settings::with_secret("s"),
            "gemini",
            ProviderOverrides::none()
                .base_url(server.uri())
                .api_key("g-key")
                .max_retries(0),
        )
        .unwrap();

    let request = ChatRequest::new(vec![Message::system("Be terse."), Message::user("Hi")]);
    let response = provider.get_model().complete(request).await.unwrap();
    assert_eq!(response.content, "Hi.");
}

#[tokio::test]
async fn test_ollama_lists_models() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "models": [
                {"name": "qwq:32b", "modified_at": "2025-01-01T00:00:00Z", "size": 1},
                {"name": "llama3.2", "modified_at": "2025-01-01T00:00:00Z", "size": 2}
            ]
        })))
        .mount(&server)
        .await;

    let provider = ollama(&server);
    assert!(provider.is_running().await);

    let names: Vec<String> = provider
        .list_models()
        .await
        .unwrap()
        .into_iter()
        .map(|m| m.name)
        .collect();
    assert_eq!(names, ["qwq:32b", "llama3.2"]);
}

#[tokio::test]
async fn test_ollama_not_running() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let provider = ollama(&server);
    assert!(!provider.is_running().await);
    assert!(provider.list_models().await.is_err());
}
