//! Provider clients against a local one-shot HTTP server.

use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use trendline_llm::llm::providers::{AnthropicClient, OpenAiCompatibleClient};
use trendline_llm::*;

/// Raw request captured by the fixture.
struct Captured {
    head: String,
    body: serde_json::Value,
}

/// Serve one canned response; the captured request arrives on the receiver.
async fn serve_once(
    status: &'static str,
    extra_headers: &'static str,
    body: String,
) -> (String, oneshot::Receiver<Captured>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = oneshot::channel();

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        let (head_end, content_length) = loop {
            let n = socket.read(&mut chunk).await.unwrap();
            buf.extend_from_slice(&chunk[..n]);
            if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                let head = String::from_utf8_lossy(&buf[..pos]).to_ascii_lowercase();
                let len = head
                    .lines()
                    .find_map(|l| l.strip_prefix("content-length:"))
                    .and_then(|v| v.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                break (pos + 4, len);
            }
            if n == 0 {
                panic!("connection closed before headers");
            }
        };
        while buf.len() < head_end + content_length {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
        }

        let head = String::from_utf8_lossy(&buf[..head_end]).to_string();
        let request_body = serde_json::from_slice(&buf[head_end..]).unwrap_or(serde_json::Value::Null);
        let _ = tx.send(Captured {
            head,
            body: request_body,
        });

        let response = format!(
            "HTTP/1.1 {status}\r\nContent-Type: application/json\r\n{extra_headers}Content-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        let _ = socket.write_all(response.as_bytes()).await;
        let _ = socket.shutdown().await;
    });

    (format!("http://{addr}/v1"), rx)
}

fn request() -> GenerationRequest {
    GenerationRequest::new("You chart trends.").with_user("Topic: X")
}

#[tokio::test]
async fn openai_compatible_round_trip() {
    let reply = json!({"choices": [{"message": {"role": "assistant", "content": "{\"ok\": true}"}}]});
    let (base, captured) = serve_once("200 OK", "", reply.to_string()).await;
    let client = OpenAiCompatibleClient::new(
        LLMConfig::openai("sk-test", "gpt-test").with_base_url(&base),
    )
    .unwrap();

    let text = client.generate(&request()).await.unwrap();
    assert_eq!(text.as_deref(), Some("{\"ok\": true}"));

    let captured = captured.await.unwrap();
    assert!(captured.head.starts_with("POST /v1/chat/completions"));
    assert!(captured.head.to_ascii_lowercase().contains("authorization: bearer sk-test"));
    assert_eq!(captured.body["model"], "gpt-test");
    assert_eq!(captured.body["messages"][0]["role"], "system");
    assert_eq!(captured.body["messages"][1]["content"], "Topic: X");
}

#[tokio::test]
async fn empty_completion_is_no_text() {
    let reply = json!({"choices": [{"message": {"role": "assistant", "content": "   "}}]});
    let (base, _captured) = serve_once("200 OK", "", reply.to_string()).await;
    let client = OpenAiCompatibleClient::new(LLMConfig::local(&base, "llama")).unwrap();

    assert_eq!(client.generate(&request()).await.unwrap(), None);
}

#[tokio::test]
async fn server_error_is_api_error() {
    let (base, _captured) = serve_once("500 Internal Server Error", "", "{\"error\":\"boom\"}".into()).await;
    let client = OpenAiCompatibleClient::new(
        LLMConfig::openai("k", "m").with_base_url(&base),
    )
    .unwrap();

    match client.generate(&request()).await {
        Err(LLMError::Api(msg)) => assert!(msg.contains("500")),
        other => panic!("expected API error, got {other:?}"),
    }
}

#[tokio::test]
async fn rate_limit_reads_retry_after() {
    let (base, _captured) = serve_once("429 Too Many Requests", "Retry-After: 7\r\n", "{}".into()).await;
    let client = OpenAiCompatibleClient::new(
        LLMConfig::openai("k", "m").with_base_url(&base),
    )
    .unwrap();

    assert_eq!(
        client.generate(&request()).await,
        Err(LLMError::RateLimited {
            retry_after_ms: 7_000
        })
    );
}

#[tokio::test]
async fn anthropic_concatenates_text_blocks() {
    let reply = json!({"content": [
        {"type": "text", "text": "{\"a\":"},
        {"type": "tool_use", "id": "x"},
        {"type": "text", "text": " 1}"}
    ]});
    let (base, captured) = serve_once("200 OK", "", reply.to_string()).await;
    let client = AnthropicClient::new(
        LLMConfig::anthropic("ak-test", "claude-test").with_base_url(&base),
    )
    .unwrap();

    let text = client.generate(&request()).await.unwrap();
    assert_eq!(text.as_deref(), Some("{\"a\": 1}"));

    let captured = captured.await.unwrap();
    let head = captured.head.to_ascii_lowercase();
    assert!(captured.head.starts_with("POST /v1/messages"));
    assert!(head.contains("x-api-key: ak-test"));
    assert!(head.contains("anthropic-version: 2023-06-01"));
    assert_eq!(captured.body["system"], "You chart trends.");
    assert_eq!(captured.body["messages"][0]["role"], "user");
}

#[tokio::test]
async fn unreachable_server_is_network_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = OpenAiCompatibleClient::new(
        LLMConfig::openai("k", "m").with_base_url(&format!("http://{addr}/v1")),
    )
    .unwrap();
    assert!(matches!(client.generate(&request()).await, Err(LLMError::Network(_))));
}
