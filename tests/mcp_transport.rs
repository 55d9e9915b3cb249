//! McpHttpClient against a mocked JSON-RPC endpoint.

mod common;

use common::{reference_tools, silent_client, silent_endpoint, McpMock, SESSION_ID};
use mcp_chat_rust::{ToolArgs, ToolTransport};
use mockito::Matcher;
use serde_json::{json, Value};
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

fn args(v: Value) -> ToolArgs {
    v.as_object().cloned().unwrap_or_default()
}

#[tokio::test]
async fn test_connect_is_idempotent() {
    let mut mock = McpMock::new().await;
    let (init, notify) = mock.mock_handshake(1).await;
    let client = mock.client();

    assert!(!client.is_connected());
    tokio_test::assert_ok!(client.connect().await);
    tokio_test::assert_ok!(client.connect().await);
    assert!(client.is_connected());
    assert_eq!(client.session_id(), Some(SESSION_ID));
    assert_eq!(client.server_info().map(|s| s.name.as_str()), Some("mock-tools"));

    init.assert_async().await;
    notify.assert_async().await;
}

#[tokio::test]
async fn test_concurrent_connects_share_one_handshake() {
    let mut mock = McpMock::new().await;
    let (init, _) = mock.mock_handshake(1).await;
    let client = Arc::new(mock.client());

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let c = client.clone();
            tokio::spawn(async move { c.connect().await })
        })
        .collect();
    for h in handles {
        tokio_test::assert_ok!(h.await.unwrap());
    }
    init.assert_async().await;
}

#[tokio::test]
async fn test_calls_before_connect_are_not_connected() {
    let mock = McpMock::new().await;
    let client = mock.client();
    assert!(client.list_tools().await.unwrap_err().is_not_connected());
    assert!(client
        .invoke("ping", ToolArgs::new())
        .await
        .unwrap_err()
        .is_not_connected());
}

#[tokio::test]
async fn test_failed_handshake_is_connection_error_and_retryable() {
    let mut mock = McpMock::new().await;
    let down = mock.mock_down(503).await;
    let client = mock.client();

    let err = client.connect().await.unwrap_err();
    assert_eq!(err.code(), "CONNECTION_ERROR");
    assert!(!client.is_connected());

    down.remove_async().await;
    mock.mock_handshake(1).await;
    tokio_test::assert_ok!(client.connect().await);
}

#[tokio::test]
async fn test_list_tools_follows_cursor() {
    let mut mock = McpMock::new().await;
    mock.mock_handshake(1).await;
    let first = mock
        .server
        .mock("POST", "/mcp")
        .match_body(Matcher::AllOf(vec![
            Matcher::PartialJson(json!({ "method": "tools/list" })),
            Matcher::Regex(r#""params":\{\}"#.to_string()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({ "jsonrpc": "2.0", "id": 2, "result": {
                "tools": [{ "name": "ping" }], "nextCursor": "page-2"
            }})
            .to_string(),
        )
        .create_async()
        .await;
    let second = mock
        .server
        .mock("POST", "/mcp")
        .match_body(Matcher::PartialJson(json!({ "params": { "cursor": "page-2" } })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({ "jsonrpc": "2.0", "id": 3, "result": { "tools": [{ "name": "echo" }] } })
                .to_string(),
        )
        .create_async()
        .await;

    let client = mock.client();
    client.connect().await.unwrap();
    let names: Vec<_> = client
        .list_tools()
        .await
        .unwrap()
        .into_iter()
        .map(|t| t.name)
        .collect();
    assert_eq!(names, ["ping", "echo"]);
    first.assert_async().await;
    second.assert_async().await;
}

#[tokio::test]
async fn test_list_tools_sends_session_header() {
    let mut mock = McpMock::new().await;
    mock.mock_handshake(1).await;
    let list = mock.mock_list_tools(reference_tools()).await;
    let client = mock.client();
    client.connect().await.unwrap();

    let tools = client.list_tools().await.unwrap();
    assert_eq!(tools.len(), 5);
    assert_eq!(tools[2].name, "math.add");
    assert_eq!(tools[2].description, "Add two numbers");
    list.assert_async().await;
}

#[tokio::test]
async fn test_invoke_normalizes_results() {
    let mut mock = McpMock::new().await;
    mock.mock_handshake(1).await;
    mock.mock_call_text("math.add", r#"{"result":12}"#).await;
    mock.mock_call_text("ping", "pong").await;
    mock.mock_call_sse("echo", r#"{"message":"hi"}"#).await;
    let client = mock.client();
    client.connect().await.unwrap();

    let sum = client.invoke("math.add", args(json!({"a": 5, "b": 7}))).await.unwrap();
    assert_eq!(sum, json!({"result": 12}));
    let pong = client.invoke("ping", ToolArgs::new()).await.unwrap();
    assert_eq!(pong, json!("pong"));
    let echoed = client.invoke("echo", args(json!({"message": "hi"}))).await.unwrap();
    assert_eq!(echoed, json!({"message": "hi"}));
}

#[tokio::test]
async fn test_invoke_float_addition_passes_through() {
    let mut mock = McpMock::new().await;
    mock.mock_handshake(1).await;
    mock.mock_call_text("math.add", r#"{"result":3.5}"#).await;
    let client = mock.client();
    client.connect().await.unwrap();

    let sum = client.invoke("math.add", args(json!({"a": 1.5, "b": 2}))).await.unwrap();
    assert_eq!(sum["result"].as_f64(), Some(3.5));
}

#[tokio::test]
async fn test_tool_error_flag_is_invocation_error() {
    let mut mock = McpMock::new().await;
    mock.mock_handshake(1).await;
    mock.mock_call_result(
        "math.add",
        json!({ "content": [{ "type": "text", "text": "Invalid arguments" }], "isError": true }),
    )
    .await;
    let client = mock.client();
    client.connect().await.unwrap();

    let err = client.invoke("math.add", ToolArgs::new()).await.unwrap_err();
    assert_eq!(err.code(), "INVOCATION_ERROR");
    assert!(err.to_string().contains("Invalid arguments"));
}

#[tokio::test]
async fn test_rpc_error_is_invocation_error() {
    let mut mock = McpMock::new().await;
    mock.mock_handshake(1).await;
    mock.server
        .mock("POST", "/mcp")
        .match_body(Matcher::PartialJson(json!({ "method": "tools/call" })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({ "jsonrpc": "2.0", "id": 3, "error": { "code": -32602, "message": "Tool nope not found" } })
                .to_string(),
        )
        .create_async()
        .await;
    let client = mock.client();
    client.connect().await.unwrap();

    let err = client.invoke("nope", ToolArgs::new()).await.unwrap_err();
    assert_eq!(err.code(), "INVOCATION_ERROR");
    assert!(err.to_string().contains("not found"));
}

#[tokio::test]
async fn test_invoke_timeout() {
    let mut mock = McpMock::new().await;
    mock.mock_handshake(1).await;
    mock.server
        .mock("POST", "/mcp")
        .match_body(Matcher::PartialJson(json!({ "method": "tools/call" })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_chunked_body(|w| {
            std::thread::sleep(Duration::from_millis(500));
            w.write_all(br#"{"jsonrpc":"2.0","id":3,"result":{"content":[]}}"#)
        })
        .create_async()
        .await;
    let client = mock.client_with_timeout(Duration::from_millis(50));
    client.connect().await.unwrap();

    let err = client.invoke("slow", ToolArgs::new()).await.unwrap_err();
    assert_eq!(err.code(), "INVOCATION_ERROR");
    assert!(err.to_string().contains("timed out"));
}

#[tokio::test]
async fn test_silent_endpoint_handshake_times_out() {
    let (url, _listener) = silent_endpoint().await;
    let client = silent_client(&url, Duration::from_millis(100));

    let result = tokio::time::timeout(Duration::from_secs(5), client.connect()).await;
    let err = result.expect("connect must be bounded").unwrap_err();
    assert_eq!(err.code(), "CONNECTION_ERROR");
    assert!(err.to_string().contains("timed out"));
    assert!(!client.is_connected());
}

#[tokio::test]
async fn test_list_tools_timeout() {
    let mut mock = McpMock::new().await;
    mock.mock_handshake(1).await;
    mock.server
        .mock("POST", "/mcp")
        .match_body(Matcher::PartialJson(json!({ "method": "tools/list" })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_chunked_body(|w| {
            std::thread::sleep(Duration::from_millis(500));
            w.write_all(br#"{"jsonrpc":"2.0","id":2,"result":{"tools":[]}}"#)
        })
        .create_async()
        .await;
    let client = mock.client_with_timeout(Duration::from_millis(50));
    client.connect().await.unwrap();

    let err = client.list_tools().await.unwrap_err();
    assert_eq!(err.code(), "TRANSPORT_ERROR");
    assert!(err.to_string().contains("tools/list timed out"));
}
