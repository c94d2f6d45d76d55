//! Integration tests for the extractors against a local chat-completions stub.

use std::sync::Arc;

use stratus_extract::{ExtractError, Extractor, KeywordExtractor, LlmExtractor};
use stratus_model::{CloudProvider, InfrastructureRequest};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::Mutex;

/// Serve `responses` in order, one per connection, and record each request body.
async fn stub_server(responses: Vec<(u16, String)>) -> (String, Arc<Mutex<Vec<String>>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let bodies = Arc::new(Mutex::new(Vec::new()));
    let seen = bodies.clone();

    tokio::spawn(async move {
        for (status, body) in responses {
            let (mut socket, _) = listener.accept().await.unwrap();
            let request = read_request(&mut socket).await;
            seen.lock().await.push(request);
            let reply = format!(
                "HTTP/1.1 {} Stub\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            socket.write_all(reply.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
        }
    });

    (format!("http://{}/v1/chat/completions", addr), bodies)
}

async fn read_request(socket: &mut tokio::net::TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = socket.read(&mut chunk).await.unwrap();
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
        let text = String::from_utf8_lossy(&buf);
        if let Some(end) = text.find("\r\n\r\n") {
            let length = text[..end]
                .lines()
                .find_map(|l| {
                    let (name, value) = l.split_once(':')?;
                    name.eq_ignore_ascii_case("content-length")
                        .then(|| value.trim().parse::<usize>().ok())
                        .flatten()
                })
                .unwrap_or(0);
            if buf.len() >= end + 4 + length {
                return String::from_utf8_lossy(&buf[end + 4..end + 4 + length]).into_owned();
            }
        }
    }
    String::new()
}

fn completion(content: &str) -> String {
    serde_json::json!({
        "choices": [{ "message": { "role": "assistant", "content": content } }]
    })
    .to_string()
}

#[tokio::test]
async fn test_llm_extractor_parses_completion() {
    let reply = r#"{"providers": [{"provider": "aws", "servers": 2, "databases": 1, "database_type": "postgresql"}]}"#;
    let (endpoint, bodies) = stub_server(vec![(200, completion(reply))]).await;
    let extractor = LlmExtractor::new("test-key".to_string(), Some("stub-model".to_string()), Some(endpoint));

    let raw = extractor.extract("2 serveurs AWS avec PostgreSQL").await.unwrap();
    let request = InfrastructureRequest::from_raw(&raw).unwrap();

    assert_eq!(request.providers()[0].provider(), CloudProvider::Aws);
    assert_eq!(request.providers()[0].servers(), 2);
    assert_eq!(request.providers()[0].databases(), 1);

    let sent: serde_json::Value = serde_json::from_str(&bodies.lock().await[0]).unwrap();
    assert_eq!(sent["model"], "stub-model");
    assert_eq!(sent["messages"][1]["content"], "2 serveurs AWS avec PostgreSQL");
}

#[tokio::test]
async fn test_llm_extractor_client_error_is_not_retried() {
    let (endpoint, bodies) = stub_server(vec![(401, r#"{"error": "bad key"}"#.to_string())]).await;
    let extractor = LlmExtractor::new("wrong".to_string(), None, Some(endpoint));

    let err = extractor.extract("un serveur").await.unwrap_err();

    assert!(matches!(err, ExtractError::Api { status: 401, .. }));
    assert_eq!(bodies.lock().await.len(), 1);
}

#[tokio::test]
async fn test_llm_extractor_empty_content() {
    let (endpoint, _) = stub_server(vec![(200, completion(""))]).await;
    let extractor = LlmExtractor::new("key".to_string(), None, Some(endpoint));

    let err = extractor.extract("un serveur").await.unwrap_err();
    assert!(matches!(err, ExtractError::EmptyResponse));
}

#[tokio::test]
async fn test_llm_extractor_non_json_reply() {
    let (endpoint, _) = stub_server(vec![(200, completion("Sure! You want one server."))]).await;
    let extractor = LlmExtractor::new("key".to_string(), None, Some(endpoint)).with_max_retries(1);

    let err = extractor.extract("un serveur").await.unwrap_err();
    assert!(matches!(err, ExtractError::Parse(_)));
}

#[tokio::test]
async fn test_keyword_output_normalizes() {
    let extractor: Box<dyn Extractor> = Box::new(KeywordExtractor::new());

    let raw = extractor
        .extract("Une base de données MongoDB sur OpenStack et 2 serveurs Azure derrière un load balancer")
        .await
        .unwrap();
    let request = InfrastructureRequest::from_raw(&raw).unwrap();

    assert_eq!(request.len(), 2);
    let openstack = &request.providers()[0];
    assert_eq!(openstack.provider(), CloudProvider::OpenStack);
    assert_eq!(openstack.servers(), 0);
    assert_eq!(openstack.databases(), 1);
    assert!(openstack.networks() >= 1);

    let azure = &request.providers()[1];
    assert_eq!(azure.provider(), CloudProvider::Azure);
    assert_eq!(azure.servers(), 2);
    assert_eq!(azure.load_balancers(), 1);
    assert!(azure.security_groups() >= 1);
}
