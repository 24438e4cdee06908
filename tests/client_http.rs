//! HTTP client tests against a one-shot local responder.

use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

use smellcheck::client::{AnalysisRequest, ServiceClient, Transport, TransportError};
use smellcheck::session::{AnalysisSession, Status};
use smellcheck::{CodeBuffer, Config, Language};

const CLEAN: &str = r#"{"smells":[],"metrics":{"lines":1,"functions":0,"classes":0,"complexity":1,"avg_method_length":0,"max_nesting_depth":0,"comment_ratio":0.0},"ml_prediction":{"has_smell":false,"confidence":0.92}}"#;

/// A request as seen by the responder.
struct Captured {
    head: String,
    body: String,
}

/// Serve exactly one HTTP response and hand back what was requested.
async fn serve_once(status: &'static str, body: &'static str) -> (String, JoinHandle<Captured>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let captured = read_request(&mut socket).await;
        let response = format!(
            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        let _ = socket.shutdown().await;
        captured
    });

    (format!("http://{}", addr), handle)
}

async fn read_request(socket: &mut TcpStream) -> Captured {
    let mut data = Vec::new();
    let mut buf = [0u8; 4096];
    loop {
        let n = socket.read(&mut buf).await.unwrap();
        if n == 0 {
            break;
        }
        data.extend_from_slice(&buf[..n]);

        if let Some(end) = data.windows(4).position(|w| w == b"\r\n\r\n") {
            let head = String::from_utf8_lossy(&data[..end]).to_string();
            let length = head
                .to_ascii_lowercase()
                .lines()
                .find_map(|line| line.strip_prefix("content-length:").map(str::to_string))
                .and_then(|value| value.trim().parse::<usize>().ok())
                .unwrap_or(0);
            let start = end + 4;
            if data.len() >= start + length {
                let body = String::from_utf8_lossy(&data[start..start + length]).to_string();
                return Captured { head, body };
            }
        }
    }
    Captured {
        head: String::from_utf8_lossy(&data).to_string(),
        body: String::new(),
    }
}

fn client(endpoint: &str, timeout_ms: u64) -> ServiceClient {
    let config = Config {
        endpoint: endpoint.to_string(),
        timeout_ms,
        ..Default::default()
    };
    ServiceClient::new(&config).unwrap()
}

fn request(code: &str) -> AnalysisRequest {
    AnalysisRequest {
        code: code.to_string(),
        language: Language::Python,
    }
}

#[tokio::test]
async fn posts_code_and_returns_body() {
    let (endpoint, server) = serve_once("200 OK", CLEAN).await;

    let body = client(&endpoint, 5_000)
        .analyze(&request("x = 1"))
        .await
        .unwrap();
    assert_eq!(body, CLEAN);

    let captured = server.await.unwrap();
    assert!(captured.head.starts_with("POST /analyze HTTP/1.1"));
    let sent: serde_json::Value = serde_json::from_str(&captured.body).unwrap();
    assert_eq!(sent, serde_json::json!({"code": "x = 1", "language": "python"}));
}

#[tokio::test]
async fn error_status_carries_detail() {
    let (endpoint, server) =
        serve_once("400 Bad Request", r#"{"detail":"Code cannot be empty"}"#).await;

    let err = client(&endpoint, 5_000)
        .analyze(&request("   "))
        .await
        .unwrap_err();
    server.await.unwrap();

    match err {
        TransportError::Status { code, detail } => {
            assert_eq!(code, 400);
            assert_eq!(detail.as_deref(), Some("Code cannot be empty"));
        }
        other => panic!("expected status error, got {:?}", other),
    }
}

#[tokio::test]
async fn server_error_fails_session() {
    let (endpoint, server) = serve_once("500 Internal Server Error", "Internal Server Error").await;
    let session = AnalysisSession::new(client(&endpoint, 5_000));

    session.analyze_and_wait(&CodeBuffer::new("x = 1")).await;
    server.await.unwrap();

    assert!(matches!(session.status(), Status::Failed { .. }));
    assert_eq!(
        session.last_error().as_deref(),
        Some("analysis service returned HTTP 500")
    );
    assert!(session.results().is_empty());
}

#[tokio::test]
async fn success_over_http_populates_session() {
    let (endpoint, server) = serve_once("200 OK", CLEAN).await;
    let session = AnalysisSession::new(client(&endpoint, 5_000));

    session.analyze_and_wait(&CodeBuffer::new("x = 1")).await;
    server.await.unwrap();

    assert_eq!(session.status(), Status::Succeeded);
    let results = session.results();
    let metrics = results.metrics().unwrap();
    assert_eq!(metrics.complexity, Some(1.0));
    assert!(metrics.extra.contains_key("comment_ratio"));
}

#[tokio::test]
async fn slow_service_times_out() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let endpoint = format!("http://{}", listener.local_addr().unwrap());
    let server = tokio::spawn(async move {
        let (socket, _) = listener.accept().await.unwrap();
        tokio::time::sleep(Duration::from_secs(2)).await;
        drop(socket);
    });

    let err = client(&endpoint, 200)
        .analyze(&request("x = 1"))
        .await
        .unwrap_err();
    assert!(matches!(err, TransportError::Timeout), "got {:?}", err);
    server.abort();
}

#[tokio::test]
async fn refused_connection_is_network_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let endpoint = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);

    let err = client(&endpoint, 2_000)
        .analyze(&request("x = 1"))
        .await
        .unwrap_err();
    assert!(matches!(err, TransportError::Network(_)), "got {:?}", err);
}

#[tokio::test]
async fn health_endpoint() {
    let (endpoint, server) =
        serve_once("200 OK", r#"{"status":"healthy","ml_model_loaded":true}"#).await;

    let health = client(&endpoint, 5_000).health().await.unwrap();
    let captured = server.await.unwrap();

    assert!(captured.head.starts_with("GET /health HTTP/1.1"));
    assert!(health.is_healthy());
    assert!(health.ml_model_loaded);
}
