use std::time::Duration;

use finassist::chat::{Attachment, BackendError, ChatBackend, HttpBackend};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Accept one connection, answer it with `status` and `body`, and hand back
/// the raw request text.
async fn serve_once(status: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let request = read_request(&mut socket).await;
        let response = format!(
            "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
            body.len()
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.ok();
        request
    });
    (format!("http://{addr}"), handle)
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
        let Some(header_end) = text.find("\r\n\r\n") else {
            continue;
        };
        let headers = text[..header_end].to_ascii_lowercase();
        let body_len = buf.len() - (header_end + 4);
        if let Some(length) = headers
            .lines()
            .find_map(|line| line.strip_prefix("content-length:"))
            .and_then(|v| v.trim().parse::<usize>().ok())
        {
            if body_len >= length {
                break;
            }
        } else if headers.contains("transfer-encoding: chunked") {
            if text.ends_with("0\r\n\r\n") {
                break;
            }
        } else {
            break;
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}

fn backend(endpoint: &str) -> HttpBackend {
    HttpBackend::new(endpoint, Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn ask_posts_question_and_files_as_multipart() {
    let (endpoint, server) = serve_once("200 OK", r#"{"answer":"Revenue grew 12%."}"#).await;
    let attachments = vec![Attachment {
        filename: "Q3-report.pdf".to_string(),
        bytes: b"%PDF-1.7 body".to_vec(),
    }];

    let answer = backend(&format!("{endpoint}/"))
        .ask("What changed in Q3?", attachments)
        .await
        .unwrap();
    assert_eq!(answer, "Revenue grew 12%.");

    let request = server.await.unwrap();
    assert!(request.starts_with("POST /ask HTTP/1.1"));
    assert!(request.to_ascii_lowercase().contains("multipart/form-data"));
    assert!(request.contains("name=\"question\""));
    assert!(request.contains("What changed in Q3?"));
    assert!(request.contains("name=\"files\"; filename=\"Q3-report.pdf\""));
    assert!(request.contains("application/pdf"));
}

#[tokio::test]
async fn missing_answer_field_is_an_empty_answer() {
    let (endpoint, server) = serve_once("200 OK", "{}").await;
    let answer = backend(&endpoint).ask("anything?", Vec::new()).await.unwrap();
    assert_eq!(answer, "");
    server.await.unwrap();
}

#[tokio::test]
async fn error_status_carries_the_json_error_body() {
    let (endpoint, server) = serve_once(
        "400 Bad Request",
        r#"{"error":"No files provided","message":"Attach at least one PDF"}"#,
    )
    .await;
    let err = backend(&endpoint).ask("q", Vec::new()).await.unwrap_err();
    server.await.unwrap();

    match err {
        BackendError::Status {
            status,
            error,
            message,
        } => {
            assert_eq!(status, 400);
            assert_eq!(error.as_deref(), Some("No files provided"));
            assert_eq!(message.as_deref(), Some("Attach at least one PDF"));
        }
        other => panic!("expected a status error, got {other:?}"),
    }
}

#[tokio::test]
async fn error_status_with_unparseable_body_has_no_details() {
    let (endpoint, server) = serve_once("500 Internal Server Error", "<html>oops</html>").await;
    let err = backend(&endpoint).ask("q", Vec::new()).await.unwrap_err();
    server.await.unwrap();

    assert!(matches!(
        err,
        BackendError::Status {
            status: 500,
            error: None,
            message: None
        }
    ));
    assert_eq!(err.to_string(), "server returned 500: Server error");
}

#[tokio::test]
async fn unreachable_endpoint_is_a_network_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = backend(&format!("http://{addr}"))
        .ask("q", Vec::new())
        .await
        .unwrap_err();
    assert!(matches!(err, BackendError::Network(_)));
}

#[tokio::test]
async fn fetch_document_reads_local_paths_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("annual.pdf");
    std::fs::write(&path, b"%PDF-1.4 annual").unwrap();

    let backend = backend("http://127.0.0.1:9");
    let bytes = backend
        .fetch_document(&format!("file://{}", path.display()))
        .await
        .unwrap();
    assert_eq!(bytes, b"%PDF-1.4 annual");

    let missing = backend
        .fetch_document(dir.path().join("nope.pdf").to_str().unwrap())
        .await;
    assert!(matches!(missing, Err(BackendError::Network(_))));
}

#[tokio::test]
async fn fetch_document_downloads_over_http() {
    let (endpoint, server) = serve_once("200 OK", "%PDF-1.7 remote").await;
    let bytes = backend("http://127.0.0.1:9")
        .fetch_document(&format!("{endpoint}/reports/annual.pdf"))
        .await
        .unwrap();
    assert_eq!(bytes, b"%PDF-1.7 remote");

    let request = server.await.unwrap();
    assert!(request.starts_with("GET /reports/annual.pdf HTTP/1.1"));
}

#[tokio::test]
async fn fetch_document_reports_http_failures() {
    let (endpoint, server) = serve_once("404 Not Found", "").await;
    let err = backend("http://127.0.0.1:9")
        .fetch_document(&format!("{endpoint}/missing.pdf"))
        .await
        .unwrap_err();
    server.await.unwrap();
    assert!(matches!(err, BackendError::Status { status: 404, .. }));
}
