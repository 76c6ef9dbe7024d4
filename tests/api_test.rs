//! HTTP contract tests against a local one-shot stub server.

mod common;

use common::{closed_url, serve_once, serve_raw};
use safescan_cli::error::CONNECTIVITY_MESSAGE;
use safescan_cli::image::SelectedImage;
use safescan_cli::{ApiClient, ClientConfig, ScanApi, ScanClient, ScanError};
use std::fs;
use tempfile::tempdir;

fn client_for(base_url: &str) -> ApiClient {
    let mut config = ClientConfig::default();
    config.set_base_url(base_url);
    ApiClient::new(config).expect("client")
}

#[test]
fn test_scan_uploads_multipart_file() {
    let (url, server) = serve_once(
        "200 OK",
        r##"{"url":"http://example.com","status":"MALICIOUS","color":"#ff4d4f","warnings":["Insecure Protocol: URL uses HTTP instead of HTTPS."]}"##,
    );
    let dir = tempdir().unwrap();
    let path = dir.path().join("qr.png");
    fs::write(&path, b"FAKEPNGDATA").unwrap();
    let image = SelectedImage::load(&path, 1024).unwrap();

    let report = client_for(&url).scan_image(&image).unwrap();
    assert_eq!(report.status, "MALICIOUS");
    assert_eq!(report.warnings.len(), 1);

    let request = server.join().unwrap();
    assert!(request.starts_with("POST /scan "));
    assert!(request.to_ascii_lowercase().contains("content-type: multipart/form-data"));
    assert!(request.contains("name=\"file\""));
    assert!(request.contains("filename=\"qr.png\""));
    assert!(request.contains("image/png"));
    assert!(request.contains("FAKEPNGDATA"));
}

#[test]
fn test_analyze_posts_json_payload() {
    let (url, server) = serve_once(
        "200 OK",
        r##"{"url":"https://example.com/login","status":"SUSPICIOUS","color":"#faad14"}"##,
    );

    let report = client_for(&url)
        .analyze_payload("https://example.com/login")
        .unwrap();
    assert_eq!(report.status, "SUSPICIOUS");
    assert!(report.warnings.is_empty());

    let request = server.join().unwrap();
    assert!(request.starts_with("POST /analyze "));
    assert!(request.to_ascii_lowercase().contains("content-type: application/json"));
    assert!(request.contains(r#"{"url":"https://example.com/login"}"#));
}

#[test]
fn test_server_error_message_is_verbatim() {
    let (url, server) = serve_once("400 BAD REQUEST", r#"{"error":"bad image"}"#);
    let api = client_for(&url);

    let mut client = ScanClient::new();
    let dispatch = client.submit_camera_payload("anything").unwrap();
    client.run_blocking(&api, dispatch);
    server.join().unwrap();

    assert_eq!(client.error_message().as_deref(), Some("bad image"));
    assert!(client.report().is_none());
}

#[test]
fn test_failure_without_message_is_rejected() {
    let (url, server) = serve_once("502 BAD GATEWAY", "<html>upstream down</html>");
    let err = client_for(&url).analyze_payload("x").unwrap_err();
    server.join().unwrap();
    assert_eq!(err, ScanError::Rejected { status: 502 });
    assert_eq!(err.to_string(), "server rejected request (HTTP 502)");
}

#[test]
fn test_unreachable_server_gives_generic_message() {
    let api = client_for(&closed_url());

    let mut client = ScanClient::new();
    let dispatch = client.submit_camera_payload("https://example.com").unwrap();
    client.run_blocking(&api, dispatch);

    assert!(matches!(client.error(), Some(ScanError::Transport { .. })));
    assert_eq!(client.error_message().as_deref(), Some(CONNECTIVITY_MESSAGE));
}

#[test]
fn test_truncated_failure_body_is_rejected_not_unreachable() {
    let (url, server) = serve_raw(
        "HTTP/1.1 500 INTERNAL SERVER ERROR\r\nContent-Type: application/json\r\nContent-Length: 100\r\nConnection: close\r\n\r\n{\"err".to_string(),
    );
    let err = client_for(&url).analyze_payload("x").unwrap_err();
    server.join().unwrap();

    assert_eq!(err, ScanError::Rejected { status: 500 });
    assert_ne!(err.to_string(), CONNECTIVITY_MESSAGE);
}

#[test]
fn test_truncated_success_body_is_malformed() {
    let (url, server) = serve_raw(
        "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: 100\r\nConnection: close\r\n\r\n{\"status\":\"SA".to_string(),
    );
    let err = client_for(&url).analyze_payload("x").unwrap_err();
    server.join().unwrap();

    assert!(matches!(err, ScanError::MalformedReport(_)));
}
