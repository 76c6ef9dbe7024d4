//! Shared test helpers: a counting fake for `ScanApi` and a one-shot HTTP
//! stub listening on 127.0.0.1.
#![allow(dead_code)]

use safescan_cli::image::SelectedImage;
use safescan_cli::{ScanApi, ScanError, ScanReport};
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::thread::{self, JoinHandle};
use std::time::Duration;

pub fn report(status: &str, color: &str, url: &str, warnings: &[&str]) -> ScanReport {
    ScanReport {
        status: status.into(),
        color: color.into(),
        url: url.into(),
        warnings: warnings.iter().map(|w| w.to_string()).collect(),
    }
}

/// Answers every call with a report whose `url` echoes the payload, or
/// with a fixed error. Counts calls and remembers what it was sent.
pub struct FakeApi {
    calls: AtomicUsize,
    seen: Mutex<Vec<String>>,
    failure: Option<ScanError>,
    slow: Option<(String, Duration)>,
}

impl FakeApi {
    pub fn ok() -> Self {
        FakeApi {
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
            failure: None,
            slow: None,
        }
    }

    pub fn failing(err: ScanError) -> Self {
        FakeApi {
            failure: Some(err),
            ..Self::ok()
        }
    }

    /// Delay answers for one particular payload.
    pub fn slow_for(mut self, payload: &str, delay: Duration) -> Self {
        self.slow = Some((payload.to_string(), delay));
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn seen(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }

    fn answer(&self, payload: String) -> Result<ScanReport, ScanError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(payload.clone());
        if let Some((slow, delay)) = &self.slow {
            if *slow == payload {
                thread::sleep(*delay);
            }
        }
        match &self.failure {
            Some(err) => Err(err.clone()),
            None => Ok(report("SAFE", "#52c41a", &payload, &[])),
        }
    }
}

impl ScanApi for FakeApi {
    fn scan_image(&self, image: &SelectedImage) -> Result<ScanReport, ScanError> {
        self.answer(format!("file:{}", image.file_name()))
    }

    fn analyze_payload(&self, payload: &str) -> Result<ScanReport, ScanError> {
        self.answer(payload.to_string())
    }
}

/// Serve exactly one HTTP response. The join handle yields the raw
/// request text the client sent.
pub fn serve_once(status_line: &str, body: &str) -> (String, JoinHandle<String>) {
    let response = format!(
        "HTTP/1.1 {status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    serve_raw(response)
}

/// Serve exactly one response written verbatim, headers included.
pub fn serve_raw(response: String) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let request = read_request(&mut stream);
        stream.write_all(response.as_bytes()).unwrap();
        stream.flush().unwrap();
        request
    });
    (format!("http://{addr}"), handle)
}

/// A base URL nothing is listening on.
pub fn closed_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

fn read_request(stream: &mut TcpStream) -> String {
    stream
        .set_read_timeout(Some(Duration::from_secs(5)))
        .unwrap();
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = match stream.read(&mut chunk) {
            Ok(0) | Err(_) => break,
            Ok(n) => n,
        };
        buf.extend_from_slice(&chunk[..n]);
        if request_complete(&buf) {
            break;
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}

fn request_complete(buf: &[u8]) -> bool {
    let Some(header_end) = buf.windows(4).position(|w| w == b"\r\n\r\n") else {
        return false;
    };
    let headers = String::from_utf8_lossy(&buf[..header_end]).to_ascii_lowercase();
    let body_len = buf.len() - (header_end + 4);

    let content_length = headers
        .lines()
        .find_map(|l| l.strip_prefix("content-length:"))
        .and_then(|v| v.trim().parse::<usize>().ok());
    if let Some(len) = content_length {
        return body_len >= len;
    }
    if headers.contains("transfer-encoding: chunked") {
        return buf.ends_with(b"0\r\n\r\n");
    }
    true
}
