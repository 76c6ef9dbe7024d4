// API client module: a small blocking HTTP client that talks to the QR
// analysis service. Two endpoints are used:
//   POST {base}/scan     multipart upload, field `file`
//   POST {base}/analyze  JSON body `{ "url": <decoded payload> }`
// Both answer with a `ScanReport` on success, or a non-2xx status with an
// `{ "error": "..." }` body on failure.

use crate::config::ClientConfig;
use crate::error::{Result, ScanError};
use crate::image::SelectedImage;
use crate::report::ScanReport;
use anyhow::Context;
use reqwest::blocking::{multipart, Client, Response};
use serde::{Deserialize, Serialize};

/// Transport seam used by the state machine and the session loop. The
/// real implementation is `ApiClient`; tests plug in their own.
pub trait ScanApi: Send + Sync {
    /// Upload raw image bytes to the scan endpoint.
    fn scan_image(&self, image: &SelectedImage) -> Result<ScanReport>;

    /// Send a camera-decoded payload to the analyze endpoint.
    fn analyze_payload(&self, payload: &str) -> Result<ScanReport>;
}

/// Blocking reqwest client plus the base URL it was configured with.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    config: ClientConfig,
}

/// Request body for `/analyze`. The field is called `url` on the wire
/// even though the payload is not necessarily a URL.
#[derive(Serialize, Deserialize, Debug)]
pub struct AnalyzeRequest {
    pub url: String,
}

/// Failure body returned by the service.
#[derive(Deserialize, Debug)]
struct ErrorBody {
    error: Option<serde_json::Value>,
}

impl ApiClient {
    /// Create a client for the given configuration. No request timeout is
    /// set; the transport default applies.
    pub fn new(config: ClientConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .build()
            .context("Failed to build HTTP client")?;
        Ok(ApiClient { client, config })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn send(&self, request: reqwest::blocking::RequestBuilder) -> Result<ScanReport> {
        let res = request.send().map_err(|e| {
            log::warn!("request failed before a response arrived: {}", e);
            ScanError::transport(e.to_string())
        })?;
        read_report(res)
    }
}

impl ScanApi for ApiClient {
    fn scan_image(&self, image: &SelectedImage) -> Result<ScanReport> {
        let url = self.config.endpoint("scan");
        log::debug!("POST {} ({} bytes)", url, image.bytes().len());

        let part = multipart::Part::bytes(image.bytes().to_vec())
            .file_name(image.file_name().to_string())
            .mime_str(image.mime_type())
            .map_err(|e| ScanError::transport(e.to_string()))?;
        let form = multipart::Form::new().part("file", part);

        self.send(self.client.post(&url).multipart(form))
    }

    fn analyze_payload(&self, payload: &str) -> Result<ScanReport> {
        let url = self.config.endpoint("analyze");
        log::debug!("POST {} ({} chars)", url, payload.len());

        let body = AnalyzeRequest {
            url: payload.to_string(),
        };
        self.send(self.client.post(&url).json(&body))
    }
}

fn read_report(res: Response) -> Result<ScanReport> {
    let status = res.status().as_u16();
    // Status is known here; an unreadable body is judged by status alone.
    let body = res.text().unwrap_or_else(|e| {
        log::warn!("response body for HTTP {} could not be read: {}", status, e);
        String::new()
    });
    interpret_response(status, &body)
}

/// Turn a status code and body into a report or the matching error.
///
/// On failure the server's `error` field is used verbatim when it is a
/// non-empty string; otherwise the generic "server rejected request"
/// message applies.
pub fn interpret_response(status: u16, body: &str) -> Result<ScanReport> {
    if (200..300).contains(&status) {
        return serde_json::from_str(body).map_err(|e| ScanError::MalformedReport(e.to_string()));
    }

    let message = serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.error)
        .and_then(|v| v.as_str().map(str::to_string))
        .filter(|m| !m.is_empty());

    match message {
        Some(message) => Err(ScanError::Server { status, message }),
        None => Err(ScanError::Rejected { status }),
    }
}
