// Library root
// -----------
// This crate exposes the QR scan client as a library; the binary
// (`main.rs`) wires it to a command line and an interactive menu.
//
// Module responsibilities:
// - `api`: HTTP calls to the analysis service (`/scan`, `/analyze`) behind
//   the `ScanApi` trait.
// - `state`: the client state machine (mode, selection, request phase).
// - `session`: event loop joining camera detections and request
//   completions onto one thread.
// - `camera`: external QR scanner process and line-based detection input.
// - `config`, `error`, `image`, `report`: supporting types.
// - `cli`, `ui`: command line definition and terminal rendering.
//
// The HTTP transport sits behind a trait so the state machine and the
// session can be exercised against test doubles.
pub mod api;
pub mod camera;
pub mod cli;
pub mod config;
pub mod error;
pub mod image;
pub mod report;
pub mod session;
pub mod state;
pub mod ui;

pub use api::{ApiClient, ScanApi};
pub use config::ClientConfig;
pub use error::{CameraError, ScanError};
pub use report::{RiskLevel, ScanReport};
pub use state::{Mode, Phase, ScanClient};
