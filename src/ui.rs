// UI layer: an interactive menu built on `dialoguer`, one-shot command
// flows, and the report renderer. Rendering writes to any `io::Write` so
// it can be checked in tests without a terminal.

use crate::camera::{self, ExternalScanner};
use crate::config::ClientConfig;
use crate::image::SelectedImage;
use crate::report::ScanReport;
use crate::session::Session;
use crate::state::{Mode, ScanClient};
use anyhow::Result;
use crossterm::style::{Color, Stylize};
use dialoguer::{Confirm, Input, Select};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, BufReader, Write};
use std::path::Path;
use std::time::Duration;

/// How results are printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Output {
    Pretty,
    Json,
}

/// Main interactive menu. Runs a simple select loop until the user
/// chooses "Exit". Switching entries switches the client's input mode.
pub fn main_menu(mut session: Session, config: &ClientConfig) -> Result<()> {
    loop {
        let items = vec!["Upload image", "Scan with camera", "Exit"];
        let selection = Select::new()
            .with_prompt("Input mode")
            .items(&items)
            .default(0)
            .interact()?;
        match selection {
            0 => {
                session.switch_mode(Mode::Upload);
                let path: String = Input::new()
                    .with_prompt("Image file path")
                    .allow_empty(true)
                    .interact_text()?;
                let path = path.trim();
                if path.is_empty() {
                    run_upload(&mut session)?;
                } else {
                    upload_path(&mut session, Path::new(path), config)?;
                }
                show(session.client(), Output::Pretty)?;
            }
            1 => loop {
                session.switch_mode(Mode::Camera);
                run_camera(&mut session, config, false)?;
                show(session.client(), Output::Pretty)?;
                if session.client().camera_error().is_some() {
                    break;
                }
                let again = Confirm::new()
                    .with_prompt("Scan another code?")
                    .default(true)
                    .interact()?;
                if !again {
                    break;
                }
            },
            2 => break,
            _ => {}
        }
    }
    Ok(())
}

/// Load the image into the session, recording a validation error if it
/// can't be used.
pub fn select_image(session: &mut Session, path: &Path, config: &ClientConfig) {
    match SelectedImage::load(path, config.max_upload_bytes) {
        Ok(image) => session.select_file(image),
        Err(e) => session.fail_selection(e),
    }
}

/// Select an image and upload it, unless it failed validation.
pub fn upload_path(session: &mut Session, path: &Path, config: &ClientConfig) -> Result<()> {
    select_image(session, path, config);
    if session.client().error().is_some() {
        return Ok(());
    }
    run_upload(session)
}

/// Submit the selected file and wait for the answer under a spinner.
pub fn run_upload(session: &mut Session) -> Result<()> {
    if !session.submit_file() {
        return Ok(());
    }
    let spinner = spinner("Scanning...");
    session.run_until_settled();
    spinner.finish_and_clear();
    Ok(())
}

/// Analyze a payload given directly on the command line.
pub fn run_analyze(session: &mut Session, payload: &str) -> Result<()> {
    if !session.submit_camera_payload(payload) {
        return Ok(());
    }
    let spinner = spinner("Analyzing...");
    session.run_until_settled();
    spinner.finish_and_clear();
    Ok(())
}

/// Feed detections from the scanner (or stdin) until one report settles.
pub fn run_camera(session: &mut Session, config: &ClientConfig, from_stdin: bool) -> Result<()> {
    let handle = if from_stdin {
        camera::spawn_line_reader(BufReader::new(io::stdin()), session.sender());
        None
    } else {
        let scanner = ExternalScanner::new(config.scanner_command.clone());
        match scanner.start(session.sender()) {
            Ok(handle) => Some(handle),
            Err(e) => {
                session.handle(camera::CameraEvent::Error(e).into());
                return Ok(());
            }
        }
    };

    let spinner = spinner("Waiting for a QR code...");
    session.run_until_settled_with(|client| {
        if client.is_busy() {
            spinner.set_message("Analyzing...");
        }
    });
    spinner.finish_and_clear();

    if let Some(handle) = handle {
        handle.stop();
    }
    session.drain();
    Ok(())
}

fn spinner(message: &'static str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(message);
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

/// Print the client state to stdout in the chosen format.
pub fn show(client: &ScanClient, output: Output) -> Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    match output {
        Output::Pretty => render_state(&mut out, client)?,
        Output::Json => writeln!(out, "{}", serde_json::to_string_pretty(&json_view(client))?)?,
    }
    Ok(())
}

/// JSON form of the visible state: the report, or an `error` object.
pub fn json_view(client: &ScanClient) -> serde_json::Value {
    let mut value = match (client.report(), client.error_message()) {
        (Some(report), _) => serde_json::json!(report),
        (None, Some(message)) => serde_json::json!({ "error": message }),
        (None, None) => serde_json::json!({}),
    };
    if let (Some(camera), Some(obj)) = (client.camera_error_message(), value.as_object_mut()) {
        obj.insert("camera_error".into(), camera.into());
    }
    value
}

/// Render report, request error and camera error. Report and request
/// error are never both present.
pub fn render_state<W: Write>(out: &mut W, client: &ScanClient) -> io::Result<()> {
    if let Some(message) = client.camera_error_message() {
        writeln!(out, "{}", format!("camera: {message}").with(Color::Yellow))?;
    }
    if let Some(message) = client.error_message() {
        writeln!(out, "{}", format!("error: {message}").with(Color::Red))?;
    }
    if let Some(report) = client.report() {
        render_report(out, report)?;
    }
    Ok(())
}

pub fn render_report<W: Write>(out: &mut W, report: &ScanReport) -> io::Result<()> {
    let badge = format!(" {} ", report.status);
    match report.rgb().or_else(|| report.risk_level().fallback_rgb()) {
        Some((r, g, b)) => writeln!(out, "{}", badge.with(Color::Black).on(Color::Rgb { r, g, b }).bold())?,
        None => writeln!(out, "{}", badge.bold())?,
    }

    writeln!(out, "Decoded URL: {}", report.url)?;
    writeln!(out, "Security Analysis:")?;
    if report.warnings.is_empty() {
        writeln!(out, "  (no warnings)")?;
    }
    for warning in &report.warnings {
        writeln!(out, "  - {warning}")?;
    }
    Ok(())
}
