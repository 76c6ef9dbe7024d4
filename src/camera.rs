// Camera capability boundary.
//
// Video capture and QR recognition are not done here. An external scanner
// process (by default `zbarcam --raw`) owns the camera and prints one
// decoded payload per line; this module turns that output into detection
// events and maps launch failures to `CameraError`. The same line reader
// also serves `--stdin`, so any tool that prints payloads can be piped in.

use crate::error::CameraError;
use async_channel::Sender;
use std::io::{self, BufRead, BufReader, Read};
use std::process::{Child, Command, Stdio};
use std::thread::{self, JoinHandle};

/// One decoded QR code as reported by the scanner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Detection {
    pub raw_value: String,
}

impl Detection {
    pub fn new(raw_value: impl Into<String>) -> Self {
        Detection {
            raw_value: raw_value.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CameraEvent {
    /// Ordered batch of detections from one callback.
    Detected(Vec<Detection>),
    Error(CameraError),
    /// The scanner stopped producing output.
    Closed,
}

/// zbar prefixes payloads with the symbology unless run with `--raw`.
fn strip_symbology(line: &str) -> &str {
    line.strip_prefix("QR-Code:").unwrap_or(line)
}

/// Forward every non-blank line as a one-entry detection batch. Returns
/// false once the receiving side has gone away.
pub fn forward_lines<R, T>(reader: R, tx: &Sender<T>) -> bool
where
    R: BufRead,
    T: From<CameraEvent>,
{
    for line in reader.lines() {
        let event = match line {
            Ok(line) => {
                let payload = strip_symbology(line.trim());
                if payload.is_empty() {
                    continue;
                }
                CameraEvent::Detected(vec![Detection::new(payload)])
            }
            Err(e) => CameraEvent::Error(CameraError::Failed(e.to_string())),
        };
        let stop = matches!(event, CameraEvent::Error(_));
        if tx.send_blocking(T::from(event)).is_err() {
            return false;
        }
        if stop {
            break;
        }
    }
    true
}

/// Read payloads from any line source (e.g. stdin) on a background thread.
pub fn spawn_line_reader<R, T>(reader: R, tx: Sender<T>) -> JoinHandle<()>
where
    R: BufRead + Send + 'static,
    T: From<CameraEvent> + Send + 'static,
{
    thread::spawn(move || {
        if forward_lines(reader, &tx) {
            let _ = tx.send_blocking(T::from(CameraEvent::Closed));
        }
    })
}

/// Launches the configured scanner command.
#[derive(Debug, Clone)]
pub struct ExternalScanner {
    command: Vec<String>,
}

/// Running scanner process. The process is killed when the handle drops;
/// its reader threads finish on their own once the pipes close.
pub struct ScannerHandle {
    child: Child,
}

impl ExternalScanner {
    pub fn new(command: Vec<String>) -> Self {
        ExternalScanner { command }
    }

    pub fn start<T>(&self, tx: Sender<T>) -> Result<ScannerHandle, CameraError>
    where
        T: From<CameraEvent> + Send + 'static,
    {
        let (program, args) = self
            .command
            .split_first()
            .ok_or_else(|| CameraError::Unavailable("no scanner command configured".into()))?;

        log::info!("starting scanner: {}", self.command.join(" "));
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| launch_error(program, &e))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| CameraError::Failed("scanner stdout not captured".into()))?;
        // stderr is drained alongside stdout so a chatty scanner never
        // blocks on a full pipe; only the tail is kept for classification.
        let stderr = child.stderr.take().map(|s| thread::spawn(move || stderr_tail(s)));

        thread::spawn(move || {
            if !forward_lines(BufReader::new(stdout), &tx) {
                return;
            }
            let tail = stderr.and_then(|h| h.join().ok()).unwrap_or_default();
            if let Some(err) = classify_stderr(&tail) {
                let _ = tx.send_blocking(T::from(CameraEvent::Error(err)));
            }
            let _ = tx.send_blocking(T::from(CameraEvent::Closed));
        });

        Ok(ScannerHandle { child })
    }
}

impl ScannerHandle {
    pub fn stop(self) {
        drop(self);
    }
}

impl Drop for ScannerHandle {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

fn launch_error(program: &str, err: &io::Error) -> CameraError {
    match err.kind() {
        io::ErrorKind::NotFound => CameraError::Unavailable(format!("{program} not found")),
        io::ErrorKind::PermissionDenied => CameraError::PermissionDenied(err.to_string()),
        _ => CameraError::Failed(err.to_string()),
    }
}

/// Bytes of scanner stderr kept for classifying its exit.
const STDERR_TAIL: usize = 4096;

/// Read a stream to the end, keeping only its last `STDERR_TAIL` bytes.
fn stderr_tail<R: Read>(mut stderr: R) -> String {
    let mut tail = Vec::new();
    let mut chunk = [0u8; 1024];
    loop {
        match stderr.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => {
                tail.extend_from_slice(&chunk[..n]);
                if tail.len() > STDERR_TAIL {
                    tail.drain(..tail.len() - STDERR_TAIL);
                }
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(_) => break,
        }
    }
    String::from_utf8_lossy(&tail).into_owned()
}

pub fn classify_stderr(text: &str) -> Option<CameraError> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    let lower = text.to_ascii_lowercase();
    if lower.contains("permission denied") || lower.contains("not permitted") {
        Some(CameraError::PermissionDenied(text.to_string()))
    } else if lower.contains("no such device") || lower.contains("no such file") {
        Some(CameraError::Unavailable(text.to_string()))
    } else {
        Some(CameraError::Failed(text.to_string()))
    }
}
