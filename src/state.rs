// Client state machine.
//
// One owner (the session loop or a one-shot command) drives `ScanClient`
// through user actions and request completions. Request progress is held
// in a single `Phase` enum, so "busy", "report" and "error" can never
// disagree with each other. Every dispatch gets a fresh `RequestId`;
// completions for any other id are stale and dropped.

use crate::api::ScanApi;
use crate::camera::Detection;
use crate::error::{CameraError, Result, ScanError};
use crate::image::SelectedImage;
use crate::report::ScanReport;
use std::fmt;

/// Input mode, i.e. which tab the user is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Upload,
    Camera,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Upload => write!(f, "upload"),
            Mode::Camera => write!(f, "camera"),
        }
    }
}

/// Monotonically increasing id assigned to each dispatched request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestId(u64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The outbound call a dispatch asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Scan(SelectedImage),
    Analyze(String),
}

impl Request {
    /// Perform the call. Exactly one network request, no retries.
    pub fn send(&self, api: &dyn ScanApi) -> Result<ScanReport> {
        match self {
            Request::Scan(image) => api.scan_image(image),
            Request::Analyze(payload) => api.analyze_payload(payload),
        }
    }
}

/// An accepted submission. The caller executes `request` and reports the
/// outcome back through `ScanClient::settle` with the same id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dispatch {
    pub id: RequestId,
    pub request: Request,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    Busy(RequestId),
    Settled(Result<ScanReport>),
}

#[derive(Debug, Default)]
pub struct ScanClient {
    mode: Mode,
    selected_file: Option<SelectedImage>,
    // Why the last selection failed; replaces "select an image first".
    selection_error: Option<ScanError>,
    phase: Phase,
    camera_error: Option<CameraError>,
    last_id: u64,
}

impl ScanClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mode(mode: Mode) -> Self {
        ScanClient {
            mode,
            ..Self::default()
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn is_busy(&self) -> bool {
        matches!(self.phase, Phase::Busy(_))
    }

    /// Id of the outstanding request, if any.
    pub fn in_flight(&self) -> Option<RequestId> {
        match self.phase {
            Phase::Busy(id) => Some(id),
            _ => None,
        }
    }

    pub fn selected_file(&self) -> Option<&SelectedImage> {
        self.selected_file.as_ref()
    }

    /// The last successful report, if the last attempt succeeded.
    pub fn report(&self) -> Option<&ScanReport> {
        match &self.phase {
            Phase::Settled(Ok(report)) => Some(report),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&ScanError> {
        match &self.phase {
            Phase::Settled(Err(err)) => Some(err),
            _ => None,
        }
    }

    pub fn error_message(&self) -> Option<String> {
        self.error().map(ToString::to_string)
    }

    pub fn camera_error(&self) -> Option<&CameraError> {
        self.camera_error.as_ref()
    }

    pub fn camera_error_message(&self) -> Option<String> {
        self.camera_error.as_ref().map(ToString::to_string)
    }

    /// Store a new selection. Like any fresh input this drops the shown
    /// report or error, but an in-flight request keeps running.
    pub fn select_file(&mut self, image: SelectedImage) {
        self.selected_file = Some(image);
        self.selection_error = None;
        self.clear_result();
    }

    /// A selection that could not be loaded. Drops any previous selection
    /// and shows the validation error. While a request is outstanding the
    /// error is held back and shown by the next `submit_file` instead.
    pub fn fail_selection(&mut self, err: ScanError) {
        self.selected_file = None;
        if self.is_busy() {
            log::debug!("selection failed during request {:?}: {}", self.in_flight(), err);
        } else {
            self.phase = Phase::Settled(Err(err.clone()));
        }
        self.selection_error = Some(err);
    }

    /// Switch tabs. Clears report, error and the camera error slot; does
    /// not cancel an outstanding request, whose response still applies.
    pub fn switch_mode(&mut self, mode: Mode) {
        if self.mode != mode {
            log::debug!("mode {} -> {}", self.mode, mode);
        }
        self.mode = mode;
        self.camera_error = None;
        self.clear_result();
    }

    /// Upload the selected image. Ignored while busy; without a selection
    /// this settles to the reason the last selection failed, or "select an
    /// image first", and makes no call.
    pub fn submit_file(&mut self) -> Option<Dispatch> {
        if self.is_busy() {
            log::debug!("submit ignored, request {:?} outstanding", self.in_flight());
            return None;
        }
        let Some(image) = self.selected_file.clone() else {
            let err = self.selection_error.clone().unwrap_or(ScanError::NoFileSelected);
            self.phase = Phase::Settled(Err(err));
            return None;
        };
        Some(self.dispatch(Request::Scan(image)))
    }

    /// Analyze a camera-decoded payload. Ignored while busy, since the
    /// scanner emits detections faster than the round trip.
    pub fn submit_camera_payload(&mut self, text: &str) -> Option<Dispatch> {
        if self.is_busy() {
            log::trace!("detection ignored while busy");
            return None;
        }
        self.camera_error = None;
        Some(self.dispatch(Request::Analyze(text.to_string())))
    }

    /// Consume a batch of detections. Only the first entry is used.
    pub fn on_detections(&mut self, detections: &[Detection]) -> Option<Dispatch> {
        let first = detections.first()?;
        self.submit_camera_payload(&first.raw_value)
    }

    /// Record a camera failure in its own slot. Request state is untouched.
    pub fn on_camera_error(&mut self, err: CameraError) {
        log::warn!("{}", err);
        self.camera_error = Some(err);
    }

    /// Apply a completion. Returns false, leaving state unchanged, when the
    /// id is not the outstanding request (cancelled or superseded).
    pub fn settle(&mut self, id: RequestId, outcome: Result<ScanReport>) -> bool {
        if self.in_flight() != Some(id) {
            log::warn!("discarding stale response for request {}", id);
            return false;
        }
        match &outcome {
            Ok(report) => log::debug!("request {} settled: {}", id, report.status),
            Err(err) => log::debug!("request {} failed: {}", id, err),
        }
        self.phase = Phase::Settled(outcome);
        true
    }

    /// Give up on the outstanding request. Its response, if it ever
    /// arrives, will be discarded.
    pub fn cancel(&mut self) -> Option<RequestId> {
        let id = self.in_flight()?;
        log::debug!("request {} cancelled", id);
        self.phase = Phase::Idle;
        Some(id)
    }

    /// Execute a dispatch on the current thread and settle it.
    pub fn run_blocking(&mut self, api: &dyn ScanApi, dispatch: Dispatch) -> &Phase {
        let outcome = dispatch.request.send(api);
        self.settle(dispatch.id, outcome);
        &self.phase
    }

    fn dispatch(&mut self, request: Request) -> Dispatch {
        self.last_id += 1;
        let id = RequestId(self.last_id);
        self.phase = Phase::Busy(id);
        log::debug!("dispatching request {}", id);
        Dispatch { id, request }
    }

    fn clear_result(&mut self) {
        if let Phase::Settled(_) = self.phase {
            self.phase = Phase::Idle;
        }
    }
}
