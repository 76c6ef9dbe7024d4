// Session loop: the single owner of `ScanClient`.
//
// Camera readers and request workers run on their own threads and post
// `Event`s into one channel; the loop applies them one at a time, so no
// two transitions ever run concurrently and the state needs no locking.

use crate::api::ScanApi;
use crate::camera::CameraEvent;
use crate::error::{Result, ScanError};
use crate::image::SelectedImage;
use crate::report::ScanReport;
use crate::state::{Dispatch, Mode, Phase, RequestId, ScanClient};
use async_channel::{Receiver, Sender};
use std::sync::Arc;
use std::thread;

#[derive(Debug)]
pub enum Event {
    Camera(CameraEvent),
    Settled {
        id: RequestId,
        outcome: Result<ScanReport>,
    },
}

impl From<CameraEvent> for Event {
    fn from(event: CameraEvent) -> Self {
        Event::Camera(event)
    }
}

pub struct Session {
    api: Arc<dyn ScanApi>,
    client: ScanClient,
    tx: Sender<Event>,
    rx: Receiver<Event>,
    camera_closed: bool,
}

impl Session {
    pub fn new(api: Arc<dyn ScanApi>, mode: Mode) -> Self {
        let (tx, rx) = async_channel::unbounded();
        Session {
            api,
            client: ScanClient::with_mode(mode),
            tx,
            rx,
            camera_closed: false,
        }
    }

    /// Sender for camera sources to post into.
    pub fn sender(&self) -> Sender<Event> {
        self.tx.clone()
    }

    pub fn client(&self) -> &ScanClient {
        &self.client
    }

    pub fn select_file(&mut self, image: SelectedImage) {
        self.client.select_file(image);
    }

    pub fn fail_selection(&mut self, err: ScanError) {
        self.client.fail_selection(err);
    }

    pub fn switch_mode(&mut self, mode: Mode) {
        self.client.switch_mode(mode);
        self.camera_closed = false;
    }

    /// Start an upload of the selected file. Returns whether a request
    /// was actually dispatched.
    pub fn submit_file(&mut self) -> bool {
        let dispatch = self.client.submit_file();
        self.start(dispatch)
    }

    pub fn submit_camera_payload(&mut self, text: &str) -> bool {
        let dispatch = self.client.submit_camera_payload(text);
        self.start(dispatch)
    }

    pub fn cancel(&mut self) -> Option<RequestId> {
        self.client.cancel()
    }

    /// Apply one event. Returns true when it changed the request phase.
    pub fn handle(&mut self, event: Event) -> bool {
        match event {
            Event::Camera(CameraEvent::Detected(batch)) => {
                let dispatch = self.client.on_detections(&batch);
                self.start(dispatch)
            }
            Event::Camera(CameraEvent::Error(err)) => {
                self.client.on_camera_error(err);
                false
            }
            Event::Camera(CameraEvent::Closed) => {
                log::debug!("camera source closed");
                self.camera_closed = true;
                false
            }
            Event::Settled { id, outcome } => self.client.settle(id, outcome),
        }
    }

    /// Process events until a request settles, or until nothing can make
    /// progress (upload mode or a closed camera, with no request in flight).
    pub fn run_until_settled(&mut self) -> &ScanClient {
        self.run_until_settled_with(|_| {})
    }

    /// Like `run_until_settled`, calling `observe` after every event.
    pub fn run_until_settled_with<F>(&mut self, mut observe: F) -> &ScanClient
    where
        F: FnMut(&ScanClient),
    {
        loop {
            if matches!(self.client.phase(), Phase::Settled(_)) {
                break;
            }
            let idle_source = self.camera_closed || self.client.mode() == Mode::Upload;
            if idle_source && !self.client.is_busy() {
                break;
            }
            let Ok(event) = self.rx.recv_blocking() else {
                break;
            };
            self.handle(event);
            observe(&self.client);
        }
        &self.client
    }

    /// Apply completions that are already queued, without blocking.
    /// Leftover camera events from a stopped scanner are dropped.
    pub fn drain(&mut self) {
        while let Ok(event) = self.rx.try_recv() {
            if let Event::Settled { .. } = event {
                self.handle(event);
            }
        }
    }

    fn start(&self, dispatch: Option<Dispatch>) -> bool {
        let Some(dispatch) = dispatch else {
            return false;
        };
        let api = Arc::clone(&self.api);
        let tx = self.tx.clone();
        thread::spawn(move || {
            let outcome = dispatch.request.send(api.as_ref());
            let _ = tx.send_blocking(Event::Settled {
                id: dispatch.id,
                outcome,
            });
        });
        true
    }
}
