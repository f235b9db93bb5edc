// SPDX-License-Identifier: GPL-3.0-only

//! Per-device session state machine
//!
//! ```text
//! Idle ──open()──▶ Opening ──Opened──▶ Configuring ──Configured──▶ Streaming
//!                     │                     │                          │
//!                     └─────────────────────┴── Disconnected ──▶ Closed ◀┘
//!                     └── Error(code) / ConfigureFailed / no sizes ──▶ Error
//! ```
//!
//! The controller owns one device handle and, while streaming, one
//! [`CaptureWorker`]. Both are released on every exit path: the worker is
//! stopped first, then the device handle is closed.

use super::events::{DeviceEvent, EventSender, SessionId};
use super::registry::Device;
use super::resolver::resolve_preview_size;
use crate::backends::camera::CameraPlatform;
use crate::backends::camera::frame_loop::{CaptureWorker, LoopAction};
use crate::backends::camera::types::{
    BackendError, CaptureConfig, CaptureRequest, CaptureSessionHandle, DeviceHandle,
    RequestTemplate, Resolution,
};
use crate::backends::permission::{Capability, PermissionProvider};
use crate::constants::{
    CAPTURE_ERROR_LOG_INTERVAL, CAPTURE_RETRY_BACKOFF, LOG_TARGET, WORKER_NAME_PREFIX,
};
use crate::errors::SessionError;
use crate::render::target::RenderTarget;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use tracing::{debug, error, info, warn};

/// Session life-cycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    Idle,
    Opening,
    Configuring,
    Streaming,
    Error,
    Closed,
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Error | SessionState::Closed)
    }

    fn rank(&self) -> u8 {
        match self {
            SessionState::Idle => 0,
            SessionState::Opening => 1,
            SessionState::Configuring => 2,
            SessionState::Streaming => 3,
            SessionState::Error | SessionState::Closed => 4,
        }
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SessionState::Idle => "idle",
            SessionState::Opening => "opening",
            SessionState::Configuring => "configuring",
            SessionState::Streaming => "streaming",
            SessionState::Error => "error",
            SessionState::Closed => "closed",
        };
        write!(f, "{}", name)
    }
}

/// Result of [`DeviceSessionController::open`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenOutcome {
    /// Open issued; completion arrives as a device event
    Opening,
    /// Camera capability not granted; the session stays idle
    PermissionMissing,
    /// The session already left `Idle`; nothing was done
    AlreadyStarted,
}

pub struct DeviceSessionController {
    id: SessionId,
    device: Device,
    target: Arc<dyn RenderTarget>,
    platform: Arc<dyn CameraPlatform>,
    events: EventSender,
    state: SessionState,
    resolution: Option<Resolution>,
    handle: Option<DeviceHandle>,
    capture_session: Option<CaptureSessionHandle>,
    worker: Option<CaptureWorker>,
    last_error: Option<SessionError>,
    frames: Arc<AtomicU64>,
}

impl DeviceSessionController {
    pub fn new(
        id: SessionId,
        device: Device,
        target: Arc<dyn RenderTarget>,
        platform: Arc<dyn CameraPlatform>,
        events: EventSender,
    ) -> Self {
        Self {
            id,
            device,
            target,
            platform,
            events,
            state: SessionState::Idle,
            resolution: None,
            handle: None,
            capture_session: None,
            worker: None,
            last_error: None,
            frames: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Request the device open
    ///
    /// Only acts from `Idle`. A missing camera permission is returned to the
    /// caller, which decides how to report it.
    pub fn open(&mut self, permissions: &dyn PermissionProvider) -> OpenOutcome {
        if self.state != SessionState::Idle {
            debug!(session = %self.id, state = %self.state, "Open ignored, session already started");
            return OpenOutcome::AlreadyStarted;
        }

        if !permissions.is_granted(Capability::Camera) {
            self.last_error = Some(SessionError::PermissionMissing);
            return OpenOutcome::PermissionMissing;
        }

        self.last_error = None;
        self.transition(SessionState::Opening);
        self.platform.open(&self.device.id, self.events.clone());
        OpenOutcome::Opening
    }

    /// Apply one platform notification
    pub fn handle_event(&mut self, event: DeviceEvent) {
        match (self.state, event) {
            (SessionState::Opening, DeviceEvent::Opened(handle)) => self.on_opened(handle),
            (_, DeviceEvent::Opened(handle)) => {
                // At most one handle per session; anything late or extra goes back
                debug!(session = %self.id, device = %handle.device_id, state = %self.state, "Closing surplus device handle");
                self.platform.close(handle);
            }
            (SessionState::Configuring, DeviceEvent::Configured(session)) => {
                self.on_configured(session)
            }
            (SessionState::Configuring, DeviceEvent::ConfigureFailed) => {
                self.fail(SessionError::ConfigureFailed {
                    device: self.device.id.clone(),
                })
            }
            (
                SessionState::Opening | SessionState::Configuring | SessionState::Streaming,
                DeviceEvent::Disconnected,
            ) => {
                info!(target: LOG_TARGET, session = %self.id, device = %self.device.id, "Camera disconnected");
                self.release();
                self.transition(SessionState::Closed);
            }
            (
                SessionState::Opening | SessionState::Configuring | SessionState::Streaming,
                DeviceEvent::Error(code),
            ) => self.fail(SessionError::DeviceError {
                device: self.device.id.clone(),
                code,
            }),
            (state, event) => {
                debug!(session = %self.id, state = %state, event = event.name(), "Ignoring device event");
            }
        }
    }

    /// Ask the capture worker to stop without waiting for it
    ///
    /// [`shutdown`](Self::shutdown) still joins the worker before closing
    /// the device.
    pub fn request_stop(&self) {
        if let Some(worker) = &self.worker {
            worker.request_stop();
        }
    }

    /// Release the worker and device handle; the session ends `Closed`
    /// unless it already reached a terminal state
    pub fn shutdown(&mut self) {
        self.release();
        if !self.state.is_terminal() {
            self.transition(SessionState::Closed);
        }
    }

    fn on_opened(&mut self, handle: DeviceHandle) {
        self.handle = Some(handle.clone());

        let size = match resolve_preview_size(&*self.platform, &self.device.id) {
            Ok(size) => size,
            Err(e) => {
                self.fail(e);
                return;
            }
        };

        self.resolution = Some(size);
        self.target.set_desired_buffer_size(size);

        let config = CaptureConfig {
            target: self.target.id().to_string(),
            size,
        };
        self.transition(SessionState::Configuring);
        self.platform
            .create_capture_session(&handle, config, self.events.clone());
    }

    fn on_configured(&mut self, session: CaptureSessionHandle) {
        let Some(size) = self.resolution else {
            self.fail(SessionError::Backend(BackendError::Other(
                "configured without a preview size".to_string(),
            )));
            return;
        };

        let request = CaptureRequest {
            template: RequestTemplate::Preview,
            target: self.target.id().to_string(),
            size,
        };
        let name = format!("{}-{}", WORKER_NAME_PREFIX, self.device.id);

        let platform = Arc::clone(&self.platform);
        let target = Arc::clone(&self.target);
        let frames = Arc::clone(&self.frames);
        let loop_session = session.clone();
        let mut failures: u64 = 0;

        let worker = CaptureWorker::start(&name, move || {
            match platform.capture_next(&loop_session, &request) {
                Ok(frame) => {
                    failures = 0;
                    frames.fetch_add(1, Ordering::Relaxed);
                    target.present(frame);
                }
                Err(e) => {
                    failures += 1;
                    if failures % CAPTURE_ERROR_LOG_INTERVAL == 1 {
                        warn!(device = %loop_session.device_id, failures, error = %e, "Capture request failed");
                    }
                    thread::sleep(CAPTURE_RETRY_BACKOFF);
                }
            }
            LoopAction::Continue
        });

        match worker {
            Ok(worker) => {
                self.worker = Some(worker);
                self.capture_session = Some(session);
                self.transition(SessionState::Streaming);
            }
            Err(e) => self.fail(SessionError::Backend(BackendError::IoError(format!(
                "failed to spawn capture worker: {}",
                e
            )))),
        }
    }

    fn fail(&mut self, err: SessionError) {
        error!(target: LOG_TARGET, session = %self.id, device = %self.device.id, state = %self.state, error = %err, "Session failed");
        self.last_error = Some(err);
        self.release();
        self.transition(SessionState::Error);
    }

    /// Stop the worker, then close the device
    fn release(&mut self) {
        if let Some(mut worker) = self.worker.take() {
            worker.stop();
        }
        self.capture_session = None;
        if let Some(handle) = self.handle.take() {
            debug!(session = %self.id, device = %handle.device_id, "Closing device");
            self.platform.close(handle);
        }
    }

    fn transition(&mut self, next: SessionState) {
        debug_assert!(
            next.rank() > self.state.rank(),
            "backward transition {} -> {}",
            self.state,
            next
        );
        info!(target: LOG_TARGET, session = %self.id, device = %self.device.id, from = %self.state, to = %next, "Session state changed");
        self.state = next;
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Chosen preview size, once the device opened
    pub fn resolution(&self) -> Option<Resolution> {
        self.resolution
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    pub fn target(&self) -> &Arc<dyn RenderTarget> {
        &self.target
    }

    pub fn last_error(&self) -> Option<&SessionError> {
        self.last_error.as_ref()
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// Frames presented by the repeating request so far
    pub fn frames_captured(&self) -> u64 {
        self.frames.load(Ordering::Relaxed)
    }

    /// A capture worker is currently owned
    pub fn has_worker(&self) -> bool {
        self.worker.is_some()
    }
}

impl Drop for DeviceSessionController {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for DeviceSessionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceSessionController")
            .field("id", &self.id)
            .field("device", &self.device.id)
            .field("target", &self.target.id())
            .field("state", &self.state)
            .field("resolution", &self.resolution)
            .finish()
    }
}
