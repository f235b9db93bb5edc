// SPDX-License-Identifier: GPL-3.0-only

//! Notifications delivered to the control loop
//!
//! Platforms and render targets complete work on their own threads. Every
//! completion is posted as a [`ControlMessage`] tagged with the owning
//! session and processed in order by the orchestrator's dispatch loop.

use crate::backends::camera::types::{CaptureSessionHandle, DeviceHandle};
use tokio::sync::mpsc::UnboundedSender;
use tracing::debug;

/// Identifier of a session within one orchestrator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(pub u32);

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "session-{}", self.0)
    }
}

/// Platform-originated device/session notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceEvent {
    /// The device finished opening
    Opened(DeviceHandle),
    /// The capture session is configured and ready for requests
    Configured(CaptureSessionHandle),
    /// The capture session setup was rejected
    ConfigureFailed,
    /// The device went away
    Disconnected,
    /// Fatal device fault with a platform error code
    Error(i32),
}

impl DeviceEvent {
    /// Short name for logging
    pub fn name(&self) -> &'static str {
        match self {
            DeviceEvent::Opened(_) => "opened",
            DeviceEvent::Configured(_) => "configured",
            DeviceEvent::ConfigureFailed => "configure-failed",
            DeviceEvent::Disconnected => "disconnected",
            DeviceEvent::Error(_) => "error",
        }
    }
}

/// Message processed by the control loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlMessage {
    /// The session's render target became usable
    TargetReady(SessionId),
    /// A platform notification for the session's device
    Device {
        session: SessionId,
        event: DeviceEvent,
    },
}

impl ControlMessage {
    pub fn session(&self) -> SessionId {
        match self {
            ControlMessage::TargetReady(session) => *session,
            ControlMessage::Device { session, .. } => *session,
        }
    }
}

/// Sender bound to one session
///
/// Handed to the platform with every asynchronous call; cheap to clone and
/// usable from any thread.
#[derive(Debug, Clone)]
pub struct EventSender {
    session: SessionId,
    tx: UnboundedSender<ControlMessage>,
}

impl EventSender {
    pub fn new(session: SessionId, tx: UnboundedSender<ControlMessage>) -> Self {
        Self { session, tx }
    }

    pub fn session(&self) -> SessionId {
        self.session
    }

    /// Post a device notification
    pub fn send(&self, event: DeviceEvent) {
        let name = event.name();
        let message = ControlMessage::Device {
            session: self.session,
            event,
        };
        if self.tx.send(message).is_err() {
            debug!(session = %self.session, event = name, "Control loop gone, dropping event");
        }
    }

    /// Post the render target readiness notification
    pub fn target_ready(&self) {
        if self
            .tx
            .send(ControlMessage::TargetReady(self.session))
            .is_err()
        {
            debug!(session = %self.session, "Control loop gone, dropping readiness");
        }
    }
}
