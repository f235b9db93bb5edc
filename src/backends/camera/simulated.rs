// SPDX-License-Identifier: GPL-3.0-only

//! Simulated camera platform
//!
//! In-process virtual cameras implementing the full asynchronous
//! [`CameraPlatform`] contract. Completion timing is selectable:
//!
//! - [`Delivery::Immediate`]: completions are posted from the calling thread
//!   before `open`/`create_capture_session` return
//! - [`Delivery::Delayed`]: completions are posted from a helper thread after
//!   a fixed delay, like real hardware
//! - [`Delivery::Manual`]: completions queue up until
//!   [`SimulatedPlatform::complete_pending`] is called
//!
//! Faults can be injected per device: failing characteristics queries,
//! rejected capture sessions, asynchronous errors and disconnects.

use super::CameraPlatform;
use super::types::*;
use crate::config::SimulatedConfig;
use crate::session::events::{DeviceEvent, EventSender};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// One virtual camera
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulatedDevice {
    pub id: DeviceId,
    #[serde(default)]
    pub facing: Option<LensFacing>,
    /// Supported preview sizes in platform order; `None` = no stream configuration
    #[serde(default)]
    pub sizes: Option<Vec<Resolution>>,
    /// Characteristics queries fail for this device
    #[serde(default)]
    pub fail_query: bool,
    /// Capture session setup is rejected for this device
    #[serde(default)]
    pub reject_configure: bool,
}

impl SimulatedDevice {
    pub fn new(id: &str, facing: LensFacing, sizes: &[Resolution]) -> Self {
        Self {
            id: DeviceId::from(id),
            facing: Some(facing),
            sizes: Some(sizes.to_vec()),
            fail_query: false,
            reject_configure: false,
        }
    }

    /// Device without any stream configuration
    pub fn without_sizes(mut self) -> Self {
        self.sizes = None;
        self
    }

    pub fn failing_query(mut self) -> Self {
        self.fail_query = true;
        self
    }

    pub fn rejecting_configure(mut self) -> Self {
        self.reject_configure = true;
        self
    }
}

/// When asynchronous completions are delivered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Delivery {
    Immediate,
    Delayed { open_ms: u64, configure_ms: u64 },
    Manual,
}

impl Default for Delivery {
    fn default() -> Self {
        Delivery::Delayed {
            open_ms: crate::constants::simulated::OPEN_DELAY_MS,
            configure_ms: crate::constants::simulated::CONFIGURE_DELAY_MS,
        }
    }
}

/// Queued completion (manual delivery)
enum Pending {
    Open {
        id: DeviceId,
        events: EventSender,
    },
    Configure {
        handle: DeviceHandle,
        config: CaptureConfig,
        events: EventSender,
    },
}

struct SimSession {
    device: DeviceHandle,
    size: Resolution,
    sequence: u64,
}

#[derive(Default)]
struct SimState {
    next_token: u64,
    /// Open device id -> handle token
    open_devices: HashMap<DeviceId, u64>,
    /// Capture session token -> session
    sessions: HashMap<u64, SimSession>,
    /// Sender of the current opener, used for fault injection
    listeners: HashMap<DeviceId, EventSender>,
    pending: VecDeque<Pending>,
    open_calls: Vec<DeviceId>,
    close_calls: Vec<DeviceId>,
}

impl SimState {
    fn mint_token(&mut self) -> u64 {
        self.next_token += 1;
        self.next_token
    }
}

/// Shared core, cloned into delayed-delivery helper threads
struct SimCore {
    devices: Vec<SimulatedDevice>,
    state: Mutex<SimState>,
}

impl SimCore {
    fn lock(&self) -> MutexGuard<'_, SimState> {
        // A panicking test thread must not wedge every other session
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn device(&self, id: &DeviceId) -> Option<&SimulatedDevice> {
        self.devices.iter().find(|d| &d.id == id)
    }

    fn complete_open(&self, id: DeviceId, events: EventSender) {
        if self.device(&id).is_none() {
            warn!(device = %id, "Open requested for unknown simulated camera");
            events.send(DeviceEvent::Error(error_codes::ERROR_CAMERA_DEVICE));
            return;
        }

        let mut state = self.lock();
        if state.open_devices.contains_key(&id) {
            drop(state);
            debug!(device = %id, "Simulated camera already open");
            events.send(DeviceEvent::Error(error_codes::ERROR_CAMERA_IN_USE));
            return;
        }

        let token = state.mint_token();
        state.open_devices.insert(id.clone(), token);
        state.listeners.insert(id.clone(), events.clone());
        drop(state);

        debug!(device = %id, token, "Simulated camera opened");
        events.send(DeviceEvent::Opened(DeviceHandle {
            device_id: id,
            token,
        }));
    }

    fn complete_configure(&self, handle: DeviceHandle, config: CaptureConfig, events: EventSender) {
        let rejected = self
            .device(&handle.device_id)
            .map(|d| d.reject_configure)
            .unwrap_or(true);

        let mut state = self.lock();
        let is_open = state.open_devices.get(&handle.device_id) == Some(&handle.token);
        if rejected || !is_open {
            drop(state);
            debug!(device = %handle.device_id, rejected, is_open, "Simulated capture session rejected");
            events.send(DeviceEvent::ConfigureFailed);
            return;
        }

        let token = state.mint_token();
        state.sessions.insert(
            token,
            SimSession {
                device: handle.clone(),
                size: config.size,
                sequence: 0,
            },
        );
        drop(state);

        debug!(device = %handle.device_id, token, size = %config.size, "Simulated capture session configured");
        events.send(DeviceEvent::Configured(CaptureSessionHandle {
            device_id: handle.device_id,
            token,
        }));
    }

    fn complete(&self, pending: Pending) {
        match pending {
            Pending::Open { id, events } => self.complete_open(id, events),
            Pending::Configure {
                handle,
                config,
                events,
            } => self.complete_configure(handle, config, events),
        }
    }
}

/// Simulated platform implementation
pub struct SimulatedPlatform {
    core: Arc<SimCore>,
    delivery: Delivery,
    frame_interval: Duration,
}

impl SimulatedPlatform {
    pub fn new(devices: Vec<SimulatedDevice>, delivery: Delivery) -> Self {
        info!(count = devices.len(), ?delivery, "Creating simulated camera platform");
        Self {
            core: Arc::new(SimCore {
                devices,
                state: Mutex::new(SimState::default()),
            }),
            delivery,
            frame_interval: Duration::from_millis(crate::constants::simulated::FRAME_INTERVAL_MS),
        }
    }

    pub fn from_config(config: &SimulatedConfig) -> Self {
        Self::new(config.devices.clone(), config.delivery)
            .with_frame_interval(Duration::from_millis(config.frame_interval_ms))
    }

    pub fn with_frame_interval(mut self, interval: Duration) -> Self {
        self.frame_interval = interval;
        self
    }

    fn dispatch(&self, pending: Pending, delay_ms: impl FnOnce(&Delivery) -> u64) {
        match self.delivery {
            Delivery::Immediate => self.core.complete(pending),
            Delivery::Delayed { .. } => {
                let delay = Duration::from_millis(delay_ms(&self.delivery));
                let core = Arc::clone(&self.core);
                thread::spawn(move || {
                    thread::sleep(delay);
                    core.complete(pending);
                });
            }
            Delivery::Manual => self.core.lock().pending.push_back(pending),
        }
    }

    /// Deliver all queued completions in call order (manual delivery)
    ///
    /// Returns the number of completions delivered.
    pub fn complete_pending(&self) -> usize {
        let pending: Vec<Pending> = self.core.lock().pending.drain(..).collect();
        let count = pending.len();
        for item in pending {
            self.core.complete(item);
        }
        count
    }

    /// Number of queued completions (manual delivery)
    pub fn pending_count(&self) -> usize {
        self.core.lock().pending.len()
    }

    /// Post an asynchronous device error to the current opener of `id`
    pub fn inject_error(&self, id: &DeviceId, code: i32) -> bool {
        self.notify(id, DeviceEvent::Error(code))
    }

    /// Post a disconnect to the current opener of `id`
    pub fn disconnect(&self, id: &DeviceId) -> bool {
        self.notify(id, DeviceEvent::Disconnected)
    }

    fn notify(&self, id: &DeviceId, event: DeviceEvent) -> bool {
        let listener = self.core.lock().listeners.get(id).cloned();
        match listener {
            Some(events) => {
                info!(device = %id, event = event.name(), "Injecting simulated device event");
                events.send(event);
                true
            }
            None => {
                warn!(device = %id, "No opener to notify");
                false
            }
        }
    }

    /// Device ids passed to `open`, in call order
    pub fn open_calls(&self) -> Vec<DeviceId> {
        self.core.lock().open_calls.clone()
    }

    /// Device ids passed to `close`, in call order
    pub fn close_calls(&self) -> Vec<DeviceId> {
        self.core.lock().close_calls.clone()
    }

    pub fn is_open(&self, id: &DeviceId) -> bool {
        self.core.lock().open_devices.contains_key(id)
    }

    /// Number of live capture sessions
    pub fn active_sessions(&self) -> usize {
        self.core.lock().sessions.len()
    }
}

impl CameraPlatform for SimulatedPlatform {
    fn platform_type(&self) -> PlatformType {
        PlatformType::Simulated
    }

    fn device_ids(&self) -> BackendResult<Vec<DeviceId>> {
        Ok(self.core.devices.iter().map(|d| d.id.clone()).collect())
    }

    fn characteristics(&self, id: &DeviceId) -> BackendResult<DeviceCharacteristics> {
        let device = self
            .core
            .device(id)
            .ok_or_else(|| BackendError::DeviceNotFound(id.to_string()))?;

        if device.fail_query {
            return Err(BackendError::QueryFailed(format!(
                "simulated query failure for camera {}",
                id
            )));
        }

        Ok(DeviceCharacteristics {
            facing: device.facing,
            output_sizes: device.sizes.clone(),
        })
    }

    fn open(&self, id: &DeviceId, events: EventSender) {
        debug!(device = %id, session = %events.session(), "Simulated open requested");
        self.core.lock().open_calls.push(id.clone());
        self.dispatch(
            Pending::Open {
                id: id.clone(),
                events,
            },
            |delivery| match delivery {
                Delivery::Delayed { open_ms, .. } => *open_ms,
                _ => 0,
            },
        );
    }

    fn create_capture_session(
        &self,
        device: &DeviceHandle,
        config: CaptureConfig,
        events: EventSender,
    ) {
        debug!(device = %device.device_id, size = %config.size, "Simulated capture session requested");
        self.dispatch(
            Pending::Configure {
                handle: device.clone(),
                config,
                events,
            },
            |delivery| match delivery {
                Delivery::Delayed { configure_ms, .. } => *configure_ms,
                _ => 0,
            },
        );
    }

    fn capture_next(
        &self,
        session: &CaptureSessionHandle,
        request: &CaptureRequest,
    ) -> BackendResult<PreviewFrame> {
        thread::sleep(self.frame_interval);

        let (size, sequence) = {
            let mut state = self.core.lock();
            let sim = state
                .sessions
                .get_mut(&session.token)
                .filter(|s| s.device.device_id == session.device_id)
                .ok_or_else(|| {
                    BackendError::InvalidHandle(format!(
                        "capture session {} on camera {}",
                        session.token, session.device_id
                    ))
                })?;
            sim.sequence += 1;
            (sim.size, sim.sequence)
        };

        if size != request.size {
            return Err(BackendError::CaptureFailed(format!(
                "request size {} does not match session size {}",
                request.size, size
            )));
        }

        // Flat luma that changes every frame so consumers can see motion
        let format = PixelFormat::YUYV;
        let len = format.frame_len(size).unwrap_or_default();
        let data: Arc<[u8]> = vec![(sequence % 256) as u8; len].into();

        Ok(PreviewFrame {
            width: size.width,
            height: size.height,
            format,
            data,
            sequence,
            captured_at: Instant::now(),
        })
    }

    fn close(&self, device: DeviceHandle) {
        let mut state = self.core.lock();
        state.close_calls.push(device.device_id.clone());

        if state.open_devices.get(&device.device_id) != Some(&device.token) {
            debug!(device = %device.device_id, token = device.token, "Close for stale handle ignored");
            return;
        }

        state.open_devices.remove(&device.device_id);
        state.listeners.remove(&device.device_id);
        state.sessions.retain(|_, s| s.device != device);
        debug!(device = %device.device_id, "Simulated camera closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::events::{ControlMessage, SessionId};
    use tokio::sync::mpsc;

    fn device_event(message: ControlMessage) -> DeviceEvent {
        match message {
            ControlMessage::Device { event, .. } => event,
            other => panic!("unexpected message {:?}", other),
        }
    }

    fn platform(delivery: Delivery) -> SimulatedPlatform {
        SimulatedPlatform::new(
            vec![
                SimulatedDevice::new("0", LensFacing::Back, &[Resolution::new(640, 480)]),
                SimulatedDevice::new("102", LensFacing::External, &[Resolution::new(320, 240)])
                    .rejecting_configure(),
            ],
            delivery,
        )
        .with_frame_interval(Duration::ZERO)
    }

    #[test]
    fn test_second_open_reports_in_use() {
        let platform = platform(Delivery::Immediate);
        let (tx, mut rx) = mpsc::unbounded_channel();

        platform.open(&"0".into(), EventSender::new(SessionId(1), tx.clone()));
        platform.open(&"0".into(), EventSender::new(SessionId(2), tx));

        assert!(matches!(
            device_event(rx.try_recv().unwrap()),
            DeviceEvent::Opened(_)
        ));
        assert_eq!(
            device_event(rx.try_recv().unwrap()),
            DeviceEvent::Error(error_codes::ERROR_CAMERA_IN_USE)
        );
    }

    #[test]
    fn test_manual_delivery_queues_until_completed() {
        let platform = platform(Delivery::Manual);
        let (tx, mut rx) = mpsc::unbounded_channel();

        platform.open(&"0".into(), EventSender::new(SessionId(1), tx));
        assert!(rx.try_recv().is_err());
        assert_eq!(platform.pending_count(), 1);

        assert_eq!(platform.complete_pending(), 1);
        assert!(matches!(
            device_event(rx.try_recv().unwrap()),
            DeviceEvent::Opened(_)
        ));
    }

    #[test]
    fn test_capture_and_close() {
        let platform = platform(Delivery::Immediate);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let events = EventSender::new(SessionId(1), tx);

        platform.open(&"0".into(), events.clone());
        let DeviceEvent::Opened(handle) = device_event(rx.try_recv().unwrap()) else {
            panic!("expected open");
        };

        let size = Resolution::new(640, 480);
        let config = CaptureConfig {
            target: "t1".into(),
            size,
        };
        platform.create_capture_session(&handle, config, events);
        let DeviceEvent::Configured(session) = device_event(rx.try_recv().unwrap()) else {
            panic!("expected configured");
        };

        let request = CaptureRequest {
            template: RequestTemplate::Preview,
            target: "t1".into(),
            size,
        };
        let first = platform.capture_next(&session, &request).unwrap();
        let second = platform.capture_next(&session, &request).unwrap();
        assert_eq!(first.data.len(), 640 * 480 * 2);
        assert_eq!(second.sequence, first.sequence + 1);

        platform.close(handle);
        assert!(!platform.is_open(&"0".into()));
        assert_eq!(platform.active_sessions(), 0);
        assert!(matches!(
            platform.capture_next(&session, &request),
            Err(BackendError::InvalidHandle(_))
        ));
    }

    #[test]
    fn test_rejected_configure() {
        let platform = platform(Delivery::Immediate);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let events = EventSender::new(SessionId(1), tx);

        platform.open(&"102".into(), events.clone());
        let DeviceEvent::Opened(handle) = device_event(rx.try_recv().unwrap()) else {
            panic!("expected open");
        };
        platform.create_capture_session(
            &handle,
            CaptureConfig {
                target: "t2".into(),
                size: Resolution::new(320, 240),
            },
            events,
        );
        assert_eq!(
            device_event(rx.try_recv().unwrap()),
            DeviceEvent::ConfigureFailed
        );
    }

    #[test]
    fn test_fault_injection_requires_opener() {
        let platform = platform(Delivery::Immediate);
        assert!(!platform.inject_error(&"0".into(), 1));

        let (tx, mut rx) = mpsc::unbounded_channel();
        platform.open(&"0".into(), EventSender::new(SessionId(3), tx));
        let _ = rx.try_recv();

        assert!(platform.disconnect(&"0".into()));
        assert_eq!(
            device_event(rx.try_recv().unwrap()),
            DeviceEvent::Disconnected
        );
    }
}
