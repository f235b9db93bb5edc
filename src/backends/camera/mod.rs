// SPDX-License-Identifier: GPL-3.0-only

//! Camera platform abstraction
//!
//! The session layer talks to cameras only through the narrow asynchronous
//! [`CameraPlatform`] contract.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────┐
//! │    Orchestrator     │  ← Pairing, control loop
//! └──────────┬──────────┘
//!            │
//!            ▼
//! ┌─────────────────────┐
//! │ Session controllers │  ← One state machine per device
//! └──────────┬──────────┘
//!            │
//!            ▼
//! ┌─────────────────────┐
//! │ CameraPlatform Trait│  ← Common interface
//! └──────────┬──────────┘
//!            │
//!       ┌────┴─────┐
//!       ▼          ▼
//!  ┌─────────┐ ┌────────┐
//!  │Simulated│ │  V4L2  │  ← Concrete implementations
//!  └─────────┘ └────────┘
//! ```

pub mod frame_loop;
pub mod simulated;
pub mod types;
pub mod v4l2;
pub(crate) mod v4l2_utils;

pub use simulated::{Delivery, SimulatedDevice, SimulatedPlatform};
pub use types::*;
pub use v4l2::V4l2Platform;

use crate::config::Config;
use crate::session::events::EventSender;
use std::sync::Arc;

/// Camera platform contract
///
/// `open` and `create_capture_session` never block: they return immediately
/// and report completion later through the [`EventSender`]. Completions may
/// arrive on any thread.
pub trait CameraPlatform: Send + Sync {
    /// Platform type identifier
    fn platform_type(&self) -> PlatformType;

    // ===== Enumeration =====

    /// List device identifiers in platform order
    fn device_ids(&self) -> BackendResult<Vec<DeviceId>>;

    /// Query facing and supported preview sizes for one device
    fn characteristics(&self, id: &DeviceId) -> BackendResult<DeviceCharacteristics>;

    // ===== Lifecycle =====

    /// Start opening a device
    ///
    /// Reports `Opened`, `Disconnected` or `Error(code)` through `events`.
    fn open(&self, id: &DeviceId, events: EventSender);

    /// Start configuring a capture session on an opened device
    ///
    /// Reports `Configured` or `ConfigureFailed` through `events`.
    fn create_capture_session(
        &self,
        device: &DeviceHandle,
        config: CaptureConfig,
        events: EventSender,
    );

    /// Run one iteration of a repeating request
    ///
    /// Blocks until the next frame is available. Called only from the owning
    /// session's worker thread.
    fn capture_next(
        &self,
        session: &CaptureSessionHandle,
        request: &CaptureRequest,
    ) -> BackendResult<PreviewFrame>;

    /// Close an opened device, tearing down its capture sessions
    fn close(&self, device: DeviceHandle);
}

/// Create the platform selected in the configuration
pub fn get_platform(config: &Config) -> Arc<dyn CameraPlatform> {
    match config.backend {
        PlatformType::Simulated => Arc::new(SimulatedPlatform::from_config(&config.simulated)),
        PlatformType::V4l2 => Arc::new(V4l2Platform::new()),
    }
}
