// SPDX-License-Identifier: GPL-3.0-only

//! Camera sessions
//!
//! - [`registry`]: device enumeration and built-in/external classification
//! - [`resolver`]: preview size selection
//! - [`pairing`]: device-to-target pairing policies
//! - [`controller`]: per-device open → configure → stream state machine
//! - [`orchestrator`]: launches one controller per pair and runs the control loop
//! - [`events`]: messages posted to the control loop

pub mod controller;
pub mod events;
pub mod orchestrator;
pub mod pairing;
pub mod registry;
pub mod resolver;

pub use controller::{DeviceSessionController, OpenOutcome, SessionState};
pub use events::{ControlMessage, DeviceEvent, EventSender, SessionId};
pub use orchestrator::{Orchestrator, Pairing};
pub use pairing::PairingPolicy;
pub use registry::{Device, DeviceClass, DeviceRegistry};
pub use resolver::{resolve_preview_size, select_preview_size};
