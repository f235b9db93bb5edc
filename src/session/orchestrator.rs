// SPDX-License-Identifier: GPL-3.0-only

//! Multi-device orchestration
//!
//! Pairs enumerated devices with render targets, launches one
//! [`DeviceSessionController`] per pair and owns the single control loop
//! through which every asynchronous notification is delivered. Sessions
//! never talk to each other; a failure in one is invisible to the rest.

use super::controller::{DeviceSessionController, OpenOutcome, SessionState};
use super::events::{ControlMessage, DeviceEvent, EventSender, SessionId};
use super::pairing::PairingPolicy;
use super::registry::{Device, DeviceRegistry};
use crate::backends::camera::CameraPlatform;
use crate::backends::camera::types::DeviceId;
use crate::backends::permission::PermissionProvider;
use crate::constants::{LOG_TARGET, MIN_DEVICES};
use crate::errors::SessionError;
use crate::render::gate::{BindOutcome, RenderTargetGate};
use crate::render::target::RenderTarget;
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, error, info, warn};

/// Device chosen for a render target at start
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pairing {
    pub session: SessionId,
    pub device: DeviceId,
    pub target: String,
}

pub struct Orchestrator {
    platform: Arc<dyn CameraPlatform>,
    permissions: Arc<dyn PermissionProvider>,
    policy: PairingPolicy,
    gate: RenderTargetGate,
    tx: UnboundedSender<ControlMessage>,
    rx: UnboundedReceiver<ControlMessage>,
    sessions: BTreeMap<SessionId, DeviceSessionController>,
    pairings: Vec<Pairing>,
    external: Option<DeviceId>,
    started: bool,
}

impl Orchestrator {
    pub fn new(
        platform: Arc<dyn CameraPlatform>,
        permissions: Arc<dyn PermissionProvider>,
        policy: PairingPolicy,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            platform,
            permissions,
            policy,
            gate: RenderTargetGate::new(),
            tx,
            rx,
            sessions: BTreeMap::new(),
            pairings: Vec::new(),
            external: None,
            started: false,
        }
    }

    /// Enumerate through `registry`, look up the external camera, then
    /// [`start`](Self::start)
    pub fn launch(&mut self, registry: &DeviceRegistry, targets: Vec<Arc<dyn RenderTarget>>) -> usize {
        let devices = registry.enumerate();
        self.external = DeviceRegistry::find_external(&devices).map(|d| d.id.clone());
        self.start(&devices, targets)
    }

    /// Pair devices with targets and launch one session per pair
    ///
    /// Returns the number of sessions launched. Each session opens its
    /// device once its target is ready; opens do not wait on each other.
    /// Only the first call has any effect.
    pub fn start(&mut self, devices: &[Device], targets: Vec<Arc<dyn RenderTarget>>) -> usize {
        if self.started {
            warn!(target: LOG_TARGET, "Orchestrator already started");
            return 0;
        }
        self.started = true;

        if devices.len() < MIN_DEVICES {
            error!(
                target: LOG_TARGET,
                found = devices.len(),
                required = MIN_DEVICES,
                "Not enough cameras for concurrent preview"
            );
            return 0;
        }

        let selected = self.policy.select(devices, targets.len());
        if selected.len() < targets.len() {
            warn!(
                target: LOG_TARGET,
                cameras = selected.len(),
                targets = targets.len(),
                "Fewer cameras than render targets, extra targets stay empty"
            );
        }

        for (index, (device, target)) in selected.into_iter().zip(targets).enumerate() {
            let id = SessionId(index as u32);
            let events = EventSender::new(id, self.tx.clone());

            self.pairings.push(Pairing {
                session: id,
                device: device.id.clone(),
                target: target.id().to_string(),
            });
            info!(target: LOG_TARGET, session = %id, device = %device.id, class = %device.class, render_target = target.id(), "Pairing camera with render target");

            let controller = DeviceSessionController::new(
                id,
                device,
                Arc::clone(&target),
                Arc::clone(&self.platform),
                events.clone(),
            );
            self.sessions.insert(id, controller);

            let outcome = self.gate.bind(&target, move || events.target_ready());
            debug!(session = %id, ?outcome, "Render target bound");
            if outcome == BindOutcome::AlreadyPending {
                warn!(session = %id, render_target = target.id(), "Render target shared by several sessions");
            }
        }

        self.sessions.len()
    }

    /// Apply one control message
    pub fn dispatch(&mut self, message: ControlMessage) {
        let session = message.session();
        let Some(controller) = self.sessions.get_mut(&session) else {
            debug!(session = %session, "Message for unknown session dropped");
            return;
        };

        match message {
            ControlMessage::TargetReady(_) => match controller.open(&*self.permissions) {
                OpenOutcome::Opening => {}
                OpenOutcome::PermissionMissing => {
                    let error = controller
                        .last_error()
                        .cloned()
                        .unwrap_or(SessionError::PermissionMissing);
                    warn!(target: LOG_TARGET, session = %session, device = %controller.device().id, error = %error, "Session stays idle");
                }
                OpenOutcome::AlreadyStarted => {
                    debug!(session = %session, "Target ready again, session already started");
                }
            },
            ControlMessage::Device { event, .. } => controller.handle_event(event),
        }
    }

    /// Drain every queued message without waiting
    ///
    /// Returns the number of messages processed.
    pub fn process_pending(&mut self) -> usize {
        let mut processed = 0;
        while let Ok(message) = self.rx.try_recv() {
            self.dispatch(message);
            processed += 1;
        }
        processed
    }

    /// Run the control loop until `shutdown` completes
    pub async fn run_until<F>(&mut self, shutdown: F)
    where
        F: Future,
    {
        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    debug!("Control loop shutdown requested");
                    break;
                }
                message = self.rx.recv() => match message {
                    Some(message) => self.dispatch(message),
                    None => break,
                },
            }
        }
    }

    /// Release every session
    ///
    /// All capture workers are signalled first so their in-flight
    /// iterations finish concurrently.
    pub fn shutdown(&mut self) {
        info!(target: LOG_TARGET, sessions = self.sessions.len(), "Shutting down sessions");
        for controller in self.sessions.values() {
            controller.request_stop();
        }
        for controller in self.sessions.values_mut() {
            controller.shutdown();
        }
    }

    /// Post a device notification as if it came from the platform
    pub fn post(&self, session: SessionId, event: DeviceEvent) {
        EventSender::new(session, self.tx.clone()).send(event);
    }

    pub fn session_states(&self) -> Vec<(SessionId, SessionState)> {
        self.sessions
            .iter()
            .map(|(id, controller)| (*id, controller.state()))
            .collect()
    }

    pub fn pairings(&self) -> &[Pairing] {
        &self.pairings
    }

    /// External camera found by [`launch`](Self::launch), if any
    pub fn external_device(&self) -> Option<&DeviceId> {
        self.external.as_ref()
    }

    pub fn session(&self, id: SessionId) -> Option<&DeviceSessionController> {
        self.sessions.get(&id)
    }

    /// Session driving the given device, if any
    pub fn session_for_device(&self, device: &DeviceId) -> Option<&DeviceSessionController> {
        self.sessions.values().find(|c| &c.device().id == device)
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }
}

impl Drop for Orchestrator {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::camera::types::{LensFacing, Resolution};
    use crate::backends::camera::{Delivery, SimulatedDevice, SimulatedPlatform};
    use crate::backends::permission::StaticPermission;
    use crate::render::surface::PreviewSurface;
    use std::time::Duration;

    const VGA: Resolution = Resolution::new(640, 480);

    fn platform(ids: &[&str]) -> Arc<SimulatedPlatform> {
        let devices = ids
            .iter()
            .map(|id| SimulatedDevice::new(id, LensFacing::Back, &[VGA]))
            .collect();
        Arc::new(
            SimulatedPlatform::new(devices, Delivery::Immediate)
                .with_frame_interval(Duration::from_millis(1)),
        )
    }

    fn targets(n: usize) -> Vec<Arc<dyn RenderTarget>> {
        (0..n)
            .map(|i| Arc::new(PreviewSurface::ready(format!("t{}", i + 1), VGA)) as Arc<dyn RenderTarget>)
            .collect()
    }

    fn orchestrator(platform: &Arc<SimulatedPlatform>) -> Orchestrator {
        Orchestrator::new(
            platform.clone(),
            Arc::new(StaticPermission(true)),
            PairingPolicy::FirstEnumerated,
        )
    }

    #[test]
    fn test_second_start_rejected() {
        let platform = platform(&["0", "1"]);
        let mut orchestrator = orchestrator(&platform);
        let registry = DeviceRegistry::new(platform.clone());

        assert_eq!(orchestrator.launch(&registry, targets(2)), 2);
        assert_eq!(orchestrator.launch(&registry, targets(2)), 0);
        assert_eq!(orchestrator.session_count(), 2);
    }

    #[test]
    fn test_pairings_follow_policy() {
        let platform = platform(&["0", "1", "2"]);
        let mut orchestrator = orchestrator(&platform);
        let registry = DeviceRegistry::new(platform.clone());
        orchestrator.launch(&registry, targets(2));

        let pairs: Vec<(&str, &str)> = orchestrator
            .pairings()
            .iter()
            .map(|p| (p.device.as_str(), p.target.as_str()))
            .collect();
        assert_eq!(pairs, vec![("0", "t1"), ("1", "t2")]);
        assert_eq!(orchestrator.external_device(), None);
    }

    #[test]
    fn test_launch_finds_external_camera() {
        let platform = Arc::new(SimulatedPlatform::new(
            vec![
                SimulatedDevice::new("0", LensFacing::Back, &[VGA]),
                SimulatedDevice::new("102", LensFacing::External, &[VGA]),
            ],
            Delivery::Manual,
        ));
        let mut orchestrator = orchestrator(&platform);
        orchestrator.launch(&DeviceRegistry::new(platform.clone()), targets(2));
        assert_eq!(
            orchestrator.external_device(),
            Some(&DeviceId::from("102"))
        );
    }

    #[test]
    fn test_unknown_session_message_is_dropped() {
        let platform = platform(&["0", "1"]);
        let mut orchestrator = orchestrator(&platform);
        orchestrator.post(SessionId(42), DeviceEvent::Disconnected);
        assert_eq!(orchestrator.process_pending(), 1);
        assert_eq!(orchestrator.session_count(), 0);
    }

    #[tokio::test]
    async fn test_run_until_reaches_streaming() {
        let platform = platform(&["0", "1"]);
        let mut orchestrator = orchestrator(&platform);
        let registry = DeviceRegistry::new(platform.clone());
        orchestrator.launch(&registry, targets(2));

        orchestrator
            .run_until(tokio::time::sleep(Duration::from_millis(100)))
            .await;

        assert!(
            orchestrator
                .session_states()
                .iter()
                .all(|(_, state)| *state == SessionState::Streaming)
        );

        orchestrator.shutdown();
        assert!(
            orchestrator
                .session_states()
                .iter()
                .all(|(_, state)| *state == SessionState::Closed)
        );
        assert_eq!(platform.active_sessions(), 0);
    }
}
