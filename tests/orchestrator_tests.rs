// SPDX-License-Identifier: GPL-3.0-only

//! Integration tests for multi-camera orchestration
//!
//! Every scenario runs against the simulated platform with manual delivery,
//! so the test decides exactly when opens and configures complete.

use multicam::backends::camera::types::{DeviceId, LensFacing, Resolution, error_codes};
use multicam::backends::camera::{Delivery, SimulatedDevice, SimulatedPlatform};
use multicam::backends::permission::StaticPermission;
use multicam::errors::SessionError;
use multicam::render::{PreviewSurface, RenderTarget};
use multicam::session::{DeviceRegistry, Orchestrator, PairingPolicy, SessionState};
use std::sync::Arc;
use std::time::{Duration, Instant};

const FHD: Resolution = Resolution::new(1920, 1080);
const HD: Resolution = Resolution::new(1280, 720);
const VGA: Resolution = Resolution::new(640, 480);

struct Fixture {
    platform: Arc<SimulatedPlatform>,
    surfaces: Vec<Arc<PreviewSurface>>,
    orchestrator: Orchestrator,
}

impl Fixture {
    fn new(devices: Vec<SimulatedDevice>, surfaces: Vec<PreviewSurface>, granted: bool) -> Self {
        let platform = Arc::new(
            SimulatedPlatform::new(devices, Delivery::Manual)
                .with_frame_interval(Duration::from_millis(1)),
        );
        let orchestrator = Orchestrator::new(
            platform.clone(),
            Arc::new(StaticPermission(granted)),
            PairingPolicy::FirstEnumerated,
        );
        Self {
            platform,
            surfaces: surfaces.into_iter().map(Arc::new).collect(),
            orchestrator,
        }
    }

    fn launch(&mut self) -> usize {
        let registry = DeviceRegistry::new(self.platform.clone());
        let targets: Vec<Arc<dyn RenderTarget>> = self
            .surfaces
            .iter()
            .map(|s| s.clone() as Arc<dyn RenderTarget>)
            .collect();
        self.orchestrator.launch(&registry, targets)
    }

    /// Complete queued platform work, then drain the control loop
    fn step(&mut self) {
        self.platform.complete_pending();
        self.orchestrator.process_pending();
    }

    fn state_of(&self, id: &str) -> Option<SessionState> {
        self.orchestrator
            .session_for_device(&DeviceId::from(id))
            .map(|s| s.state())
    }
}

fn ready_targets() -> Vec<PreviewSurface> {
    vec![
        PreviewSurface::ready("T1", HD),
        PreviewSurface::ready("T2", HD),
    ]
}

fn builtin_and_external() -> Vec<SimulatedDevice> {
    vec![
        SimulatedDevice::new("0", LensFacing::Back, &[FHD, HD]),
        SimulatedDevice::new("102", LensFacing::External, &[VGA, HD]),
    ]
}

#[test]
fn test_two_devices_two_targets_two_sessions() {
    let mut fixture = Fixture::new(builtin_and_external(), ready_targets(), true);
    assert_eq!(fixture.launch(), 2);
    assert_eq!(fixture.orchestrator.session_count(), 2);
}

#[test]
fn test_fewer_than_two_devices_launches_nothing() {
    let mut fixture = Fixture::new(
        vec![SimulatedDevice::new("0", LensFacing::Back, &[HD])],
        ready_targets(),
        true,
    );
    assert_eq!(fixture.launch(), 0);
    fixture.step();
    assert!(fixture.platform.open_calls().is_empty());

    let mut fixture = Fixture::new(Vec::new(), ready_targets(), true);
    assert_eq!(fixture.launch(), 0);
}

#[test]
fn test_opens_are_issued_independently() {
    let mut fixture = Fixture::new(builtin_and_external(), ready_targets(), true);
    fixture.launch();

    // Both targets are ready: both opens go out before either completes
    fixture.orchestrator.process_pending();
    assert_eq!(
        fixture.platform.open_calls(),
        vec![DeviceId::from("0"), DeviceId::from("102")]
    );
    assert_eq!(fixture.state_of("0"), Some(SessionState::Opening));
    assert_eq!(fixture.state_of("102"), Some(SessionState::Opening));

    fixture.step();
    fixture.step();
    assert_eq!(fixture.state_of("0"), Some(SessionState::Streaming));
    assert_eq!(fixture.state_of("102"), Some(SessionState::Streaming));

    // Each target gets its own device's first size
    assert_eq!(fixture.surfaces[0].desired_buffer_size(), Some(FHD));
    assert_eq!(fixture.surfaces[1].desired_buffer_size(), Some(VGA));
}

#[test]
fn test_device_error_is_isolated() {
    let mut fixture = Fixture::new(builtin_and_external(), ready_targets(), true);
    fixture.launch();
    fixture.step();
    fixture.step();
    fixture.step();

    assert!(
        fixture
            .platform
            .inject_error(&DeviceId::from("102"), error_codes::ERROR_CAMERA_IN_USE)
    );
    fixture.orchestrator.process_pending();

    assert_eq!(fixture.state_of("102"), Some(SessionState::Error));
    assert_eq!(fixture.state_of("0"), Some(SessionState::Streaming));

    let failed = fixture
        .orchestrator
        .session_for_device(&DeviceId::from("102"))
        .unwrap();
    assert_eq!(
        failed.last_error(),
        Some(&SessionError::DeviceError {
            device: DeviceId::from("102"),
            code: error_codes::ERROR_CAMERA_IN_USE,
        })
    );
    assert!(!failed.has_worker());

    // The healthy session keeps producing frames
    let before = fixture.surfaces[0].frames_presented();
    let deadline = Instant::now() + Duration::from_secs(5);
    while fixture.surfaces[0].frames_presented() <= before && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(5));
    }
    assert!(fixture.surfaces[0].frames_presented() > before);
}

#[test]
fn test_configure_failure_is_isolated() {
    let devices = vec![
        SimulatedDevice::new("0", LensFacing::Back, &[HD]),
        SimulatedDevice::new("102", LensFacing::External, &[VGA]).rejecting_configure(),
    ];
    let mut fixture = Fixture::new(devices, ready_targets(), true);
    fixture.launch();
    fixture.step();
    fixture.step();
    fixture.step();

    assert_eq!(fixture.state_of("0"), Some(SessionState::Streaming));
    assert_eq!(fixture.state_of("102"), Some(SessionState::Error));
}

#[test]
fn test_device_without_sizes_is_isolated() {
    let devices = vec![
        SimulatedDevice::new("0", LensFacing::Back, &[HD]),
        SimulatedDevice::new("1", LensFacing::Front, &[]).without_sizes(),
    ];
    let mut fixture = Fixture::new(devices, ready_targets(), true);
    fixture.launch();
    fixture.step();
    fixture.step();
    fixture.step();

    assert_eq!(fixture.state_of("0"), Some(SessionState::Streaming));
    assert_eq!(fixture.state_of("1"), Some(SessionState::Error));
    assert!(!fixture.platform.is_open(&DeviceId::from("1")));
}

#[test]
fn test_open_waits_for_target_readiness() {
    let targets = vec![PreviewSurface::new("T1"), PreviewSurface::ready("T2", HD)];
    let mut fixture = Fixture::new(builtin_and_external(), targets, true);
    fixture.launch();
    fixture.step();

    assert_eq!(fixture.state_of("0"), Some(SessionState::Idle));
    assert_eq!(fixture.platform.open_calls(), vec![DeviceId::from("102")]);

    fixture.surfaces[0].available(HD);
    fixture.step();
    assert_eq!(fixture.state_of("0"), Some(SessionState::Opening));

    // Later surface notifications do not reopen anything
    fixture.surfaces[0].destroy();
    fixture.surfaces[0].available(HD);
    fixture.step();
    fixture.step();
    assert_eq!(fixture.platform.open_calls().len(), 2);
    assert_eq!(fixture.state_of("0"), Some(SessionState::Streaming));
}

#[test]
fn test_permission_missing_keeps_sessions_idle() {
    let mut fixture = Fixture::new(builtin_and_external(), ready_targets(), false);
    assert_eq!(fixture.launch(), 2);
    fixture.step();

    assert!(fixture.platform.open_calls().is_empty());
    for (id, state) in fixture.orchestrator.session_states() {
        assert_eq!(state, SessionState::Idle);
        assert_eq!(
            fixture.orchestrator.session(id).unwrap().last_error(),
            Some(&SessionError::PermissionMissing)
        );
    }
}

#[test]
fn test_disconnect_closes_one_session() {
    let mut fixture = Fixture::new(builtin_and_external(), ready_targets(), true);
    fixture.launch();
    fixture.step();
    fixture.step();
    fixture.step();

    assert!(fixture.platform.disconnect(&DeviceId::from("0")));
    fixture.orchestrator.process_pending();

    assert_eq!(fixture.state_of("0"), Some(SessionState::Closed));
    assert_eq!(fixture.state_of("102"), Some(SessionState::Streaming));
    assert!(!fixture.platform.is_open(&DeviceId::from("0")));
}

#[test]
fn test_shutdown_releases_every_worker() {
    let mut fixture = Fixture::new(builtin_and_external(), ready_targets(), true);
    fixture.launch();
    fixture.step();
    fixture.step();
    fixture.step();
    assert_eq!(fixture.platform.active_sessions(), 2);

    fixture.orchestrator.shutdown();

    for (id, state) in fixture.orchestrator.session_states() {
        assert_eq!(state, SessionState::Closed);
        assert!(!fixture.orchestrator.session(id).unwrap().has_worker());
    }
    assert_eq!(fixture.platform.active_sessions(), 0);
    assert!(!fixture.platform.is_open(&DeviceId::from("0")));
    assert!(!fixture.platform.is_open(&DeviceId::from("102")));
}

#[test]
fn test_explicit_pairing_uses_listed_ids() {
    let devices = vec![
        SimulatedDevice::new("0", LensFacing::Back, &[HD]),
        SimulatedDevice::new("1", LensFacing::Front, &[HD]),
        SimulatedDevice::new("102", LensFacing::External, &[VGA]),
    ];
    let platform = Arc::new(SimulatedPlatform::new(devices, Delivery::Manual));
    let mut orchestrator = Orchestrator::new(
        platform.clone(),
        Arc::new(StaticPermission(true)),
        PairingPolicy::Explicit {
            ids: vec![DeviceId::from("0"), DeviceId::from("102")],
        },
    );
    let targets: Vec<Arc<dyn RenderTarget>> = vec![
        Arc::new(PreviewSurface::ready("T1", HD)),
        Arc::new(PreviewSurface::ready("T2", HD)),
    ];
    assert_eq!(
        orchestrator.launch(&DeviceRegistry::new(platform.clone()), targets),
        2
    );

    let paired: Vec<&str> = orchestrator
        .pairings()
        .iter()
        .map(|p| p.device.as_str())
        .collect();
    assert_eq!(paired, vec!["0", "102"]);
}
