// SPDX-License-Identifier: GPL-3.0-only

//! CLI commands
//!
//! This module provides command-line functionality for:
//! - Listing available cameras
//! - Running a concurrent preview against headless surfaces

use multicam::backends::camera::get_platform;
use multicam::backends::permission::get_permissions;
use multicam::constants::{LOG_TARGET, preview::SURFACE_SIZE};
use multicam::render::{PreviewSurface, RenderTarget};
use multicam::session::{DeviceRegistry, Orchestrator, select_preview_size};
use multicam::Config;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// List all available cameras
pub fn list_cameras(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let platform = get_platform(config);
    let devices = DeviceRegistry::new(platform).enumerate();

    if devices.is_empty() {
        println!("No cameras found.");
        return Ok(());
    }

    println!("Available cameras:");
    println!();
    for device in &devices {
        let facing = device
            .facing
            .map(|f| f.to_string())
            .unwrap_or_else(|| "unknown".to_string());
        println!("  [{}] {} ({})", device.id, device.class, facing);

        match select_preview_size(&device.resolutions) {
            Some(size) => println!("      Preview: {}", size),
            None => println!("      Preview: none (no stream configuration)"),
        }
        if device.resolutions.len() > 1 {
            let sizes: Vec<String> = device.resolutions.iter().map(|s| s.to_string()).collect();
            println!("      Sizes: {}", sizes.join(", "));
        }
        println!();
    }

    Ok(())
}

/// Stream paired cameras into preview surfaces until Ctrl+C or `duration`
pub fn run_preview(config: &Config, duration: Option<u64>) -> Result<(), Box<dyn std::error::Error>> {
    config.validate()?;
    let platform = get_platform(config);
    let registry = DeviceRegistry::new(Arc::clone(&platform));
    let mut orchestrator =
        Orchestrator::new(platform, get_permissions(config), config.pairing.clone());

    let surfaces: Vec<Arc<PreviewSurface>> = (1..=config.targets)
        .map(|i| Arc::new(PreviewSurface::new(format!("target-{}", i))))
        .collect();
    let targets: Vec<Arc<dyn RenderTarget>> = surfaces
        .iter()
        .map(|s| Arc::clone(s) as Arc<dyn RenderTarget>)
        .collect();

    let launched = orchestrator.launch(&registry, targets);
    if launched == 0 {
        return Err("No camera sessions launched".into());
    }

    for pairing in orchestrator.pairings() {
        println!("{} -> camera {}", pairing.target, pairing.device);
    }

    // Surfaces come up some time after the sessions exist, like a mapped window
    let delay = Duration::from_millis(config.target_ready_delay_ms);
    let pending_surfaces = surfaces.clone();
    std::thread::Builder::new()
        .name("surface-ready".to_string())
        .spawn(move || {
            std::thread::sleep(delay);
            for surface in pending_surfaces {
                surface.available(SURFACE_SIZE);
            }
        })?;

    println!();
    println!("Previewing... (press Ctrl+C to stop)");

    let interval = Duration::from_millis(config.stats_interval_ms.max(1));
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        let stop = async {
            match duration {
                Some(secs) => {
                    tokio::select! {
                        _ = tokio::time::sleep(Duration::from_secs(secs)) => {}
                        _ = tokio::signal::ctrl_c() => {}
                    }
                }
                None => {
                    let _ = tokio::signal::ctrl_c().await;
                }
            }
        };
        tokio::pin!(stop);

        let mut stats = tokio::time::interval(interval);
        stats.tick().await;

        let mut stopped = false;
        while !stopped {
            orchestrator
                .run_until(async {
                    tokio::select! {
                        _ = &mut stop => stopped = true,
                        _ = stats.tick() => {}
                    }
                })
                .await;

            report(&orchestrator);

            if orchestrator.session_count() > 0
                && orchestrator
                    .session_states()
                    .iter()
                    .all(|(_, state)| state.is_terminal())
            {
                println!("All sessions ended.");
                break;
            }
        }
    });

    orchestrator.shutdown();

    println!();
    for (id, state) in orchestrator.session_states() {
        if let Some(session) = orchestrator.session(id) {
            println!(
                "  {} camera {}: {} ({} frames)",
                session.target().id(),
                session.device().id,
                state,
                session.frames_captured()
            );
        }
    }

    Ok(())
}

fn report(orchestrator: &Orchestrator) {
    for (id, state) in orchestrator.session_states() {
        if let Some(session) = orchestrator.session(id) {
            info!(
                target: LOG_TARGET,
                session = %id,
                device = %session.device().id,
                state = %state,
                resolution = ?session.resolution(),
                frames = session.frames_captured(),
                "Preview status"
            );
        }
    }
}
