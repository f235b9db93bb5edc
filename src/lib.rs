// SPDX-License-Identifier: GPL-3.0-only

//! Multicam - concurrent live preview from several cameras
//!
//! Discovers the cameras a platform exposes and drives two or more of them at
//! once, each streaming into its own render target. Every device runs an
//! independent open → configure → stream state machine; a failure in one
//! session never affects another.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`backends`]: Camera platform and permission abstractions
//! - [`render`]: Render target contract, headless surface and readiness gate
//! - [`session`]: Device registry, session controllers and orchestration
//! - [`config`]: User configuration handling
//!
//! # Example
//!
//! ```ignore
//! let config = Config::default();
//! let platform = get_platform(&config);
//! let registry = DeviceRegistry::new(platform.clone());
//! let mut orchestrator = Orchestrator::new(platform, get_permissions(&config), config.pairing);
//! orchestrator.launch(&registry, targets);
//! orchestrator.run_until(tokio::signal::ctrl_c()).await;
//! orchestrator.shutdown();
//! ```

pub mod backends;
pub mod config;
pub mod constants;
pub mod errors;
pub mod render;
pub mod session;

// Re-export commonly used types
pub use backends::camera::{CameraPlatform, SimulatedPlatform, V4l2Platform, get_platform};
pub use backends::permission::{PermissionProvider, get_permissions};
pub use config::Config;
pub use errors::{AppError, AppResult, SessionError};
pub use render::{PreviewSurface, RenderTarget, RenderTargetGate};
pub use session::{DeviceRegistry, Orchestrator, PairingPolicy, SessionState};
