// SPDX-License-Identifier: GPL-3.0-only

//! Render targets
//!
//! - [`target`]: the render target contract the UI layer implements
//! - [`surface`]: headless [`PreviewSurface`] implementation
//! - [`gate`]: bind-when-ready primitive decoupling target readiness from device timing

pub mod gate;
pub mod surface;
pub mod target;

pub use gate::{BindOutcome, RenderTargetGate};
pub use surface::PreviewSurface;
pub use target::{ListenerId, RenderTarget, SurfaceEvent, SurfaceListener};
