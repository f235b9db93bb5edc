// SPDX-License-Identifier: GPL-3.0-only

//! Platform collaborators
//!
//! - [`camera`]: camera platform contract with simulated and V4L2 implementations
//! - [`permission`]: camera permission checks

pub mod camera;
pub mod permission;
