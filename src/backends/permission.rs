// SPDX-License-Identifier: GPL-3.0-only

//! Permission collaborator
//!
//! Sessions ask once per `open()` whether the camera capability is granted.
//! Consent flows are out of scope; providers only answer the question.

use super::camera::types::PlatformType;
use super::camera::v4l2_utils::{list_video_nodes, node_accessible};
use crate::config::Config;
use std::sync::Arc;
use tracing::debug;

/// Capabilities a session may require
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    Camera,
}

/// Answers whether a capability is currently granted
pub trait PermissionProvider: Send + Sync {
    fn is_granted(&self, capability: Capability) -> bool;
}

/// Fixed answer, for simulated platforms and tests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaticPermission(pub bool);

impl PermissionProvider for StaticPermission {
    fn is_granted(&self, _capability: Capability) -> bool {
        self.0
    }
}

/// Camera access granted when the user can read and write a video node
#[derive(Debug, Clone, Copy, Default)]
pub struct DeviceNodeAccess;

impl PermissionProvider for DeviceNodeAccess {
    fn is_granted(&self, capability: Capability) -> bool {
        match capability {
            Capability::Camera => {
                let granted = list_video_nodes()
                    .iter()
                    .any(|(_, path)| node_accessible(path));
                debug!(granted, "Checked video node access");
                granted
            }
        }
    }
}

/// Permission provider matching the configured platform
pub fn get_permissions(config: &Config) -> Arc<dyn PermissionProvider> {
    match config.backend {
        PlatformType::Simulated => Arc::new(StaticPermission(config.simulated.permission_granted)),
        PlatformType::V4l2 => Arc::new(DeviceNodeAccess),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_permission() {
        assert!(StaticPermission(true).is_granted(Capability::Camera));
        assert!(!StaticPermission(false).is_granted(Capability::Camera));
    }

    #[test]
    fn test_simulated_permission_follows_config() {
        let mut config = Config::default();
        assert!(get_permissions(&config).is_granted(Capability::Camera));

        config.simulated.permission_granted = false;
        assert!(!get_permissions(&config).is_granted(Capability::Camera));
    }
}
