// SPDX-License-Identifier: GPL-3.0-only

//! Device discovery and classification

use crate::backends::camera::CameraPlatform;
use crate::backends::camera::types::{DeviceId, LensFacing, Resolution};
use crate::errors::SessionError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Built into the host, or an external peripheral
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceClass {
    BuiltIn,
    External,
}

impl std::fmt::Display for DeviceClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeviceClass::BuiltIn => write!(f, "built-in"),
            DeviceClass::External => write!(f, "external"),
        }
    }
}

/// An enumerated imaging device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Device {
    pub id: DeviceId,
    pub class: DeviceClass,
    pub facing: Option<LensFacing>,
    /// Supported preview sizes in platform order (may be empty)
    pub resolutions: Vec<Resolution>,
}

impl Device {
    pub fn is_external(&self) -> bool {
        self.class == DeviceClass::External
    }
}

pub struct DeviceRegistry {
    platform: Arc<dyn CameraPlatform>,
}

impl DeviceRegistry {
    pub fn new(platform: Arc<dyn CameraPlatform>) -> Self {
        Self { platform }
    }

    /// Classify a facing attribute; absent facing counts as built-in
    pub fn classify(facing: Option<LensFacing>) -> DeviceClass {
        match facing {
            Some(LensFacing::External) => DeviceClass::External,
            Some(LensFacing::Front) | Some(LensFacing::Back) | None => DeviceClass::BuiltIn,
        }
    }

    /// Enumerate devices in platform order
    ///
    /// Ids whose characteristics cannot be queried are skipped.
    pub fn enumerate(&self) -> Vec<Device> {
        let ids = match self.platform.device_ids() {
            Ok(ids) => ids,
            Err(e) => {
                warn!(error = %e, "Failed to list cameras");
                return Vec::new();
            }
        };

        let devices: Vec<Device> = ids
            .into_iter()
            .filter_map(|id| match self.describe(&id) {
                Ok(device) => Some(device),
                Err(e) => {
                    warn!(device = %id, error = %e, "Skipping camera");
                    None
                }
            })
            .collect();

        info!(count = devices.len(), "Enumerated cameras");
        for device in &devices {
            debug!(
                device = %device.id,
                class = %device.class,
                facing = ?device.facing,
                sizes = device.resolutions.len(),
                "Camera"
            );
        }
        devices
    }

    /// First external device, logging its supported preview sizes
    pub fn first_external(&self) -> Option<Device> {
        Self::find_external(&self.enumerate()).cloned()
    }

    /// First external device among already enumerated ones
    pub fn find_external(devices: &[Device]) -> Option<&Device> {
        let Some(device) = devices.iter().find(|d| d.is_external()) else {
            debug!("No external camera found");
            return None;
        };
        info!(device = %device.id, sizes = device.resolutions.len(), "Found external camera");
        for size in &device.resolutions {
            debug!(device = %device.id, size = %size, "External camera preview size");
        }
        Some(device)
    }

    fn describe(&self, id: &DeviceId) -> Result<Device, SessionError> {
        let characteristics =
            self.platform
                .characteristics(id)
                .map_err(|e| SessionError::Enumeration {
                    device: id.clone(),
                    reason: e.to_string(),
                })?;

        Ok(Device {
            id: id.clone(),
            class: Self::classify(characteristics.facing),
            facing: characteristics.facing,
            resolutions: characteristics.output_sizes.unwrap_or_default(),
        })
    }
}
