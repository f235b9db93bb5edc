// SPDX-License-Identifier: GPL-3.0-only

//! Preview size resolution
//!
//! No negotiation: the first size the platform reports wins.

use crate::backends::camera::CameraPlatform;
use crate::backends::camera::types::{DeviceId, Resolution};
use crate::errors::{SessionError, SessionResult};
use tracing::debug;

/// Pick the preview size from a platform-ordered list
pub fn select_preview_size(sizes: &[Resolution]) -> Option<Resolution> {
    sizes.first().copied()
}

/// Fetch the supported sizes of `device` and select one
pub fn resolve_preview_size(
    platform: &dyn CameraPlatform,
    device: &DeviceId,
) -> SessionResult<Resolution> {
    let characteristics = platform.characteristics(device)?;
    let sizes = characteristics.output_sizes.unwrap_or_default();

    let size = select_preview_size(&sizes).ok_or_else(|| SessionError::NoCapabilities {
        device: device.clone(),
    })?;

    debug!(device = %device, size = %size, available = sizes.len(), "Resolved preview size");
    Ok(size)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::camera::types::{BackendError, LensFacing};
    use crate::backends::camera::{Delivery, SimulatedDevice, SimulatedPlatform};

    fn platform() -> SimulatedPlatform {
        SimulatedPlatform::new(
            vec![
                SimulatedDevice::new(
                    "0",
                    LensFacing::Back,
                    &[Resolution::new(1920, 1080), Resolution::new(640, 480)],
                ),
                SimulatedDevice::new("1", LensFacing::Front, &[]),
                SimulatedDevice::new("2", LensFacing::Front, &[]).without_sizes(),
                SimulatedDevice::new("3", LensFacing::Front, &[]).failing_query(),
            ],
            Delivery::Manual,
        )
    }

    #[test]
    fn test_first_size_wins() {
        assert_eq!(
            resolve_preview_size(&platform(), &DeviceId::from("0")),
            Ok(Resolution::new(1920, 1080))
        );
    }

    #[test]
    fn test_empty_and_absent_sizes() {
        let platform = platform();
        for id in ["1", "2"] {
            assert_eq!(
                resolve_preview_size(&platform, &DeviceId::from(id)),
                Err(SessionError::NoCapabilities {
                    device: DeviceId::from(id)
                })
            );
        }
    }

    #[test]
    fn test_query_failure_is_backend_error() {
        assert!(matches!(
            resolve_preview_size(&platform(), &DeviceId::from("3")),
            Err(SessionError::Backend(BackendError::QueryFailed(_)))
        ));
    }

    #[test]
    fn test_select_preview_size() {
        assert_eq!(select_preview_size(&[]), None);
        assert_eq!(
            select_preview_size(&[Resolution::new(320, 240), Resolution::new(640, 480)]),
            Some(Resolution::new(320, 240))
        );
    }
}
