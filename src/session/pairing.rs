// SPDX-License-Identifier: GPL-3.0-only

//! Device-to-target pairing policies

use super::registry::{Device, DeviceClass};
use crate::backends::camera::types::DeviceId;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Chooses which enumerated devices drive the render targets
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PairingPolicy {
    /// First devices in enumeration order
    #[default]
    FirstEnumerated,
    /// First built-in device, then first external, then the rest in order
    BuiltInThenExternal,
    /// Listed ids in order; ids that were not enumerated are skipped
    Explicit { ids: Vec<DeviceId> },
}

impl PairingPolicy {
    /// Select up to `count` distinct devices, in target order
    pub fn select(&self, devices: &[Device], count: usize) -> Vec<Device> {
        let ordered: Vec<&Device> = match self {
            PairingPolicy::FirstEnumerated => devices.iter().collect(),
            PairingPolicy::BuiltInThenExternal => {
                let built_in = devices.iter().find(|d| d.class == DeviceClass::BuiltIn);
                let external = devices.iter().find(|d| d.class == DeviceClass::External);
                let mut ordered: Vec<&Device> = built_in.into_iter().chain(external).collect();
                for device in devices {
                    if !ordered.iter().any(|d| d.id == device.id) {
                        ordered.push(device);
                    }
                }
                ordered
            }
            PairingPolicy::Explicit { ids } => {
                let mut ordered: Vec<&Device> = Vec::new();
                for id in ids {
                    match devices.iter().find(|d| &d.id == id) {
                        Some(device) if !ordered.iter().any(|d| d.id == device.id) => {
                            ordered.push(device)
                        }
                        Some(_) => warn!(device = %id, "Camera listed twice in pairing"),
                        None => warn!(device = %id, "Paired camera was not enumerated"),
                    }
                }
                ordered
            }
        };

        ordered.into_iter().take(count).cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::camera::types::LensFacing;

    fn device(id: &str, class: DeviceClass) -> Device {
        Device {
            id: DeviceId::from(id),
            class,
            facing: match class {
                DeviceClass::BuiltIn => Some(LensFacing::Back),
                DeviceClass::External => Some(LensFacing::External),
            },
            resolutions: Vec::new(),
        }
    }

    fn ids(devices: &[Device]) -> Vec<&str> {
        devices.iter().map(|d| d.id.as_str()).collect()
    }

    fn enumerated() -> Vec<Device> {
        vec![
            device("0", DeviceClass::BuiltIn),
            device("1", DeviceClass::BuiltIn),
            device("102", DeviceClass::External),
        ]
    }

    #[test]
    fn test_first_enumerated() {
        let selected = PairingPolicy::FirstEnumerated.select(&enumerated(), 2);
        assert_eq!(ids(&selected), vec!["0", "1"]);
    }

    #[test]
    fn test_built_in_then_external() {
        let selected = PairingPolicy::BuiltInThenExternal.select(&enumerated(), 2);
        assert_eq!(ids(&selected), vec!["0", "102"]);

        let selected = PairingPolicy::BuiltInThenExternal.select(&enumerated(), 3);
        assert_eq!(ids(&selected), vec!["0", "102", "1"]);
    }

    #[test]
    fn test_built_in_then_external_without_external() {
        let devices = vec![
            device("0", DeviceClass::BuiltIn),
            device("1", DeviceClass::BuiltIn),
        ];
        let selected = PairingPolicy::BuiltInThenExternal.select(&devices, 2);
        assert_eq!(ids(&selected), vec!["0", "1"]);
    }

    #[test]
    fn test_explicit_skips_unknown_and_duplicates() {
        let policy = PairingPolicy::Explicit {
            ids: vec![
                DeviceId::from("102"),
                DeviceId::from("7"),
                DeviceId::from("102"),
                DeviceId::from("0"),
            ],
        };
        let selected = policy.select(&enumerated(), 2);
        assert_eq!(ids(&selected), vec!["102", "0"]);
    }

    #[test]
    fn test_count_larger_than_devices() {
        let selected = PairingPolicy::FirstEnumerated.select(&enumerated(), 5);
        assert_eq!(selected.len(), 3);
    }
}
