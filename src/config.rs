// SPDX-License-Identifier: GPL-3.0-only

use crate::backends::camera::types::{DeviceId, LensFacing, PlatformType, Resolution};
use crate::backends::camera::{Delivery, SimulatedDevice};
use crate::constants::{self, APP_DIR, CONFIG_FILE, DEFAULT_TARGET_COUNT};
use crate::errors::{AppError, AppResult};
use crate::session::pairing::PairingPolicy;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Simulated platform settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatedConfig {
    /// Virtual cameras in enumeration order
    pub devices: Vec<SimulatedDevice>,
    /// When open/configure completions arrive
    pub delivery: Delivery,
    /// Delay between frames of the repeating request
    pub frame_interval_ms: u64,
    /// Answer of the permission check in simulated mode
    pub permission_granted: bool,
}

impl Default for SimulatedConfig {
    fn default() -> Self {
        Self {
            devices: vec![
                SimulatedDevice::new(
                    "0",
                    LensFacing::Back,
                    &[
                        Resolution::new(1920, 1080),
                        Resolution::new(1280, 720),
                        Resolution::new(640, 480),
                    ],
                ),
                SimulatedDevice::new(
                    "1",
                    LensFacing::Front,
                    &[Resolution::new(1280, 720), Resolution::new(640, 480)],
                ),
                SimulatedDevice::new(
                    "102",
                    LensFacing::External,
                    &[Resolution::new(640, 480), Resolution::new(1280, 720)],
                ),
            ],
            delivery: Delivery::default(),
            frame_interval_ms: constants::simulated::FRAME_INTERVAL_MS,
            permission_granted: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Camera platform to drive (simulated or V4L2)
    pub backend: PlatformType,
    /// Number of render targets to create
    pub targets: usize,
    /// How enumerated devices are paired with targets
    pub pairing: PairingPolicy,
    /// Demo surfaces become available after this delay
    pub target_ready_delay_ms: u64,
    /// Interval of the per-session status log in preview mode
    pub stats_interval_ms: u64,
    pub simulated: SimulatedConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: PlatformType::default(),
            targets: DEFAULT_TARGET_COUNT,
            pairing: PairingPolicy::default(),
            target_ready_delay_ms: constants::preview::TARGET_READY_DELAY_MS,
            stats_interval_ms: constants::preview::STATS_INTERVAL_MS,
            simulated: SimulatedConfig::default(),
        }
    }
}

impl Config {
    /// `<config dir>/multicam/config.json`, if the platform has a config dir
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
    }

    /// Load from an explicit path, or from the default location
    ///
    /// An explicit path must exist. A missing file at the default location
    /// yields the defaults.
    pub fn load(path: Option<&Path>) -> AppResult<Self> {
        match path {
            Some(path) => Self::load_from(path),
            None => match Self::default_path() {
                Some(path) if path.exists() => Self::load_from(&path),
                Some(path) => {
                    debug!(path = %path.display(), "No config file, using defaults");
                    Ok(Self::default())
                }
                None => {
                    debug!("No config directory, using defaults");
                    Ok(Self::default())
                }
            },
        }
    }

    pub fn load_from(path: &Path) -> AppResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        let config: Config = serde_json::from_str(&text).map_err(|e| {
            AppError::Config(format!("failed to parse {}: {}", path.display(), e))
        })?;
        config.validate()?;
        info!(path = %path.display(), backend = ?config.backend, targets = config.targets, "Loaded config");
        Ok(config)
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.targets == 0 {
            return Err(AppError::Config(
                "targets must be at least 1".to_string(),
            ));
        }

        let mut seen: HashSet<&DeviceId> = HashSet::new();
        for device in &self.simulated.devices {
            if !seen.insert(&device.id) {
                return Err(AppError::Config(format!(
                    "duplicate simulated camera id {}",
                    device.id
                )));
            }
        }

        if let PairingPolicy::Explicit { ids } = &self.pairing {
            if ids.is_empty() {
                return Err(AppError::Config(
                    "explicit pairing needs at least one device id".to_string(),
                ));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.targets, 2);
        assert_eq!(config.backend, PlatformType::Simulated);
        assert_eq!(config.simulated.devices.len(), 3);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: Config = serde_json::from_str(r#"{ "targets": 3 }"#).unwrap();
        assert_eq!(config.targets, 3);
        assert_eq!(config.pairing, PairingPolicy::FirstEnumerated);
        assert_eq!(config.simulated, SimulatedConfig::default());
    }

    #[test]
    fn test_zero_targets_rejected() {
        let config = Config {
            targets: 0,
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(AppError::Config(_))));
    }

    #[test]
    fn test_duplicate_simulated_ids_rejected() {
        let mut config = Config::default();
        config
            .simulated
            .devices
            .push(SimulatedDevice::new("0", LensFacing::Front, &[]));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_explicit_pairing_from_json() {
        let config: Config = serde_json::from_str(
            r#"{ "pairing": { "kind": "explicit", "ids": ["0", "102"] } }"#,
        )
        .unwrap();
        assert_eq!(
            config.pairing,
            PairingPolicy::Explicit {
                ids: vec![DeviceId::from("0"), DeviceId::from("102")]
            }
        );
    }
}
