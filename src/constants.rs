// SPDX-License-Identifier: GPL-3.0-only

//! Application-wide constants

use std::time::Duration;

/// Log target for application-level messages
pub const LOG_TARGET: &str = "multicam";

/// Application directory name under the user config directory
pub const APP_DIR: &str = "multicam";

/// Configuration file name
pub const CONFIG_FILE: &str = "config.json";

/// Default log filter when `RUST_LOG` is not set
pub const DEFAULT_LOG_FILTER: &str = "warn,multicam=info";

/// Minimum number of enumerated devices required to start any session
pub const MIN_DEVICES: usize = 2;

/// Default number of render targets
pub const DEFAULT_TARGET_COUNT: usize = 2;

/// Thread name prefix for per-session capture workers
pub const WORKER_NAME_PREFIX: &str = "capture";

/// Back-off after a failed repeating-request iteration
pub const CAPTURE_RETRY_BACKOFF: Duration = Duration::from_millis(10);

/// Log every Nth failed capture iteration
pub const CAPTURE_ERROR_LOG_INTERVAL: u64 = 30;

/// V4L2 streaming constants
pub mod v4l2 {
    use std::time::Duration;

    /// Device node directory
    pub const DEV_DIR: &str = "/dev";

    /// Device node name prefix
    pub const NODE_PREFIX: &str = "video";

    /// Number of memory-mapped buffers per stream
    pub const BUFFER_COUNT: u32 = 4;

    /// Maximum wait for a single dequeued frame
    pub const FRAME_TIMEOUT: Duration = Duration::from_secs(1);
}

/// Simulated platform defaults
pub mod simulated {
    /// Open completion delay
    pub const OPEN_DELAY_MS: u64 = 150;

    /// Capture session configuration delay
    pub const CONFIGURE_DELAY_MS: u64 = 50;

    /// Interval between simulated frames (~30 fps)
    pub const FRAME_INTERVAL_MS: u64 = 33;
}

/// Preview CLI defaults
pub mod preview {
    /// Delay before demo surfaces report themselves available
    pub const TARGET_READY_DELAY_MS: u64 = 100;

    /// Interval between session status reports
    pub const STATS_INTERVAL_MS: u64 = 1000;

    /// Size reported by demo surfaces when they become available
    pub const SURFACE_SIZE: crate::backends::camera::types::Resolution =
        crate::backends::camera::types::Resolution::new(1280, 720);
}
