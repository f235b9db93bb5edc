// SPDX-License-Identifier: GPL-3.0-only

//! Integration tests for constants module

use multicam::backends::camera::types::error_codes;
use multicam::constants::{self, LOG_TARGET, MIN_DEVICES};

#[test]
fn test_concurrent_preview_needs_two_cameras() {
    assert_eq!(MIN_DEVICES, 2);
    assert!(constants::DEFAULT_TARGET_COUNT >= MIN_DEVICES);
}

#[test]
fn test_log_target_matches_crate() {
    // The default filter enables the application target
    assert!(constants::DEFAULT_LOG_FILTER.contains(LOG_TARGET));
}

#[test]
fn test_error_codes_are_distinct() {
    let codes = [
        error_codes::ERROR_CAMERA_IN_USE,
        error_codes::ERROR_MAX_CAMERAS_IN_USE,
        error_codes::ERROR_CAMERA_DISABLED,
        error_codes::ERROR_CAMERA_DEVICE,
        error_codes::ERROR_CAMERA_SERVICE,
    ];
    assert_eq!(codes, [1, 2, 3, 4, 5]);
}

#[test]
fn test_retry_backoff_is_short() {
    // A failing capture must not stall shutdown for long
    assert!(constants::CAPTURE_RETRY_BACKOFF < constants::v4l2::FRAME_TIMEOUT);
}
