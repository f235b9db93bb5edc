// SPDX-License-Identifier: GPL-3.0-only
// Shared types for camera platform abstraction

//! Shared types for camera platforms

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

/// Device error codes reported through [`DeviceEvent::Error`](crate::session::events::DeviceEvent::Error)
///
/// Platforms that wrap an OS API report the OS error number instead.
pub mod error_codes {
    /// The device is already opened by another client
    pub const ERROR_CAMERA_IN_USE: i32 = 1;
    /// Too many devices are open at once
    pub const ERROR_MAX_CAMERAS_IN_USE: i32 = 2;
    /// Device access is disabled by policy
    pub const ERROR_CAMERA_DISABLED: i32 = 3;
    /// Fatal device fault
    pub const ERROR_CAMERA_DEVICE: i32 = 4;
    /// Fatal platform service fault
    pub const ERROR_CAMERA_SERVICE: i32 = 5;
}

/// Camera platform type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PlatformType {
    /// In-process virtual cameras
    #[default]
    Simulated,
    /// Linux V4L2 capture devices
    V4l2,
}

impl std::fmt::Display for PlatformType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlatformType::Simulated => write!(f, "simulated"),
            PlatformType::V4l2 => write!(f, "V4L2"),
        }
    }
}

/// Platform-assigned device identifier (e.g. "0", "102")
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(String);

impl DeviceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DeviceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DeviceId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for DeviceId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Direction a lens faces, as reported by the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LensFacing {
    /// Same side as the display
    Front,
    /// Opposite side from the display
    Back,
    /// Attached peripheral (e.g. a UVC webcam)
    External,
}

impl LensFacing {
    /// Parse a location string ("front", "back", "external")
    pub fn from_location(location: &str) -> Option<Self> {
        match location.trim().to_ascii_lowercase().as_str() {
            "front" => Some(LensFacing::Front),
            "back" | "rear" => Some(LensFacing::Back),
            "external" | "usb" => Some(LensFacing::External),
            _ => None,
        }
    }
}

impl std::fmt::Display for LensFacing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LensFacing::Front => write!(f, "front"),
            LensFacing::Back => write!(f, "back"),
            LensFacing::External => write!(f, "external"),
        }
    }
}

/// Pixel dimensions of a stream or surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Total pixel count
    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Characteristics queried from the platform for one device
///
/// `output_sizes` is `None` when the device does not report a stream
/// configuration at all; the order of the list is the platform's order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceCharacteristics {
    pub facing: Option<LensFacing>,
    pub output_sizes: Option<Vec<Resolution>>,
}

/// Handle to an opened device
///
/// Handles are minted by the platform; `token` is only meaningful to the
/// platform that issued it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeviceHandle {
    pub device_id: DeviceId,
    pub token: u64,
}

/// Handle to a configured capture session
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CaptureSessionHandle {
    pub device_id: DeviceId,
    pub token: u64,
}

/// Capture session configuration: one output surface at a fixed size
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureConfig {
    /// Identifier of the render target receiving frames
    pub target: String,
    pub size: Resolution,
}

/// Request template
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RequestTemplate {
    #[default]
    Preview,
}

/// Capture request resubmitted continuously by the session worker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureRequest {
    pub template: RequestTemplate,
    pub target: String,
    pub size: Resolution,
}

/// Pixel format of a preview frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// RGBA - 32-bit with alpha (4 bytes per pixel)
    RGBA,
    /// YUYV - Packed 4:2:2 (Y0 U Y1 V interleaved)
    YUYV,
    /// UYVY - Packed 4:2:2 (U Y0 V Y1 interleaved)
    UYVY,
    /// NV12 - Semi-planar 4:2:0
    NV12,
    /// Gray8 - 8-bit grayscale
    Gray8,
    /// Compressed MJPEG, one JPEG per frame
    MJPEG,
    /// Anything else, kept as its FourCC
    Other([u8; 4]),
}

impl PixelFormat {
    /// Parse format from a V4L2 FourCC code
    pub fn from_fourcc(fourcc: &[u8; 4]) -> Self {
        match fourcc {
            b"RGBA" | b"AB24" => Self::RGBA,
            b"YUYV" | b"YUY2" => Self::YUYV,
            b"UYVY" => Self::UYVY,
            b"NV12" => Self::NV12,
            b"GREY" | b"Y800" => Self::Gray8,
            b"MJPG" | b"JPEG" => Self::MJPEG,
            other => Self::Other(*other),
        }
    }

    /// Average bytes per pixel (accounting for chroma subsampling)
    ///
    /// `None` for compressed or unknown formats.
    pub fn bytes_per_pixel(&self) -> Option<f32> {
        match self {
            Self::RGBA => Some(4.0),
            Self::YUYV | Self::UYVY => Some(2.0),
            Self::NV12 => Some(1.5),
            Self::Gray8 => Some(1.0),
            Self::MJPEG | Self::Other(_) => None,
        }
    }

    /// Expected buffer length for an uncompressed frame
    pub fn frame_len(&self, size: Resolution) -> Option<usize> {
        self.bytes_per_pixel()
            .map(|bpp| (size.area() as f64 * bpp as f64) as usize)
    }
}

impl std::fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RGBA => write!(f, "RGBA"),
            Self::YUYV => write!(f, "YUYV"),
            Self::UYVY => write!(f, "UYVY"),
            Self::NV12 => write!(f, "NV12"),
            Self::Gray8 => write!(f, "GREY"),
            Self::MJPEG => write!(f, "MJPG"),
            Self::Other(code) => write!(f, "{}", String::from_utf8_lossy(code)),
        }
    }
}

/// A single preview frame produced by one iteration of a repeating request
#[derive(Debug, Clone)]
pub struct PreviewFrame {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub data: Arc<[u8]>,
    /// Platform frame sequence number
    pub sequence: u64,
    pub captured_at: Instant,
}

/// Result type for platform operations
pub type BackendResult<T> = Result<T, BackendError>;

/// Error types for platform operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// Platform is not available on this system
    NotAvailable(String),
    /// Camera device not found
    DeviceNotFound(String),
    /// Characteristics query failed
    QueryFailed(String),
    /// Handle is unknown or already closed
    InvalidHandle(String),
    /// A capture iteration failed
    CaptureFailed(String),
    /// General I/O error
    IoError(String),
    /// Other errors
    Other(String),
}

impl std::fmt::Display for BackendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendError::NotAvailable(msg) => write!(f, "Platform not available: {}", msg),
            BackendError::DeviceNotFound(msg) => write!(f, "Device not found: {}", msg),
            BackendError::QueryFailed(msg) => write!(f, "Characteristics query failed: {}", msg),
            BackendError::InvalidHandle(msg) => write!(f, "Invalid handle: {}", msg),
            BackendError::CaptureFailed(msg) => write!(f, "Capture failed: {}", msg),
            BackendError::IoError(msg) => write!(f, "I/O error: {}", msg),
            BackendError::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for BackendError {}

impl From<std::io::Error> for BackendError {
    fn from(err: std::io::Error) -> Self {
        BackendError::IoError(err.to_string())
    }
}
