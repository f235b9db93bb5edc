// SPDX-License-Identifier: GPL-3.0-only

//! Error types for multi-camera preview

use crate::backends::camera::types::{BackendError, DeviceId};
use std::fmt;

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Result type for session operations
pub type SessionResult<T> = Result<T, SessionError>;

/// Main application error type
#[derive(Debug, Clone)]
pub enum AppError {
    /// Camera platform errors
    Backend(BackendError),
    /// Session errors
    Session(SessionError),
    /// Configuration errors
    Config(String),
    /// Generic error with message
    Other(String),
}

/// Per-session failure taxonomy
///
/// Every variant is local to the session that produced it; nothing here is
/// ever forwarded to sibling sessions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// Characteristics query failed for one id during enumeration
    Enumeration { device: DeviceId, reason: String },
    /// Device reports no preview sizes
    NoCapabilities { device: DeviceId },
    /// Capture session setup was rejected
    ConfigureFailed { device: DeviceId },
    /// Asynchronous device fault
    DeviceError { device: DeviceId, code: i32 },
    /// Camera capability not granted when opening
    PermissionMissing,
    /// Platform failure outside the categories above
    Backend(BackendError),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Backend(e) => write!(f, "Camera error: {}", e),
            AppError::Session(e) => write!(f, "Session error: {}", e),
            AppError::Config(msg) => write!(f, "Configuration error: {}", msg),
            AppError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::Enumeration { device, reason } => {
                write!(f, "Failed to query camera {}: {}", device, reason)
            }
            SessionError::NoCapabilities { device } => {
                write!(f, "Camera {} reports no preview sizes", device)
            }
            SessionError::ConfigureFailed { device } => {
                write!(f, "Capture session setup failed for camera {}", device)
            }
            SessionError::DeviceError { device, code } => {
                write!(f, "Camera {} error: {}", device, code)
            }
            SessionError::PermissionMissing => write!(f, "Camera permission not granted"),
            SessionError::Backend(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for AppError {}
impl std::error::Error for SessionError {}

impl From<BackendError> for AppError {
    fn from(err: BackendError) -> Self {
        AppError::Backend(err)
    }
}

impl From<SessionError> for AppError {
    fn from(err: SessionError) -> Self {
        AppError::Session(err)
    }
}

impl From<BackendError> for SessionError {
    fn from(err: BackendError) -> Self {
        SessionError::Backend(err)
    }
}

impl From<String> for AppError {
    fn from(msg: String) -> Self {
        AppError::Other(msg)
    }
}

impl From<&str> for AppError {
    fn from(msg: &str) -> Self {
        AppError::Other(msg.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_error_display() {
        let err = SessionError::DeviceError {
            device: DeviceId::from("102"),
            code: 1,
        };
        assert_eq!(err.to_string(), "Camera 102 error: 1");

        let app: AppError = err.into();
        assert_eq!(app.to_string(), "Session error: Camera 102 error: 1");
    }

    #[test]
    fn test_backend_error_conversion() {
        let err: SessionError = BackendError::QueryFailed("busy".into()).into();
        assert_eq!(
            err,
            SessionError::Backend(BackendError::QueryFailed("busy".into()))
        );
    }
}
