//! HID error types.

use thiserror::Error;

/// HID error type.
#[derive(Debug, Error)]
pub enum HidError {
    #[error("Device not found")]
    DeviceNotFound,

    #[error("Permission denied - check udev rules")]
    PermissionDenied,

    #[error("HID error: {0}")]
    Hid(#[from] hidapi::HidError),
}

/// Result type for HID operations.
pub type HidResult<T> = Result<T, HidError>;
