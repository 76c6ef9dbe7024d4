// Error types shared by the library modules.
//
// `ScanError` covers everything that can end a scan attempt: local
// validation of the selection, transport failures and failure payloads
// from the service. Camera problems live in their own `CameraError` so
// they can be shown in a separate slot and never replace a request error.

use std::path::PathBuf;
use thiserror::Error;

/// Message shown when no response was received at all.
pub const CONNECTIVITY_MESSAGE: &str = "could not reach server";

/// Message shown when submitting in upload mode without a selection.
pub const NO_FILE_MESSAGE: &str = "select an image first";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScanError {
    /// Submit was pressed before an image was chosen.
    #[error("select an image first")]
    NoFileSelected,

    #[error("unsupported image type for {0} (allowed: png, jpg, jpeg, gif)")]
    UnsupportedImage(PathBuf),

    #[error("image is {size} bytes, the limit is {limit} bytes")]
    ImageTooLarge { size: u64, limit: u64 },

    #[error("could not read {path}: {reason}")]
    Unreadable { path: PathBuf, reason: String },

    /// No response was received. `detail` is only logged, the user sees
    /// the generic connectivity message.
    #[error("could not reach server")]
    Transport { detail: String },

    /// The server answered with a failure payload carrying a message.
    #[error("{message}")]
    Server { status: u16, message: String },

    /// The server answered with a failure status but no usable message.
    #[error("server rejected request (HTTP {status})")]
    Rejected { status: u16 },

    #[error("server returned an unreadable report: {0}")]
    MalformedReport(String),
}

impl ScanError {
    pub fn transport(detail: impl Into<String>) -> Self {
        ScanError::Transport {
            detail: detail.into(),
        }
    }

    /// True for errors produced locally, before any request was made.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            ScanError::NoFileSelected
                | ScanError::UnsupportedImage(_)
                | ScanError::ImageTooLarge { .. }
                | ScanError::Unreadable { .. }
        )
    }
}

/// Failures of the camera capability. Reported into their own slot.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CameraError {
    #[error("camera permission denied: {0}")]
    PermissionDenied(String),

    #[error("camera unavailable: {0}")]
    Unavailable(String),

    #[error("camera scanner failed: {0}")]
    Failed(String),
}

pub type Result<T> = std::result::Result<T, ScanError>;
