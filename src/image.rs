// In-memory image selection for upload mode.
//
// The file is read once when selected; the scan request then carries the
// raw bytes. Only the formats the service accepts are allowed.

use crate::error::{Result, ScanError};
use std::fs;
use std::path::{Path, PathBuf};

/// Default upload limit, matching the service's 10 MB request cap.
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

/// Extensions accepted by the scan endpoint, with their MIME types.
const ALLOWED: &[(&str, &str)] = &[
    ("png", "image/png"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("gif", "image/gif"),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedImage {
    path: PathBuf,
    file_name: String,
    mime: &'static str,
    bytes: Vec<u8>,
}

impl SelectedImage {
    /// Read and validate an image from disk.
    pub fn load(path: &Path, max_bytes: u64) -> Result<Self> {
        let mime = mime_for(path).ok_or_else(|| ScanError::UnsupportedImage(path.to_path_buf()))?;

        let meta = fs::metadata(path).map_err(|e| ScanError::Unreadable {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        if meta.len() > max_bytes {
            return Err(ScanError::ImageTooLarge {
                size: meta.len(),
                limit: max_bytes,
            });
        }

        let bytes = fs::read(path).map_err(|e| ScanError::Unreadable {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        log::debug!("selected {} ({} bytes, {})", path.display(), bytes.len(), mime);

        Ok(Self::from_bytes(path, mime, bytes))
    }

    /// Build a selection from bytes already in memory.
    pub fn from_bytes(path: &Path, mime: &'static str, bytes: Vec<u8>) -> Self {
        let file_name = path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("image")
            .to_string();
        SelectedImage {
            path: path.to_path_buf(),
            file_name,
            mime,
            bytes,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn mime_type(&self) -> &'static str {
        self.mime
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// MIME type for an accepted image path, `None` for anything else.
pub fn mime_for(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    ALLOWED
        .iter()
        .find(|(allowed, _)| *allowed == ext)
        .map(|(_, mime)| *mime)
}
