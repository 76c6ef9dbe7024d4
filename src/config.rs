// Client configuration.
//
// Values are layered: built-in defaults, then the JSON file in the user's
// config directory, then the `SAFESCAN_API_URL` environment variable, then
// whatever the command line passes in. The result is handed to
// `ApiClient::new` explicitly; nothing reads ambient settings later on.

use crate::image::DEFAULT_MAX_UPLOAD_BYTES;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:5000";
pub const BASE_URL_ENV: &str = "SAFESCAN_API_URL";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL of the analysis service, without trailing slash.
    pub base_url: String,
    /// Largest image the client will upload.
    pub max_upload_bytes: u64,
    /// External QR scanner; must print one decoded payload per line.
    pub scanner_command: Vec<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.into(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            scanner_command: vec!["zbarcam".into(), "--raw".into(), "--quiet".into()],
        }
    }
}

impl ClientConfig {
    /// Directory: ~/.config/safescan/
    fn dir() -> PathBuf {
        let mut p = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        p.push("safescan");
        p
    }

    pub fn path() -> PathBuf {
        Self::dir().join("config.json")
    }

    /// Load from a file, returning defaults if it doesn't exist or is invalid.
    pub fn load_from(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(data) => serde_json::from_str(&data).unwrap_or_else(|e| {
                log::warn!("ignoring invalid config {}: {}", path.display(), e);
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    /// Full layering: config file, environment, then an optional override.
    pub fn resolve(server_override: Option<&str>) -> Self {
        let mut config = Self::load_from(&Self::path());
        config.apply_env(std::env::var(BASE_URL_ENV).ok().as_deref());
        if let Some(url) = server_override {
            config.set_base_url(url);
        }
        log::debug!("using service at {}", config.base_url);
        config
    }

    /// Apply the value of `SAFESCAN_API_URL` if it is set and non-empty.
    pub fn apply_env(&mut self, value: Option<&str>) {
        if let Some(url) = value.filter(|v| !v.trim().is_empty()) {
            self.set_base_url(url);
        }
    }

    pub fn set_base_url(&mut self, url: &str) {
        self.base_url = url.trim().trim_end_matches('/').to_string();
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }

    /// Persist to disk.
    pub fn save(&self) -> anyhow::Result<()> {
        fs::create_dir_all(Self::dir())?;
        let data = serde_json::to_string_pretty(self)?;
        fs::write(Self::path(), data)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn defaults_point_at_loopback() {
        let config = ClientConfig::default();
        assert_eq!(config.base_url, "http://127.0.0.1:5000");
        assert_eq!(config.max_upload_bytes, 10 * 1024 * 1024);
        assert_eq!(config.endpoint("scan"), "http://127.0.0.1:5000/scan");
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"base_url":"http://scanner.lan:8080/"}"#).unwrap();

        let config = ClientConfig::load_from(&path);
        assert_eq!(config.base_url, "http://scanner.lan:8080/");
        assert_eq!(config.endpoint("analyze"), "http://scanner.lan:8080/analyze");
        assert_eq!(config.scanner_command[0], "zbarcam");
    }

    #[test]
    fn invalid_or_missing_file_falls_back() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        assert_eq!(ClientConfig::load_from(&path), ClientConfig::default());
        fs::write(&path, "not json").unwrap();
        assert_eq!(ClientConfig::load_from(&path), ClientConfig::default());
    }

    #[test]
    fn env_overrides_and_blank_env_is_ignored() {
        let mut config = ClientConfig::default();
        config.apply_env(Some("  "));
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        config.apply_env(Some("https://qr.example.org/"));
        assert_eq!(config.base_url, "https://qr.example.org");
    }
}
