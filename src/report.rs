// Report data returned by the analysis service.
//
// The client treats the report as opaque, untrusted data: it only checks
// that `status`, `color` and `url` exist. `warnings` may be missing or
// `null` and is then the same as an empty list; odd items never reject
// the whole report.

use serde::{Deserialize, Deserializer, Serialize};

/// Risk assessment for one decoded QR payload.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ScanReport {
    /// Human readable risk label, e.g. "SAFE".
    pub status: String,
    /// Display color token, usually a `#rrggbb` hex string.
    pub color: String,
    /// The decoded payload. Not guaranteed to be a well formed URL.
    pub url: String,
    #[serde(default, deserialize_with = "lenient_warnings")]
    pub warnings: Vec<String>,
}

/// Absent or `null` means no warnings. Non-string items are kept in
/// their JSON text form, `null` items are skipped.
fn lenient_warnings<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let items = Option::<Vec<serde_json::Value>>::deserialize(deserializer)?.unwrap_or_default();
    Ok(items
        .into_iter()
        .filter_map(|item| match item {
            serde_json::Value::Null => None,
            serde_json::Value::String(text) => Some(text),
            other => Some(other.to_string()),
        })
        .collect())
}

/// Coarse risk level derived from the status label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiskLevel {
    Safe,
    Suspicious,
    Malicious,
    Unknown,
}

impl RiskLevel {
    pub fn from_status(status: &str) -> Self {
        match status.trim().to_ascii_lowercase().as_str() {
            "safe" => RiskLevel::Safe,
            "suspicious" => RiskLevel::Suspicious,
            "malicious" => RiskLevel::Malicious,
            _ => RiskLevel::Unknown,
        }
    }

    /// Process exit code used by the one-shot commands.
    pub fn exit_code(self) -> u8 {
        match self {
            RiskLevel::Safe | RiskLevel::Unknown => 0,
            RiskLevel::Suspicious => 2,
            RiskLevel::Malicious => 3,
        }
    }

    /// Fallback color when the report's own token can't be parsed.
    pub fn fallback_rgb(self) -> Option<(u8, u8, u8)> {
        match self {
            RiskLevel::Safe => Some((0x52, 0xc4, 0x1a)),
            RiskLevel::Suspicious => Some((0xfa, 0xad, 0x14)),
            RiskLevel::Malicious => Some((0xff, 0x4d, 0x4f)),
            RiskLevel::Unknown => None,
        }
    }
}

impl ScanReport {
    pub fn risk_level(&self) -> RiskLevel {
        RiskLevel::from_status(&self.status)
    }

    /// Parse the color token as `#rrggbb` or `#rgb`.
    pub fn rgb(&self) -> Option<(u8, u8, u8)> {
        parse_hex_color(&self.color)
    }
}

pub fn parse_hex_color(token: &str) -> Option<(u8, u8, u8)> {
    let hex = token.trim().strip_prefix('#')?;
    if !hex.is_ascii() {
        return None;
    }
    match hex.len() {
        6 => {
            let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
            let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
            let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
            Some((r, g, b))
        }
        3 => {
            let mut out = [0u8; 3];
            for (i, c) in hex.chars().enumerate() {
                let v = c.to_digit(16)? as u8;
                out[i] = v * 17;
            }
            Some((out[0], out[1], out[2]))
        }
        _ => None,
    }
}
