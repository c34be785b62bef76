//! Link configuration

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use super::{ProtocolError, ScanMode, DEFAULT_BAUD_RATE, DEFAULT_PORT, DEFAULT_TIMEOUT_MS};

/// Serial link configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    /// Serial port name (e.g., "/dev/ttyAMA0")
    pub port_name: String,
    /// Baud rate
    pub baud_rate: u32,
    /// How long to wait for a response frame after each write, in milliseconds
    pub response_timeout_ms: u64,
    /// Handling of bytes trailing a response frame
    pub scan_mode: ScanMode,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            port_name: DEFAULT_PORT.to_string(),
            baud_rate: DEFAULT_BAUD_RATE,
            response_timeout_ms: DEFAULT_TIMEOUT_MS,
            scan_mode: ScanMode::default(),
        }
    }
}

impl LinkConfig {
    /// Load a configuration from a JSON file. Missing fields keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self, ProtocolError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Parse a JSON configuration, rejecting a zero baud rate or timeout
    pub fn from_json(content: &str) -> Result<Self, ProtocolError> {
        let config: LinkConfig =
            serde_json::from_str(content).map_err(|e| ProtocolError::Config(e.to_string()))?;
        if config.baud_rate == 0 {
            return Err(ProtocolError::Config("baud_rate must be non-zero".into()));
        }
        if config.response_timeout_ms == 0 {
            return Err(ProtocolError::Config(
                "response_timeout_ms must be non-zero".into(),
            ));
        }
        Ok(config)
    }

    /// Response timeout as a `Duration`
    pub fn response_timeout(&self) -> Duration {
        Duration::from_millis(self.response_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = LinkConfig::default();
        assert_eq!(config.port_name, "/dev/ttyAMA0");
        assert_eq!(config.baud_rate, 38400);
        assert_eq!(config.response_timeout(), Duration::from_secs(1));
        assert_eq!(config.scan_mode, ScanMode::Continuous);
    }

    #[test]
    fn test_partial_json() {
        let config =
            LinkConfig::from_json(r#"{"port_name": "/dev/ttyUSB0", "scan_mode": "reset_after_frame"}"#)
                .unwrap();
        assert_eq!(config.port_name, "/dev/ttyUSB0");
        assert_eq!(config.baud_rate, DEFAULT_BAUD_RATE);
        assert_eq!(config.scan_mode, ScanMode::ResetAfterFrame);
    }

    #[test]
    fn test_rejects_zero_timeout() {
        assert!(matches!(
            LinkConfig::from_json(r#"{"response_timeout_ms": 0}"#),
            Err(ProtocolError::Config(_))
        ));
    }
}
