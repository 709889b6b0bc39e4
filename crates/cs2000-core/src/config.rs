//! Session configuration
//!
//! Connection and initialization settings, loadable from a JSON file. Every
//! field has a default so partial files are accepted.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::instrument::FailurePolicy;
use crate::protocol::{ConnectionConfig, ProtocolError, DEFAULT_BAUD_RATE};

/// Sync frequency used when none is configured
pub const DEFAULT_SYNC_FREQUENCY_HZ: u32 = 60;

/// Full session configuration (stored as JSON)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Serial link settings
    pub connection: ConnectionSettings,

    /// Initialization sequence settings
    pub init: InitConfig,
}

/// Connection/communication settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionSettings {
    /// Serial port name
    pub port: Option<String>,

    /// Baud rate
    pub baud_rate: u32,

    /// Reply timeout in seconds (0 = wait indefinitely)
    pub timeout_secs: f64,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            port: None,
            baud_rate: DEFAULT_BAUD_RATE,
            timeout_secs: 0.0,
        }
    }
}

impl ConnectionSettings {
    /// Validate and convert into a protocol-level connection config
    pub fn to_connection_config(&self) -> Result<ConnectionConfig, ProtocolError> {
        let port_name = self
            .port
            .clone()
            .filter(|p| !p.is_empty())
            .ok_or_else(|| ProtocolError::Config("no serial port configured".to_string()))?;
        self.for_port(port_name)
    }

    /// Same settings, applied to `port_name` instead of the configured port
    pub fn for_port(
        &self,
        port_name: impl Into<String>,
    ) -> Result<ConnectionConfig, ProtocolError> {
        if self.baud_rate == 0 {
            return Err(ProtocolError::Config("baud rate must be non-zero".to_string()));
        }

        let timeout = Duration::try_from_secs_f64(self.timeout_secs).map_err(|e| {
            ProtocolError::Config(format!("invalid timeout {}: {e}", self.timeout_secs))
        })?;

        Ok(ConnectionConfig {
            port_name: port_name.into(),
            baud_rate: self.baud_rate,
            timeout,
        })
    }
}

/// Initialization sequence settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InitConfig {
    /// Internal sync frequency in hertz
    pub sync_frequency_hz: u32,

    /// Whether a failed step stops the sequence
    pub failure_policy: FailurePolicy,
}

impl Default for InitConfig {
    fn default() -> Self {
        Self {
            sync_frequency_hz: DEFAULT_SYNC_FREQUENCY_HZ,
            failure_policy: FailurePolicy::Continue,
        }
    }
}

impl SessionConfig {
    /// Set the serial port
    pub fn with_port(mut self, port: impl Into<String>) -> Self {
        self.connection.port = Some(port.into());
        self
    }

    /// Load configuration from a JSON file.
    ///
    /// File access errors surface as `ProtocolError::IoError`, malformed JSON
    /// as `ProtocolError::Config`.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ProtocolError> {
        let content = fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| ProtocolError::Config(format!("invalid config file: {e}")))
    }

    /// Save configuration as pretty-printed JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ProtocolError> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| ProtocolError::Config(e.to_string()))?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Check values that cannot be caught by deserialization
    pub fn validate(&self) -> Result<(), ProtocolError> {
        if self.init.sync_frequency_hz == 0 {
            return Err(ProtocolError::Config(
                "sync frequency must be non-zero".to_string(),
            ));
        }
        if self.connection.baud_rate == 0 {
            return Err(ProtocolError::Config("baud rate must be non-zero".to_string()));
        }
        if !self.connection.timeout_secs.is_finite() || self.connection.timeout_secs < 0.0 {
            return Err(ProtocolError::Config(format!(
                "invalid timeout {}",
                self.connection.timeout_secs
            )));
        }
        Ok(())
    }
}
