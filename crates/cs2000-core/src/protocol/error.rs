//! Protocol errors

use thiserror::Error;

/// Errors that can occur during protocol communication
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Connect failed on {port}: {reason}")]
    ConnectFailed { port: String, reason: String },

    #[error("Close failed: {0}")]
    CloseFailed(String),

    #[error("Send failed: {0}")]
    SendFailed(String),

    #[error("Receive failed: {0}")]
    ReceiveFailed(String),

    #[error("Device returned status {code} for {command}")]
    DeviceStatus { command: String, code: String },

    #[error("Invalid response to {command}: {reason}")]
    InvalidResponse { command: String, reason: String },

    #[error("Not connected to device")]
    NotConnected,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl ProtocolError {
    /// Device status code, when the device itself reported the failure
    pub fn device_code(&self) -> Option<&str> {
        match self {
            ProtocolError::DeviceStatus { code, .. } => Some(code.as_str()),
            _ => None,
        }
    }
}
