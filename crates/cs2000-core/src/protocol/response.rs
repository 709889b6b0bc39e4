//! Reply line parsing
//!
//! Every reply is one line of comma-separated fields. Field 0 is the status
//! code; the rest is command-specific payload.

use super::{ProtocolError, STATUS_OK};

/// A single parsed reply line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    fields: Vec<String>,
}

impl Response {
    /// Parse a decoded line, stripping the trailing line feed (and carriage return)
    pub fn parse(line: &str) -> Self {
        let line = line.strip_suffix('\n').unwrap_or(line);
        let line = line.strip_suffix('\r').unwrap_or(line);
        Self {
            fields: line.split(',').map(str::to_string).collect(),
        }
    }

    /// Decode raw bytes as text and parse them
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ProtocolError> {
        let text = std::str::from_utf8(bytes).map_err(|e| {
            ProtocolError::ReceiveFailed(format!("reply is not valid text: {e}"))
        })?;
        Ok(Self::parse(text))
    }

    /// All fields, status first
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Status code (first field)
    pub fn status(&self) -> &str {
        self.fields.first().map(String::as_str).unwrap_or("")
    }

    /// True when the status field is `OK00`
    pub fn is_ok(&self) -> bool {
        self.status() == STATUS_OK
    }

    /// Payload fields following the status
    pub fn payload(&self) -> &[String] {
        self.fields.get(1..).unwrap_or(&[])
    }

    /// Payload field by index (0 = first field after the status)
    pub fn field(&self, index: usize) -> Option<&str> {
        self.payload().get(index).map(String::as_str)
    }

    /// Turn a non-`OK00` status into a `DeviceStatus` error
    pub fn check(self, command: &str) -> Result<Self, ProtocolError> {
        if self.is_ok() {
            Ok(self)
        } else {
            Err(ProtocolError::DeviceStatus {
                command: command.to_string(),
                code: self.status().to_string(),
            })
        }
    }

    /// Require at least `count` payload fields
    pub fn require_payload(&self, command: &str, count: usize) -> Result<&[String], ProtocolError> {
        let payload = self.payload();
        if payload.len() < count {
            return Err(ProtocolError::InvalidResponse {
                command: command.to_string(),
                reason: format!("expected {count} payload fields, got {}", payload.len()),
            });
        }
        Ok(&payload[..count])
    }
}

impl std::fmt::Display for Response {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.fields.join(","))
    }
}
