//! Connection management
//!
//! Handles the connection lifecycle and the raw write/read-line exchange with
//! the meter. The protocol is strictly half-duplex: one command, then its
//! reply line(s), before the next command.

use serde::{Deserialize, Serialize};
use std::io::{ErrorKind, Read, Write};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::{
    serial::{configure_port, open_port},
    Command, ProtocolError, Response, DEFAULT_BAUD_RATE, DEFAULT_TIMEOUT_SECS, MAX_LINE_LENGTH,
};

/// OS-level read timeout used while waiting for a reply line
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Byte stream the protocol runs over.
///
/// Implemented for anything readable and writable, so a `serialport` handle,
/// the simulator and test doubles all plug in the same way.
pub trait Transport: Read + Write + Send {}

impl<T: Read + Write + Send + ?Sized> Transport for T {}

/// Connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionState {
    /// Port open and usable
    Connected,
    /// Port released
    Closed,
}

/// Connection configuration
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionConfig {
    /// Serial port name
    pub port_name: String,
    /// Baud rate
    pub baud_rate: u32,
    /// Reply timeout; zero blocks until a line arrives
    pub timeout: Duration,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            port_name: String::new(),
            baud_rate: DEFAULT_BAUD_RATE,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl ConnectionConfig {
    /// Configuration for the named port with default baud rate and timeout
    pub fn new(port_name: impl Into<String>) -> Self {
        Self {
            port_name: port_name.into(),
            ..Self::default()
        }
    }

    /// Overall reply deadline, `None` when reads block indefinitely
    pub fn read_deadline(&self) -> Option<Duration> {
        if self.timeout.is_zero() {
            None
        } else {
            Some(self.timeout)
        }
    }

    fn poll_timeout(&self) -> Duration {
        match self.read_deadline() {
            Some(t) => t.min(POLL_INTERVAL),
            None => POLL_INTERVAL,
        }
    }
}

/// An open link to a meter
pub struct Connection {
    /// Byte stream handle, `None` once closed
    port: Option<Box<dyn Transport>>,
    /// Current connection state
    state: ConnectionState,
    /// Connection configuration
    config: ConnectionConfig,
    /// Metrics: cumulative bytes/lines sent & received
    tx_bytes: u64,
    rx_bytes: u64,
    tx_lines: u64,
    rx_lines: u64,
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("port_name", &self.config.port_name)
            .field("state", &self.state)
            .finish()
    }
}

impl Connection {
    /// Open and configure the serial port named in `config`
    pub fn open(config: ConnectionConfig) -> Result<Self, ProtocolError> {
        let mut port = open_port(&config.port_name, config.baud_rate, config.poll_timeout())
            .inspect_err(|e| warn!("{e}"))?;
        configure_port(port.as_mut()).inspect_err(|e| warn!("{e}"))?;

        info!(
            port = %config.port_name,
            baud_rate = config.baud_rate,
            "Connected to {}",
            config.port_name
        );
        Ok(Self::from_transport(config, Box::new(port)))
    }

    /// Wrap an already-open transport
    pub fn from_transport(config: ConnectionConfig, transport: Box<dyn Transport>) -> Self {
        Self {
            port: Some(transport),
            state: ConnectionState::Connected,
            config,
            tx_bytes: 0,
            rx_bytes: 0,
            tx_lines: 0,
            rx_lines: 0,
        }
    }

    /// Release the port. Closing twice reports `CloseFailed`.
    pub fn close(&mut self) -> Result<(), ProtocolError> {
        let mut port = self.port.take().ok_or_else(|| {
            ProtocolError::CloseFailed(format!("{} is not open", self.config.port_name))
        })?;
        self.state = ConnectionState::Closed;

        port.flush()
            .map_err(|e| ProtocolError::CloseFailed(e.to_string()))?;
        drop(port);

        info!("Port {} has been closed", self.config.port_name);
        Ok(())
    }

    /// Get current connection state
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Port name this connection was opened on
    pub fn port_name(&self) -> &str {
        &self.config.port_name
    }

    /// Connection configuration
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Get cumulative tx/rx bytes and line counters
    pub fn get_counters(&self) -> (u64, u64, u64, u64) {
        (self.tx_bytes, self.rx_bytes, self.tx_lines, self.rx_lines)
    }

    /// Write raw command bytes. No retry.
    pub fn send(&mut self, bytes: &[u8]) -> Result<(), ProtocolError> {
        let port = self.port.as_mut().ok_or(ProtocolError::NotConnected)?;

        port.write_all(bytes)
            .and_then(|_| port.flush())
            .map_err(|e| ProtocolError::SendFailed(e.to_string()))?;

        debug!(tx = %String::from_utf8_lossy(bytes).trim_end(), "sent");
        self.tx_bytes = self.tx_bytes.saturating_add(bytes.len() as u64);
        self.tx_lines = self.tx_lines.saturating_add(1);
        Ok(())
    }

    /// Encode and write a command
    pub fn send_command(&mut self, command: &Command) -> Result<(), ProtocolError> {
        self.send(&command.to_bytes())
    }

    /// Read one line-feed terminated reply and split it into fields.
    ///
    /// Blocks until the line arrives or the configured timeout elapses. A
    /// timeout too large to represent as an instant never expires.
    pub fn receive(&mut self) -> Result<Response, ProtocolError> {
        let deadline = self
            .config
            .read_deadline()
            .and_then(|t| Instant::now().checked_add(t).map(|at| (at, t)));
        let port = self.port.as_mut().ok_or(ProtocolError::NotConnected)?;

        let mut line = Vec::new();
        let mut byte = [0u8; 1];
        loop {
            if let Some((at, after)) = deadline {
                if Instant::now() >= at {
                    return Err(ProtocolError::ReceiveFailed(format!(
                        "timed out after {after:?} with {} bytes read",
                        line.len()
                    )));
                }
            }

            match port.read(&mut byte) {
                Ok(0) => {
                    return Err(ProtocolError::ReceiveFailed(if line.is_empty() {
                        "end of stream".to_string()
                    } else {
                        format!("end of stream after {} bytes", line.len())
                    }));
                }
                Ok(_) => {
                    line.push(byte[0]);
                    if byte[0] == b'\n' {
                        break;
                    }
                    if line.len() > MAX_LINE_LENGTH {
                        return Err(ProtocolError::ReceiveFailed(format!(
                            "reply exceeds {MAX_LINE_LENGTH} bytes"
                        )));
                    }
                }
                Err(e) if matches!(e.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock) => {
                    // Deadline is checked at the top of the loop
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => return Err(ProtocolError::ReceiveFailed(e.to_string())),
            }
        }

        self.rx_bytes = self.rx_bytes.saturating_add(line.len() as u64);
        self.rx_lines = self.rx_lines.saturating_add(1);

        let response = Response::from_bytes(&line)?;
        debug!(rx = %response, "received");
        Ok(response)
    }

    /// One command, one reply
    pub fn transact(&mut self, command: &Command) -> Result<Response, ProtocolError> {
        self.send_command(command)?;
        self.receive()
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        if self.port.take().is_some() {
            debug!("Dropping open connection on {}", self.config.port_name);
        }
    }
}
