//! Serial Protocol Communication
//!
//! Implements the CS2000 remote-control protocol: ASCII commands terminated by
//! a line feed, answered by a single comma-separated line whose first field is
//! a status code.

pub mod commands;
mod connection;
mod error;
mod response;
pub mod serial;

pub use commands::{Command, MeasurementData};
pub use connection::{Connection, ConnectionConfig, ConnectionState, Transport};
pub use error::ProtocolError;
pub use response::Response;
pub use serial::{configure_port, list_ports, open_port, PortInfo};

/// Default baud rate for the meter's RS-232/USB link
pub const DEFAULT_BAUD_RATE: u32 = 115200;

/// Default read timeout in seconds (0 = block until a line arrives)
pub const DEFAULT_TIMEOUT_SECS: u64 = 0;

/// Status field value signalling success
pub const STATUS_OK: &str = "OK00";

/// Maximum reply line length accepted before the line is rejected
pub const MAX_LINE_LENGTH: usize = 4096;
