//! # CS2000 Core Library
//!
//! Core functionality for remote control of CS2000-class luminance meters.

#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//!
//! This library provides:
//! - Serial port discovery and connection lifecycle
//! - The ASCII command/response protocol (`OK00` status classification)
//! - An instrument session with initialization, measurement and value reads
//! - JSON session configuration
//! - A simulated meter for running without hardware
//!
//! ## Example
//!
//! ```rust,ignore
//! use cs2000_core::{config::SessionConfig, instrument::Cs2000};
//!
//! let config = SessionConfig::default().with_port("/dev/ttyUSB0");
//! let mut meter = Cs2000::open(&config)?;
//! meter.initialize(&config.init)?;
//!
//! let lv = meter.get_luminance()?;
//! println!("Lv: {} cd/m²", lv.lv);
//!
//! meter.close()?;
//! ```

pub mod config;
pub mod instrument;
pub mod protocol;
pub mod simulator;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::{ConnectionSettings, InitConfig, SessionConfig};
    pub use crate::instrument::{
        ChromaticityLuminance, Cs2000, FailurePolicy, InitReport, Luminance, MeasureReport,
        SyncMode, SyncModeReading,
    };
    pub use crate::protocol::{
        list_ports, Command, Connection, ConnectionConfig, PortInfo, ProtocolError, Response,
    };
    pub use crate::simulator::SimulatedCs2000;
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
