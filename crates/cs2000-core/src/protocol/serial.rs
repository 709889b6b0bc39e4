//! Serial port handling
//!
//! Provides port discovery and low-level serial port access for the meter.

use serde::Serialize;
use serialport::{SerialPort, SerialPortInfo, SerialPortType};
use std::collections::HashMap;
#[cfg(target_os = "linux")]
use std::fs;
use std::time::Duration;

use super::ProtocolError;

/// Information about an available serial port
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PortInfo {
    /// Port name (e.g., "/dev/ttyUSB0" or "COM3")
    pub name: String,

    /// USB vendor ID (if USB device)
    pub vid: Option<u16>,

    /// USB product ID (if USB device)
    pub pid: Option<u16>,

    /// Manufacturer name (if available)
    pub manufacturer: Option<String>,

    /// Product name (if available)
    pub product: Option<String>,

    /// Serial number (if available)
    pub serial_number: Option<String>,
}

impl PortInfo {
    fn bare(name: String) -> Self {
        Self {
            name,
            vid: None,
            pid: None,
            manufacturer: None,
            product: None,
            serial_number: None,
        }
    }

    /// Human-readable description: the USB product string, else the port name
    pub fn description(&self) -> &str {
        self.product.as_deref().unwrap_or(&self.name)
    }

    /// Manufacturer string, or "n/a" when the OS reports none
    pub fn manufacturer_or_na(&self) -> &str {
        self.manufacturer.as_deref().unwrap_or("n/a")
    }
}

impl From<SerialPortInfo> for PortInfo {
    fn from(info: SerialPortInfo) -> Self {
        match info.port_type {
            SerialPortType::UsbPort(usb_info) => Self {
                name: info.port_name,
                vid: Some(usb_info.vid),
                pid: Some(usb_info.pid),
                manufacturer: usb_info.manufacturer,
                product: usb_info.product,
                serial_number: usb_info.serial_number,
            },
            _ => Self::bare(info.port_name),
        }
    }
}

/// Sort key so that ttyACM* ports come first, then ttyUSB*, then the rest.
/// Numeric suffixes sort numerically.
fn port_sort_key(name: &str) -> (u8, usize, String) {
    let basename = name.rsplit('/').next().unwrap_or(name);
    if let Some(rest) = basename.strip_prefix("ttyACM") {
        let num = rest.parse::<usize>().unwrap_or(usize::MAX);
        return (0, num, basename.to_string());
    }
    if let Some(rest) = basename.strip_prefix("ttyUSB") {
        let num = rest.parse::<usize>().unwrap_or(usize::MAX);
        return (1, num, basename.to_string());
    }
    (2, 0, basename.to_string())
}

/// List all available serial ports, with /dev fallbacks and deterministic ordering.
///
/// An empty list is a valid answer; enumeration errors degrade to it.
pub fn list_ports() -> Vec<PortInfo> {
    let mut map: HashMap<String, PortInfo> = HashMap::new();
    match serialport::available_ports() {
        Ok(ports) => {
            for info in ports {
                let p = PortInfo::from(info);
                map.entry(p.name.clone()).or_insert(p);
            }
        }
        Err(e) => tracing::debug!("serial port enumeration failed: {e}"),
    }

    // Linux-only: pick up USB serial nodes the enumeration API missed
    #[cfg(target_os = "linux")]
    if let Ok(entries) = fs::read_dir("/dev") {
        for entry in entries.flatten() {
            if let Some(fname) = entry.file_name().to_str() {
                if fname.starts_with("ttyACM") || fname.starts_with("ttyUSB") {
                    let full = format!("/dev/{}", fname);
                    map.entry(full.clone())
                        .or_insert_with(|| PortInfo::bare(full));
                }
            }
        }
    }

    let mut v: Vec<PortInfo> = map.into_values().collect();
    v.sort_by_key(|p| port_sort_key(&p.name));
    v
}

/// Open a serial port.
///
/// `poll_timeout` is the per-read timeout handed to the OS; overall reply
/// deadlines are enforced by the connection.
pub fn open_port(
    name: &str,
    baud_rate: u32,
    poll_timeout: Duration,
) -> Result<Box<dyn SerialPort>, ProtocolError> {
    if name.is_empty() {
        return Err(ProtocolError::ConnectFailed {
            port: String::new(),
            reason: "port name cannot be empty".to_string(),
        });
    }

    serialport::new(name, baud_rate)
        .timeout(poll_timeout)
        .open()
        .map_err(|e| ProtocolError::ConnectFailed {
            port: name.to_string(),
            reason: e.to_string(),
        })
}

/// Configure a serial port for meter communication (8N1, no flow control)
pub fn configure_port(port: &mut dyn SerialPort) -> Result<(), ProtocolError> {
    let name = port.name().unwrap_or_default();
    let fail = |e: serialport::Error| ProtocolError::ConnectFailed {
        port: name.clone(),
        reason: e.to_string(),
    };

    port.set_data_bits(serialport::DataBits::Eight).map_err(fail)?;
    port.set_parity(serialport::Parity::None).map_err(fail)?;
    port.set_stop_bits(serialport::StopBits::One).map_err(fail)?;
    port.set_flow_control(serialport::FlowControl::None)
        .map_err(fail)?;

    // Drop anything left over from a previous session
    port.clear(serialport::ClearBuffer::All).map_err(fail)?;

    Ok(())
}
