//! Simulated meter for running without hardware
//!
//! Answers the remote-control protocol over an in-memory byte stream. Readings
//! jitter slightly around a configurable target so repeated measurements look
//! like a real light source.
//!
//! Replies use `OK00` for success and `ER00` for anything the simulated meter
//! refuses: unknown or malformed commands, commands other than `RMTS` outside
//! remote mode, and data reads before any measurement.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::{HashMap, VecDeque};
use std::io::{self, Read, Write};

use crate::instrument::SyncMode;
use crate::protocol::{Connection, ConnectionConfig, STATUS_OK};

/// Status sent for refused commands
pub const STATUS_REFUSED: &str = "ER00";

/// Port name reported by simulated connections
pub const SIMULATED_PORT: &str = "simulated";

#[derive(Debug, Clone, Copy)]
struct Reading {
    x: f64,
    y: f64,
    lv: f64,
}

/// Simulated CS2000 that implements `Read + Write`
pub struct SimulatedCs2000 {
    /// Bytes written by the host, up to the next line feed
    inbound: Vec<u8>,
    /// Reply bytes waiting to be read by the host
    outbound: VecDeque<u8>,
    remote: bool,
    measure_key_enabled: bool,
    sync_mode: SyncMode,
    /// Sync frequency in hundredths of a hertz
    sync_frequency: u32,
    /// Nominal source the readings jitter around
    target: Reading,
    last: Option<Reading>,
    /// Keyword -> forced status code
    forced: HashMap<String, String>,
    rng: StdRng,
}

impl Default for SimulatedCs2000 {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedCs2000 {
    /// Create a simulator with a random seed
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Create a simulator with reproducible readings
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            inbound: Vec::new(),
            outbound: VecDeque::new(),
            remote: false,
            measure_key_enabled: true,
            sync_mode: SyncMode::NoSync,
            sync_frequency: 0,
            // D65 white at a typical display luminance
            target: Reading {
                x: 0.3127,
                y: 0.3290,
                lv: 120.0,
            },
            last: None,
            forced: HashMap::new(),
            rng,
        }
    }

    /// Set the nominal source readings jitter around
    pub fn with_target(mut self, x: f64, y: f64, lv: f64) -> Self {
        self.target = Reading { x, y, lv };
        self
    }

    /// Answer every command with `keyword` using `code` instead of the normal reply
    pub fn force_status(mut self, keyword: &str, code: &str) -> Self {
        self.forced.insert(keyword.to_string(), code.to_string());
        self
    }

    /// Wrap the simulator in a connection with default settings
    pub fn connect(self) -> Connection {
        self.connect_with(ConnectionConfig::new(SIMULATED_PORT))
    }

    /// Wrap the simulator in a connection using the given settings
    pub fn connect_with(self, config: ConnectionConfig) -> Connection {
        Connection::from_transport(config, Box::new(self))
    }

    /// Whether the simulated meter is in remote mode
    pub fn is_remote(&self) -> bool {
        self.remote
    }

    /// Whether the front-panel MEASURE key is enabled
    pub fn measure_key_enabled(&self) -> bool {
        self.measure_key_enabled
    }

    fn reply(&mut self, fields: &[&str]) {
        self.outbound.extend(fields.join(",").bytes());
        self.outbound.push_back(b'\n');
    }

    fn refuse(&mut self) {
        self.reply(&[STATUS_REFUSED]);
    }

    fn handle_line(&mut self, line: &str) {
        let line = line.trim_end_matches('\r');
        let fields: Vec<&str> = line.split(',').collect();
        let keyword = fields[0];
        let args = &fields[1..];
        tracing::trace!(command = line, "simulator received");

        if let Some(code) = self.forced.get(keyword).cloned() {
            self.reply(&[code.as_str()]);
            // A refused trigger sends no completion line
            if keyword == "MEAS" && code == STATUS_OK {
                self.reply(&[STATUS_OK]);
            }
            return;
        }

        if keyword != "RMTS" && !self.remote {
            self.refuse();
            return;
        }

        match (keyword, args) {
            ("RMTS", ["1"]) => {
                self.remote = true;
                self.reply(&[STATUS_OK]);
            }
            ("RMTS", ["0"]) => {
                self.remote = false;
                self.reply(&[STATUS_OK]);
            }
            ("MSWE", [flag @ ("0" | "1")]) => {
                self.measure_key_enabled = *flag == "1";
                self.reply(&[STATUS_OK]);
            }
            ("SCMS", ["0"]) => self.set_sync(SyncMode::NoSync, 0),
            ("SCMS", ["2"]) => self.set_sync(SyncMode::External, 0),
            ("SCMS", ["1", freq]) => match freq.parse::<u32>() {
                Ok(f) if f > 0 => self.set_sync(SyncMode::Internal, f),
                _ => self.refuse(),
            },
            ("SCMR", []) => {
                let mode = self.sync_mode.code();
                if self.sync_mode == SyncMode::Internal {
                    let freq = self.sync_frequency.to_string();
                    self.reply(&[STATUS_OK, mode, freq.as_str()]);
                } else {
                    self.reply(&[STATUS_OK, mode]);
                }
            }
            ("MEAS", ["1"]) => {
                let reading = self.sample();
                self.last = Some(reading);
                // Measurement time in seconds, then completion
                self.reply(&[STATUS_OK, "1"]);
                self.reply(&[STATUS_OK]);
            }
            ("MEDR", ["2", "0", selector]) => match (self.last, *selector) {
                (Some(r), "101") => {
                    let lv = format!("{:.4}", r.lv);
                    self.reply(&[STATUS_OK, lv.as_str()]);
                }
                (Some(r), "2") => {
                    let x = format!("{:.4}", r.x);
                    let y = format!("{:.4}", r.y);
                    let lv = format!("{:.4}", r.lv);
                    self.reply(&[STATUS_OK, x.as_str(), y.as_str(), lv.as_str()]);
                }
                _ => self.refuse(),
            },
            _ => self.refuse(),
        }
    }

    fn set_sync(&mut self, mode: SyncMode, frequency: u32) {
        self.sync_mode = mode;
        self.sync_frequency = frequency;
        self.reply(&[STATUS_OK]);
    }

    fn sample(&mut self) -> Reading {
        Reading {
            x: self.target.x + self.rng.gen_range(-0.0005..0.0005),
            y: self.target.y + self.rng.gen_range(-0.0005..0.0005),
            lv: self.target.lv * (1.0 + self.rng.gen_range(-0.005..0.005)),
        }
    }
}

impl Read for SimulatedCs2000 {
    /// Returns 0 when no reply is pending: the simulated meter never speaks
    /// unprompted, so waiting longer would not help.
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut n = 0;
        while n < buf.len() {
            match self.outbound.pop_front() {
                Some(b) => {
                    buf[n] = b;
                    n += 1;
                }
                None => break,
            }
        }
        Ok(n)
    }
}

impl Write for SimulatedCs2000 {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        for &b in buf {
            if b == b'\n' {
                let line = String::from_utf8_lossy(&self.inbound).into_owned();
                self.inbound.clear();
                self.handle_line(&line);
            } else {
                self.inbound.push(b);
            }
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
