//! Scripted meter double shared by the integration tests

#![allow(dead_code)]

use cs2000_core::protocol::{Connection, ConnectionConfig};
use std::collections::{HashMap, VecDeque};
use std::io::{self, Read, Write};
use std::sync::{Arc, Mutex};
use tracing_subscriber::EnvFilter;

/// Route library logs through the test harness; `cargo test -- --nocapture`
/// shows the TX/RX trace
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new("debug"))
        .with_test_writer()
        .try_init();
}

#[derive(Default)]
struct MockState {
    /// Command line (without LF) -> reply lines queued when it arrives
    script: HashMap<String, Vec<String>>,
    /// Bytes written by the host
    sent: Vec<u8>,
    /// Partially written line
    pending: Vec<u8>,
    /// Reply bytes not yet read
    recv_buffer: VecDeque<u8>,
    fail_on_send: bool,
}

/// Mock meter: replies to each complete command line from a script.
///
/// Cloning shares state, so a test can keep a handle after boxing one clone
/// into a connection.
#[derive(Clone, Default)]
pub struct MockDevice {
    state: Arc<Mutex<MockState>>,
}

impl MockDevice {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reply with `replies` (each already LF-terminated) whenever `command` arrives
    pub fn on(self, command: &str, replies: &[&str]) -> Self {
        self.state.lock().unwrap().script.insert(
            command.to_string(),
            replies.iter().map(|r| r.to_string()).collect(),
        );
        self
    }

    /// Make every write fail
    pub fn failing_writes(self) -> Self {
        self.state.lock().unwrap().fail_on_send = true;
        self
    }

    /// Everything the host wrote, as text
    pub fn sent(&self) -> String {
        String::from_utf8_lossy(&self.state.lock().unwrap().sent).into_owned()
    }

    /// Command lines the host wrote, in order
    pub fn sent_lines(&self) -> Vec<String> {
        self.sent().lines().map(str::to_string).collect()
    }

    pub fn connect(&self) -> Connection {
        self.connect_with(ConnectionConfig::new("mock"))
    }

    pub fn connect_with(&self, config: ConnectionConfig) -> Connection {
        init_logging();
        Connection::from_transport(config, Box::new(self.clone()))
    }
}

impl Read for MockDevice {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut state = self.state.lock().unwrap();
        let mut n = 0;
        while n < buf.len() {
            match state.recv_buffer.pop_front() {
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

impl Write for MockDevice {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut state = self.state.lock().unwrap();
        if state.fail_on_send {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "Serial write failed"));
        }
        state.sent.extend_from_slice(buf);
        for &b in buf {
            if b == b'\n' {
                let line = String::from_utf8_lossy(&state.pending).into_owned();
                state.pending.clear();
                if let Some(replies) = state.script.get(&line).cloned() {
                    for reply in replies {
                        state.recv_buffer.extend(reply.bytes());
                    }
                }
            } else {
                state.pending.push(b);
            }
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
