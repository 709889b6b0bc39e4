//! CS2000 session: initialization, measurement and value reads

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::values::{ChromaticityLuminance, Luminance, SyncModeReading};
use crate::config::{InitConfig, SessionConfig};
use crate::protocol::{Command, Connection, MeasurementData, ProtocolError, Response};

/// What to do when a step fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Log the failure and carry on with the next step
    #[default]
    Continue,
    /// Stop at the first failure and return it
    Abort,
}

/// Steps of the initialization sequence, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InitStep {
    /// `RMTS,1`
    SetRemoteMode,
    /// `MSWE,0`
    DisableMeasureKey,
    /// `SCMS,1,<freq>00`
    SetSyncMode,
    /// `SCMR`
    ReadSyncMode,
}

impl InitStep {
    /// All steps in the order they run
    pub const ALL: [InitStep; 4] = [
        InitStep::SetRemoteMode,
        InitStep::DisableMeasureKey,
        InitStep::SetSyncMode,
        InitStep::ReadSyncMode,
    ];
}

impl std::fmt::Display for InitStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(match self {
            InitStep::SetRemoteMode => "remote mode setting",
            InitStep::DisableMeasureKey => "measure key disable",
            InitStep::SetSyncMode => "sync mode setting",
            InitStep::ReadSyncMode => "sync mode read",
        })
    }
}

/// Outcome of one initialization step
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepOutcome {
    /// Which step
    pub step: InitStep,
    /// Error message, `None` on success
    pub error: Option<String>,
}

/// Result of running the initialization sequence
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InitReport {
    /// One entry per executed step
    pub steps: Vec<StepOutcome>,
    /// Sync setting read back at the end, when that read succeeded
    pub sync: Option<SyncModeReading>,
}

impl InitReport {
    /// True when every step succeeded
    pub fn is_success(&self) -> bool {
        self.steps.iter().all(|s| s.error.is_none())
    }

    /// Steps that failed
    pub fn failures(&self) -> impl Iterator<Item = &StepOutcome> {
        self.steps.iter().filter(|s| s.error.is_some())
    }
}

/// Result of a measurement trigger
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MeasureReport {
    /// Measurement time (seconds) from the acceptance reply, if the meter sent one
    pub measurement_time: Option<String>,
}

/// A session with one meter over one connection
#[derive(Debug)]
pub struct Cs2000 {
    conn: Connection,
    policy: FailurePolicy,
}

impl Cs2000 {
    /// Wrap an open connection
    pub fn new(conn: Connection) -> Self {
        Self {
            conn,
            policy: FailurePolicy::default(),
        }
    }

    /// Open the configured port and apply the configured failure policy
    pub fn open(config: &SessionConfig) -> Result<Self, ProtocolError> {
        let conn = Connection::open(config.connection.to_connection_config()?)?;
        Ok(Self::new(conn).with_policy(config.init.failure_policy))
    }

    /// Set the policy used by `get_luminance` / `get_chromaticity_and_luminance`.
    ///
    /// [`Cs2000::initialize`] replaces it with the policy of the `InitConfig`
    /// it runs, so one session follows a single policy.
    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Active failure policy
    pub fn policy(&self) -> FailurePolicy {
        self.policy
    }

    /// Underlying connection
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Underlying connection, for raw exchanges
    pub fn connection_mut(&mut self) -> &mut Connection {
        &mut self.conn
    }

    /// Release the port
    pub fn close(&mut self) -> Result<(), ProtocolError> {
        self.conn.close().inspect_err(|e| warn!("{e}"))
    }

    /// Send a command, read one reply and require `OK00`
    fn expect_ok(&mut self, command: Command) -> Result<Response, ProtocolError> {
        let name = command.to_line();
        self.conn.transact(&command)?.check(&name)
    }

    /// Put the meter under host control (`RMTS,1`)
    pub fn set_remote_mode(&mut self) -> Result<(), ProtocolError> {
        match self.expect_ok(Command::SetRemoteMode) {
            Ok(_) => {
                info!("Remote mode setting OK");
                Ok(())
            }
            Err(e) => {
                warn!("Remote mode setting error: {e}");
                Err(e)
            }
        }
    }

    /// Lock out the front-panel MEASURE key (`MSWE,0`)
    pub fn disable_measure_key(&mut self) -> Result<(), ProtocolError> {
        match self.expect_ok(Command::DisableMeasureKey) {
            Ok(_) => {
                info!("Measure key disabled");
                Ok(())
            }
            Err(e) => {
                warn!("Measure key disable error: {e}");
                Err(e)
            }
        }
    }

    /// Select internal sync at `frequency_hz` (`SCMS,1,<freq>00`)
    pub fn set_sync_mode(&mut self, frequency_hz: u32) -> Result<(), ProtocolError> {
        match self.expect_ok(Command::SetSyncMode { frequency_hz }) {
            Ok(_) => {
                info!("Sync mode is internal, frequency {frequency_hz}Hz");
                Ok(())
            }
            Err(e) => {
                warn!("Sync mode setting error: {e}");
                Err(e)
            }
        }
    }

    /// Read back the sync setting (`SCMR`)
    pub fn read_sync_mode(&mut self) -> Result<SyncModeReading, ProtocolError> {
        let command = Command::ReadSyncMode;
        let result = self.expect_ok(command).and_then(|resp| {
            SyncModeReading::from_payload(&command.to_line(), resp.payload())
        });

        match result {
            Ok(reading) => {
                info!("Sync mode is {}", reading.mode);
                if let Some(hz) = reading.frequency_hz() {
                    info!("Sync frequency is {hz}Hz");
                }
                Ok(reading)
            }
            Err(e) => {
                warn!("Sync mode read error: {e}");
                Err(e)
            }
        }
    }

    /// Run remote mode, key lock, sync setting and sync read-back in order.
    ///
    /// With [`FailurePolicy::Continue`] every step runs and failures are
    /// collected in the report; with [`FailurePolicy::Abort`] the first
    /// failure is returned. The policy then also governs later
    /// trigger-then-read calls.
    pub fn initialize(&mut self, init: &InitConfig) -> Result<InitReport, ProtocolError> {
        self.policy = init.failure_policy;
        let mut report = InitReport::default();

        for step in InitStep::ALL {
            let result = match step {
                InitStep::SetRemoteMode => self.set_remote_mode(),
                InitStep::DisableMeasureKey => self.disable_measure_key(),
                InitStep::SetSyncMode => self.set_sync_mode(init.sync_frequency_hz),
                InitStep::ReadSyncMode => self.read_sync_mode().map(|reading| {
                    report.sync = Some(reading);
                }),
            };

            match result {
                Ok(()) => report.steps.push(StepOutcome { step, error: None }),
                Err(e) if init.failure_policy == FailurePolicy::Abort => return Err(e),
                Err(e) => report.steps.push(StepOutcome {
                    step,
                    error: Some(e.to_string()),
                }),
            }
        }

        Ok(report)
    }

    /// Trigger a measurement (`MEAS,1`).
    ///
    /// The meter answers twice: once when the command is accepted and once
    /// when the measurement has finished. Both replies are always read and
    /// checked independently; the first failure is returned.
    pub fn measure(&mut self) -> Result<MeasureReport, ProtocolError> {
        let command = Command::Measure;
        let name = command.to_line();
        self.conn
            .send_command(&command)
            .inspect_err(|e| warn!("Measure command error: {e}"))?;

        let accepted = self
            .conn
            .receive()
            .and_then(|resp| resp.check(&name))
            .inspect_err(|e| warn!("Measure command error: {e}"));

        let finished = self
            .conn
            .receive()
            .and_then(|resp| resp.check(&name))
            .inspect_err(|e| warn!("Measure wait error: {e}"));

        let accepted = accepted?;
        finished?;

        Ok(MeasureReport {
            measurement_time: accepted.field(0).map(str::to_string),
        })
    }

    fn read_measurement(&mut self, data: MeasurementData) -> Result<Vec<String>, ProtocolError> {
        let command = Command::ReadMeasurement(data);
        let name = command.to_line();
        let resp = self.expect_ok(command)?;
        Ok(resp.require_payload(&name, data.payload_len())?.to_vec())
    }

    /// Read luminance of the last measurement (`MEDR,2,0,101`)
    pub fn read_luminance(&mut self) -> Result<Luminance, ProtocolError> {
        match self.read_measurement(MeasurementData::Luminance) {
            Ok(mut fields) => Ok(Luminance {
                lv: fields.swap_remove(0),
            }),
            Err(e) => {
                warn!("Luminance read error: {e}");
                Err(e)
            }
        }
    }

    /// Read chromaticity x, y and luminance of the last measurement (`MEDR,2,0,2`)
    pub fn read_chromaticity_and_luminance(
        &mut self,
    ) -> Result<ChromaticityLuminance, ProtocolError> {
        match self.read_measurement(MeasurementData::ChromaticityLuminance) {
            Ok(fields) => {
                let [x, y, lv]: [String; 3] = fields.try_into().map_err(|_| {
                    ProtocolError::InvalidResponse {
                        command: Command::ReadMeasurement(MeasurementData::ChromaticityLuminance)
                            .to_line(),
                        reason: "expected 3 payload fields".to_string(),
                    }
                })?;
                let reading = ChromaticityLuminance { x, y, lv };
                info!("X, Y, LV are {} {} {}", reading.x, reading.y, reading.lv);
                Ok(reading)
            }
            Err(e) => {
                warn!("Chromaticity read error: {e}");
                Err(e)
            }
        }
    }

    /// Trigger a measurement; under `Continue` a failed trigger is logged
    /// and the caller goes on to read anyway
    fn trigger_before_read(&mut self) -> Result<(), ProtocolError> {
        match self.measure() {
            Ok(_) => Ok(()),
            Err(e) if self.policy == FailurePolicy::Abort => Err(e),
            Err(e) => {
                warn!("Reading after failed measurement: {e}");
                Ok(())
            }
        }
    }

    /// Measure, then read luminance
    pub fn get_luminance(&mut self) -> Result<Luminance, ProtocolError> {
        self.trigger_before_read()?;
        self.read_luminance()
    }

    /// Measure, then read chromaticity and luminance
    pub fn get_chromaticity_and_luminance(
        &mut self,
    ) -> Result<ChromaticityLuminance, ProtocolError> {
        self.trigger_before_read()?;
        self.read_chromaticity_and_luminance()
    }
}
