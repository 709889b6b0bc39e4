//! Protocol commands
//!
//! Defines the remote-control commands understood by CS2000-class meters.

use serde::{Deserialize, Serialize};

/// Measurement data block requested by `MEDR`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MeasurementData {
    /// Luminance only (`MEDR,2,0,101`)
    Luminance,
    /// Chromaticity x, y and luminance (`MEDR,2,0,2`)
    ChromaticityLuminance,
}

impl MeasurementData {
    /// Colorimetric data selector sent as the last `MEDR` argument
    pub fn selector(&self) -> &'static str {
        match self {
            MeasurementData::Luminance => "101",
            MeasurementData::ChromaticityLuminance => "2",
        }
    }

    /// Number of payload fields a successful reply carries
    pub fn payload_len(&self) -> usize {
        match self {
            MeasurementData::Luminance => 1,
            MeasurementData::ChromaticityLuminance => 3,
        }
    }
}

/// Protocol commands for meter communication
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    /// Enter remote mode (`RMTS,1`)
    SetRemoteMode,

    /// Disable the front-panel MEASURE key (`MSWE,0`)
    DisableMeasureKey,

    /// Internal sync at the given frequency (`SCMS,1,<freq>00`)
    SetSyncMode {
        /// Sync frequency in whole hertz
        frequency_hz: u32,
    },

    /// Read back the sync setting (`SCMR`)
    ReadSyncMode,

    /// Trigger a measurement (`MEAS,1`)
    Measure,

    /// Read measured data (`MEDR,2,0,<selector>`)
    ReadMeasurement(MeasurementData),
}

impl Command {
    /// Command keyword
    pub fn keyword(&self) -> &'static str {
        match self {
            Command::SetRemoteMode => "RMTS",
            Command::DisableMeasureKey => "MSWE",
            Command::SetSyncMode { .. } => "SCMS",
            Command::ReadSyncMode => "SCMR",
            Command::Measure => "MEAS",
            Command::ReadMeasurement(_) => "MEDR",
        }
    }

    /// Comma-separated argument fields following the keyword
    pub fn args(&self) -> Vec<String> {
        match self {
            Command::SetRemoteMode => vec!["1".into()],
            Command::DisableMeasureKey => vec!["0".into()],
            // Frequency is transmitted in hundredths of a hertz
            Command::SetSyncMode { frequency_hz } => {
                vec!["1".into(), format!("{frequency_hz}00")]
            }
            Command::ReadSyncMode => Vec::new(),
            Command::Measure => vec!["1".into()],
            Command::ReadMeasurement(data) => {
                vec!["2".into(), "0".into(), data.selector().into()]
            }
        }
    }

    /// Number of reply lines the meter sends for this command
    pub fn reply_count(&self) -> usize {
        match self {
            // Acceptance, then completion
            Command::Measure => 2,
            _ => 1,
        }
    }

    /// Command line without terminator, e.g. `MEDR,2,0,101`
    pub fn to_line(&self) -> String {
        let mut line = self.keyword().to_string();
        for arg in self.args() {
            line.push(',');
            line.push_str(&arg);
        }
        line
    }

    /// Convert command to bytes, appending the line feed terminator
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = self.to_line().into_bytes();
        bytes.push(b'\n');
        bytes
    }
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_line())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_command_bytes() {
        assert_eq!(Command::SetRemoteMode.to_bytes(), b"RMTS,1\n".to_vec());
        assert_eq!(Command::DisableMeasureKey.to_bytes(), b"MSWE,0\n".to_vec());
        assert_eq!(Command::ReadSyncMode.to_bytes(), b"SCMR\n".to_vec());
        assert_eq!(Command::Measure.to_bytes(), b"MEAS,1\n".to_vec());
    }

    #[test]
    fn test_sync_mode_frequency_encoding() {
        let cmd = Command::SetSyncMode { frequency_hz: 60 };
        assert_eq!(cmd.to_bytes(), b"SCMS,1,6000\n".to_vec());

        let cmd = Command::SetSyncMode { frequency_hz: 50 };
        assert_eq!(cmd.to_line(), "SCMS,1,5000");
    }

    #[test]
    fn test_read_measurement_selectors() {
        let lv = Command::ReadMeasurement(MeasurementData::Luminance);
        assert_eq!(lv.to_bytes(), b"MEDR,2,0,101\n".to_vec());

        let xylv = Command::ReadMeasurement(MeasurementData::ChromaticityLuminance);
        assert_eq!(xylv.to_bytes(), b"MEDR,2,0,2\n".to_vec());
    }

    #[test]
    fn test_bytes_are_keyword_args_and_newline() {
        let all = [
            Command::SetRemoteMode,
            Command::DisableMeasureKey,
            Command::SetSyncMode { frequency_hz: 120 },
            Command::ReadSyncMode,
            Command::Measure,
            Command::ReadMeasurement(MeasurementData::Luminance),
            Command::ReadMeasurement(MeasurementData::ChromaticityLuminance),
        ];
        for cmd in all {
            let mut expected = cmd.keyword().to_string();
            for arg in cmd.args() {
                expected.push(',');
                expected.push_str(&arg);
            }
            expected.push('\n');
            assert_eq!(cmd.to_bytes(), expected.into_bytes());
        }
    }

    #[test]
    fn test_reply_count() {
        assert_eq!(Command::Measure.reply_count(), 2);
        assert_eq!(Command::ReadSyncMode.reply_count(), 1);
    }
}
