//! Measured and configured values reported by the meter
//!
//! Numeric payload fields are kept as the strings the meter sent so nothing
//! is lost to float formatting; parse helpers are provided for callers that
//! want numbers.

use serde::Serialize;

use crate::protocol::ProtocolError;

/// Flicker synchronization strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncMode {
    /// Code `0`
    NoSync,
    /// Code `1`, synchronized to an internally set frequency
    Internal,
    /// Code `2`, synchronized to an external signal
    External,
}

impl SyncMode {
    /// Map the wire code to a mode
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "0" => Some(SyncMode::NoSync),
            "1" => Some(SyncMode::Internal),
            "2" => Some(SyncMode::External),
            _ => None,
        }
    }

    /// Wire code for this mode
    pub fn code(&self) -> &'static str {
        match self {
            SyncMode::NoSync => "0",
            SyncMode::Internal => "1",
            SyncMode::External => "2",
        }
    }

    /// Display name
    pub fn label(&self) -> &'static str {
        match self {
            SyncMode::NoSync => "No sync",
            SyncMode::Internal => "Internal sync",
            SyncMode::External => "External sync",
        }
    }
}

impl std::fmt::Display for SyncMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Sync setting read back with `SCMR`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncModeReading {
    /// Active sync mode
    pub mode: SyncMode,
    /// Raw frequency field in hundredths of a hertz; only present for internal sync
    pub frequency: Option<String>,
}

impl SyncModeReading {
    /// Build from the `SCMR` payload (mode code, then frequency when internal)
    pub fn from_payload(command: &str, payload: &[String]) -> Result<Self, ProtocolError> {
        let invalid = |reason: String| ProtocolError::InvalidResponse {
            command: command.to_string(),
            reason,
        };

        let code = payload
            .first()
            .ok_or_else(|| invalid("missing sync mode code".to_string()))?;
        let mode =
            SyncMode::from_code(code).ok_or_else(|| invalid(format!("unknown sync mode {code:?}")))?;

        let frequency = match mode {
            SyncMode::Internal => payload.get(1).cloned(),
            SyncMode::NoSync | SyncMode::External => None,
        };

        Ok(Self { mode, frequency })
    }

    /// Frequency in whole hertz as sent with `SCMS` (raw field minus the two
    /// hundredths digits), e.g. `"6000"` -> `"60"`
    pub fn frequency_hz(&self) -> Option<&str> {
        let raw = self.frequency.as_deref()?;
        raw.get(..raw.len().saturating_sub(2))
    }
}

impl std::fmt::Display for SyncModeReading {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.frequency_hz() {
            Some(hz) => write!(f, "{}, {}Hz", self.mode, hz),
            None => write!(f, "{}", self.mode),
        }
    }
}

/// Luminance reading (Lv, cd/m²)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Luminance {
    /// Luminance exactly as received
    pub lv: String,
}

impl Luminance {
    /// Parsed luminance
    pub fn value(&self) -> Option<f64> {
        self.lv.trim().parse().ok()
    }
}

impl std::fmt::Display for Luminance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} cd/m²", self.lv)
    }
}

/// Chromaticity coordinates plus luminance
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChromaticityLuminance {
    /// Chromaticity x, as received
    pub x: String,
    /// Chromaticity y, as received
    pub y: String,
    /// Luminance (cd/m²), as received
    pub lv: String,
}

impl ChromaticityLuminance {
    /// Parsed (x, y, Lv), `None` if any field is not numeric
    pub fn values(&self) -> Option<(f64, f64, f64)> {
        Some((
            self.x.trim().parse().ok()?,
            self.y.trim().parse().ok()?,
            self.lv.trim().parse().ok()?,
        ))
    }
}

impl std::fmt::Display for ChromaticityLuminance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "x={} y={} Lv={} cd/m²", self.x, self.y, self.lv)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn fields(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_sync_mode_codes() {
        assert_eq!(SyncMode::from_code("0"), Some(SyncMode::NoSync));
        assert_eq!(SyncMode::from_code("1"), Some(SyncMode::Internal));
        assert_eq!(SyncMode::from_code("2"), Some(SyncMode::External));
        assert_eq!(SyncMode::from_code("3"), None);
        assert_eq!(SyncMode::Internal.label(), "Internal sync");
        assert_eq!(SyncMode::NoSync.to_string(), "No sync");
        assert_eq!(SyncMode::External.to_string(), "External sync");
    }

    #[test]
    fn test_internal_sync_reports_frequency() {
        let reading = SyncModeReading::from_payload("SCMR", &fields(&["1", "6000"])).unwrap();
        assert_eq!(reading.mode, SyncMode::Internal);
        assert_eq!(reading.frequency.as_deref(), Some("6000"));
        assert_eq!(reading.frequency_hz(), Some("60"));
        assert_eq!(reading.to_string(), "Internal sync, 60Hz");
    }

    #[test]
    fn test_no_sync_suppresses_frequency() {
        let reading = SyncModeReading::from_payload("SCMR", &fields(&["0", "6000"])).unwrap();
        assert_eq!(reading.mode, SyncMode::NoSync);
        assert_eq!(reading.frequency, None);
        assert_eq!(reading.to_string(), "No sync");
    }

    #[test]
    fn test_unknown_sync_code_is_invalid() {
        let err = SyncModeReading::from_payload("SCMR", &fields(&["7"])).unwrap_err();
        assert!(matches!(err, ProtocolError::InvalidResponse { .. }));
        assert!(SyncModeReading::from_payload("SCMR", &[]).is_err());
    }

    #[test]
    fn test_numeric_helpers() {
        let lv = Luminance { lv: "123.45".into() };
        assert_eq!(lv.value(), Some(123.45));

        let xylv = ChromaticityLuminance {
            x: "0.3127".into(),
            y: "0.3290".into(),
            lv: "abc".into(),
        };
        assert_eq!(xylv.values(), None);
    }
}
