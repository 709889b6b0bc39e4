//! Instrument session
//!
//! High-level operations on a CS2000-class meter, each built from one command
//! and its reply line(s).

mod session;
mod values;

pub use session::{Cs2000, FailurePolicy, InitReport, InitStep, MeasureReport, StepOutcome};
pub use values::{ChromaticityLuminance, Luminance, SyncMode, SyncModeReading};
