//! Error module for the LIF ring harness.
use std::error::Error;
use std::fmt;

use crate::harness::sweep::SweepReport;
use crate::sim::signal::Signal;
use crate::sim::time::SimTime;

/// Error types for the library.
#[derive(Debug, PartialEq, Clone)]
pub enum HarnessError {
    /// Error for operations issued out of order, e.g., stimulus before the reset sequence
    /// completed.
    ProtocolViolation(String),
    /// The next pending event lies beyond the simulation horizon.
    HorizonExceeded { now: SimTime, horizon: SimTime },
    /// No task is ready and no event is pending, the main task can never resume.
    Stalled { now: SimTime },
    /// Two different tasks scheduled a value for the same signal in the same delta step.
    WriteConflict { signal: Signal, now: SimTime },
    /// Error for a write to a signal driven by the DUT.
    ReadOnlySignal(Signal),
    /// Error for invalid parameters.
    InvalidParameter(String),
    /// Error for invalid operation.
    InvalidOperation(String),
    /// Error for I/O operations.
    IOError(String),
}

impl fmt::Display for HarnessError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            HarnessError::ProtocolViolation(e) => write!(f, "Protocol violation: {}", e),
            HarnessError::HorizonExceeded { now, horizon } => write!(
                f,
                "Simulation horizon exceeded at {}: next event lies beyond {}",
                now, horizon
            ),
            HarnessError::Stalled { now } => {
                write!(f, "Simulation stalled at {}: no pending event", now)
            }
            HarnessError::WriteConflict { signal, now } => write!(
                f,
                "Conflicting writes to {} at {}: only one writer per signal and cycle",
                signal, now
            ),
            HarnessError::ReadOnlySignal(signal) => {
                write!(f, "Signal {} is driven by the DUT and cannot be written", signal)
            }
            HarnessError::InvalidParameter(e) => write!(f, "Invalid parameters: {}", e),
            HarnessError::InvalidOperation(e) => write!(f, "Invalid operation: {}", e),
            HarnessError::IOError(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl Error for HarnessError {}

impl From<std::io::Error> for HarnessError {
    fn from(e: std::io::Error) -> Self {
        HarnessError::IOError(e.to_string())
    }
}

impl From<serde_json::Error> for HarnessError {
    fn from(e: serde_json::Error) -> Self {
        HarnessError::IOError(e.to_string())
    }
}

/// A failed session, with the counts accumulated before the failure.
#[derive(Debug, PartialEq, Clone)]
pub struct SweepFailure {
    /// The error that ended the session.
    pub error: HarnessError,
    /// The report as it stood when the session failed.
    pub partial: SweepReport,
}

impl fmt::Display for SweepFailure {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Session failed after {} pattern(s) ({} spikes, {} transitions): {}",
            self.partial.patterns.len(),
            self.partial.total_spikes,
            self.partial.total_transitions,
            self.error
        )
    }
}

impl Error for SweepFailure {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&self.error)
    }
}

impl From<HarnessError> for SweepFailure {
    fn from(error: HarnessError) -> Self {
        SweepFailure {
            error,
            partial: SweepReport::default(),
        }
    }
}
