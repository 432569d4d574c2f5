//! Reset sequencer.
use serde::{Deserialize, Serialize};
use std::fmt;

use super::testbench::Testbench;
use crate::config::{HarnessConfig, MIN_RESET_CYCLES};
use crate::error::HarnessError;
use crate::sim::signal::Signal;

/// Phases of the reset sequence. Stimulus and sampling are only allowed in `Running`.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
pub enum ResetPhase {
    Uninitialized,
    ResetAsserted,
    Running,
}

impl fmt::Display for ResetPhase {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ResetPhase::Uninitialized => write!(f, "UNINITIALIZED"),
            ResetPhase::ResetAsserted => write!(f, "RESET_ASSERTED"),
            ResetPhase::Running => write!(f, "RUNNING"),
        }
    }
}

/// Drives the initialization and reset pulse sequence, once per session.
#[derive(Debug, PartialEq, Clone)]
pub struct ResetSequencer {
    reset_cycles: u64,
    settle_cycles: u64,
    enable_during_reset: bool,
}

impl ResetSequencer {
    pub fn new(reset_cycles: u64, settle_cycles: u64, enable_during_reset: bool) -> Self {
        ResetSequencer {
            reset_cycles,
            settle_cycles,
            enable_during_reset,
        }
    }

    pub fn from_config(config: &HarnessConfig) -> Self {
        ResetSequencer::new(
            config.reset_cycles,
            config.settle_cycles,
            config.enable_during_reset,
        )
    }

    /// Run the reset sequence:
    /// 1. drive `ena`, `rst_n = 1` and the input buses to zero, and wait for one rising edge;
    /// 2. assert `rst_n = 0` for `reset_cycles` rising edges;
    /// 3. release `rst_n`, assert `ena`, and wait `settle_cycles` rising edges.
    ///
    /// The function returns a protocol violation if the sequence already ran in this session.
    pub async fn run(&self, tb: &Testbench) -> Result<(), HarnessError> {
        if tb.phase() != ResetPhase::Uninitialized {
            return Err(HarnessError::ProtocolViolation(format!(
                "reset sequence started while already {}",
                tb.phase()
            )));
        }
        if self.reset_cycles < MIN_RESET_CYCLES {
            return Err(HarnessError::InvalidParameter(format!(
                "Reset must be held for at least {} cycles, got {}",
                MIN_RESET_CYCLES, self.reset_cycles
            )));
        }

        let sim = tb.sim();
        sim.write(Signal::Ena, self.enable_during_reset as u64)?;
        sim.write(Signal::RstN, 1)?;
        sim.write(Signal::UiIn, 0)?;
        sim.write(Signal::UioIn, 0)?;
        sim.rising_edge().await;

        sim.write(Signal::RstN, 0)?;
        tb.set_phase(ResetPhase::ResetAsserted);
        sim.clock_cycles(self.reset_cycles).await;

        sim.write(Signal::RstN, 1)?;
        sim.write(Signal::Ena, 1)?;
        sim.clock_cycles(self.settle_cycles).await;

        tb.set_phase(ResetPhase::Running);
        Ok(())
    }
}
