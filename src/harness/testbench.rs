//! Per-session state shared by the harness components.
use serde::{Deserialize, Serialize};
use std::cell::{Cell, RefCell};
use std::fmt;

use super::monitor::{SpikeCounter, SpikeEvent, WindowResult};
use super::reset::ResetPhase;
use super::stimulus::StimulusField;
use crate::config::HarnessConfig;
use crate::error::HarnessError;
use crate::sim::kernel::SimHandle;

/// Data issues the harness tolerates but reports.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub enum HarnessWarning {
    /// A stimulus parameter did not fit its bit field and was masked.
    Truncated {
        field: StimulusField,
        value: u32,
        applied: u32,
    },
    /// Some transitions of a monitoring window went from one non-zero spike vector to another, so
    /// the spike count of that window may differ from the true number of per-neuron onsets.
    AmbiguousTransitions { label: String, count: u64 },
}

impl fmt::Display for HarnessWarning {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            HarnessWarning::Truncated { field, value, applied } => write!(
                f,
                "{} {} does not fit its bit field, applied as {}",
                field, value, applied
            ),
            HarnessWarning::AmbiguousTransitions { label, count } => write!(
                f,
                "{}: {} transition(s) between two non-zero spike vectors",
                label, count
            ),
        }
    }
}

/// The state of one test session: the simulation handle, the configuration, the reset phase, the
/// warnings raised so far and the monitoring window in progress.
#[derive(Debug)]
pub struct Testbench {
    sim: SimHandle,
    config: HarnessConfig,
    phase: Cell<ResetPhase>,
    warnings: RefCell<Vec<HarnessWarning>>,
    window: RefCell<Option<(String, SpikeCounter)>>,
}

impl Testbench {
    pub fn new(sim: SimHandle, config: HarnessConfig) -> Self {
        Testbench {
            sim,
            config,
            phase: Cell::new(ResetPhase::Uninitialized),
            warnings: RefCell::new(vec![]),
            window: RefCell::new(None),
        }
    }

    pub fn sim(&self) -> &SimHandle {
        &self.sim
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Returns the current phase of the reset sequence.
    pub fn phase(&self) -> ResetPhase {
        self.phase.get()
    }

    pub(crate) fn set_phase(&self, phase: ResetPhase) {
        log::info!("{} reset phase: {}", self.sim.now(), phase);
        self.phase.set(phase);
    }

    /// The function returns a protocol violation unless the reset sequence reached `Running`.
    pub fn require_running(&self, operation: &str) -> Result<(), HarnessError> {
        match self.phase() {
            ResetPhase::Running => Ok(()),
            phase => Err(HarnessError::ProtocolViolation(format!(
                "{} issued at {} while the reset sequence is {}",
                operation,
                self.sim.now(),
                phase
            ))),
        }
    }

    /// Log a warning and keep it for the report.
    pub fn warn(&self, warning: HarnessWarning) {
        log::warn!("{} {}", self.sim.now(), warning);
        self.warnings.borrow_mut().push(warning);
    }

    /// Returns and clears the warnings raised so far.
    pub fn take_warnings(&self) -> Vec<HarnessWarning> {
        std::mem::take(&mut *self.warnings.borrow_mut())
    }

    /// Start counting a new monitoring window, replacing any window left open.
    pub(crate) fn open_window(&self, label: &str) {
        *self.window.borrow_mut() = Some((label.to_string(), SpikeCounter::new()));
    }

    /// Count one `uo_out` sample in the open window.
    pub(crate) fn observe(&self, raw: u64) -> Option<SpikeEvent> {
        self.window
            .borrow_mut()
            .as_mut()
            .and_then(|(_, counter)| counter.observe(raw))
    }

    /// Close the open window and return its counts so far, if a window is open.
    ///
    /// The counts outlive the monitoring task, so a window cut short by a failure can still be
    /// reported.
    pub fn take_window(&self) -> Option<WindowResult> {
        self.window
            .borrow_mut()
            .take()
            .map(|(label, counter)| counter.result(&label))
    }
}
