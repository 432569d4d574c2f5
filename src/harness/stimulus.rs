//! Stimulus encoder: the bit layout of the DUT input buses.
//!
//! | bus      | bits  | field        |
//! |----------|-------|--------------|
//! | `ui_in`  | [2:0] | pattern id   |
//! | `ui_in`  | [7:3] | base current |
//! | `uio_in` | [7:0] | coupling     |
//!
//! This layout is a fixed contract with the DUT: out-of-range parameters are masked into their
//! fields, and every truncation is reported as a [`HarnessWarning`].
use serde::{Deserialize, Serialize};
use std::fmt;

use super::testbench::{HarnessWarning, Testbench};
use crate::error::HarnessError;
use crate::sim::signal::Signal;

pub const PATTERN_ID_MASK: u32 = 0x7;
pub const BASE_CURRENT_MASK: u32 = 0x1F;
pub const BASE_CURRENT_SHIFT: u32 = 3;
pub const COUPLING_MASK: u32 = 0xFF;

/// The stimulus bit fields.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
pub enum StimulusField {
    PatternId,
    BaseCurrent,
    Coupling,
}

impl StimulusField {
    pub fn mask(&self) -> u32 {
        match self {
            StimulusField::PatternId => PATTERN_ID_MASK,
            StimulusField::BaseCurrent => BASE_CURRENT_MASK,
            StimulusField::Coupling => COUPLING_MASK,
        }
    }
}

impl fmt::Display for StimulusField {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            StimulusField::PatternId => write!(f, "pattern_id"),
            StimulusField::BaseCurrent => write!(f, "base_current"),
            StimulusField::Coupling => write!(f, "coupling"),
        }
    }
}

/// Returns the `(ui_in, uio_in)` bus values for a stimulus.
pub fn encode(pattern_id: u32, base_current: u32, coupling: u32) -> (u8, u8) {
    let ui_in =
        ((base_current & BASE_CURRENT_MASK) << BASE_CURRENT_SHIFT) | (pattern_id & PATTERN_ID_MASK);
    let uio_in = coupling & COUPLING_MASK;
    (ui_in as u8, uio_in as u8)
}

/// Returns a warning for every parameter that does not fit its bit field.
pub fn truncations(pattern_id: u32, base_current: u32, coupling: u32) -> Vec<HarnessWarning> {
    [
        (StimulusField::PatternId, pattern_id),
        (StimulusField::BaseCurrent, base_current),
        (StimulusField::Coupling, coupling),
    ]
    .into_iter()
    .filter(|(field, value)| value & !field.mask() != 0)
    .map(|(field, value)| HarnessWarning::Truncated {
        field,
        value,
        applied: value & field.mask(),
    })
    .collect()
}

/// Write a stimulus on the input buses. The DUT sees it from the next rising edge on.
/// Returns the bus values written.
///
/// The function returns a protocol violation if the reset sequence has not completed.
pub fn apply(
    tb: &Testbench,
    pattern_id: u32,
    base_current: u32,
    coupling: u32,
) -> Result<(u8, u8), HarnessError> {
    tb.require_running("stimulus")?;
    for warning in truncations(pattern_id, base_current, coupling) {
        tb.warn(warning);
    }

    let (ui_in, uio_in) = encode(pattern_id, base_current, coupling);
    tb.sim().write(Signal::UiIn, ui_in as u64)?;
    tb.sim().write(Signal::UioIn, uio_in as u64)?;
    log::debug!(
        "{} stimulus ui_in={:08b} uio_in={:08b}",
        tb.sim().now(),
        ui_in,
        uio_in
    );
    Ok((ui_in, uio_in))
}
