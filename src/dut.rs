//! The device under test, seen as an opaque clocked black box.
//!
//! The harness never looks inside a DUT: it only drives its input pins and samples `uo_out`.
//! This module provides the [`Dut`] trait the simulator clocks, and a few implementations:
//!
//! - [`LifRing`]: a behavioural model of a ring of LIF neurons decoding the stimulus pins
//! - [`Playback`]: replays a scripted (or seeded random) output stream
//! - [`HeldInReset`]: presents a constantly asserted reset to another DUT
pub mod lif_ring;
pub mod playback;

pub use lif_ring::LifRing;
pub use playback::Playback;

use crate::sim::signal::DutInputs;

/// A clocked device under test.
pub trait Dut {
    /// Clock the DUT once, on a rising edge of `clk`, with its input pins as sampled on that edge.
    /// Returns the value presented on `uo_out` after the clocked update.
    fn clock(&mut self, inputs: &DutInputs) -> u8;

    /// Returns a short name for the DUT, used in logs.
    fn name(&self) -> &str {
        "dut"
    }
}

impl<D: Dut + ?Sized> Dut for Box<D> {
    fn clock(&mut self, inputs: &DutInputs) -> u8 {
        (**self).clock(inputs)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Wraps a DUT so that it only ever sees `rst_n = 0`, whatever the harness drives.
#[derive(Debug, Clone)]
pub struct HeldInReset<D> {
    inner: D,
}

impl<D: Dut> HeldInReset<D> {
    pub fn new(inner: D) -> Self {
        HeldInReset { inner }
    }
}

impl<D: Dut> Dut for HeldInReset<D> {
    fn clock(&mut self, inputs: &DutInputs) -> u8 {
        let inputs = DutInputs {
            rst_n: false,
            ..*inputs
        };
        self.inner.clock(&inputs)
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}
