//! Behavioural model of a ring of leaky-integrate-and-fire neurons behind the harness pin contract.
//!
//! The model decodes `ui_in` (pattern id and base current) and `uio_in` (coupling) exactly as the
//! stimulus encoder lays them out, and presents the spike vector on `uo_out[3:0]`. Its dynamics are
//! integer and illustrative only; the harness makes no assumption about them.
use serde::{Deserialize, Serialize};

use super::Dut;
use crate::sim::signal::DutInputs;

/// The number of neurons in the ring.
pub const NUM_NEURONS: usize = 4;
/// The potential at which a neuron fires.
pub const FIRING_THRESHOLD: u16 = 64;
/// The number of cycles a neuron stays silent after firing.
pub const REFRACTORY_CYCLES: u8 = 2;
/// The potential leaks by `v >> LEAK_SHIFT` every cycle.
pub const LEAK_SHIFT: u32 = 3;
/// The length of the on and off phases of the burst pattern, in cycles.
pub const BURST_PHASE_CYCLES: u32 = 32;

/// A 4-neuron LIF ring, neuron `i` receiving the spikes of neuron `i - 1`.
#[derive(Debug, PartialEq, Clone, Default, Serialize, Deserialize)]
pub struct LifRing {
    potentials: [u16; NUM_NEURONS],
    refractory: [u8; NUM_NEURONS],
    spikes: u8,
    cycle: u32,
}

impl LifRing {
    pub fn new() -> Self {
        LifRing::default()
    }

    /// Returns the membrane potentials of the neurons.
    pub fn potentials(&self) -> &[u16] {
        &self.potentials[..]
    }

    /// Returns the spike vector of the last cycle.
    pub fn spikes(&self) -> u8 {
        self.spikes
    }

    /// The external drive of every neuron for the given pattern.
    fn drive(&self, pattern_id: u8, current: u16) -> [u16; NUM_NEURONS] {
        match pattern_id {
            // Independent: staggered rates, no drive at all without base current.
            0 => [
                current,
                current + current / 4,
                current + current / 2,
                current + 3 * current / 4,
            ],
            // Wave: only the head of the ring is driven, the rest follows through coupling.
            1 => [current, 0, 0, 0],
            2 => [current; NUM_NEURONS],
            // Clustered: two strongly and two weakly driven neurons.
            3 => [current, current, current / 2, current / 2],
            4 => {
                if (self.cycle / BURST_PHASE_CYCLES) % 2 == 0 {
                    [2 * current; NUM_NEURONS]
                } else {
                    [0; NUM_NEURONS]
                }
            }
            _ => [0; NUM_NEURONS],
        }
    }

    /// Bits [3:0] hold the spike vector, bits [7:4] the upper bits of the head neuron potential.
    fn output(&self) -> u8 {
        let level = (self.potentials[0] >> 4).min(0xF) as u8;
        (level << 4) | self.spikes
    }
}

impl Dut for LifRing {
    fn clock(&mut self, inputs: &DutInputs) -> u8 {
        if !inputs.rst_n {
            *self = LifRing::new();
            return 0;
        }
        if !inputs.ena {
            return self.output();
        }

        let pattern_id = inputs.ui_in & 0x7;
        let current = (inputs.ui_in >> 3) as u16;
        let coupling = inputs.uio_in as u16;
        let drive = self.drive(pattern_id, current);

        let mut spikes = 0u8;
        for i in 0..NUM_NEURONS {
            if self.refractory[i] > 0 {
                self.refractory[i] -= 1;
                continue;
            }
            let predecessor = (i + NUM_NEURONS - 1) % NUM_NEURONS;
            let coupled = if (self.spikes >> predecessor) & 1 == 1 {
                coupling >> 1
            } else {
                0
            };
            let v = self.potentials[i];
            let next = v - (v >> LEAK_SHIFT) + drive[i] + coupled;
            if next >= FIRING_THRESHOLD {
                spikes |= 1 << i;
                self.potentials[i] = 0;
                self.refractory[i] = REFRACTORY_CYCLES;
            } else {
                self.potentials[i] = next;
            }
        }

        self.spikes = spikes;
        self.cycle = self.cycle.wrapping_add(1);
        self.output()
    }

    fn name(&self) -> &str {
        "lif_ring"
    }
}
