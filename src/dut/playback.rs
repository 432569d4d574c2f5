//! A DUT replaying a fixed output stream.
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use super::Dut;
use crate::sim::signal::DutInputs;

/// Replays a scripted `uo_out` stream, one value per rising edge.
///
/// Like a real DUT, playback only starts after a reset pulse: the stream is rewound while
/// `rst_n` is low, and advances on each edge where the DUT is out of reset and enabled.
/// Once the stream is exhausted, the output stays at zero.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Playback {
    samples: Vec<u8>,
    position: usize,
    armed: bool,
}

impl Playback {
    pub fn new(samples: Vec<u8>) -> Self {
        Playback {
            samples,
            position: 0,
            armed: false,
        }
    }

    /// Create a seeded random stream of `len` values. On each cycle, a non-zero spike vector is
    /// drawn with probability `density`; the upper nibble is always random.
    pub fn random(len: usize, density: f64, seed: u64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let density = density.clamp(0.0, 1.0);
        let samples = (0..len)
            .map(|_| {
                let upper = rng.gen::<u8>() & 0xF0;
                if rng.gen_bool(density) {
                    upper | rng.gen_range(1..16u8)
                } else {
                    upper
                }
            })
            .collect();
        Playback::new(samples)
    }

    /// Returns the scripted stream.
    pub fn samples(&self) -> &[u8] {
        &self.samples[..]
    }

    /// Returns the number of values played so far.
    pub fn position(&self) -> usize {
        self.position
    }
}

impl Dut for Playback {
    fn clock(&mut self, inputs: &DutInputs) -> u8 {
        if !inputs.rst_n {
            self.armed = true;
            self.position = 0;
            return 0;
        }
        if !self.armed || !inputs.ena {
            return 0;
        }
        let value = self.samples.get(self.position).copied().unwrap_or(0);
        self.position += 1;
        value
    }

    fn name(&self) -> &str {
        "playback"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RESET: DutInputs = DutInputs {
        rst_n: false,
        ena: true,
        ui_in: 0,
        uio_in: 0,
    };
    const RUNNING: DutInputs = DutInputs {
        rst_n: true,
        ena: true,
        ui_in: 0,
        uio_in: 0,
    };

    #[test]
    fn test_waits_for_reset_pulse() {
        let mut dut = Playback::new(vec![0x1, 0x2]);
        assert_eq!(dut.clock(&RUNNING), 0);
        assert_eq!(dut.clock(&RESET), 0);
        assert_eq!(dut.clock(&RUNNING), 0x1);
        assert_eq!(dut.clock(&RUNNING), 0x2);
        assert_eq!(dut.clock(&RUNNING), 0);
        assert_eq!(dut.position(), 3);
    }

    #[test]
    fn test_reset_rewinds() {
        let mut dut = Playback::new(vec![0x7, 0x8]);
        dut.clock(&RESET);
        assert_eq!(dut.clock(&RUNNING), 0x7);
        dut.clock(&RESET);
        assert_eq!(dut.clock(&RUNNING), 0x7);
    }

    #[test]
    fn test_disabled_holds_position() {
        let mut dut = Playback::new(vec![0x3, 0x4]);
        dut.clock(&RESET);
        let disabled = DutInputs {
            ena: false,
            ..RUNNING
        };
        assert_eq!(dut.clock(&disabled), 0);
        assert_eq!(dut.clock(&RUNNING), 0x3);
    }

    #[test]
    fn test_random_is_seeded() {
        let a = Playback::random(256, 0.3, 42);
        let b = Playback::random(256, 0.3, 42);
        let c = Playback::random(256, 0.3, 43);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.samples().len(), 256);
        assert!(a.samples().iter().any(|s| s & 0x0F != 0));
    }

    #[test]
    fn test_random_without_spikes() {
        let dut = Playback::random(128, 0.0, 7);
        assert!(dut.samples().iter().all(|s| s & 0x0F == 0));
    }
}
