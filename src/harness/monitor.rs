//! Spike monitor: per-cycle sampling of the spike vector and level-to-edge counting.
//!
//! A window counts a spike vector only on the cycle where it appears: a vector held for several
//! cycles is counted once, and a direct change from one non-zero vector to another adds the
//! population of the new vector. When several neurons switch in the same cycle this may differ
//! from the true number of per-neuron onsets; [`WindowResult::onsets`] and
//! [`WindowResult::ambiguous`] make that difference measurable.
use serde::{Deserialize, Serialize};

use super::testbench::{HarnessWarning, Testbench};
use crate::error::HarnessError;
use crate::sim::signal::Signal;

/// The spike vector lives in `uo_out[3:0]`, one bit per ring neuron.
pub const SPIKE_MASK: u64 = 0x0F;

/// A spike vector counted by the monitor.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct SpikeEvent {
    /// The spike vector.
    pub sample: u8,
    /// The running spike count, including this vector.
    pub spike_count: u64,
}

/// The counts of one monitoring window.
#[derive(Debug, PartialEq, Eq, Clone, Default, Serialize, Deserialize)]
pub struct WindowResult {
    pub label: String,
    /// The number of sampled cycles.
    pub cycles: u64,
    /// The population of every new non-zero spike vector.
    pub spike_count: u64,
    /// The number of cycles where the spike vector changed.
    pub transition_count: u64,
    /// The number of individual neuron 0 -> 1 transitions.
    pub onsets: u64,
    /// The number of changes from one non-zero spike vector to another.
    pub ambiguous: u64,
}

/// Level-to-edge spike counter over a stream of samples.
#[derive(Debug, PartialEq, Eq, Clone, Default)]
pub struct SpikeCounter {
    previous: u8,
    cycles: u64,
    spike_count: u64,
    transition_count: u64,
    onsets: u64,
    ambiguous: u64,
}

impl SpikeCounter {
    pub fn new() -> Self {
        SpikeCounter::default()
    }

    /// Count one raw `uo_out` sample. Bits outside [`SPIKE_MASK`] are ignored.
    /// Returns an event if the sample added to the spike count.
    pub fn observe(&mut self, raw: u64) -> Option<SpikeEvent> {
        let sample = (raw & SPIKE_MASK) as u8;
        let previous = std::mem::replace(&mut self.previous, sample);
        self.cycles += 1;

        if sample == previous {
            return None;
        }
        self.transition_count += 1;
        self.onsets += (sample & !previous).count_ones() as u64;
        if sample == 0 {
            return None;
        }
        if previous != 0 {
            self.ambiguous += 1;
        }
        self.spike_count += sample.count_ones() as u64;
        Some(SpikeEvent {
            sample,
            spike_count: self.spike_count,
        })
    }

    pub fn spike_count(&self) -> u64 {
        self.spike_count
    }

    pub fn transition_count(&self) -> u64 {
        self.transition_count
    }

    pub fn result(&self, label: &str) -> WindowResult {
        WindowResult {
            label: label.to_string(),
            cycles: self.cycles,
            spike_count: self.spike_count,
            transition_count: self.transition_count,
            onsets: self.onsets,
            ambiguous: self.ambiguous,
        }
    }
}

/// Sample `uo_out` on each of the next `duration_cycles` rising edges and count spikes and
/// transitions. The previous sample starts at zero for every window.
///
/// The running counts are kept on the testbench until the window completes, see
/// [`Testbench::take_window`].
///
/// The function returns a protocol violation if the reset sequence has not completed.
pub async fn monitor(
    tb: &Testbench,
    duration_cycles: u64,
    label: &str,
) -> Result<WindowResult, HarnessError> {
    tb.require_running("monitoring")?;
    let sim = tb.sim();
    tb.open_window(label);

    for _ in 0..duration_cycles {
        sim.rising_edge().await;
        if let Some(event) = tb.observe(sim.read(Signal::UoOut)) {
            log::info!(
                "{} [{}] spikes {:04b} (total {})",
                sim.now(),
                label,
                event.sample,
                event.spike_count
            );
        }
    }

    let result = tb.take_window().ok_or_else(|| {
        HarnessError::InvalidOperation(format!("monitoring window {} closed early", label))
    })?;
    if result.ambiguous > 0 {
        tb.warn(HarnessWarning::AmbiguousTransitions {
            label: label.to_string(),
            count: result.ambiguous,
        });
    }
    log::info!(
        "{} [{}] window done: {} spikes, {} transitions over {} cycles",
        sim.now(),
        label,
        result.spike_count,
        result.transition_count,
        result.cycles
    );
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use itertools::Itertools;

    fn count(samples: &[u64]) -> WindowResult {
        let mut counter = SpikeCounter::new();
        samples.iter().for_each(|s| {
            counter.observe(*s);
        });
        counter.result("test")
    }

    #[test]
    fn test_constant_zero() {
        let result = count(&[0; 1000]);
        assert_eq!((result.spike_count, result.transition_count), (0, 0));
        assert_eq!(result.cycles, 1000);
    }

    #[test]
    fn test_single_pulse() {
        let result = count(&[0b0000, 0b0101, 0b0000]);
        assert_eq!(result.transition_count, 2);
        assert_eq!(result.spike_count, 2);
        assert_eq!(result.onsets, 2);
        assert_eq!(result.ambiguous, 0);
    }

    #[test]
    fn test_held_vector_counted_once() {
        let mut counter = SpikeCounter::new();
        assert_eq!(
            counter.observe(0b0101),
            Some(SpikeEvent {
                sample: 0b0101,
                spike_count: 2
            })
        );
        assert_eq!(counter.observe(0b0101), None);
        assert_eq!(counter.transition_count(), 1);
        assert_eq!(counter.spike_count(), 2);
    }

    #[test]
    fn test_nonzero_to_nonzero() {
        // 0011 -> 0110: one transition, adds popcount(0110) although only neuron 2 turned on.
        let result = count(&[0b0011, 0b0110]);
        assert_eq!(result.transition_count, 2);
        assert_eq!(result.spike_count, 4);
        assert_eq!(result.onsets, 3);
        assert_eq!(result.ambiguous, 1);
    }

    #[test]
    fn test_upper_bits_are_ignored() {
        let result = count(&[0xF0, 0xA0, 0x31, 0x71, 0x00]);
        assert_eq!(result.transition_count, 2);
        assert_eq!(result.spike_count, 1);
    }

    #[test]
    fn test_deterministic() {
        let samples = (0..500u64).map(|i| (i * 7 + i / 3) % 16).collect_vec();
        assert_eq!(count(&samples), count(&samples));
    }

    #[test]
    fn test_spike_count_matches_reference() {
        let samples = (0..300u64).map(|i| (i * i + 3 * i) % 13).collect_vec();
        let expected_transitions = std::iter::once(0)
            .chain(samples.iter().map(|s| s & SPIKE_MASK))
            .tuple_windows()
            .filter(|(a, b)| a != b)
            .count() as u64;
        let expected_spikes: u64 = std::iter::once(0)
            .chain(samples.iter().map(|s| s & SPIKE_MASK))
            .tuple_windows()
            .filter(|(a, b)| a != b && *b != 0)
            .map(|(_, b)| b.count_ones() as u64)
            .sum();
        let result = count(&samples);
        assert_eq!(result.transition_count, expected_transitions);
        assert_eq!(result.spike_count, expected_spikes);
    }
}
