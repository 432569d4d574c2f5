//! This crate provides a cycle-synchronous verification harness for a clocked ring of
//! leaky-integrate-and-fire (LIF) spiking neurons.
//!
//! The device under test (DUT) is an opaque black box exposing the pins `clk`, `rst_n`, `ena`,
//! `ui_in[7:0]`, `uio_in[7:0]` and `uo_out[7:0]`. The harness drives the clock and the reset
//! sequence, applies stimulus patterns, samples the spike vector `uo_out[3:0]` on every rising
//! edge, and aggregates spike and transition counts over a sweep of patterns.
//!
//! # Running a Sweep
//!
//! ```rust
//! use lif_ring_tb::config::HarnessConfig;
//! use lif_ring_tb::dut::{HeldInReset, LifRing};
//! use lif_ring_tb::harness::{run_session, PatternConfig};
//!
//! let patterns = vec![
//!     PatternConfig::new("Synchronous", 2, 20, 64, 200),
//!     PatternConfig::new("Wave", 1, 16, 160, 200),
//! ];
//!
//! // A DUT kept in reset never spikes
//! let config = HarnessConfig::default();
//! let report = run_session(HeldInReset::new(LifRing::new()), &config, &patterns).unwrap();
//! assert_eq!(report.total_spikes, 0);
//! assert_eq!(report.total_transitions, 0);
//!
//! // A running ring does
//! let report = run_session(LifRing::new(), &config, &patterns).unwrap();
//! assert!(report.total_spikes > 0);
//! assert_eq!(report.patterns.len(), 2);
//! ```
//!
//! # Writing Tests
//!
//! The components can also be driven one by one from a task on the [`sim::Simulator`]:
//!
//! ```rust
//! use std::rc::Rc;
//! use lif_ring_tb::config::HarnessConfig;
//! use lif_ring_tb::dut::Playback;
//! use lif_ring_tb::harness::{monitor, stimulus, Clock, ResetSequencer, Testbench};
//! use lif_ring_tb::sim::Simulator;
//!
//! let config = HarnessConfig { settle_cycles: 2, ..HarnessConfig::default() };
//! let dut = Playback::new(vec![0, 0, 0b0101, 0b0101, 0]);
//! let mut sim = Simulator::new(Box::new(dut), config.horizon());
//! sim.spawn(Clock::new(config.clock_half_period, config.time_unit).start(sim.handle()));
//!
//! let tb = Rc::new(Testbench::new(sim.handle(), config.clone()));
//! let result = sim.run_until(async move {
//!     ResetSequencer::from_config(tb.config()).run(&tb).await?;
//!     stimulus::apply(&tb, 2, 20, 64)?;
//!     monitor(&tb, 3, "pulse").await
//! }).unwrap().unwrap();
//!
//! assert_eq!((result.spike_count, result.transition_count), (2, 2));
//! ```

pub mod config;
pub mod dut;
pub mod error;
pub mod harness;
pub mod sim;
