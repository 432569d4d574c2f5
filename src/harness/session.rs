//! A complete test session: clock, reset, then the pattern sweep.
use std::cell::RefCell;
use std::rc::Rc;

use super::clock::Clock;
use super::reset::ResetSequencer;
use super::sweep::{PatternConfig, PatternSweep, SweepReport};
use super::testbench::Testbench;
use crate::config::HarnessConfig;
use crate::dut::Dut;
use crate::error::SweepFailure;
use crate::sim::kernel::Simulator;

/// Run a full session against a DUT and return the finalized report.
///
/// The clock runs for the whole session and is dropped once the sweep completes. On failure,
/// the returned [`SweepFailure`] carries the results of the patterns completed so far, followed by
/// the counts of the window in progress marked as incomplete.
pub fn run_session<D>(
    dut: D,
    config: &HarnessConfig,
    patterns: &[PatternConfig],
) -> Result<SweepReport, SweepFailure>
where
    D: Dut + 'static,
{
    config.validate()?;
    log::info!(
        "Session on {} with {} pattern(s), clock period {}",
        dut.name(),
        patterns.len(),
        config.period()
    );

    let mut sim = Simulator::new(Box::new(dut), config.horizon());
    sim.spawn(Clock::new(config.clock_half_period, config.time_unit).start(sim.handle()));

    let tb = Rc::new(Testbench::new(sim.handle(), config.clone()));
    let report = Rc::new(RefCell::new(SweepReport::new()));
    let reset = ResetSequencer::from_config(config);
    let sweep = PatternSweep::new(patterns.to_vec(), config.inter_pattern_cycles);

    let main = {
        let tb = Rc::clone(&tb);
        let report = Rc::clone(&report);
        async move {
            reset.run(&tb).await?;
            sweep.run(&tb, &report).await
        }
    };
    let outcome = sim.run_until(main).and_then(|result| result);
    let mut report = report.borrow().clone();

    match outcome {
        Ok(()) => {
            log::info!("Session done at {}\n{}", tb.sim().now(), report.summary());
            Ok(report)
        }
        Err(error) => {
            log::error!("Session failed at {}: {}", tb.sim().now(), error);
            // The window cut short belongs to the first pattern without a result.
            if let Some(window) = tb.take_window() {
                if let Some(config) = patterns.get(report.patterns.len()) {
                    log::warn!(
                        "Pattern {} cut after {} of {} cycles",
                        config.name,
                        window.cycles,
                        config.duration
                    );
                    report.record(config.clone(), window, tb.take_warnings());
                }
            }
            Err(SweepFailure {
                error,
                partial: report,
            })
        }
    }
}
