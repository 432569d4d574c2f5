//! Free-running clock driver.
use crate::sim::kernel::SimHandle;
use crate::sim::signal::Signal;
use crate::sim::time::{SimTime, TimeUnit};

/// A periodic clock on `clk`: one rising and one falling edge per period, starting low.
#[derive(Debug, PartialEq, Clone, Copy)]
pub struct Clock {
    half_period: SimTime,
}

impl Clock {
    pub fn new(half_period: u64, unit: TimeUnit) -> Self {
        Clock {
            half_period: SimTime::new(half_period, unit),
        }
    }

    pub fn half_period(&self) -> SimTime {
        self.half_period
    }

    pub fn period(&self) -> SimTime {
        self.half_period * 2
    }

    /// Toggle `clk` forever. The task only ends when the simulator drops it at the end of the
    /// session.
    pub async fn start(self, sim: SimHandle) {
        let mut level = 0;
        loop {
            if let Err(e) = sim.write(Signal::Clk, level) {
                log::error!("Clock driver stopped: {}", e);
                return;
            }
            sim.timer(self.half_period).await;
            level ^= 1;
        }
    }
}
