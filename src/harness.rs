//! The verification harness proper.
//!
//! - [`clock`]: the free-running clock driver
//! - [`reset`]: the reset sequencer and its phases
//! - [`stimulus`]: the stimulus encoder
//! - [`monitor`]: the spike monitor
//! - [`sweep`]: the pattern sweep orchestrator and its report
//! - [`session`]: a whole session, from clock start to report
//! - [`testbench`]: the per-session state shared by all of the above
pub mod clock;
pub mod monitor;
pub mod reset;
pub mod session;
pub mod stimulus;
pub mod sweep;
pub mod testbench;

pub use clock::Clock;
pub use monitor::{monitor, SpikeCounter, WindowResult};
pub use reset::{ResetPhase, ResetSequencer};
pub use session::run_session;
pub use sweep::{default_patterns, PatternConfig, PatternSweep, SweepReport};
pub use testbench::{HarnessWarning, Testbench};
