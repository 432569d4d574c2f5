//! Minimal discrete-event simulation kernel the harness runs on.
//!
//! - [`time`]: simulated time and units
//! - [`signal`]: the typed pin contract of the DUT and the signal values
//! - [`kernel`]: the cooperative scheduler, the [`kernel::SimHandle`] given to tasks, and the
//!   event loop
//! - [`trigger`]: awaitable timers and edges
pub mod kernel;
pub mod signal;
pub mod time;
pub mod trigger;

pub use kernel::{Edge, SimHandle, Simulator, TaskId};
pub use signal::{Direction, DutInputs, Signal, SignalSet};
pub use time::{SimTime, TimeUnit};
