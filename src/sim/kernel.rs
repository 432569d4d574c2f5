//! Discrete-event scheduler multiplexing cooperative tasks on one simulated timeline.
//!
//! Each call to [`Simulator::run_until`] repeats the following steps until the main task completes:
//! 1. poll every ready task, in wake-up order;
//! 2. apply the writes scheduled during the delta step. The DUT samples its inputs as they stood
//!    before these writes, is clocked on a rising edge of `clk`, and only then are the tasks
//!    waiting on that edge made ready;
//! 3. once nothing is ready, advance time to the earliest pending timer.
use derivative::Derivative;
use futures::task::noop_waker_ref;
use std::cell::RefCell;
use std::cmp::Reverse;
use std::collections::{BTreeMap, BinaryHeap, HashMap, HashSet, VecDeque};
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::Context;

use super::signal::{Direction, Signal, SignalSet};
use super::time::SimTime;
use super::trigger::Trigger;
use crate::dut::Dut;
use crate::error::HarnessError;

/// Identifier of a task spawned on the simulator.
pub type TaskId = usize;
pub(crate) type WaitId = u64;
type LocalTask = Pin<Box<dyn Future<Output = ()>>>;

/// Writer id used for writes issued outside of any task, e.g., before the simulation starts.
const EXTERNAL_WRITER: TaskId = usize::MAX;

/// Kind of a signal edge.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Edge {
    Rising,
    Falling,
}

/// A wait condition registered by a suspended task.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub(crate) enum Wait {
    /// Resume after the given duration.
    Timer(SimTime),
    /// Resume on the next edge of the given kind on a 1-bit signal.
    Edge(Signal, Edge),
}

#[derive(Derivative)]
#[derivative(Debug)]
struct Kernel {
    now: SimTime,
    horizon: SimTime,
    cycle: u64,
    signals: SignalSet,
    writes: BTreeMap<Signal, (TaskId, u64)>,
    timers: BinaryHeap<Reverse<(SimTime, WaitId)>>,
    edge_waits: Vec<(WaitId, Signal, Edge)>,
    owners: HashMap<WaitId, TaskId>,
    fired: HashSet<WaitId>,
    ready: VecDeque<TaskId>,
    current: Option<TaskId>,
    next_wait: WaitId,
    next_task: TaskId,
    #[derivative(Debug = "ignore")]
    spawned: Vec<(TaskId, LocalTask)>,
    error: Option<HarnessError>,
}

impl Kernel {
    fn new(horizon: SimTime) -> Self {
        Kernel {
            now: SimTime::ZERO,
            horizon,
            cycle: 0,
            signals: SignalSet::new(),
            writes: BTreeMap::new(),
            timers: BinaryHeap::new(),
            edge_waits: vec![],
            owners: HashMap::new(),
            fired: HashSet::new(),
            ready: VecDeque::new(),
            current: None,
            next_wait: 0,
            next_task: 0,
            spawned: vec![],
            error: None,
        }
    }

    /// Mark a wait as fired and make its owner ready.
    fn fire(&mut self, wait_id: WaitId) {
        if let Some(task_id) = self.owners.remove(&wait_id) {
            self.fired.insert(wait_id);
            self.ready.push_back(task_id);
        }
    }

    fn fire_edges(&mut self, signal: Signal, edge: Edge) {
        let (hits, pending): (Vec<_>, Vec<_>) = std::mem::take(&mut self.edge_waits)
            .into_iter()
            .partition(|(_, s, e)| *s == signal && *e == edge);
        self.edge_waits = pending;
        for (wait_id, _, _) in hits {
            self.fire(wait_id);
        }
    }
}

/// A cheap, cloneable handle on the simulation, given to every task.
///
/// All signal access and all suspension points go through the handle; simulated time is read with
/// [`SimHandle::now`] rather than from any global state.
#[derive(Debug, Clone)]
pub struct SimHandle {
    kernel: Rc<RefCell<Kernel>>,
}

impl SimHandle {
    /// Returns the current simulated time.
    pub fn now(&self) -> SimTime {
        self.kernel.borrow().now
    }

    /// Returns the number of rising edges of `clk` seen so far.
    pub fn cycle(&self) -> u64 {
        self.kernel.borrow().cycle
    }

    /// Returns the simulation horizon.
    pub fn horizon(&self) -> SimTime {
        self.kernel.borrow().horizon
    }

    /// Returns the current value of a signal.
    pub fn read(&self, signal: Signal) -> u64 {
        self.kernel.borrow().signals.get(signal)
    }

    /// Schedule a new value for an input signal. The value is masked to the signal width and
    /// takes effect at the end of the current delta step.
    ///
    /// The function returns an error for output signals, or if another task already scheduled a
    /// value for the same signal in the same delta step.
    pub fn write(&self, signal: Signal, value: u64) -> Result<(), HarnessError> {
        if signal.direction() == Direction::Output {
            return Err(HarnessError::ReadOnlySignal(signal));
        }
        let mut kernel = self.kernel.borrow_mut();
        let writer = kernel.current.unwrap_or(EXTERNAL_WRITER);
        if let Some((other, _)) = kernel.writes.get(&signal) {
            if *other != writer {
                return Err(HarnessError::WriteConflict { signal, now: kernel.now });
            }
        }
        kernel.writes.insert(signal, (writer, value & signal.mask()));
        Ok(())
    }

    /// Spawn a new task, polled for the first time in the current delta step.
    pub fn spawn<F>(&self, task: F) -> TaskId
    where
        F: Future<Output = ()> + 'static,
    {
        let mut kernel = self.kernel.borrow_mut();
        let task_id = kernel.next_task;
        kernel.next_task += 1;
        kernel.spawned.push((task_id, Box::pin(task)));
        task_id
    }

    /// Resume after the given duration.
    pub fn timer(&self, duration: SimTime) -> Trigger {
        Trigger::new(self.clone(), Wait::Timer(duration))
    }

    /// Resume on the next edge of the given kind on a 1-bit signal.
    pub fn edge(&self, signal: Signal, edge: Edge) -> Trigger {
        Trigger::new(self.clone(), Wait::Edge(signal, edge))
    }

    /// Resume on the next rising edge of `clk`, after the DUT has been clocked.
    pub fn rising_edge(&self) -> Trigger {
        self.edge(Signal::Clk, Edge::Rising)
    }

    pub fn falling_edge(&self) -> Trigger {
        self.edge(Signal::Clk, Edge::Falling)
    }

    /// Resume after `num_cycles` rising edges of `clk`.
    pub async fn clock_cycles(&self, num_cycles: u64) {
        for _ in 0..num_cycles {
            self.rising_edge().await;
        }
    }

    pub(crate) fn register(&self, wait: Wait) -> WaitId {
        let mut kernel = self.kernel.borrow_mut();
        let wait_id = kernel.next_wait;
        kernel.next_wait += 1;

        let Some(task_id) = kernel.current else {
            kernel.error = Some(HarnessError::InvalidOperation(
                "trigger awaited outside of a simulation task".to_string(),
            ));
            return wait_id;
        };

        kernel.owners.insert(wait_id, task_id);
        match wait {
            Wait::Timer(duration) => {
                let at = kernel.now + duration;
                kernel.timers.push(Reverse((at, wait_id)));
            }
            Wait::Edge(signal, edge) => {
                if signal.width() != 1 {
                    kernel.owners.remove(&wait_id);
                    kernel.error = Some(HarnessError::InvalidOperation(format!(
                        "edge awaited on multi-bit signal {}",
                        signal
                    )));
                } else {
                    kernel.edge_waits.push((wait_id, signal, edge));
                }
            }
        }
        wait_id
    }

    pub(crate) fn take_fired(&self, wait_id: WaitId) -> bool {
        self.kernel.borrow_mut().fired.remove(&wait_id)
    }
}

/// The simulator: owns the DUT and the spawned tasks, and drives the event loop.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct Simulator {
    handle: SimHandle,
    #[derivative(Debug = "ignore")]
    tasks: HashMap<TaskId, LocalTask>,
    #[derivative(Debug = "ignore")]
    dut: Box<dyn Dut>,
}

impl Simulator {
    /// Create a simulator around a DUT. No event past `horizon` is ever processed.
    pub fn new(dut: Box<dyn Dut>, horizon: SimTime) -> Self {
        Simulator {
            handle: SimHandle {
                kernel: Rc::new(RefCell::new(Kernel::new(horizon))),
            },
            tasks: HashMap::new(),
            dut,
        }
    }

    /// Returns a new handle on the simulation.
    pub fn handle(&self) -> SimHandle {
        self.handle.clone()
    }

    /// Spawn a background task, e.g., the clock driver.
    pub fn spawn<F>(&mut self, task: F) -> TaskId
    where
        F: Future<Output = ()> + 'static,
    {
        self.handle.spawn(task)
    }

    /// Run the simulation until the main task completes and return its output.
    /// Background tasks still pending at that point are dropped.
    ///
    /// The function returns an error if the next event lies beyond the horizon, if no event is
    /// pending while the main task is suspended, or on any scheduling error raised by a task.
    pub fn run_until<F, T>(&mut self, main: F) -> Result<T, HarnessError>
    where
        F: Future<Output = T> + 'static,
        T: 'static,
    {
        let output: Rc<RefCell<Option<T>>> = Rc::new(RefCell::new(None));
        let slot = Rc::clone(&output);
        self.handle.spawn(async move {
            let value = main.await;
            *slot.borrow_mut() = Some(value);
        });

        loop {
            self.adopt_spawned();
            while let Some(task_id) = self.pop_ready() {
                self.poll_task(task_id);
                let error = self.handle.kernel.borrow_mut().error.take();
                if let Some(error) = error {
                    self.tasks.clear();
                    return Err(error);
                }
                let done = output.borrow_mut().take();
                if let Some(value) = done {
                    log::debug!("Main task completed at {}", self.handle.now());
                    self.tasks.clear();
                    return Ok(value);
                }
                self.adopt_spawned();
            }

            if !self.handle.kernel.borrow().writes.is_empty() {
                self.apply_writes();
                continue;
            }

            if let Err(error) = self.advance() {
                self.tasks.clear();
                return Err(error);
            }
        }
    }

    fn adopt_spawned(&mut self) {
        let spawned = std::mem::take(&mut self.handle.kernel.borrow_mut().spawned);
        for (task_id, task) in spawned {
            self.tasks.insert(task_id, task);
            self.handle.kernel.borrow_mut().ready.push_back(task_id);
        }
    }

    fn pop_ready(&self) -> Option<TaskId> {
        self.handle.kernel.borrow_mut().ready.pop_front()
    }

    fn poll_task(&mut self, task_id: TaskId) {
        let Some(task) = self.tasks.get_mut(&task_id) else {
            return;
        };
        self.handle.kernel.borrow_mut().current = Some(task_id);
        let mut cx = Context::from_waker(noop_waker_ref());
        let poll = task.as_mut().poll(&mut cx);
        self.handle.kernel.borrow_mut().current = None;
        if poll.is_ready() {
            self.tasks.remove(&task_id);
        }
    }

    /// Apply the writes of the delta step, clock the DUT on a rising edge of `clk`, and wake the
    /// tasks waiting on the resulting edges.
    fn apply_writes(&mut self) {
        let mut kernel = self.handle.kernel.borrow_mut();
        let sampled = kernel.signals.inputs();
        let writes = std::mem::take(&mut kernel.writes);

        let mut edges = vec![];
        for (signal, (_, value)) in writes {
            let previous = kernel.signals.set(signal, value);
            let current = kernel.signals.get(signal);
            if signal.width() == 1 && previous != current {
                let edge = if current == 1 { Edge::Rising } else { Edge::Falling };
                edges.push((signal, edge));
            }
        }

        for (signal, edge) in edges {
            if signal == Signal::Clk && edge == Edge::Rising {
                let output = self.dut.clock(&sampled);
                kernel.signals.set(Signal::UoOut, output as u64);
                kernel.cycle += 1;
            }
            kernel.fire_edges(signal, edge);
        }
    }

    fn advance(&mut self) -> Result<(), HarnessError> {
        let mut kernel = self.handle.kernel.borrow_mut();
        let Some(Reverse((at, _))) = kernel.timers.peek().copied() else {
            return Err(HarnessError::Stalled { now: kernel.now });
        };
        if at > kernel.horizon {
            return Err(HarnessError::HorizonExceeded {
                now: kernel.now,
                horizon: kernel.horizon,
            });
        }

        kernel.now = at;
        while let Some(Reverse((t, wait_id))) = kernel.timers.peek().copied() {
            if t != at {
                break;
            }
            kernel.timers.pop();
            kernel.fire(wait_id);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dut::Playback;
    use crate::sim::time::TimeUnit;

    fn clocked(dut: Box<dyn Dut>, horizon_ns: u64) -> Simulator {
        let mut sim = Simulator::new(dut, SimTime::new(horizon_ns, TimeUnit::Ns));
        let handle = sim.handle();
        sim.spawn(async move {
            loop {
                if handle.write(Signal::Clk, 0).is_err() {
                    return;
                }
                handle.timer(SimTime::new(5, TimeUnit::Ns)).await;
                if handle.write(Signal::Clk, 1).is_err() {
                    return;
                }
                handle.timer(SimTime::new(5, TimeUnit::Ns)).await;
            }
        });
        sim
    }

    #[test]
    fn test_timer_advances_time() {
        let dut = Box::new(Playback::new(vec![]));
        let mut sim = Simulator::new(dut, SimTime::new(100, TimeUnit::Ns));
        let handle = sim.handle();
        let now = sim
            .run_until(async move {
                handle.timer(SimTime::new(30, TimeUnit::Ns)).await;
                handle.timer(SimTime::new(12, TimeUnit::Ns)).await;
                handle.now()
            })
            .unwrap();
        assert_eq!(now, SimTime::new(42, TimeUnit::Ns));
    }

    #[test]
    fn test_rising_edges_are_counted() {
        let mut sim = clocked(Box::new(Playback::new(vec![])), 1_000);
        let handle = sim.handle();
        let (now, cycle) = sim
            .run_until(async move {
                handle.clock_cycles(10).await;
                (handle.now(), handle.cycle())
            })
            .unwrap();
        // The first rising edge happens after one half-period.
        assert_eq!(now, SimTime::new(95, TimeUnit::Ns));
        assert_eq!(cycle, 10);
    }

    #[test]
    fn test_falling_edge() {
        let mut sim = clocked(Box::new(Playback::new(vec![])), 1_000);
        let handle = sim.handle();
        let now = sim
            .run_until(async move {
                handle.rising_edge().await;
                handle.falling_edge().await;
                handle.now()
            })
            .unwrap();
        assert_eq!(now, SimTime::new(10, TimeUnit::Ns));
    }

    #[test]
    fn test_writes_take_effect_after_the_delta_step() {
        let dut = Box::new(Playback::new(vec![]));
        let mut sim = Simulator::new(dut, SimTime::new(100, TimeUnit::Ns));
        let handle = sim.handle();
        let (before, after) = sim
            .run_until(async move {
                handle.write(Signal::UiIn, 0x1FF).unwrap();
                let before = handle.read(Signal::UiIn);
                handle.timer(SimTime::new(1, TimeUnit::Ns)).await;
                (before, handle.read(Signal::UiIn))
            })
            .unwrap();
        assert_eq!(before, 0);
        assert_eq!(after, 0xFF);
    }

    #[test]
    fn test_output_signal_is_read_only() {
        let sim = Simulator::new(Box::new(Playback::new(vec![])), SimTime::ZERO);
        assert_eq!(
            sim.handle().write(Signal::UoOut, 1),
            Err(HarnessError::ReadOnlySignal(Signal::UoOut))
        );
    }

    #[test]
    fn test_write_conflict() {
        let dut = Box::new(Playback::new(vec![]));
        let mut sim = Simulator::new(dut, SimTime::new(100, TimeUnit::Ns));
        let other = sim.handle();
        sim.spawn(async move {
            other.write(Signal::Ena, 1).unwrap();
        });
        let handle = sim.handle();
        let result = sim.run_until(async move { handle.write(Signal::Ena, 0) }).unwrap();
        assert!(matches!(
            result,
            Err(HarnessError::WriteConflict { signal: Signal::Ena, .. })
        ));
    }

    #[test]
    fn test_stalled_without_clock() {
        let dut = Box::new(Playback::new(vec![]));
        let mut sim = Simulator::new(dut, SimTime::new(100, TimeUnit::Ns));
        let handle = sim.handle();
        let result = sim.run_until(async move { handle.rising_edge().await });
        assert_eq!(result, Err(HarnessError::Stalled { now: SimTime::ZERO }));
    }

    #[test]
    fn test_horizon_exceeded() {
        let mut sim = clocked(Box::new(Playback::new(vec![])), 100);
        let handle = sim.handle();
        let result = sim.run_until(async move { handle.clock_cycles(20).await });
        assert!(matches!(result, Err(HarnessError::HorizonExceeded { .. })));
    }

    #[test]
    fn test_dut_is_clocked_before_edge_waiters_resume() {
        // The DUT replays its script once it has seen a reset pulse while enabled.
        let mut sim = clocked(Box::new(Playback::new(vec![0x3, 0x5, 0x9])), 1_000);
        let handle = sim.handle();
        let samples = sim
            .run_until(async move {
                handle.write(Signal::Ena, 1).unwrap();
                handle.write(Signal::RstN, 0).unwrap();
                handle.clock_cycles(2).await;
                handle.write(Signal::RstN, 1).unwrap();
                let mut samples = vec![];
                for _ in 0..4 {
                    handle.rising_edge().await;
                    samples.push(handle.read(Signal::UoOut));
                }
                samples
            })
            .unwrap();
        assert_eq!(samples, vec![0x3, 0x5, 0x9, 0x0]);
    }
}
