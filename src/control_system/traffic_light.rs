use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{unbounded, Receiver, Sender};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::SignalTiming;
use crate::error::{JunctionError, JunctionResult};

/// The two phases of an intersection's traffic light.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrafficLightPhase {
    Red,
    Green,
}

impl TrafficLightPhase {
    /// The phase that follows this one.
    pub fn toggled(self) -> Self {
        match self {
            TrafficLightPhase::Red => TrafficLightPhase::Green,
            TrafficLightPhase::Green => TrafficLightPhase::Red,
        }
    }

    pub fn is_green(self) -> bool {
        self == TrafficLightPhase::Green
    }
}

/// Published to subscribers every time the light toggles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseChange {
    /// The phase the light switched to.
    pub phase: TrafficLightPhase,
    /// How long the previous phase was shown.
    pub held_for: Duration,
}

struct PhaseState {
    phase: TrafficLightPhase,
    /// Number of Red -> Green transitions so far. Lets a waiter notice a green
    /// that already ended before it got scheduled again.
    green_transitions: u64,
    last_change: Instant,
    closed: bool,
}

struct LightShared {
    name: String,
    timing: SignalTiming,
    state: Mutex<PhaseState>,
    green: Condvar,
    // Lock-free mirror of `state.phase` for snapshot reads.
    is_green: AtomicBool,
    subscribers: Mutex<Vec<Sender<PhaseChange>>>,
    stop: AtomicBool,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl LightShared {
    fn toggle(&self) -> PhaseChange {
        let change = {
            let mut state = lock(&self.state);
            state.phase = state.phase.toggled();
            if state.phase.is_green() {
                state.green_transitions += 1;
            }
            let now = Instant::now();
            let change = PhaseChange {
                phase: state.phase,
                held_for: now.duration_since(state.last_change),
            };
            state.last_change = now;
            self.is_green.store(state.phase.is_green(), Ordering::Release);

            // Published while the state lock is held so subscribers see
            // changes in the order they happened.
            lock(&self.subscribers).retain(|tx| tx.send(change).is_ok());
            change
        };
        self.green.notify_all();
        change
    }

    fn random_cycle(&self) -> Duration {
        let ms = rand::rng().random_range(self.timing.min_cycle_ms..=self.timing.max_cycle_ms);
        Duration::from_millis(ms)
    }
}

/// Red/green light that cycles on a randomised interval and releases every
/// waiting thread when it turns green.
pub struct TrafficLight {
    shared: Arc<LightShared>,
    started: AtomicBool,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl TrafficLight {
    /// Creates a light showing red. Nothing cycles until [`TrafficLight::simulate`].
    ///
    /// Fails with [`JunctionError::InvalidConfig`] if `timing` does not validate.
    pub fn new(name: impl Into<String>, timing: SignalTiming) -> JunctionResult<Self> {
        Self::with_phase(name, TrafficLightPhase::Red, timing)
    }

    pub fn with_phase(
        name: impl Into<String>,
        phase: TrafficLightPhase,
        timing: SignalTiming,
    ) -> JunctionResult<Self> {
        timing.validate()?;
        Ok(Self {
            shared: Arc::new(LightShared {
                name: name.into(),
                timing,
                state: Mutex::new(PhaseState {
                    phase,
                    green_transitions: 0,
                    last_change: Instant::now(),
                    closed: false,
                }),
                green: Condvar::new(),
                is_green: AtomicBool::new(phase.is_green()),
                subscribers: Mutex::new(Vec::new()),
                stop: AtomicBool::new(false),
            }),
            started: AtomicBool::new(false),
            worker: Mutex::new(None),
        })
    }

    pub fn current_phase(&self) -> TrafficLightPhase {
        if self.shared.is_green.load(Ordering::Acquire) {
            TrafficLightPhase::Green
        } else {
            TrafficLightPhase::Red
        }
    }

    pub fn timing(&self) -> SignalTiming {
        self.shared.timing
    }

    /// Blocks until the light is green.
    ///
    /// Returns at once if it already is. Every thread blocked here is released
    /// by the same Red -> Green transition, even if the light turns red again
    /// before a waiter gets to run.
    pub fn wait_for_green(&self) -> JunctionResult<()> {
        let mut state = lock(&self.shared.state);
        let seen = state.green_transitions;
        loop {
            if state.phase.is_green() || state.green_transitions != seen {
                return Ok(());
            }
            if state.closed {
                return Err(JunctionError::Closed);
            }
            state = self
                .shared
                .green
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Switches the phase immediately and notifies all waiters and subscribers.
    pub fn toggle(&self) -> PhaseChange {
        self.shared.toggle()
    }

    /// Receives every phase change from now on.
    pub fn subscribe(&self) -> Receiver<PhaseChange> {
        let (tx, rx) = unbounded();
        lock(&self.shared.subscribers).push(tx);
        rx
    }

    /// Starts the cycling thread. Later calls do nothing.
    pub fn simulate(&self) {
        if self.started.swap(true, Ordering::AcqRel) {
            log::warn!("{}: traffic light already cycling", self.shared.name);
            return;
        }
        let shared = Arc::clone(&self.shared);
        let handle = thread::Builder::new()
            .name(format!("{} light", shared.name))
            .spawn(move || cycle_through_phases(shared));
        match handle {
            Ok(handle) => *lock(&self.worker) = Some(handle),
            Err(e) => log::error!("{}: failed to start light cycle: {}", self.shared.name, e),
        }
    }

    /// Stops cycling, wakes every waiter with [`JunctionError::Closed`] and
    /// joins the cycling thread. Safe to call more than once.
    pub fn shutdown(&self) {
        self.shared.stop.store(true, Ordering::Release);
        lock(&self.shared.state).closed = true;
        self.shared.green.notify_all();
        lock(&self.shared.subscribers).clear();

        if let Some(handle) = lock(&self.worker).take() {
            if handle.join().is_err() {
                log::warn!("{}: light cycle thread panicked", self.shared.name);
            }
        }
    }
}

impl Drop for TrafficLight {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn cycle_through_phases(shared: Arc<LightShared>) {
    let poll = shared.timing.poll_interval();
    let mut cycle_duration = shared.random_cycle();
    let mut last_update = Instant::now();

    while !shared.stop.load(Ordering::Acquire) {
        thread::sleep(poll);

        if last_update.elapsed() >= cycle_duration {
            cycle_duration = shared.random_cycle();
            let change = shared.toggle();
            log::debug!(
                "{}: light turned {:?} after {} ms",
                shared.name,
                change.phase,
                change.held_for.as_millis()
            );
            last_update = Instant::now();
        }
    }
}
