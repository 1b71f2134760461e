//! Autonomous shuttle: a train bouncing between a home sensor and a timer.
//!
//! The shuttle waits at the home end, departs when the layout's start timer
//! fires, runs for a configured time, coasts to the away end, and returns
//! when the home sensor picks it up again. Sequencing is a five-state
//! machine driven entirely by events:
//!
//! ```text
//!            ShuttleStart            TrainDetected
//! HomeStop ---------------> HomeReady -----------> HomeStart
//!     ^                                                | ShuttleStop
//!     | TrainDetected                                  v
//! AwayStart <--------------- AwayStop <----------------+
//!            ShuttleStart
//! ```
//!
//! Each control tick runs at most one motion command and consumes at most
//! one event. Sensor sampling runs on its own faster schedule, strictly
//! before the control phase in any loop pass, so a state function always
//! sees a coherent snapshot at most one tick old.

use crate::config::ShuttleConfig;
use crate::converter::Presence;
use crate::locomotive::Locomotive;
use crate::machine::{Automaton, EventQueue, Machine};
use crate::scheduler::Scheduler;
use crate::ticks::Ticks;
use crate::traits::MotorDriver;

/// Shuttle sequencing states.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ShuttleState {
    /// Braking hard on return to the home end.
    HomeStop,
    /// At rest at the home end, waiting for the train to be detected.
    HomeReady,
    /// Departing away from home under power.
    HomeStart,
    /// Braking gently at the away end.
    AwayStop,
    /// Returning toward home under power.
    AwayStart,
}

/// Events consumed by the shuttle's transition table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ShuttleEvent {
    /// The periodic start timer fired.
    ShuttleStart,
    /// The departure run time lapsed.
    ShuttleStop,
    /// The home sensor saw the train.
    TrainDetected,
}

/// The shuttle automaton: locomotive plus sequencing state.
///
/// Owned by [`Shuttle`]; separate so the [`Machine`] driver can borrow it
/// while the harness holds the schedulers and sensor chain.
pub struct ShuttleApp<M: MotorDriver> {
    engine: Locomotive<M>,
    events: EventQueue<ShuttleEvent, 8>,
    config: ShuttleConfig,
    countdown: i32,
    fault: Option<M::Error>,
}

impl<M: MotorDriver> ShuttleApp<M> {
    fn new(engine: Locomotive<M>, config: ShuttleConfig) -> Self {
        Self {
            engine,
            events: EventQueue::new(),
            config,
            countdown: 0,
            fault: None,
        }
    }

    /// Record a motion command result; the first error wins.
    fn motion(&mut self, result: Result<(), M::Error>) {
        if let Err(error) = result {
            if self.fault.is_none() {
                self.fault = Some(error);
            }
        }
    }

    fn run_ticks(&self) -> i32 {
        (self.config.run_ms / self.config.control_period_ms.max(1)) as i32
    }
}

impl<M: MotorDriver> Automaton for ShuttleApp<M> {
    type State = ShuttleState;
    type Event = ShuttleEvent;

    fn run_state(&mut self, state: ShuttleState) -> Option<ShuttleState> {
        match state {
            ShuttleState::HomeStop => {
                let brake = self.config.home_brake;
                let result = self.engine.brake(brake);
                self.motion(result);
            }
            ShuttleState::HomeReady => {
                self.countdown = self.run_ticks();
                let result = self.engine.stop();
                self.motion(result);
            }
            ShuttleState::HomeStart => {
                self.countdown -= 1;
                if self.countdown < 0 {
                    self.events.push(ShuttleEvent::ShuttleStop);
                }
                let step = self.config.accelerate_step;
                let result = self.engine.accelerate(step);
                self.motion(result);
            }
            ShuttleState::AwayStop => {
                let brake = self.config.away_brake;
                let result = self.engine.brake(brake);
                self.motion(result);
            }
            ShuttleState::AwayStart => {
                let step = self.config.accelerate_step;
                let result = self.engine.accelerate(-step);
                self.motion(result);
            }
        }
        None
    }

    fn next_state(&self, state: ShuttleState, event: ShuttleEvent) -> Option<ShuttleState> {
        match (state, event) {
            (ShuttleState::HomeStop, ShuttleEvent::ShuttleStart) => Some(ShuttleState::HomeReady),
            (ShuttleState::HomeReady, ShuttleEvent::TrainDetected) => Some(ShuttleState::HomeStart),
            (ShuttleState::HomeStart, ShuttleEvent::ShuttleStop) => Some(ShuttleState::AwayStop),
            (ShuttleState::AwayStop, ShuttleEvent::ShuttleStart) => Some(ShuttleState::AwayStart),
            (ShuttleState::AwayStart, ShuttleEvent::TrainDetected) => Some(ShuttleState::HomeStop),
            _ => None,
        }
    }

    fn poll_event(&mut self) -> Option<ShuttleEvent> {
        self.events.pop()
    }
}

/// Shuttle control loop harness.
///
/// Composes a [`Locomotive`], a presence-detecting sensor chain, and
/// three schedulers (fast sampling, slow control, periodic shuttle
/// start). The owner calls [`poll`](Self::poll) continuously with the
/// current clock; phases fire when their deadlines lapse.
///
/// The home sensor is consumed as a level, not an edge: while the train
/// sits at home, every control tick raises `TrainDetected`, which is what
/// lets `HomeReady` depart again on the next shuttle round. States that
/// do not care simply ignore the event.
pub struct Shuttle<M: MotorDriver, S: Presence> {
    app: ShuttleApp<M>,
    machine: Machine<ShuttleApp<M>>,
    sensor: S,
    sensor_task: Scheduler,
    control_task: Scheduler,
    start_task: Scheduler,
}

impl<M: MotorDriver, S: Presence> Shuttle<M, S> {
    /// Create a shuttle. `now` seeds the schedulers.
    ///
    /// The shuttle starts in [`ShuttleState::HomeReady`]: at rest, waiting
    /// for the home sensor to confirm the train is actually there.
    pub fn new(engine: Locomotive<M>, sensor: S, config: ShuttleConfig, now: Ticks) -> Self {
        Self {
            app: ShuttleApp::new(engine, config),
            machine: Machine::new(ShuttleState::HomeReady),
            sensor,
            sensor_task: Scheduler::every(config.sensor_period_ms, now),
            control_task: Scheduler::every(config.control_period_ms, now),
            start_task: Scheduler::every(config.shuttle_period_ms, now),
        }
    }

    /// Run any phases that are due. Call continuously from the owning loop.
    ///
    /// Ordering within one pass is fixed: sensor sampling, then control,
    /// then the start timer. A motor fault from any state function is
    /// returned immediately and is fatal; do not keep polling after an
    /// error.
    pub fn poll(&mut self, now: Ticks) -> Result<(), M::Error> {
        if self.sensor_task.is_ready(now) {
            self.sensor.sample();
        }

        if self.control_task.is_ready(now) {
            if self.sensor.is_present(now) {
                self.app.events.push(ShuttleEvent::TrainDetected);
            }
            self.machine.step(&mut self.app);
        }

        if self.start_task.is_ready(now) {
            self.app.events.push(ShuttleEvent::ShuttleStart);
        }

        match self.app.fault.take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    /// Stop the locomotive. Call on cancellation, whatever the state.
    pub fn shutdown(&mut self) -> Result<(), M::Error> {
        tracing::info!("shuttle shutdown");
        self.app.engine.stop()
    }

    /// Current sequencing state.
    pub fn state(&self) -> ShuttleState {
        self.machine.current()
    }

    /// The locomotive, for inspection.
    pub fn engine(&self) -> &Locomotive<M> {
        &self.app.engine
    }

    /// Inject an event from outside the loop (an operator command, a test).
    pub fn push_event(&mut self, event: ShuttleEvent) {
        self.app.events.push(event);
    }
}
