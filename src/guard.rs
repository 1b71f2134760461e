//! Guard: two-endpoint semi-automatic train coordination.
//!
//! Two independent state machines with no shared memory, coordinating over
//! lossy datagrams (see [`crate::message`] for the vocabulary):
//!
//! - [`GuardController`]: the operator's end. A speed lever and direction
//!   switch, translated into `CONTROL` commands; discovery by broadcasting
//!   `MARCO` until a `POLO` comes back.
//! - [`GuardActuator`]: the train's end. Applies `CONTROL`/`STOP` to its
//!   locomotive, and in automatic mode bounces between two end sensors,
//!   notifying the controller at each reversal.
//!
//! Every command is an idempotent absolute instruction, so lost and
//! duplicated datagrams degrade latency, never correctness. A quiet
//! network is the steady state, not an error.
//!
//! ```text
//! controller states                    actuator states
//!
//! Identify --Polo--> Stopped           Listening --Control--> Manual
//! Stopped --mid lever--> Transition    Manual --Auto--> Automatic
//! Transition --lever 0--> Manual       Automatic --Stop--> Listening
//! Transition --Bounce--> Automatic     Automatic --Control--> Manual
//! Automatic --Stop--> Stopped
//! ```

use crate::behaviour::{EventSource, SensorEvent};
use crate::config::GuardConfig;
use crate::locomotive::{Locomotive, RelativeDirection};
use crate::machine::{Automaton, EventQueue, Machine};
use crate::message::{echo_reply, Message};
use crate::scheduler::Scheduler;
use crate::ticks::Ticks;
use crate::traits::{Datagram, Endpoint, LeverDirection, LeverInput, MotorDriver};

// ============================================================================
// Controller
// ============================================================================

/// Controller (operator end) states.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ControllerState {
    /// Broadcasting `MARCO` until the actuator answers.
    Identify,
    /// Connected and at rest; a mid-range lever arms mode selection.
    Stopped,
    /// Mode selection: lever to 0 for manual, 100 for automatic.
    Transition,
    /// Lever changes stream out as `CONTROL` commands.
    Manual,
    /// The actuator is bouncing on its own; the lever only interrupts.
    Automatic,
    /// Interrupt state: command the train to stop and go quiet.
    Shutdown,
}

/// The controller automaton. Owned and stepped by [`GuardController`].
pub struct ControllerApp<N: Datagram, L: LeverInput> {
    socket: N,
    lever: L,
    config: GuardConfig,
    events: EventQueue<Message, 8>,
    now: Ticks,
    retry: Scheduler,
    identify_started: bool,
    peer: Option<Endpoint>,
    last_speed: Option<u8>,
    last_direction: Option<LeverDirection>,
    flip_count: u8,
    end_feedback: Option<RelativeDirection>,
}

impl<N: Datagram, L: LeverInput> ControllerApp<N, L> {
    fn new(socket: N, lever: L, config: GuardConfig) -> Self {
        Self {
            socket,
            lever,
            config,
            events: EventQueue::new(),
            now: 0,
            retry: Scheduler::every(config.retry_ms, 0),
            identify_started: false,
            peer: None,
            last_speed: None,
            last_direction: None,
            flip_count: 0,
            end_feedback: None,
        }
    }

    /// Send to the discovered peer, or broadcast before discovery.
    /// A failed send is a lost datagram: logged, not fatal.
    fn send(&mut self, message: Message) {
        let dest = self.peer.unwrap_or(Endpoint::Broadcast);
        let wire = message.encode();
        if self.socket.send(wire.as_str(), dest).is_err() {
            tracing::warn!(command = wire.as_str(), "datagram send failed");
        }
    }

    /// Drain the socket, capturing the peer and feedback, queueing the
    /// events the transition table cares about.
    fn dispatch_incoming(&mut self) {
        while let Some((payload, from)) = self.socket.recv() {
            match Message::parse(&payload) {
                Some(Message::Polo) => {
                    self.peer = Some(from);
                    // snapshot the lever so Manual starts from "no change"
                    self.last_speed = Some(self.lever.speed_percent());
                    self.last_direction = Some(self.lever.direction());
                    self.events.push(Message::Polo);
                }
                Some(Message::ForwardEnd) => {
                    self.end_feedback = Some(RelativeDirection::Forward);
                }
                Some(Message::ReverseEnd) => {
                    self.end_feedback = Some(RelativeDirection::Reverse);
                }
                Some(message @ (Message::Bounce | Message::Stop | Message::Error)) => {
                    self.events.push(message);
                }
                Some(Message::Echo) => {
                    tracing::debug!("peer echoed unparseable traffic");
                }
                Some(other) => {
                    tracing::trace!(?other, "ignored message");
                }
                None => {
                    tracing::debug!("unparseable datagram ignored");
                }
            }
        }
    }
}

impl<N: Datagram, L: LeverInput> Automaton for ControllerApp<N, L> {
    type State = ControllerState;
    type Event = Message;

    fn run_state(&mut self, state: ControllerState) -> Option<ControllerState> {
        match state {
            ControllerState::Identify => {
                // put the actuator into a known state, then call out;
                // retry for as long as it takes
                if !self.identify_started {
                    self.identify_started = true;
                    self.send(Message::Stop);
                    self.send(Message::Marco);
                    self.retry.restart(self.now);
                } else if self.retry.is_ready(self.now) {
                    self.send(Message::Marco);
                }
                None
            }

            ControllerState::Stopped => {
                let speed = self.lever.speed_percent();
                self.last_speed = Some(speed);
                if (33..=66).contains(&speed) {
                    Some(ControllerState::Transition)
                } else {
                    None
                }
            }

            ControllerState::Transition => {
                let speed = self.lever.speed_percent();
                if speed == 0 {
                    self.last_speed = Some(0);
                    return Some(ControllerState::Manual);
                }
                if speed == 100 && self.last_speed != Some(100) {
                    self.send(Message::Auto);
                }
                self.last_speed = Some(speed);
                None
            }

            ControllerState::Manual => {
                let speed = self.lever.speed_percent();
                let direction = self.lever.direction();

                if speed == 0 && self.last_direction.is_some_and(|last| last != direction) {
                    self.flip_count += 1;
                }
                if speed > 0 {
                    self.flip_count = 0;
                }

                let next = if self.flip_count >= self.config.direction_flip_limit {
                    self.flip_count = 0;
                    self.send(Message::Stop);
                    Some(ControllerState::Stopped)
                } else if self.last_speed != Some(speed) || self.last_direction != Some(direction)
                {
                    self.send(Message::Control { direction, speed });
                    None
                } else {
                    None
                };

                self.last_speed = Some(speed);
                self.last_direction = Some(direction);
                next
            }

            ControllerState::Automatic => {
                let speed = self.lever.speed_percent();
                let moved = self
                    .last_speed
                    .is_some_and(|last| speed.abs_diff(last) >= self.config.lever_override_percent);
                if moved {
                    // the operator grabbed the lever: stop the train and
                    // fall back to mode selection
                    self.send(Message::Stop);
                    self.last_speed = Some(speed);
                    return Some(ControllerState::Stopped);
                }
                None
            }

            ControllerState::Shutdown => {
                self.send(Message::Stop);
                None
            }
        }
    }

    fn next_state(&self, state: ControllerState, event: Message) -> Option<ControllerState> {
        match (state, event) {
            (ControllerState::Identify, Message::Polo) => Some(ControllerState::Stopped),
            (ControllerState::Transition, Message::Bounce) => Some(ControllerState::Automatic),
            (ControllerState::Automatic, Message::Stop) => Some(ControllerState::Stopped),
            _ => None,
        }
    }

    fn poll_event(&mut self) -> Option<Message> {
        self.events.pop()
    }
}

/// Controller control-loop harness.
pub struct GuardController<N: Datagram, L: LeverInput> {
    app: ControllerApp<N, L>,
    machine: Machine<ControllerApp<N, L>>,
    poll_task: Scheduler,
}

impl<N: Datagram, L: LeverInput> GuardController<N, L> {
    /// Create a controller. `now` seeds the polling schedule.
    pub fn new(socket: N, lever: L, config: GuardConfig, now: Ticks) -> Self {
        Self {
            app: ControllerApp::new(socket, lever, config),
            machine: Machine::new(ControllerState::Identify)
                .with_interrupt_state(ControllerState::Shutdown),
            poll_task: Scheduler::every(config.poll_period_ms, now),
        }
    }

    /// Run one loop pass if the poll period has lapsed.
    pub fn poll(&mut self, now: Ticks) {
        if !self.poll_task.is_ready(now) {
            return;
        }
        self.app.now = now;
        self.app.dispatch_incoming();
        self.machine.step(&mut self.app);
    }

    /// External cancellation: runs the shutdown state exactly once.
    pub fn cancel(&mut self) {
        self.machine.cancel(&mut self.app);
    }

    /// Current state.
    pub fn state(&self) -> ControllerState {
        self.machine.current()
    }

    /// The discovered actuator endpoint, if any.
    pub fn peer(&self) -> Option<Endpoint> {
        self.app.peer
    }

    /// Latest end-sensor feedback from the actuator, for indicators.
    pub fn end_feedback(&self) -> Option<RelativeDirection> {
        self.app.end_feedback
    }

    /// The transport, for inspection.
    pub fn socket(&self) -> &N {
        &self.app.socket
    }

    /// Mutable transport access (queueing test traffic, reconfiguring).
    pub fn socket_mut(&mut self) -> &mut N {
        &mut self.app.socket
    }

    /// Mutable lever access.
    pub fn lever_mut(&mut self) -> &mut L {
        &mut self.app.lever
    }
}

// ============================================================================
// Actuator
// ============================================================================

/// Actuator (train end) states.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ActuatorState {
    /// At rest, answering discovery, waiting for commands.
    Listening,
    /// Steering toward the last `CONTROL` command.
    Manual,
    /// Bouncing between the end sensors autonomously.
    Automatic,
    /// Interrupt state: stop the motor.
    Shutdown,
}

/// The actuator automaton. Owned and stepped by [`GuardActuator`].
pub struct ActuatorApp<M: MotorDriver, N: Datagram> {
    engine: Locomotive<M>,
    socket: N,
    config: GuardConfig,
    events: EventQueue<Message, 8>,
    peer: Option<Endpoint>,
    commanded: Option<(LeverDirection, u8)>,
    auto_direction: RelativeDirection,
    pending_end: Option<RelativeDirection>,
    fault: Option<M::Error>,
}

impl<M: MotorDriver, N: Datagram> ActuatorApp<M, N> {
    fn new(engine: Locomotive<M>, socket: N, config: GuardConfig) -> Self {
        Self {
            engine,
            socket,
            config,
            events: EventQueue::new(),
            peer: None,
            commanded: None,
            auto_direction: RelativeDirection::Forward,
            pending_end: None,
            fault: None,
        }
    }

    fn motion(&mut self, result: Result<(), M::Error>) {
        if let Err(error) = result {
            if self.fault.is_none() {
                self.fault = Some(error);
            }
        }
    }

    fn send_to(&mut self, wire: &str, dest: Endpoint) {
        if self.socket.send(wire, dest).is_err() {
            tracing::warn!(command = wire, "datagram send failed");
        }
    }

    /// Notify the controller, if one has been discovered.
    fn notify(&mut self, message: Message) {
        if let Some(peer) = self.peer {
            let wire = message.encode();
            self.send_to(wire.as_str(), peer);
        }
    }

    /// Drain the socket. Discovery and acknowledgements are answered
    /// inline; commands queue for the transition table.
    fn dispatch_incoming(&mut self) {
        while let Some((payload, from)) = self.socket.recv() {
            match Message::parse(&payload) {
                Some(Message::Marco) => {
                    self.peer = Some(from);
                    let wire = Message::Polo.encode();
                    self.send_to(wire.as_str(), from);
                }
                Some(message @ Message::Control { direction, speed }) => {
                    self.peer = Some(from);
                    self.commanded = Some((direction, speed));
                    self.events.push(message);
                }
                Some(Message::Auto) => {
                    self.peer = Some(from);
                    let wire = Message::Bounce.encode();
                    self.send_to(wire.as_str(), from);
                    self.events.push(Message::Auto);
                }
                Some(Message::Stop) => {
                    self.events.push(Message::Stop);
                }
                Some(Message::Echo) => {}
                Some(other) => {
                    tracing::trace!(?other, "ignored message");
                }
                None => {
                    // garbled traffic: echo it back for diagnostics
                    let reply = echo_reply(&payload);
                    self.send_to(reply.as_str(), from);
                }
            }
        }
    }

    /// One bounded step toward a target velocity.
    fn steer(&mut self, target: f32) {
        let delta = target - self.engine.velocity();
        let ramp = self.config.ramp_step;
        let step = delta.clamp(-ramp, ramp);
        if step != 0.0 {
            let result = self.engine.accelerate(step);
            self.motion(result);
        }
    }

    fn commanded_target(&self) -> f32 {
        let Some((direction, speed)) = self.commanded else {
            return 0.0;
        };
        let magnitude = speed as f32 / 100.0 * self.engine.profile().max_speed;
        match direction {
            LeverDirection::Forward => magnitude,
            LeverDirection::Reverse => -magnitude,
            LeverDirection::Neutral => 0.0,
        }
    }

    fn auto_target(&self) -> f32 {
        let magnitude =
            self.config.auto_speed_percent as f32 / 100.0 * self.engine.profile().max_speed;
        match self.auto_direction {
            RelativeDirection::Forward => magnitude,
            RelativeDirection::Reverse => -magnitude,
        }
    }
}

impl<M: MotorDriver, N: Datagram> Automaton for ActuatorApp<M, N> {
    type State = ActuatorState;
    type Event = Message;

    fn run_state(&mut self, state: ActuatorState) -> Option<ActuatorState> {
        match state {
            ActuatorState::Listening => {
                if self.engine.velocity() != 0.0 {
                    let result = self.engine.stop();
                    self.motion(result);
                }
            }

            ActuatorState::Manual => {
                let target = self.commanded_target();
                self.steer(target);
            }

            ActuatorState::Automatic => {
                if let Some(end) = self.pending_end.take() {
                    // reached an end of the run: report it, reverse
                    let (note, next_direction) = match end {
                        RelativeDirection::Forward => {
                            (Message::ForwardEnd, RelativeDirection::Reverse)
                        }
                        RelativeDirection::Reverse => {
                            (Message::ReverseEnd, RelativeDirection::Forward)
                        }
                    };
                    self.notify(note);
                    self.auto_direction = next_direction;
                    let result = self.engine.stop();
                    self.motion(result);
                } else {
                    let target = self.auto_target();
                    self.steer(target);
                }
            }

            ActuatorState::Shutdown => {
                let result = self.engine.stop();
                self.motion(result);
            }
        }
        None
    }

    fn next_state(&self, state: ActuatorState, event: Message) -> Option<ActuatorState> {
        match (state, event) {
            (ActuatorState::Listening, Message::Control { .. }) => Some(ActuatorState::Manual),
            (ActuatorState::Automatic, Message::Control { .. }) => Some(ActuatorState::Manual),
            (ActuatorState::Listening, Message::Auto) => Some(ActuatorState::Automatic),
            (ActuatorState::Manual, Message::Auto) => Some(ActuatorState::Automatic),
            (ActuatorState::Manual, Message::Stop) => Some(ActuatorState::Listening),
            (ActuatorState::Automatic, Message::Stop) => Some(ActuatorState::Listening),
            _ => None,
        }
    }

    fn poll_event(&mut self) -> Option<Message> {
        self.events.pop()
    }
}

/// Actuator control-loop harness.
///
/// `F` watches the forward end of the run, `R` the reverse end. In
/// automatic mode a trigger on either sensor reverses the train and
/// notifies the controller.
pub struct GuardActuator<M, N, F, R>
where
    M: MotorDriver,
    N: Datagram,
    F: EventSource,
    R: EventSource,
{
    app: ActuatorApp<M, N>,
    machine: Machine<ActuatorApp<M, N>>,
    forward_sensor: F,
    reverse_sensor: R,
    poll_task: Scheduler,
}

impl<M, N, F, R> GuardActuator<M, N, F, R>
where
    M: MotorDriver,
    N: Datagram,
    F: EventSource,
    R: EventSource,
{
    /// Create an actuator. `now` seeds the polling schedule.
    pub fn new(
        engine: Locomotive<M>,
        socket: N,
        forward_sensor: F,
        reverse_sensor: R,
        config: GuardConfig,
        now: Ticks,
    ) -> Self {
        Self {
            app: ActuatorApp::new(engine, socket, config),
            machine: Machine::new(ActuatorState::Listening)
                .with_interrupt_state(ActuatorState::Shutdown),
            forward_sensor,
            reverse_sensor,
            poll_task: Scheduler::every(config.poll_period_ms, now),
        }
    }

    /// Run one loop pass if the poll period has lapsed. Sensor sampling
    /// runs strictly before the state machine, so a state function sees a
    /// snapshot at most one tick old.
    pub fn poll(&mut self, now: Ticks) -> Result<(), M::Error> {
        if !self.poll_task.is_ready(now) {
            return Ok(());
        }

        self.forward_sensor.sample();
        self.reverse_sensor.sample();

        if self.forward_sensor.check_event(now) == SensorEvent::Trigger {
            self.app.pending_end = Some(RelativeDirection::Forward);
        }
        if self.reverse_sensor.check_event(now) == SensorEvent::Trigger {
            self.app.pending_end = Some(RelativeDirection::Reverse);
        }

        self.app.dispatch_incoming();
        self.machine.step(&mut self.app);

        match self.app.fault.take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    /// External cancellation: stops the motor via the shutdown state.
    pub fn cancel(&mut self) -> Result<(), M::Error> {
        self.machine.cancel(&mut self.app);
        match self.app.fault.take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    /// Current state.
    pub fn state(&self) -> ActuatorState {
        self.machine.current()
    }

    /// The locomotive, for inspection.
    pub fn engine(&self) -> &Locomotive<M> {
        &self.app.engine
    }

    /// The transport, for inspection.
    pub fn socket(&self) -> &N {
        &self.app.socket
    }

    /// Mutable transport access (queueing test traffic).
    pub fn socket_mut(&mut self) -> &mut N {
        &mut self.app.socket
    }

    /// Mutable access to the forward end sensor chain.
    pub fn forward_sensor_mut(&mut self) -> &mut F {
        &mut self.forward_sensor
    }

    /// Mutable access to the reverse end sensor chain.
    pub fn reverse_sensor_mut(&mut self) -> &mut R {
        &mut self.reverse_sensor
    }
}
