//! Generic finite-state-machine driver.
//!
//! The driver holds no domain knowledge. An application implements
//! [`Automaton`]: enumerated states and events, a state function per state,
//! and a transition table. [`Machine::step`] runs one iteration:
//!
//! 1. the `before` hook (ancillary feedback, decoupled from control logic),
//! 2. the current state's function - if it returns a new state, transition,
//! 3. pop at most one queued event (oldest first) and consult the
//!    transition table - an event with no matching entry is a no-op, not an
//!    error.
//!
//! On external cancellation, [`Machine::cancel`] runs the configured
//! interrupt state exactly once as a shutdown action (stop motors, release
//! outputs) before the owning loop exits.
//!
//! Event queues are bounded; see [`EventQueue`].

use heapless::Deque;

/// An application state machine: states, events, behaviour, transitions.
///
/// `run_state` is the per-state behaviour function. It reads sensor and
/// network events, issues at most one motion command, and may either push
/// an event (consumed by the table on this or a later step) or return a
/// direct next state.
pub trait Automaton {
    /// Closed set of state identifiers.
    type State: Copy + PartialEq + core::fmt::Debug;
    /// Closed set of event identifiers.
    type Event: Copy + core::fmt::Debug;

    /// Execute the behaviour for `state`. Returning `Some` transitions
    /// immediately; `None` stays (possibly until an event moves the table).
    fn run_state(&mut self, state: Self::State) -> Option<Self::State>;

    /// The transition table: `None` means the event is ignored in this
    /// state.
    fn next_state(&self, state: Self::State, event: Self::Event) -> Option<Self::State>;

    /// Pop the oldest pending event, if any.
    fn poll_event(&mut self) -> Option<Self::Event>;

    /// Hook run ahead of every state function. Default: nothing.
    fn before(&mut self) {}
}

/// Drives an [`Automaton`] one step at a time.
///
/// # Example
///
/// ```rust
/// use rs_shunter::machine::{Automaton, EventQueue, Machine};
///
/// #[derive(Clone, Copy, Debug, PartialEq)]
/// enum State {
///     Idle,
///     Running,
/// }
/// #[derive(Clone, Copy, Debug)]
/// enum Event {
///     Go,
/// }
///
/// struct App {
///     events: EventQueue<Event, 4>,
/// }
///
/// impl Automaton for App {
///     type State = State;
///     type Event = Event;
///
///     fn run_state(&mut self, _state: State) -> Option<State> {
///         None
///     }
///
///     fn next_state(&self, state: State, event: Event) -> Option<State> {
///         match (state, event) {
///             (State::Idle, Event::Go) => Some(State::Running),
///             _ => None,
///         }
///     }
///
///     fn poll_event(&mut self) -> Option<Event> {
///         self.events.pop()
///     }
/// }
///
/// let mut app = App { events: EventQueue::new() };
/// let mut machine = Machine::<App>::new(State::Idle);
///
/// app.events.push(Event::Go);
/// machine.step(&mut app);
/// assert_eq!(machine.current(), State::Running);
/// ```
pub struct Machine<A: Automaton> {
    current: A::State,
    interrupt_state: Option<A::State>,
}

impl<A: Automaton> Machine<A> {
    /// Create a driver starting in `initial`.
    pub fn new(initial: A::State) -> Self {
        Self {
            current: initial,
            interrupt_state: None,
        }
    }

    /// Configure the state to run once on cancellation.
    pub fn with_interrupt_state(mut self, state: A::State) -> Self {
        self.interrupt_state = Some(state);
        self
    }

    /// The current state.
    pub fn current(&self) -> A::State {
        self.current
    }

    /// Run one iteration: before hook, state function, one table event.
    pub fn step(&mut self, app: &mut A) {
        app.before();

        if let Some(next) = app.run_state(self.current) {
            if next != self.current {
                tracing::debug!(from = ?self.current, to = ?next, "state transition");
            }
            self.current = next;
        }

        if let Some(event) = app.poll_event() {
            match app.next_state(self.current, event) {
                Some(next) => {
                    tracing::debug!(from = ?self.current, to = ?next, ?event, "event transition");
                    self.current = next;
                }
                // unknown event in this state: ignore and continue
                None => {
                    tracing::trace!(state = ?self.current, ?event, "event ignored");
                }
            }
        }
    }

    /// Run the configured interrupt state exactly once. Call on external
    /// cancellation, then stop stepping.
    pub fn cancel(&mut self, app: &mut A) {
        if let Some(state) = self.interrupt_state.take() {
            tracing::debug!(?state, "cancelled, running interrupt state");
            self.current = state;
            if let Some(next) = app.run_state(state) {
                self.current = next;
            }
        }
    }
}

// ============================================================================
// Event queue
// ============================================================================

/// Bounded FIFO event queue.
///
/// Control loops must never block or allocate, so the queue has a fixed
/// capacity. Pushing onto a full queue drops the new event with a warning;
/// in practice the applications enqueue at most one event per tick and
/// drain one per step, so a drop indicates a stalled consumer.
#[derive(Debug)]
pub struct EventQueue<E, const N: usize = 8> {
    queue: Deque<E, N>,
}

impl<E, const N: usize> EventQueue<E, N> {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self {
            queue: Deque::new(),
        }
    }

    /// Append an event. Full queue: the event is dropped.
    pub fn push(&mut self, event: E) {
        if self.queue.push_back(event).is_err() {
            tracing::warn!(capacity = N, "event queue full, dropping event");
        }
    }

    /// Remove and return the oldest event.
    pub fn pop(&mut self) -> Option<E> {
        self.queue.pop_front()
    }

    /// Number of queued events.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Whether the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

impl<E, const N: usize> Default for EventQueue<E, N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq)]
    enum State {
        Idle,
        Running,
        Cleanup,
    }

    #[derive(Clone, Copy, Debug, PartialEq)]
    enum Event {
        Go,
        Halt,
        Bogus,
    }

    struct App {
        events: EventQueue<Event, 4>,
        before_calls: usize,
        run_calls: usize,
        cleanup_calls: usize,
        direct_next: Option<State>,
    }

    impl App {
        fn new() -> Self {
            Self {
                events: EventQueue::new(),
                before_calls: 0,
                run_calls: 0,
                cleanup_calls: 0,
                direct_next: None,
            }
        }
    }

    impl Automaton for App {
        type State = State;
        type Event = Event;

        fn run_state(&mut self, state: State) -> Option<State> {
            self.run_calls += 1;
            if state == State::Cleanup {
                self.cleanup_calls += 1;
            }
            self.direct_next.take()
        }

        fn next_state(&self, state: State, event: Event) -> Option<State> {
            match (state, event) {
                (State::Idle, Event::Go) => Some(State::Running),
                (State::Running, Event::Halt) => Some(State::Idle),
                _ => None,
            }
        }

        fn poll_event(&mut self) -> Option<Event> {
            self.events.pop()
        }

        fn before(&mut self) {
            self.before_calls += 1;
        }
    }

    #[test]
    fn step_without_events_stays_put() {
        let mut app = App::new();
        let mut machine = Machine::<App>::new(State::Idle);
        machine.step(&mut app);
        machine.step(&mut app);
        assert_eq!(machine.current(), State::Idle);
        assert_eq!(app.run_calls, 2);
    }

    #[test]
    fn before_hook_runs_ahead_of_every_state_function() {
        let mut app = App::new();
        let mut machine = Machine::<App>::new(State::Idle);
        for _ in 0..5 {
            machine.step(&mut app);
        }
        assert_eq!(app.before_calls, 5);
        assert_eq!(app.run_calls, 5);
    }

    #[test]
    fn event_transition_follows_table() {
        let mut app = App::new();
        let mut machine = Machine::<App>::new(State::Idle);
        app.events.push(Event::Go);
        machine.step(&mut app);
        assert_eq!(machine.current(), State::Running);
        app.events.push(Event::Halt);
        machine.step(&mut app);
        assert_eq!(machine.current(), State::Idle);
    }

    #[test]
    fn unknown_event_is_a_no_op() {
        let mut app = App::new();
        let mut machine = Machine::<App>::new(State::Idle);
        app.events.push(Event::Bogus);
        machine.step(&mut app);
        assert_eq!(machine.current(), State::Idle);
        // event was consumed, not left to clog the queue
        assert!(app.events.is_empty());
    }

    #[test]
    fn one_event_per_step_oldest_first() {
        let mut app = App::new();
        let mut machine = Machine::<App>::new(State::Idle);
        app.events.push(Event::Go);
        app.events.push(Event::Halt);
        machine.step(&mut app);
        assert_eq!(machine.current(), State::Running); // only Go consumed
        assert_eq!(app.events.len(), 1);
        machine.step(&mut app);
        assert_eq!(machine.current(), State::Idle);
    }

    #[test]
    fn direct_return_wins_over_staying() {
        let mut app = App::new();
        let mut machine = Machine::<App>::new(State::Idle);
        app.direct_next = Some(State::Running);
        machine.step(&mut app);
        assert_eq!(machine.current(), State::Running);
    }

    #[test]
    fn cancel_runs_interrupt_state_exactly_once() {
        let mut app = App::new();
        let mut machine = Machine::<App>::new(State::Running).with_interrupt_state(State::Cleanup);
        machine.cancel(&mut app);
        assert_eq!(app.cleanup_calls, 1);
        // a second cancel is inert
        machine.cancel(&mut app);
        assert_eq!(app.cleanup_calls, 1);
    }

    #[test]
    fn cancel_without_interrupt_state_is_inert() {
        let mut app = App::new();
        let mut machine = Machine::<App>::new(State::Running);
        machine.cancel(&mut app);
        assert_eq!(app.run_calls, 0);
        assert_eq!(machine.current(), State::Running);
    }

    #[test]
    fn event_queue_drops_when_full() {
        let mut queue: EventQueue<u8, 2> = EventQueue::new();
        queue.push(1);
        queue.push(2);
        queue.push(3); // dropped
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.pop(), Some(1));
        assert_eq!(queue.pop(), Some(2));
        assert_eq!(queue.pop(), None);
    }
}
