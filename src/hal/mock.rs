//! Mock implementations for testing without hardware.
//!
//! Test doubles for every capability trait, enabling development and
//! testing on desktop without a layout on the desk.
//!
//! # Available Mocks
//!
//! | Mock | Trait | Purpose |
//! |------|-------|---------|
//! | [`MockPin`] | [`DigitalInput`] | Scripted pin levels |
//! | [`MockAdc`] | [`AnalogInput`] | Queued ADC samples |
//! | [`MockMotor`] | [`MotorDriver`] | Records drive commands |
//! | [`MockClock`] | [`Clock`] | Controllable time source |
//! | [`MockLever`] | [`LeverInput`] | Settable operator controls |
//! | [`MockSocket`] | [`Datagram`] | Captured sends, queued receives |
//!
//! Queued inputs drain oldest-first and then hold the last value, which
//! matches how a real sensor keeps reporting its current reading between
//! changes.
//!
//! # Example
//!
//! ```rust
//! use rs_shunter::config::Profile;
//! use rs_shunter::hal::MockMotor;
//! use rs_shunter::locomotive::{AbsoluteDirection, Locomotive};
//!
//! let mut engine = Locomotive::new(MockMotor::new(), Profile::named("test").unwrap(),
//!     AbsoluteDirection::Left);
//! engine.accelerate(1.0).unwrap();
//!
//! assert!(engine.motor().is_on());
//! assert!((engine.motor().step - 9.0).abs() < 1e-6); // dead band 8 + speed 1
//! ```
//!
//! [`DigitalInput`]: crate::traits::DigitalInput
//! [`AnalogInput`]: crate::traits::AnalogInput
//! [`MotorDriver`]: crate::traits::MotorDriver
//! [`Clock`]: crate::traits::Clock
//! [`LeverInput`]: crate::traits::LeverInput
//! [`Datagram`]: crate::traits::Datagram

extern crate alloc;
use alloc::collections::VecDeque;
use alloc::string::String;
use alloc::vec::Vec;

use crate::ticks::Ticks;
use crate::traits::{
    AnalogInput, Clock, Datagram, DigitalInput, Endpoint, LeverDirection, LeverInput, MotorDriver,
    Payload, Polarity,
};

// ============================================================================
// Sensor mocks
// ============================================================================

/// Mock digital pin.
///
/// Queue levels to script a sequence; once the queue drains, the last
/// level persists.
#[derive(Debug, Default)]
pub struct MockPin {
    queued: VecDeque<bool>,
    level: bool,
}

impl MockPin {
    /// Creates a pin reading low.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the steady level.
    pub fn set_level(&mut self, level: bool) {
        self.level = level;
    }

    /// Queue a sequence of levels, oldest first.
    pub fn queue_levels(&mut self, levels: &[bool]) {
        self.queued.extend(levels.iter().copied());
    }
}

impl DigitalInput for MockPin {
    fn read(&mut self) -> bool {
        if let Some(level) = self.queued.pop_front() {
            self.level = level;
        }
        self.level
    }
}

/// Mock ADC channel.
///
/// Samples are 16-bit full scale, as the [`AnalogInput`] contract
/// requires; detectors rescale to 10 bits, so a 10-bit test value `v`
/// should be queued as `v << 6`.
#[derive(Debug, Default)]
pub struct MockAdc {
    queued: VecDeque<u16>,
    level: u16,
}

impl MockAdc {
    /// Creates an ADC reading zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the steady sample value.
    pub fn set_level(&mut self, level: u16) {
        self.level = level;
    }

    /// Queue one sample.
    pub fn queue_sample(&mut self, sample: u16) {
        self.queued.push_back(sample);
    }

    /// Queue a sequence of samples, oldest first.
    pub fn queue_samples(&mut self, samples: &[u16]) {
        self.queued.extend(samples.iter().copied());
    }
}

impl AnalogInput for MockAdc {
    fn read(&mut self) -> u16 {
        if let Some(sample) = self.queued.pop_front() {
            self.level = sample;
        }
        self.level
    }
}

// ============================================================================
// Motor mock
// ============================================================================

/// Error returned by [`MockMotor`] when scripted to fail.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MotorNotReady;

/// Mock motor driver.
///
/// Records the last drive command and counts calls. Set
/// [`fail_next`](Self::fail_next) to script a hardware-not-ready error on
/// the next operation.
#[derive(Debug, Default)]
pub struct MockMotor {
    /// Polarity of the last drive command.
    pub polarity: Polarity,
    /// Step of the last drive command (zero after `off`).
    pub step: f32,
    /// Whether the motor is currently driven.
    pub on: bool,
    /// Number of `drive` calls.
    pub drive_calls: usize,
    /// Number of `off` calls.
    pub off_calls: usize,
    /// Fail the next operation with [`MotorNotReady`].
    pub fail_next: bool,
}

impl MockMotor {
    /// Creates a mock motor, off.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the motor is currently driven.
    pub fn is_on(&self) -> bool {
        self.on
    }
}

impl MotorDriver for MockMotor {
    type Error = MotorNotReady;

    fn drive(&mut self, polarity: Polarity, step: f32) -> Result<(), MotorNotReady> {
        if self.fail_next {
            self.fail_next = false;
            return Err(MotorNotReady);
        }
        self.polarity = polarity;
        self.step = step;
        self.on = true;
        self.drive_calls += 1;
        Ok(())
    }

    fn off(&mut self) -> Result<(), MotorNotReady> {
        if self.fail_next {
            self.fail_next = false;
            return Err(MotorNotReady);
        }
        self.step = 0.0;
        self.on = false;
        self.off_calls += 1;
        Ok(())
    }
}

// ============================================================================
// Clock mock
// ============================================================================

/// Mock clock with controllable time.
///
/// # Example
///
/// ```rust
/// use rs_shunter::hal::MockClock;
/// use rs_shunter::traits::Clock;
///
/// let mut clock = MockClock::new();
/// clock.advance(500);
/// assert_eq!(clock.now_ms(), 500);
/// clock.set(1_000);
/// assert_eq!(clock.now_ms(), 1_000);
/// ```
#[derive(Debug, Default)]
pub struct MockClock {
    current_ms: Ticks,
}

impl MockClock {
    /// Creates a clock at 0 ms.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a clock at the given time, for rollover tests.
    pub fn at(ms: Ticks) -> Self {
        Self { current_ms: ms }
    }

    /// Set the current time.
    pub fn set(&mut self, ms: Ticks) {
        self.current_ms = ms;
    }

    /// Advance the clock, wrapping at the counter range.
    pub fn advance(&mut self, ms: Ticks) {
        self.current_ms = self.current_ms.wrapping_add(ms);
    }
}

impl Clock for MockClock {
    fn now_ms(&self) -> Ticks {
        self.current_ms
    }
}

// ============================================================================
// Operator controls mock
// ============================================================================

/// Mock speed lever and direction switch.
#[derive(Debug, Default)]
pub struct MockLever {
    /// Current lever position, percent.
    pub speed: u8,
    /// Current direction switch position.
    pub direction: LeverDirection,
}

impl MockLever {
    /// Creates a lever at zero, neutral.
    pub fn new() -> Self {
        Self::default()
    }

    /// Move the lever.
    pub fn set(&mut self, speed: u8, direction: LeverDirection) {
        self.speed = speed;
        self.direction = direction;
    }
}

impl LeverInput for MockLever {
    fn speed_percent(&mut self) -> u8 {
        self.speed
    }

    fn direction(&mut self) -> LeverDirection {
        self.direction
    }
}

// ============================================================================
// Network mock
// ============================================================================

/// Mock datagram transport.
///
/// Captures sent messages and serves queued incoming datagrams, oldest
/// first. `recv` on an empty queue returns `None`, like a quiet network.
///
/// # Example
///
/// ```rust
/// use rs_shunter::hal::MockSocket;
/// use rs_shunter::traits::{Datagram, Endpoint};
///
/// let mut socket = MockSocket::new();
/// socket.queue_incoming(b"POLO", Endpoint::Unicast(2));
///
/// let (payload, from) = socket.recv().unwrap();
/// assert_eq!(&payload[..], b"POLO");
/// assert_eq!(from, Endpoint::Unicast(2));
///
/// socket.send("CONTROL F 40", from).unwrap();
/// assert_eq!(socket.sent.len(), 1);
/// assert_eq!(socket.sent[0].0, "CONTROL F 40");
/// ```
#[derive(Debug, Default)]
pub struct MockSocket {
    /// Messages sent, in order, with their destinations.
    pub sent: Vec<(String, Endpoint)>,
    /// Queue of incoming datagrams served by `recv`.
    pub incoming: VecDeque<(Payload, Endpoint)>,
}

impl MockSocket {
    /// Creates a socket with nothing queued.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an incoming datagram. Oversized payloads are truncated, as a
    /// real transport's receive buffer would.
    pub fn queue_incoming(&mut self, payload: &[u8], from: Endpoint) {
        let mut buf = Payload::new();
        for &byte in payload {
            if buf.push(byte).is_err() {
                break;
            }
        }
        self.incoming.push_back((buf, from));
    }

    /// Messages sent to the given destination.
    pub fn sent_to(&self, dest: Endpoint) -> Vec<&str> {
        self.sent
            .iter()
            .filter(|(_, d)| *d == dest)
            .map(|(m, _)| m.as_str())
            .collect()
    }

    /// The most recently sent message, if any.
    pub fn last_sent(&self) -> Option<&str> {
        self.sent.last().map(|(m, _)| m.as_str())
    }

    /// Clear the sent log.
    pub fn clear_sent(&mut self) {
        self.sent.clear();
    }
}

impl Datagram for MockSocket {
    type Error = core::convert::Infallible;

    fn send(&mut self, message: &str, dest: Endpoint) -> Result<(), Self::Error> {
        self.sent.push((String::from(message), dest));
        Ok(())
    }

    fn recv(&mut self) -> Option<(Payload, Endpoint)> {
        self.incoming.pop_front()
    }
}

// ============================================================================
// Tests
// ============================================================================
