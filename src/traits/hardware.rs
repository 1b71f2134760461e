//! Hardware capability traits for sensors, motors, and timing.
//!
//! The control core never touches a pin, an ADC, or a PWM peripheral
//! directly. Everything physical is injected through the traits in this
//! module, which keeps the core testable on desktop and portable across
//! boards.
//!
//! # Key Traits
//!
//! | Trait | Purpose |
//! |-------|---------|
//! | [`DigitalInput`] | Boolean pin read for digital sensors |
//! | [`AnalogInput`] | ADC read for analog sensors |
//! | [`MotorDriver`] | Direction-and-step DC motor drive |
//! | [`Clock`] | Monotonic wrapping tick source |
//! | [`LeverInput`] | Operator speed/direction controls |
//!
//! Sensor reads are infallible by contract: a detector that has nothing to
//! report returns a quiescent value, never an error, so the control loop
//! can never stall on input. Motor operations are fallible because a driver
//! addressed before initialisation is a wiring/configuration mistake that
//! must surface immediately.
//!
//! For testing and desktop development use the mock implementations from
//! [`crate::hal::mock`].

use crate::ticks::Ticks;

/// Electrical polarity applied to a motor output.
///
/// This is the final, absolute polarity on the wire, after track polarity,
/// locomotive orientation, and direction of travel have all been folded in
/// (see [`Locomotive`]).
///
/// [`Locomotive`]: crate::locomotive::Locomotive
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Polarity {
    /// Nominal forward polarity.
    #[default]
    Forward,
    /// Reversed polarity.
    Reverse,
}

impl Polarity {
    /// Returns the opposite polarity.
    #[inline]
    pub const fn flipped(self) -> Self {
        match self {
            Polarity::Forward => Polarity::Reverse,
            Polarity::Reverse => Polarity::Forward,
        }
    }

    /// Returns the polarity as a lowercase string.
    #[inline]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Polarity::Forward => "forward",
            Polarity::Reverse => "reverse",
        }
    }
}

/// Digital sensor pin capability.
///
/// One read per call; debouncing and interpretation happen in the signal
/// pipeline, not here.
pub trait DigitalInput {
    /// Read the current pin level.
    fn read(&mut self) -> bool;
}

/// Analog sensor capability.
///
/// Returns the raw conversion scaled to the full 16-bit range, whatever the
/// underlying converter width. [`AnalogDetector`] rescales to a common bit
/// depth so thresholds are comparable across boards.
///
/// [`AnalogDetector`]: crate::detector::AnalogDetector
pub trait AnalogInput {
    /// Read one conversion as a 16-bit full-scale value.
    fn read(&mut self) -> u16;
}

/// DC motor driver capability.
///
/// The core addresses a motor as a polarity plus a non-negative step
/// (duty percentage). A step of zero always means "off"; drivers must not
/// interpret it as a stall at minimum duty.
///
/// # Errors
///
/// Implementations return an error when the driver is not ready (not
/// initialised, bad channel). The core treats this as fatal configuration
/// trouble and reports it without retrying.
///
/// # Example Implementation
///
/// ```rust,ignore
/// use rs_shunter::traits::{MotorDriver, Polarity};
///
/// struct BoardMotor { /* pwm + h-bridge handles */ }
///
/// impl MotorDriver for BoardMotor {
///     type Error = BoardError;
///
///     fn drive(&mut self, polarity: Polarity, step: f32) -> Result<(), BoardError> {
///         let duty = step.clamp(0.0, 100.0);
///         // set h-bridge pins from polarity, PWM duty from step...
///         Ok(())
///     }
///
///     fn off(&mut self) -> Result<(), BoardError> {
///         // release both h-bridge legs
///         Ok(())
///     }
/// }
/// ```
pub trait MotorDriver {
    /// Error type for motor operations.
    type Error;

    /// Drive the motor with the given polarity and step (duty percent).
    fn drive(&mut self, polarity: Polarity, step: f32) -> Result<(), Self::Error>;

    /// Turn the motor output off.
    fn off(&mut self) -> Result<(), Self::Error>;
}

/// Monotonic time source.
///
/// Tick values wrap; compare them only through
/// [`ticks_diff`](crate::ticks::ticks_diff).
///
/// # Example
///
/// ```rust
/// use rs_shunter::traits::Clock;
/// use rs_shunter::hal::MockClock;
///
/// let mut clock = MockClock::new();
/// assert_eq!(clock.now_ms(), 0);
/// clock.advance(100);
/// assert_eq!(clock.now_ms(), 100);
/// ```
pub trait Clock {
    /// Current time in milliseconds (wrapping).
    fn now_ms(&self) -> Ticks;

    /// Current time in microseconds (wrapping).
    ///
    /// Coarse clocks may derive this from `now_ms`.
    fn now_us(&self) -> Ticks {
        self.now_ms().wrapping_mul(1000)
    }
}

/// Position of an operator direction lever.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum LeverDirection {
    /// Lever pushed forward.
    Forward,
    /// Lever centred.
    #[default]
    Neutral,
    /// Lever pulled back.
    Reverse,
}

impl LeverDirection {
    /// Single-letter wire encoding (`F`, `N`, `R`).
    pub const fn letter(&self) -> char {
        match self {
            LeverDirection::Forward => 'F',
            LeverDirection::Neutral => 'N',
            LeverDirection::Reverse => 'R',
        }
    }

    /// Parse the single-letter wire encoding.
    pub const fn from_letter(c: char) -> Option<Self> {
        match c {
            'F' => Some(LeverDirection::Forward),
            'N' => Some(LeverDirection::Neutral),
            'R' => Some(LeverDirection::Reverse),
            _ => None,
        }
    }
}

/// Operator control input: a speed lever and a direction switch.
///
/// Used by the guard controller. Reads are snapshots; the caller decides
/// when a change is significant.
pub trait LeverInput {
    /// Current lever position as a percentage, 0 to 100.
    fn speed_percent(&mut self) -> u8;

    /// Current direction switch position.
    fn direction(&mut self) -> LeverDirection;
}
