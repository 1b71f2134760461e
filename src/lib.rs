//! # rs-shunter
//!
//! The control core of a model-railway automation controller: turns noisy
//! sensor readings into reliable presence and edge events, converts
//! commands into bounded motor motion, and sequences train behaviour
//! through explicit finite state machines on a cooperative, tick-based
//! scheduler.
//!
//! ## Features
//!
//! - **Signal pipeline**: detector, converter, behaviour layers with
//!   thresholds, Schmitt hysteresis, adaptive baselines, debouncing, and
//!   edge detection
//! - **Motion model**: velocity-integrating locomotive with dead-band
//!   compensation and three-way polarity parity
//! - **Cooperative scheduling**: wraparound-safe deadline tasks, no
//!   threads, no blocking
//! - **State machines**: a generic event-table driver plus two complete
//!   applications (autonomous shuttle, guard remote coordination)
//! - **Hardware abstraction**: every pin, motor, clock, and socket behind
//!   a capability trait, with mock implementations for desktop testing
//!
//! ## Architecture
//!
//! The crate is structured so the whole control stack runs on desktop
//! against `hal::mock`:
//!
//! - `traits` - hardware and network capability seams
//! - `ticks` / `scheduler` - wrapping tick arithmetic and deadline tasks
//! - `detector` / `converter` / `behaviour` - the signal pipeline
//! - `locomotive` - the motion model
//! - `machine` - the generic state-machine driver
//! - `shuttle` / `guard` - the control applications
//! - `hal` - mock capability implementations
//!
//! ## Example
//!
//! ```rust
//! use rs_shunter::{
//!     config::Profile,
//!     hal::MockMotor,
//!     locomotive::{AbsoluteDirection, Locomotive},
//! };
//!
//! let mut engine = Locomotive::new(
//!     MockMotor::new(),
//!     Profile::named("test").unwrap(),
//!     AbsoluteDirection::Left,
//! );
//!
//! // six gentle notches on the regulator
//! for _ in 0..6 {
//!     engine.accelerate(0.2).unwrap();
//! }
//! assert!((engine.velocity() - 1.2).abs() < 1e-6);
//! assert!((engine.motor_step() - 9.2).abs() < 1e-6); // dead band + speed
//!
//! engine.stop().unwrap();
//! assert_eq!(engine.motor_step(), 0.0); // step 0 == motor off
//! ```

#![cfg_attr(not(feature = "std"), no_std)]
#![warn(missing_docs)]

extern crate alloc;

/// Composable post-processing over presence signals (invert, debounce,
/// edge detection).
pub mod behaviour;
/// Block occupancy counting from wheel-sensor edges.
pub mod blocks;
/// Configuration types: locomotive profiles, sensor thresholds, loop
/// timing.
pub mod config;
/// Raw readings to boolean presence (threshold, Schmitt, AGC).
pub mod converter;
/// Lowest-level sensor abstraction producing raw numeric readings.
pub mod detector;
/// Two-endpoint semi-automatic coordination over datagrams.
pub mod guard;
/// Mock capability implementations for testing without hardware.
pub mod hal;
/// Locomotive motion model: velocity, dead band, polarity parity.
pub mod locomotive;
/// Generic finite-state-machine driver and bounded event queue.
pub mod machine;
/// Guard protocol wire vocabulary.
pub mod message;
/// Deadline-based cooperative task scheduling.
pub mod scheduler;
/// Autonomous shuttle application.
pub mod shuttle;
/// Wraparound-safe tick arithmetic.
pub mod ticks;
/// Capability traits for hardware and network access.
pub mod traits;

// Re-exports for convenience
pub use behaviour::{Debounce, EdgeDetector, EventSource, Inverter, SensorEvent};
pub use blocks::{Block, WheelCounter};
pub use config::{GuardConfig, LayoutConfig, Profile, SensorConfig, ShuttleConfig};
pub use converter::{AgcConverter, Presence, SchmittConverter, ThresholdConverter};
pub use detector::{AnalogDetector, Detector, DigitalDetector, FilteredDetector};
pub use guard::{ActuatorState, ControllerState, GuardActuator, GuardController};
pub use locomotive::{AbsoluteDirection, Locomotive, MotionState, RelativeDirection};
pub use machine::{Automaton, EventQueue, Machine};
pub use message::Message;
pub use scheduler::Scheduler;
pub use shuttle::{Shuttle, ShuttleEvent, ShuttleState};
pub use ticks::{ticks_add, ticks_diff, Ticks};
pub use traits::{
    // Hardware
    AnalogInput,
    Clock,
    // Network
    Datagram,
    DigitalInput,
    Endpoint,
    LeverDirection,
    LeverInput,
    MotorDriver,
    Polarity,
};
