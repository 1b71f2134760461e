//! Configuration types for layouts, locomotives, sensors, and control loops.
//!
//! Plain data with builder-style setters and usable defaults. Values are
//! supplied externally (flashed constants, a settings file parsed at the
//! boundary, test fixtures); the core never performs configuration I/O.
//!
//! # Example
//!
//! ```rust
//! use rs_shunter::config::{Profile, ShuttleConfig};
//!
//! // preset by locomotive id
//! let profile = Profile::named("lourie").unwrap();
//! assert_eq!(profile.max_speed, 30.0);
//!
//! // or built explicitly
//! let slow = Profile::new(8.0, 9.0, 12.0).with_max_speed(3.0);
//!
//! let shuttle = ShuttleConfig::default().with_run_ms(5_000);
//! assert_eq!(shuttle.sensor_period_ms, 10);
//! ```

use crate::locomotive::AbsoluteDirection;
use crate::ticks::Ticks;

// ============================================================================
// Locomotive profile
// ============================================================================

/// Per-locomotive drive characteristics.
///
/// `start_step_forward` / `start_step_reverse` are the dead band: the
/// minimum non-zero motor step that overcomes static friction in each
/// direction. Mechanisms are rarely symmetric, hence two values.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Profile {
    /// Minimum motor step for forward motion.
    pub start_step_forward: f32,
    /// Minimum motor step for reverse motion.
    pub start_step_reverse: f32,
    /// Symmetric velocity clamp in locomotive units per second.
    pub max_speed: f32,
    /// Motor steps added per unit of velocity.
    pub steps_per_unit: f32,
}

impl Profile {
    /// Create a profile with the given dead bands and maximum speed.
    pub fn new(start_step_forward: f32, start_step_reverse: f32, max_speed: f32) -> Self {
        Self {
            start_step_forward,
            start_step_reverse,
            max_speed,
            steps_per_unit: 1.0,
        }
    }

    /// Look up a named preset profile (case-insensitive).
    pub fn named(id: &str) -> Option<Self> {
        let id = id.trim();
        if id.eq_ignore_ascii_case("test") {
            Some(Profile::new(8.0, 9.0, 12.0))
        } else if id.eq_ignore_ascii_case("lourie") {
            Some(Profile::new(7.0, 8.0, 30.0))
        } else {
            None
        }
    }

    /// Override the maximum speed.
    pub fn with_max_speed(mut self, max_speed: f32) -> Self {
        self.max_speed = max_speed;
        self
    }

    /// Override the steps-per-unit scaling.
    pub fn with_steps_per_unit(mut self, steps_per_unit: f32) -> Self {
        self.steps_per_unit = steps_per_unit;
        self
    }
}

impl Default for Profile {
    fn default() -> Self {
        Profile::new(5.0, 5.0, 100.0)
    }
}

// ============================================================================
// Layout
// ============================================================================

/// Layout-wide wiring constants.
#[derive(Clone, Copy, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LayoutConfig {
    /// Direction a locomotive moves when powered with nominal polarity.
    pub track_polarity: AbsoluteDirection,
}

impl LayoutConfig {
    /// Set the track polarity.
    pub fn with_track_polarity(mut self, polarity: AbsoluteDirection) -> Self {
        self.track_polarity = polarity;
        self
    }
}

// ============================================================================
// Sensors
// ============================================================================

/// Threshold pair for one physical sensor channel.
///
/// Used to build Schmitt converters; `trigger` latches presence on a drop,
/// `release` clears it on a rise. The defaults suit the reflectance
/// sensors on the reference layout.
#[derive(Clone, Copy, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SensorConfig {
    /// Value below which presence latches.
    pub trigger: u16,
    /// Value above which presence releases.
    pub release: u16,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            trigger: 200,
            release: 250,
        }
    }
}

impl SensorConfig {
    /// Create a threshold pair.
    pub fn new(trigger: u16, release: u16) -> Self {
        Self { trigger, release }
    }
}

// ============================================================================
// Shuttle control loop
// ============================================================================

/// Timing and motion constants for the shuttle application.
#[derive(Clone, Copy, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ShuttleConfig {
    /// Fast sensor-sampling period.
    pub sensor_period_ms: Ticks,
    /// Slow control / state-machine period.
    pub control_period_ms: Ticks,
    /// How long a departing train keeps accelerating before coasting to
    /// the far end.
    pub run_ms: Ticks,
    /// Period between automatic shuttle starts.
    pub shuttle_period_ms: Ticks,
    /// Velocity added per control tick while departing.
    pub accelerate_step: f32,
    /// Brake amount on arriving back at the home end.
    pub home_brake: f32,
    /// Brake amount on arriving at the away end.
    pub away_brake: f32,
}

impl Default for ShuttleConfig {
    fn default() -> Self {
        Self {
            sensor_period_ms: 10,
            control_period_ms: 100,
            run_ms: 3_000,
            shuttle_period_ms: 20_000,
            accelerate_step: 0.1,
            home_brake: 1.5,
            away_brake: 0.25,
        }
    }
}

impl ShuttleConfig {
    /// Set the sensor sampling period.
    pub fn with_sensor_period_ms(mut self, ms: Ticks) -> Self {
        self.sensor_period_ms = ms;
        self
    }

    /// Set the control period.
    pub fn with_control_period_ms(mut self, ms: Ticks) -> Self {
        self.control_period_ms = ms;
        self
    }

    /// Set the departure run time.
    pub fn with_run_ms(mut self, ms: Ticks) -> Self {
        self.run_ms = ms;
        self
    }

    /// Set the period between automatic shuttle starts.
    pub fn with_shuttle_period_ms(mut self, ms: Ticks) -> Self {
        self.shuttle_period_ms = ms;
        self
    }
}

// ============================================================================
// Guard coordination
// ============================================================================

/// Timing constants for the guard discovery-and-command protocol.
#[derive(Clone, Copy, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GuardConfig {
    /// Period between discovery (MARCO) retries.
    pub retry_ms: Ticks,
    /// Control-loop polling period for both endpoints.
    pub poll_period_ms: Ticks,
    /// Consecutive zero-speed direction flips that drop the controller out
    /// of manual mode.
    pub direction_flip_limit: u8,
    /// Lever change (percent) treated as a manual override while in
    /// automatic mode.
    pub lever_override_percent: u8,
    /// Velocity change applied per control tick while steering toward a
    /// commanded speed.
    pub ramp_step: f32,
    /// Cruise speed in automatic (bounce) mode, percent of maximum.
    pub auto_speed_percent: u8,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            retry_ms: 10_000,
            poll_period_ms: 20,
            direction_flip_limit: 4,
            lever_override_percent: 2,
            ramp_step: 0.5,
            auto_speed_percent: 40,
        }
    }
}

impl GuardConfig {
    /// Set the discovery retry period.
    pub fn with_retry_ms(mut self, ms: Ticks) -> Self {
        self.retry_ms = ms;
        self
    }

    /// Set the polling period.
    pub fn with_poll_period_ms(mut self, ms: Ticks) -> Self {
        self.poll_period_ms = ms;
        self
    }
}
