//! Locomotive motion model.
//!
//! Translates a requested velocity into a direction-and-step motor command.
//! The model carries three related but distinct notions of direction:
//!
//! - [`AbsoluteDirection`]: left/right as seen by someone facing the
//!   layout. Track polarity and locomotive orientation are absolute.
//! - [`RelativeDirection`]: forward/reverse relative to the locomotive
//!   itself. Velocity sign encodes this.
//! - [`Polarity`]: the electrical polarity finally applied to the motor.
//!
//! The polarity is the XOR parity of track polarity, orientation, and
//! direction of travel: each inversion contributes one parity bit, and an
//! even total selects nominal polarity. A locomotive mounted backwards on a
//! layout with inverted track wiring (two inversions) therefore still
//! responds correctly to "forward".
//!
//! DC motors have a dead band: below some drive step the mechanism does not
//! move at all. The step computation adds a per-direction `start_step` so
//! any non-zero velocity produces actual motion, and the latched
//! [`velocity_direction`](Locomotive::velocity_direction) survives a
//! zero-velocity crossing so the correct dead band is applied to the next
//! non-zero command.
//!
//! # Example
//!
//! ```rust
//! use rs_shunter::config::Profile;
//! use rs_shunter::hal::MockMotor;
//! use rs_shunter::locomotive::{AbsoluteDirection, Locomotive, RelativeDirection};
//!
//! let profile = Profile::new(8.0, 9.0, 12.0);
//! let mut engine = Locomotive::new(MockMotor::new(), profile, AbsoluteDirection::Left);
//!
//! for _ in 0..6 {
//!     engine.accelerate(0.2).unwrap();
//! }
//! assert!((engine.velocity() - 1.2).abs() < 1e-6);
//! assert_eq!(engine.velocity_direction(), RelativeDirection::Forward);
//! assert!((engine.motor_step() - 9.2).abs() < 1e-6); // dead band 8 + speed 1.2
//! ```

use crate::config::Profile;
use crate::traits::{MotorDriver, Polarity};

/// Direction when facing the layout. `Left` is nominal forward.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum AbsoluteDirection {
    /// Toward the left of the layout (nominal forward).
    #[default]
    Left,
    /// Toward the right of the layout.
    Right,
}

impl AbsoluteDirection {
    /// Parity bit contributed to the motor polarity computation.
    #[inline]
    const fn parity(self) -> u8 {
        match self {
            AbsoluteDirection::Left => 0,
            AbsoluteDirection::Right => 1,
        }
    }

    /// The opposite direction.
    pub const fn opposite(self) -> Self {
        match self {
            AbsoluteDirection::Left => AbsoluteDirection::Right,
            AbsoluteDirection::Right => AbsoluteDirection::Left,
        }
    }
}

/// Direction of travel relative to the locomotive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum RelativeDirection {
    /// Moving forward (nose first).
    #[default]
    Forward,
    /// Moving in reverse.
    Reverse,
}

impl RelativeDirection {
    #[inline]
    const fn parity(self) -> u8 {
        match self {
            RelativeDirection::Forward => 0,
            RelativeDirection::Reverse => 1,
        }
    }

    /// The opposite direction.
    pub const fn opposite(self) -> Self {
        match self {
            RelativeDirection::Forward => RelativeDirection::Reverse,
            RelativeDirection::Reverse => RelativeDirection::Forward,
        }
    }
}

/// Snapshot of the motion state, for feedback and telemetry.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MotionState {
    /// Signed velocity in locomotive units per second.
    pub velocity: f32,
    /// Latched direction of travel.
    pub velocity_direction: RelativeDirection,
    /// Motor drive step (duty percent); zero means the motor is off.
    pub motor_step: f32,
    /// Electrical polarity at the motor.
    pub motor_polarity: Polarity,
}

/// A locomotive with a DC motor.
///
/// Owns its motor exclusively; all motion state is mutated only through
/// [`accelerate`](Self::accelerate), [`brake`](Self::brake), and
/// [`stop`](Self::stop), each of which recomputes the motor command and
/// drives the hardware.
pub struct Locomotive<M: MotorDriver> {
    motor: M,
    profile: Profile,
    track_polarity: AbsoluteDirection,
    orientation: AbsoluteDirection,
    velocity: f32,
    velocity_direction: RelativeDirection,
    motor_step: f32,
    motor_polarity: Polarity,
}

impl<M: MotorDriver> Locomotive<M> {
    /// Create a locomotive with the given motor, profile, and facing.
    ///
    /// Track polarity defaults to [`AbsoluteDirection::Left`]; use
    /// [`with_track_polarity`](Self::with_track_polarity) for layouts wired
    /// the other way round.
    pub fn new(motor: M, profile: Profile, orientation: AbsoluteDirection) -> Self {
        Self {
            motor,
            profile,
            track_polarity: AbsoluteDirection::Left,
            orientation,
            velocity: 0.0,
            velocity_direction: RelativeDirection::Forward,
            motor_step: 0.0,
            motor_polarity: Polarity::Forward,
        }
    }

    /// Set the layout's track polarity.
    pub fn with_track_polarity(mut self, polarity: AbsoluteDirection) -> Self {
        self.track_polarity = polarity;
        self
    }

    /// Change velocity by `amount` (positive = forward), clamped to the
    /// profile's maximum speed in either direction.
    ///
    /// The direction latch follows the sign of the resulting velocity and
    /// is left untouched when the result is exactly zero, so the dead-band
    /// compensation stays correct through a zero crossing.
    pub fn accelerate(&mut self, amount: f32) -> Result<(), M::Error> {
        let max = self.profile.max_speed;
        self.velocity = (self.velocity + amount).clamp(-max, max);

        if self.velocity > 0.0 {
            self.velocity_direction = RelativeDirection::Forward;
        } else if self.velocity < 0.0 {
            self.velocity_direction = RelativeDirection::Reverse;
        }
        // exactly zero: keep the last direction

        self.update_motor()
    }

    /// Reduce speed by `amount`, clamping at zero. Braking never carries
    /// the velocity past zero into the opposite direction.
    pub fn brake(&mut self, amount: f32) -> Result<(), M::Error> {
        let amount = amount.abs();
        let speed = self.speed();
        if amount >= speed {
            self.velocity = 0.0;
        } else {
            let speed = speed - amount;
            self.velocity = match self.velocity_direction {
                RelativeDirection::Forward => speed,
                RelativeDirection::Reverse => -speed,
            };
        }
        self.update_motor()
    }

    /// Force velocity to zero and turn the motor off.
    pub fn stop(&mut self) -> Result<(), M::Error> {
        self.velocity = 0.0;
        self.update_motor()
    }

    /// Recompute step and polarity from the current velocity and drive the
    /// motor. `step == 0` always maps to a motor-off command.
    fn update_motor(&mut self) -> Result<(), M::Error> {
        let inversions = self.track_polarity.parity()
            + self.orientation.parity()
            + self.velocity_direction.parity();
        self.motor_polarity = if inversions % 2 == 0 {
            Polarity::Forward
        } else {
            Polarity::Reverse
        };

        let dead_band = if self.velocity > 0.0 {
            self.profile.start_step_forward
        } else if self.velocity < 0.0 {
            self.profile.start_step_reverse
        } else {
            0.0
        };
        self.motor_step = dead_band + self.speed() * self.profile.steps_per_unit;

        if self.motor_step <= 0.0 {
            self.motor_step = 0.0;
            self.motor.off()
        } else {
            self.motor.drive(self.motor_polarity, self.motor_step)
        }
    }

    /// Signed velocity in locomotive units per second.
    pub fn velocity(&self) -> f32 {
        self.velocity
    }

    /// Speed (velocity magnitude).
    pub fn speed(&self) -> f32 {
        self.velocity.abs()
    }

    /// Latched direction of travel. Survives zero-velocity crossings.
    pub fn velocity_direction(&self) -> RelativeDirection {
        self.velocity_direction
    }

    /// Current motor drive step; zero when the motor is off.
    pub fn motor_step(&self) -> f32 {
        self.motor_step
    }

    /// Electrical polarity last applied to the motor.
    pub fn motor_polarity(&self) -> Polarity {
        self.motor_polarity
    }

    /// The direction the locomotive is facing.
    pub fn orientation(&self) -> AbsoluteDirection {
        self.orientation
    }

    /// Latched direction of travel mapped into layout coordinates.
    ///
    /// Used by block occupancy counting, which cares about which way a
    /// wagon crossed a sensor, not which end of the locomotive led.
    pub fn movement_direction(&self) -> AbsoluteDirection {
        match self.velocity_direction {
            RelativeDirection::Forward => self.orientation,
            RelativeDirection::Reverse => self.orientation.opposite(),
        }
    }

    /// The profile this locomotive runs with.
    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    /// Snapshot of the motion state.
    pub fn state(&self) -> MotionState {
        MotionState {
            velocity: self.velocity,
            velocity_direction: self.velocity_direction,
            motor_step: self.motor_step,
            motor_polarity: self.motor_polarity,
        }
    }

    /// Access the underlying motor (for inspection in tests).
    pub fn motor(&self) -> &M {
        &self.motor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::MockMotor;

    fn engine(orientation: AbsoluteDirection) -> Locomotive<MockMotor> {
        Locomotive::new(MockMotor::new(), Profile::new(8.0, 9.0, 12.0), orientation)
    }

    // === Velocity integration ===

    #[test]
    fn accelerate_accumulates() {
        let mut e = engine(AbsoluteDirection::Left);
        for _ in 0..6 {
            e.accelerate(0.2).unwrap();
        }
        assert!((e.velocity() - 1.2).abs() < 1e-6);
        assert_eq!(e.velocity_direction(), RelativeDirection::Forward);
        assert!((e.motor_step() - 9.2).abs() < 1e-6);
    }

    #[test]
    fn velocity_clamped_to_max_speed() {
        let mut e = engine(AbsoluteDirection::Left);
        for _ in 0..100 {
            e.accelerate(1.0).unwrap();
        }
        assert!((e.velocity() - 12.0).abs() < 1e-6);
        for _ in 0..100 {
            e.accelerate(-1.0).unwrap();
        }
        assert!((e.velocity() + 12.0).abs() < 1e-6);
    }

    #[test]
    fn brake_clamps_at_zero() {
        let mut e = engine(AbsoluteDirection::Left);
        e.accelerate(1.0).unwrap();
        e.brake(5.0).unwrap();
        assert_eq!(e.velocity(), 0.0);
        // braking from rest stays at rest
        e.brake(5.0).unwrap();
        assert_eq!(e.velocity(), 0.0);
    }

    #[test]
    fn brake_never_flips_sign() {
        let mut e = engine(AbsoluteDirection::Left);
        e.accelerate(-2.0).unwrap();
        e.brake(1.5).unwrap();
        assert!((e.velocity() + 0.5).abs() < 1e-6);
        e.brake(1.5).unwrap();
        assert_eq!(e.velocity(), 0.0);
        assert_eq!(e.velocity_direction(), RelativeDirection::Reverse);
    }

    #[test]
    fn brake_ignores_sign_of_amount() {
        let mut e = engine(AbsoluteDirection::Left);
        e.accelerate(2.0).unwrap();
        e.brake(-0.5).unwrap();
        assert!((e.velocity() - 1.5).abs() < 1e-6);
    }

    #[test]
    fn direction_preserved_through_zero() {
        let mut e = engine(AbsoluteDirection::Left);
        e.accelerate(-1.0).unwrap();
        assert_eq!(e.velocity_direction(), RelativeDirection::Reverse);
        // back to exactly zero: latch keeps Reverse
        e.accelerate(1.0).unwrap();
        assert_eq!(e.velocity(), 0.0);
        assert_eq!(e.velocity_direction(), RelativeDirection::Reverse);
        // stop() does not touch the latch either
        e.stop().unwrap();
        assert_eq!(e.velocity_direction(), RelativeDirection::Reverse);
    }

    // === Motor step ===

    #[test]
    fn motor_off_iff_velocity_zero() {
        let mut e = engine(AbsoluteDirection::Left);
        assert_eq!(e.motor_step(), 0.0);

        e.accelerate(0.1).unwrap();
        assert!(e.motor_step() > 0.0);
        assert!(e.motor().is_on());

        e.stop().unwrap();
        assert_eq!(e.motor_step(), 0.0);
        assert!(!e.motor().is_on());
    }

    #[test]
    fn dead_band_per_direction() {
        let mut e = engine(AbsoluteDirection::Left);
        e.accelerate(2.0).unwrap();
        assert!((e.motor_step() - 10.0).abs() < 1e-6); // 8 + 2

        let mut e = engine(AbsoluteDirection::Left);
        e.accelerate(-2.0).unwrap();
        assert!((e.motor_step() - 11.0).abs() < 1e-6); // 9 + 2
    }

    #[test]
    fn steps_per_unit_scales_speed() {
        let profile = Profile::new(5.0, 5.0, 100.0).with_steps_per_unit(2.5);
        let mut e = Locomotive::new(MockMotor::new(), profile, AbsoluteDirection::Left);
        e.accelerate(4.0).unwrap();
        assert!((e.motor_step() - 15.0).abs() < 1e-6); // 5 + 4 * 2.5
    }

    // === Polarity parity ===

    #[test]
    fn polarity_parity_truth_table() {
        use AbsoluteDirection::{Left, Right};
        // (track, orientation, travel-forward?, expected)
        let cases = [
            (Left, Left, true, Polarity::Forward),
            (Left, Left, false, Polarity::Reverse),
            (Left, Right, true, Polarity::Reverse),
            (Left, Right, false, Polarity::Forward),
            (Right, Left, true, Polarity::Reverse),
            (Right, Left, false, Polarity::Forward),
            (Right, Right, true, Polarity::Forward),
            (Right, Right, false, Polarity::Reverse),
        ];
        for (track, orientation, forward, expected) in cases {
            let mut e = Locomotive::new(MockMotor::new(), Profile::new(8.0, 9.0, 12.0), orientation)
                .with_track_polarity(track);
            e.accelerate(if forward { 1.0 } else { -1.0 }).unwrap();
            assert_eq!(
                e.motor_polarity(),
                expected,
                "track={track:?} orientation={orientation:?} forward={forward}"
            );
        }
    }

    #[test]
    fn polarity_is_pure_recomputation() {
        let mut e = engine(AbsoluteDirection::Right);
        e.accelerate(1.0).unwrap();
        let first = e.motor_polarity();
        // recomputing without a state change yields the same polarity
        e.accelerate(0.0).unwrap();
        assert_eq!(e.motor_polarity(), first);
    }

    #[test]
    fn backwards_engine_on_inverted_track_runs_nominal() {
        // two inversions cancel out
        let mut e = engine(AbsoluteDirection::Right).with_track_polarity(AbsoluteDirection::Right);
        e.accelerate(1.0).unwrap();
        assert_eq!(e.motor_polarity(), Polarity::Forward);
    }

    // === Layout-frame direction ===

    #[test]
    fn movement_direction_maps_through_orientation() {
        let mut e = engine(AbsoluteDirection::Left);
        e.accelerate(1.0).unwrap();
        assert_eq!(e.movement_direction(), AbsoluteDirection::Left);
        e.accelerate(-2.0).unwrap();
        assert_eq!(e.movement_direction(), AbsoluteDirection::Right);

        let mut e = engine(AbsoluteDirection::Right);
        e.accelerate(1.0).unwrap();
        assert_eq!(e.movement_direction(), AbsoluteDirection::Right);
    }

    // === State snapshot ===

    #[test]
    fn state_snapshot_matches_accessors() {
        let mut e = engine(AbsoluteDirection::Left);
        e.accelerate(0.5).unwrap();
        let state = e.state();
        assert_eq!(state.velocity, e.velocity());
        assert_eq!(state.velocity_direction, e.velocity_direction());
        assert_eq!(state.motor_step, e.motor_step());
        assert_eq!(state.motor_polarity, e.motor_polarity());
    }

    // === Motor error propagation ===

    #[test]
    fn motor_error_surfaces_immediately() {
        let mut motor = MockMotor::new();
        motor.fail_next = true;
        let mut e = Locomotive::new(motor, Profile::new(8.0, 9.0, 12.0), AbsoluteDirection::Left);
        assert!(e.accelerate(1.0).is_err());
    }
}
