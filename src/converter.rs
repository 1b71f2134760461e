//! Converters: raw readings to boolean presence.
//!
//! A converter owns a [`Detector`] and answers one question: is something
//! there? The three variants cover the sensors found on a layout:
//!
//! | Converter | Use case |
//! |-----------|----------|
//! | [`ThresholdConverter`] | Clean signals, fixed trip point |
//! | [`SchmittConverter`] | Noisy signals, hysteresis band |
//! | [`AgcConverter`] | Drifting baselines (ambient light, temperature) |
//!
//! Reflectance-style sensors read *lower* when covered, so the Schmitt and
//! AGC converters declare presence on a drop. The plain threshold converter
//! is configurable either way.
//!
//! All converters implement [`Presence`], the uniform query the behaviour
//! layer stacks on. `sample()` performs the hardware read;
//! `is_present(now)` only interprets the stored value. A converter whose
//! detector has never been read reports absent - the safe default.

use crate::detector::Detector;
use crate::ticks::{ticks_diff, Ticks};

/// A presence signal, queryable each control tick.
///
/// Implemented by every converter and behaviour so stages can stack in any
/// order. `sample` runs the underlying hardware read and is forwarded down
/// the chain; `is_present` interprets without I/O.
pub trait Presence {
    /// Take a fresh reading on the underlying detector.
    fn sample(&mut self);

    /// Whether an object is currently present.
    ///
    /// `now_ms` feeds the time-dependent stages (AGC, debounce); stateless
    /// stages ignore it.
    fn is_present(&mut self, now_ms: Ticks) -> bool;
}

// ============================================================================
// Simple threshold
// ============================================================================

/// Stateless comparison against a fixed threshold.
#[derive(Debug)]
pub struct ThresholdConverter<D: Detector> {
    detector: D,
    threshold: u16,
    present_on_high: bool,
}

impl<D: Detector> ThresholdConverter<D> {
    /// Present when the value is at or above `threshold`.
    pub fn new(detector: D, threshold: u16) -> Self {
        Self {
            detector,
            threshold,
            present_on_high: true,
        }
    }

    /// Present when the value is at or below `threshold`.
    pub fn present_on_low(detector: D, threshold: u16) -> Self {
        Self {
            detector,
            threshold,
            present_on_high: false,
        }
    }

    /// The wrapped detector.
    pub fn detector(&self) -> &D {
        &self.detector
    }
}

impl<D: Detector> Presence for ThresholdConverter<D> {
    fn sample(&mut self) {
        self.detector.read();
    }

    fn is_present(&mut self, _now_ms: Ticks) -> bool {
        match self.detector.value() {
            Some(value) if self.present_on_high => value >= self.threshold,
            Some(value) => value <= self.threshold,
            None => false,
        }
    }
}

// ============================================================================
// Schmitt trigger
// ============================================================================

/// Hysteresis converter: latches present on a drop below `trigger`,
/// absent on a rise above `release`, holds in between.
///
/// The two thresholds are independent latch points; an asymmetric band is
/// normal and intentional.
///
/// # Example
///
/// ```rust
/// use rs_shunter::converter::{Presence, SchmittConverter};
/// use rs_shunter::detector::AnalogDetector;
/// use rs_shunter::hal::MockAdc;
///
/// let mut adc = MockAdc::new();
/// // 10-bit samples arrive as 16-bit full scale (x64)
/// adc.queue_samples(&[300 * 64, 150 * 64, 220 * 64, 260 * 64]);
///
/// let mut sensor = SchmittConverter::new(AnalogDetector::new(adc), 200, 250);
///
/// sensor.sample();
/// assert!(!sensor.is_present(0)); // 300: above release, absent
/// sensor.sample();
/// assert!(sensor.is_present(0)); // 150: below trigger, latched
/// sensor.sample();
/// assert!(sensor.is_present(0)); // 220: in the band, held
/// sensor.sample();
/// assert!(!sensor.is_present(0)); // 260: above release, released
/// ```
#[derive(Debug)]
pub struct SchmittConverter<D: Detector> {
    detector: D,
    trigger_threshold: u16,
    release_threshold: u16,
    present: bool,
}

impl<D: Detector> SchmittConverter<D> {
    /// Create a Schmitt converter with the given latch points.
    pub fn new(detector: D, trigger_threshold: u16, release_threshold: u16) -> Self {
        Self {
            detector,
            trigger_threshold,
            release_threshold,
            present: false,
        }
    }

    /// Create a Schmitt converter from a per-channel threshold pair.
    pub fn from_config(detector: D, config: crate::config::SensorConfig) -> Self {
        Self::new(detector, config.trigger, config.release)
    }

    /// The wrapped detector.
    pub fn detector(&self) -> &D {
        &self.detector
    }
}

impl<D: Detector> Presence for SchmittConverter<D> {
    fn sample(&mut self) {
        self.detector.read();
    }

    fn is_present(&mut self, _now_ms: Ticks) -> bool {
        if let Some(value) = self.detector.value() {
            if value < self.trigger_threshold {
                self.present = true;
            } else if value > self.release_threshold {
                self.present = false;
            }
            // inside the band: hold the latched state
        }
        self.present
    }
}

// ============================================================================
// Automatic gain control
// ============================================================================

/// Adaptive converter tracking a slowly-drifting baseline.
///
/// Presence is a sharp drop below the baseline: `value < base -
/// base_threshold`. While absent, the baseline chases the reading with an
/// exponential update `base += (value - base) * gain * dt_seconds`, so
/// ambient drift is absorbed at any sampling rate. While present the
/// baseline freezes, keeping the detected object out of its own reference.
///
/// The baseline seeds from the first stored sample.
#[derive(Debug)]
pub struct AgcConverter<D: Detector> {
    detector: D,
    base: Option<f32>,
    base_threshold: f32,
    gain: f32,
    last_ms: Option<Ticks>,
}

impl<D: Detector> AgcConverter<D> {
    /// Create an AGC converter.
    ///
    /// `base_threshold` is the drop (in detector counts) that declares
    /// presence; `gain` scales the baseline tracking rate in 1/seconds.
    pub fn new(detector: D, base_threshold: u16, gain: f32) -> Self {
        Self {
            detector,
            base: None,
            base_threshold: base_threshold as f32,
            gain,
            last_ms: None,
        }
    }

    /// Current baseline, once seeded.
    pub fn base(&self) -> Option<f32> {
        self.base
    }

    /// The wrapped detector.
    pub fn detector(&self) -> &D {
        &self.detector
    }
}

impl<D: Detector> Presence for AgcConverter<D> {
    fn sample(&mut self) {
        self.detector.read();
    }

    fn is_present(&mut self, now_ms: Ticks) -> bool {
        let Some(value) = self.detector.value() else {
            return false;
        };
        let value = value as f32;

        let elapsed_s = match self.last_ms {
            Some(last) => ticks_diff(now_ms, last).max(0) as f32 / 1000.0,
            None => 0.0,
        };
        self.last_ms = Some(now_ms);

        let Some(base) = self.base else {
            self.base = Some(value);
            return false;
        };

        if value < base - self.base_threshold {
            // present: baseline frozen
            return true;
        }

        // absent: chase the reading, never overshooting it
        let factor = (self.gain * elapsed_s).min(1.0);
        self.base = Some(base + (value - base) * factor);
        false
    }
}
