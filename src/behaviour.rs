//! Behaviours: composable post-processing over a presence signal.
//!
//! A behaviour wraps any [`Presence`] stage - a converter or another
//! behaviour - and modifies its output. Chains can be arbitrarily deep:
//!
//! ```text
//! AnalogDetector -> SchmittConverter -> Debounce -> EdgeDetector
//! ```
//!
//! | Behaviour | Effect |
//! |-----------|--------|
//! | [`Inverter`] | Logical NOT of the parent |
//! | [`Debounce`] | Holds presence for a fixed window, suppressing chatter |
//! | [`EdgeDetector`] | Emits [`SensorEvent`]s on presence changes |
//!
//! [`EdgeDetector::check_event`] is stateful: call it exactly once per
//! control tick, or edges will be lost or duplicated.

use crate::converter::Presence;
use crate::ticks::{ticks_add, ticks_diff, Ticks};

/// Edge event emitted by [`EdgeDetector`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum SensorEvent {
    /// No change since the last check.
    #[default]
    None,
    /// Presence was asserted.
    Trigger,
    /// Presence was released.
    Release,
}

/// A presence stage that can also be polled for edge events.
///
/// The seam between the signal pipeline and the control applications: a
/// shuttle or guard only needs edges, not the shape of the chain that
/// produced them. Sampling comes from the [`Presence`] supertrait.
pub trait EventSource: Presence {
    /// Poll for an edge. At most once per control tick.
    fn check_event(&mut self, now_ms: Ticks) -> SensorEvent;
}

// ============================================================================
// Inverter
// ============================================================================

/// Logical NOT of the parent's presence.
///
/// Useful when a sensor reports "beam unbroken" but the layout logic wants
/// "something is here".
#[derive(Debug)]
pub struct Inverter<P: Presence> {
    parent: P,
}

impl<P: Presence> Inverter<P> {
    /// Invert the given stage.
    pub fn new(parent: P) -> Self {
        Self { parent }
    }
}

impl<P: Presence> Presence for Inverter<P> {
    fn sample(&mut self) {
        self.parent.sample();
    }

    fn is_present(&mut self, now_ms: Ticks) -> bool {
        !self.parent.is_present(now_ms)
    }
}

// ============================================================================
// Debounce
// ============================================================================

/// Holds presence for a fixed window after each assertion.
///
/// Inside the hold window the parent is not consulted; once the window
/// lapses the parent is re-evaluated and, if still present, the window
/// restarts. A single momentary pulse therefore reads as one continuous
/// presence of at least `debounce_ms`.
#[derive(Debug)]
pub struct Debounce<P: Presence> {
    parent: P,
    debounce_ms: Ticks,
    present_until: Option<Ticks>,
}

impl<P: Presence> Debounce<P> {
    /// Debounce the given stage with a hold window in milliseconds.
    pub fn new(parent: P, debounce_ms: Ticks) -> Self {
        Self {
            parent,
            debounce_ms,
            present_until: None,
        }
    }
}

impl<P: Presence> Presence for Debounce<P> {
    fn sample(&mut self) {
        self.parent.sample();
    }

    fn is_present(&mut self, now_ms: Ticks) -> bool {
        let holding = self
            .present_until
            .is_some_and(|until| ticks_diff(until, now_ms) > 0);
        if holding {
            return true;
        }
        if self.parent.is_present(now_ms) {
            self.present_until = Some(ticks_add(now_ms, self.debounce_ms));
            true
        } else {
            false
        }
    }
}

// ============================================================================
// Edge detection
// ============================================================================

/// Emits [`SensorEvent`]s when the parent's presence changes.
///
/// Compares the current presence to the last observed presence; the scan is
/// stateful, so [`check_event`](Self::check_event) must run at most once
/// per control-loop iteration. Repeated presence reads between ticks are
/// fine; repeated event checks are not.
///
/// # Example
///
/// ```rust
/// use rs_shunter::behaviour::{EdgeDetector, EventSource, SensorEvent};
/// use rs_shunter::converter::{Presence, ThresholdConverter};
/// use rs_shunter::detector::AnalogDetector;
/// use rs_shunter::hal::MockAdc;
///
/// let mut adc = MockAdc::new();
/// adc.queue_samples(&[0, 0, 60_000, 60_000, 0]);
///
/// let mut edges = EdgeDetector::new(ThresholdConverter::new(AnalogDetector::new(adc), 512));
///
/// let mut seen = Vec::new();
/// for tick in 0..5 {
///     edges.sample();
///     seen.push(edges.check_event(tick));
/// }
/// assert_eq!(
///     seen,
///     [
///         SensorEvent::None,
///         SensorEvent::None,
///         SensorEvent::Trigger,
///         SensorEvent::None,
///         SensorEvent::Release,
///     ]
/// );
/// ```
#[derive(Debug)]
pub struct EdgeDetector<P: Presence> {
    parent: P,
    last_present: bool,
}

impl<P: Presence> EdgeDetector<P> {
    /// Watch the given stage for presence changes.
    pub fn new(parent: P) -> Self {
        Self {
            parent,
            last_present: false,
        }
    }
}

impl<P: Presence> Presence for EdgeDetector<P> {
    fn sample(&mut self) {
        self.parent.sample();
    }

    fn is_present(&mut self, now_ms: Ticks) -> bool {
        self.parent.is_present(now_ms)
    }
}

impl<P: Presence> EventSource for EdgeDetector<P> {
    fn check_event(&mut self, now_ms: Ticks) -> SensorEvent {
        let present = self.parent.is_present(now_ms);
        if present == self.last_present {
            return SensorEvent::None;
        }
        self.last_present = present;
        if present {
            SensorEvent::Trigger
        } else {
            SensorEvent::Release
        }
    }
}
