//! Detectors: the lowest layer of the signal pipeline.
//!
//! A detector turns one hardware channel into a raw numeric reading. It
//! owns exactly one sample: `read()` performs the I/O and overwrites it,
//! `value()` is a pull with no side effects. Anything smarter (thresholds,
//! hysteresis, debouncing) belongs to the converter and behaviour layers.
//!
//! Analog readings are rescaled to a common 10-bit depth so threshold
//! configuration is comparable across boards with different ADC widths.
//!
//! A detector that has never been read reports `None`; downstream stages
//! must treat that as "not present" rather than an error, so the control
//! loop can start in any order.
//!
//! # Example
//!
//! ```rust
//! use rs_shunter::detector::{AnalogDetector, Detector};
//! use rs_shunter::hal::MockAdc;
//!
//! let mut adc = MockAdc::new();
//! adc.queue_sample(32_000); // 16-bit full scale
//!
//! let mut detector = AnalogDetector::new(adc);
//! assert_eq!(detector.value(), None); // nothing read yet
//! assert_eq!(detector.read(), 500);   // rescaled to 10 bits
//! assert_eq!(detector.value(), Some(500));
//! ```

use crate::traits::{AnalogInput, DigitalInput};

/// Common bit depth detectors rescale to.
pub const BIT_DEPTH: u32 = 10;

/// Full-scale value at [`BIT_DEPTH`] bits.
pub const FULL_SCALE: u16 = 1 << BIT_DEPTH;

/// A sensor producing raw numeric readings.
///
/// `read` performs hardware I/O and stores the sample; `value` returns the
/// stored sample without touching hardware. The sampling phase of the
/// control loop calls `read`; everything downstream pulls `value`.
pub trait Detector {
    /// Read the sensor, store and return the new sample.
    fn read(&mut self) -> u16;

    /// The most recent sample, or `None` before the first read.
    fn value(&self) -> Option<u16>;
}

/// Detector over a boolean pin. Reads as 0 or 1.
#[derive(Debug)]
pub struct DigitalDetector<P: DigitalInput> {
    pin: P,
    last: Option<u16>,
}

impl<P: DigitalInput> DigitalDetector<P> {
    /// Create a detector over the given pin capability.
    pub fn new(pin: P) -> Self {
        Self { pin, last: None }
    }
}

impl<P: DigitalInput> Detector for DigitalDetector<P> {
    fn read(&mut self) -> u16 {
        let sample = self.pin.read() as u16;
        self.last = Some(sample);
        sample
    }

    fn value(&self) -> Option<u16> {
        self.last
    }
}

/// Detector over an ADC channel, rescaled to [`BIT_DEPTH`] bits.
#[derive(Debug)]
pub struct AnalogDetector<A: AnalogInput> {
    adc: A,
    last: Option<u16>,
}

impl<A: AnalogInput> AnalogDetector<A> {
    /// Create a detector over the given ADC capability.
    pub fn new(adc: A) -> Self {
        Self { adc, last: None }
    }
}

impl<A: AnalogInput> Detector for AnalogDetector<A> {
    fn read(&mut self) -> u16 {
        let sample = self.adc.read() >> (16 - BIT_DEPTH);
        self.last = Some(sample);
        sample
    }

    fn value(&self) -> Option<u16> {
        self.last
    }
}

/// First-order low-pass smoothing over another detector.
///
/// `y = alpha * x + (1 - alpha) * y_last`, with the first sample passing
/// through unfiltered. Lower `alpha` filters harder; `alpha = 1.0` is a
/// pass-through. Useful for jittery timing-based sensors ahead of a
/// threshold or AGC converter.
#[derive(Debug)]
pub struct FilteredDetector<D: Detector> {
    inner: D,
    alpha: f32,
    y_last: Option<f32>,
}

impl<D: Detector> FilteredDetector<D> {
    /// Wrap `inner` with a filter constant `alpha` in `[0.0, 1.0]`.
    pub fn new(inner: D, alpha: f32) -> Self {
        Self {
            inner,
            alpha: alpha.clamp(0.0, 1.0),
            y_last: None,
        }
    }

    /// The wrapped detector.
    pub fn inner(&self) -> &D {
        &self.inner
    }
}

impl<D: Detector> Detector for FilteredDetector<D> {
    fn read(&mut self) -> u16 {
        let x = self.inner.read() as f32;
        let y = match self.y_last {
            Some(y_last) => self.alpha * x + (1.0 - self.alpha) * y_last,
            None => x,
        };
        self.y_last = Some(y);
        y as u16
    }

    fn value(&self) -> Option<u16> {
        self.y_last.map(|y| y as u16)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakePin(bool);
    impl DigitalInput for FakePin {
        fn read(&mut self) -> bool {
            self.0
        }
    }

    struct FakeAdc(u16);
    impl AnalogInput for FakeAdc {
        fn read(&mut self) -> u16 {
            self.0
        }
    }

    #[test]
    fn digital_reads_zero_one() {
        let mut low = DigitalDetector::new(FakePin(false));
        let mut high = DigitalDetector::new(FakePin(true));
        assert_eq!(low.read(), 0);
        assert_eq!(high.read(), 1);
    }

    #[test]
    fn value_none_before_first_read() {
        let detector = AnalogDetector::new(FakeAdc(1000));
        assert_eq!(detector.value(), None);
    }

    #[test]
    fn analog_rescales_to_ten_bits() {
        let mut detector = AnalogDetector::new(FakeAdc(u16::MAX));
        assert_eq!(detector.read(), FULL_SCALE - 1);

        let mut detector = AnalogDetector::new(FakeAdc(0));
        assert_eq!(detector.read(), 0);

        // 16-bit midpoint lands on the 10-bit midpoint
        let mut detector = AnalogDetector::new(FakeAdc(1 << 15));
        assert_eq!(detector.read(), FULL_SCALE / 2);
    }

    #[test]
    fn value_returns_last_sample() {
        let mut detector = AnalogDetector::new(FakeAdc(1 << 15));
        detector.read();
        assert_eq!(detector.value(), Some(FULL_SCALE / 2));
        // pull does not consume the sample
        assert_eq!(detector.value(), Some(FULL_SCALE / 2));
    }

    /// ADC returning a fixed sequence of samples, then repeating the last.
    struct SeqAdc {
        samples: &'static [u16],
        idx: usize,
    }

    impl AnalogInput for SeqAdc {
        fn read(&mut self) -> u16 {
            let sample = self.samples[self.idx.min(self.samples.len() - 1)];
            self.idx += 1;
            sample
        }
    }

    fn seq(samples: &'static [u16]) -> AnalogDetector<SeqAdc> {
        AnalogDetector::new(SeqAdc { samples, idx: 0 })
    }

    #[test]
    fn filter_first_sample_passes_through() {
        let mut filtered = FilteredDetector::new(seq(&[1 << 15]), 0.0);
        assert_eq!(filtered.read(), FULL_SCALE / 2);
        // alpha = 0 holds the first sample forever
        assert_eq!(filtered.read(), FULL_SCALE / 2);
        assert_eq!(filtered.value(), Some(FULL_SCALE / 2));
    }

    #[test]
    fn filter_chases_a_step_input() {
        // input steps 0 -> full scale; alpha 0.5 closes half the gap per read
        let mut filtered = FilteredDetector::new(seq(&[0, u16::MAX, u16::MAX]), 0.5);
        assert_eq!(filtered.read(), 0);
        assert_eq!(filtered.read(), 511);
        assert_eq!(filtered.read(), 767);
    }

    #[test]
    fn filter_alpha_one_is_pass_through() {
        let mut filtered = FilteredDetector::new(seq(&[0, u16::MAX]), 1.0);
        assert_eq!(filtered.read(), 0);
        assert_eq!(filtered.read(), FULL_SCALE - 1);
    }
}
