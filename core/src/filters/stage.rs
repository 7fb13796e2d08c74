use crate::filters::biquad::{butterworth_highpass, butterworth_lowpass, Biquad};
use crate::prelude::FilterStage;

/// Band-pass built from cascaded high-pass and low-pass Butterworth
/// sections, the same construction the reference filter bank uses.
pub struct BandpassStage {
    highpass: [Biquad; 2],
    lowpass: [Biquad; 2],
}

impl BandpassStage {
    pub fn new(sample_rate: f32, low_hz: f32, high_hz: f32) -> Self {
        Self {
            highpass: butterworth_highpass(sample_rate, low_hz),
            lowpass: butterworth_lowpass(sample_rate, high_hz),
        }
    }
}

impl FilterStage for BandpassStage {
    fn process(&mut self, sample: f32) -> f32 {
        let high = self.highpass.iter_mut().fold(sample, |acc, s| s.process(acc));
        self.lowpass.iter_mut().fold(high, |acc, s| s.process(acc))
    }

    fn reset(&mut self) {
        for section in self.highpass.iter_mut().chain(self.lowpass.iter_mut()) {
            section.reset();
        }
    }
}

/// Narrow notch for line-noise removal.
pub struct NotchStage {
    section: Biquad,
}

impl NotchStage {
    pub fn new(sample_rate: f32, center_hz: f32, q: f32) -> Self {
        Self {
            section: Biquad::notch(sample_rate, center_hz, q),
        }
    }
}

impl FilterStage for NotchStage {
    fn process(&mut self, sample: f32) -> f32 {
        self.section.process(sample)
    }

    fn reset(&mut self) {
        self.section.reset();
    }
}

/// Full-wave rectifier followed by a low-pass smoother.
pub struct EnvelopeStage {
    smoother: [Biquad; 2],
}

impl EnvelopeStage {
    pub fn new(sample_rate: f32, cutoff_hz: f32) -> Self {
        Self {
            smoother: butterworth_lowpass(sample_rate, cutoff_hz),
        }
    }
}

impl FilterStage for EnvelopeStage {
    fn process(&mut self, sample: f32) -> f32 {
        self.smoother
            .iter_mut()
            .fold(sample.abs(), |acc, s| s.process(acc))
    }

    fn reset(&mut self) {
        for section in self.smoother.iter_mut() {
            section.reset();
        }
    }
}
