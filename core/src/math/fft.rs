use ndarray::Array1;
use num_complex::Complex32;
use rustfft::{num_traits::Zero, Fft, FftPlanner};
use std::f32::consts::PI;

/// Helper that wraps the `rustfft` planner for reuse.
pub struct FftHelper {
    fft: std::sync::Arc<dyn Fft<f32>>,
    size: usize,
    hann: Array1<f32>,
}

impl FftHelper {
    pub fn new(size: usize) -> Self {
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(size);
        let hann = Array1::from_iter(
            (0..size).map(|i| 0.5 * (1.0 - (2.0 * PI * i as f32 / size as f32).cos())),
        );
        Self { fft, size, hann }
    }

    pub fn forward(&mut self, input: &[f32]) -> Vec<Complex32> {
        let mut buffer: Vec<Complex32> = input
            .iter()
            .map(|&value| Complex32::new(value, 0.0))
            .collect();
        buffer.resize(self.size, Complex32::zero());
        self.fft.process(&mut buffer);
        buffer
    }

    /// One-sided power spectral density of a Hann-windowed frame.
    ///
    /// Bin `k` corresponds to frequency `k * fs / size`; scaling matches a
    /// single-segment Welch estimate so band powers sum comparably across
    /// window lengths.
    pub fn power_spectrum(&mut self, input: &[f32], sample_rate: f32) -> Vec<f32> {
        let samples = Array1::from_iter(input.iter().copied().take(self.size));
        let tapered = (&samples * &self.hann.slice(ndarray::s![..samples.len()])).to_vec();
        let spectrum = self.forward(&tapered);

        let window_power: f32 = self.hann.iter().map(|w| w * w).sum();
        let scale = 1.0 / (sample_rate * window_power.max(f32::EPSILON));

        let half = self.size / 2 + 1;
        let mut psd = Vec::with_capacity(half);
        for (k, value) in spectrum.iter().take(half).enumerate() {
            let mut power = value.norm_sqr() * scale;
            // interior bins carry the mirrored negative-frequency energy
            if k != 0 && !(self.size % 2 == 0 && k == half - 1) {
                power *= 2.0;
            }
            psd.push(power);
        }
        psd
    }

    pub fn size(&self) -> usize {
        self.size
    }
}
