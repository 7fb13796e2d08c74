use crate::features::window::SlidingWindow;
use crate::features::{FeatureVector, WindowSettings};
use crate::math::FftHelper;
use serde::{Deserialize, Serialize};

/// Named frequency band in Hz.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrequencyBand {
    pub name: String,
    pub low_hz: f32,
    pub high_hz: f32,
}

impl FrequencyBand {
    fn new(name: &str, low_hz: f32, high_hz: f32) -> Self {
        Self {
            name: name.to_string(),
            low_hz,
            high_hz,
        }
    }
}

/// The clinical band split used for total-power normalization (0.5-30 Hz).
pub fn default_bands() -> Vec<FrequencyBand> {
    vec![
        FrequencyBand::new("delta", 0.5, 4.0),
        FrequencyBand::new("theta", 4.0, 8.0),
        FrequencyBand::new("alpha", 8.0, 13.0),
        FrequencyBand::new("beta", 13.0, 30.0),
    ]
}

/// Spectral feature extractor for one EEG channel: absolute and relative
/// band powers from a Hann-windowed periodogram over the sliding window.
pub struct EegExtractor {
    window: SlidingWindow,
    fft: FftHelper,
    bands: Vec<FrequencyBand>,
    sample_rate: f32,
}

impl EegExtractor {
    pub fn new(settings: &WindowSettings, bands: Vec<FrequencyBand>, sample_rate: f32) -> Self {
        Self {
            window: SlidingWindow::new(settings.capacity, settings.stride),
            fft: FftHelper::new(settings.capacity),
            bands,
            sample_rate,
        }
    }

    pub fn push(&mut self, sample: f32) -> Option<FeatureVector> {
        if !self.window.push(sample) {
            return None;
        }
        let snapshot = self.window.snapshot();
        let psd = self.fft.power_spectrum(&snapshot, self.sample_rate);
        let resolution = self.sample_rate / self.fft.size() as f32;

        let timestamp_s = self.window.sample_count() as f64 / self.sample_rate as f64;
        let mut features = FeatureVector::new(timestamp_s);

        let mut total_power = 0.0;
        for band in &self.bands {
            let power = band_power(&psd, resolution, band.low_hz, band.high_hz);
            features.insert(&band.name, power);
            total_power += power;
        }
        features.insert("total_power", total_power);

        if total_power > 0.0 {
            for band in &self.bands {
                let power = features.get(&band.name).unwrap_or(0.0);
                features.insert(&format!("{}_rel", band.name), power / total_power);
            }
        }

        Some(features)
    }

    pub fn reset(&mut self) {
        self.window.reset();
    }
}

/// Sums PSD bins whose center frequency falls inside `[low_hz, high_hz]`.
fn band_power(psd: &[f32], resolution: f32, low_hz: f32, high_hz: f32) -> f32 {
    psd.iter()
        .enumerate()
        .filter(|(k, _)| {
            let freq = *k as f32 * resolution;
            freq >= low_hz && freq <= high_hz
        })
        .map(|(_, &power)| power)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    fn feed_tone(extractor: &mut EegExtractor, freq_hz: f32, fs: f32, count: usize) -> Option<FeatureVector> {
        let mut last = None;
        for i in 0..count {
            if let Some(features) = extractor.push((2.0 * PI * freq_hz * i as f32 / fs).sin()) {
                last = Some(features);
            }
        }
        last
    }

    #[test]
    fn alpha_tone_concentrates_power_in_alpha_band() {
        let settings = WindowSettings {
            capacity: 512,
            stride: 64,
        };
        let fs = 512.0;
        let mut extractor = EegExtractor::new(&settings, default_bands(), fs);
        let features = feed_tone(&mut extractor, 10.0, fs, 512).expect("window due");

        let alpha_rel = features.get("alpha_rel").unwrap();
        assert!(alpha_rel > 0.8, "alpha_rel = {alpha_rel}");
        assert!(features.get("delta_rel").unwrap() < 0.1);
    }

    #[test]
    fn relative_powers_sum_to_one_for_in_band_signal() {
        let settings = WindowSettings {
            capacity: 512,
            stride: 512,
        };
        let fs = 512.0;
        let mut extractor = EegExtractor::new(&settings, default_bands(), fs);
        let features = feed_tone(&mut extractor, 6.0, fs, 512).expect("window due");

        let sum: f32 = ["delta_rel", "theta_rel", "alpha_rel", "beta_rel"]
            .iter()
            .map(|name| features.get(name).unwrap())
            .sum();
        assert!((sum - 1.0).abs() < 1e-3);
    }

    #[test]
    fn emits_absolute_and_total_power_features() {
        let settings = WindowSettings {
            capacity: 256,
            stride: 256,
        };
        let mut extractor = EegExtractor::new(&settings, default_bands(), 256.0);
        let features = feed_tone(&mut extractor, 20.0, 256.0, 256).expect("window due");
        for name in ["delta", "theta", "alpha", "beta", "total_power"] {
            assert!(features.get(name).is_some(), "missing {name}");
        }
        assert!(features.get("beta").unwrap() > features.get("delta").unwrap());
    }
}
