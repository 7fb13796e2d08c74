use crate::features::window::SlidingWindow;
use crate::features::{FeatureVector, WindowSettings};
use crate::math::StatsHelper;

/// Threshold on successive differences for the Willison amplitude count,
/// sized for signals in volts.
const WAMP_THRESHOLD: f32 = 1e-4;
const ENTROPY_BINS: usize = 10;

/// Stride-based time-domain feature extractor for one EMG channel.
pub struct EmgExtractor {
    window: SlidingWindow,
    sample_rate: f32,
}

impl EmgExtractor {
    pub fn new(settings: &WindowSettings, sample_rate: f32) -> Self {
        Self {
            window: SlidingWindow::new(settings.capacity, settings.stride),
            sample_rate,
        }
    }

    /// Feeds one filtered sample; yields a feature vector whenever the
    /// overlapping window is due.
    pub fn push(&mut self, sample: f32) -> Option<FeatureVector> {
        if !self.window.push(sample) {
            return None;
        }
        let snapshot = self.window.snapshot();
        let timestamp_s = self.window.sample_count() as f64 / self.sample_rate as f64;
        let mut features = FeatureVector::new(timestamp_s);
        write_features(&snapshot, &mut features);
        Some(features)
    }

    pub fn reset(&mut self) {
        self.window.reset();
    }
}

/// Computes the 13 time-domain features over one window.
pub fn write_features(window: &[f32], out: &mut FeatureVector) {
    if window.is_empty() {
        return;
    }

    let diffs: Vec<f32> = window.windows(2).map(|w| w[1] - w[0]).collect();

    let abs_sum: f32 = window.iter().map(|v| v.abs()).sum();
    let peak = window.iter().fold(0.0f32, |acc, v| acc.max(v.abs()));
    let min = window.iter().fold(f32::INFINITY, |acc, &v| acc.min(v));
    let max = window.iter().fold(f32::NEG_INFINITY, |acc, &v| acc.max(v));

    let waveform_length: f32 = diffs.iter().map(|d| d.abs()).sum();
    let slope_sign_changes = diffs
        .windows(2)
        .filter(|pair| pair[0] * pair[1] < 0.0)
        .count();
    let willison = diffs.iter().filter(|d| d.abs() > WAMP_THRESHOLD).count();

    out.insert("rms", StatsHelper::rms(window));
    out.insert("mav", abs_sum / window.len() as f32);
    out.insert("var", StatsHelper::variance(window));
    out.insert("wl", waveform_length);
    out.insert("peak", peak);
    out.insert("range", max - min);
    out.insert("iemg", abs_sum);
    out.insert("entropy", shannon_entropy(window));
    out.insert("energy", window.iter().map(|v| v * v).sum());
    out.insert("kurtosis", StatsHelper::kurtosis(window));
    out.insert("skewness", StatsHelper::skewness(window));
    out.insert("ssc", slope_sign_changes as f32);
    out.insert("wamp", willison as f32);
}

/// Shannon entropy of a fixed-bin amplitude histogram.
fn shannon_entropy(window: &[f32]) -> f32 {
    let min = window.iter().fold(f32::INFINITY, |acc, &v| acc.min(v));
    let max = window.iter().fold(f32::NEG_INFINITY, |acc, &v| acc.max(v));
    let span = max - min;
    if !(span > 0.0) {
        return 0.0;
    }

    let mut counts = [0usize; ENTROPY_BINS];
    for &value in window {
        let bin = (((value - min) / span) * ENTROPY_BINS as f32) as usize;
        counts[bin.min(ENTROPY_BINS - 1)] += 1;
    }

    let total = window.len() as f32;
    counts
        .iter()
        .filter(|&&count| count > 0)
        .map(|&count| {
            let p = count as f32 / total;
            -p * p.log2()
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(window: &[f32]) -> FeatureVector {
        let mut features = FeatureVector::new(0.0);
        write_features(window, &mut features);
        features
    }

    #[test]
    fn emits_all_thirteen_features() {
        let window: Vec<f32> = (0..512).map(|i| (i as f32 * 0.1).sin()).collect();
        let features = extract(&window);
        for name in [
            "rms", "mav", "var", "wl", "peak", "range", "iemg", "entropy", "energy",
            "kurtosis", "skewness", "ssc", "wamp",
        ] {
            assert!(features.get(name).is_some(), "missing {name}");
        }
    }

    #[test]
    fn known_values_on_a_simple_window() {
        let features = extract(&[1.0, -1.0, 2.0, -2.0]);
        assert!((features.get("mav").unwrap() - 1.5).abs() < 1e-6);
        assert!((features.get("iemg").unwrap() - 6.0).abs() < 1e-6);
        assert!((features.get("peak").unwrap() - 2.0).abs() < 1e-6);
        assert!((features.get("range").unwrap() - 4.0).abs() < 1e-6);
        assert!((features.get("wl").unwrap() - (2.0 + 3.0 + 4.0)).abs() < 1e-6);
        assert!((features.get("energy").unwrap() - 10.0).abs() < 1e-6);
        // alternating slope flips sign at both interior points
        assert_eq!(features.get("ssc").unwrap(), 2.0);
        assert_eq!(features.get("wamp").unwrap(), 3.0);
    }

    #[test]
    fn constant_window_has_zero_entropy_and_variance() {
        let features = extract(&[3.0; 64]);
        assert_eq!(features.get("entropy").unwrap(), 0.0);
        assert_eq!(features.get("var").unwrap(), 0.0);
        assert_eq!(features.get("wl").unwrap(), 0.0);
    }

    #[test]
    fn extractor_emits_on_window_cadence() {
        let settings = WindowSettings {
            capacity: 128,
            stride: 32,
        };
        let mut extractor = EmgExtractor::new(&settings, 512.0);
        let mut emitted_at = Vec::new();
        for i in 1..=256 {
            if extractor.push((i as f32 * 0.3).sin()).is_some() {
                emitted_at.push(i);
            }
        }
        assert_eq!(emitted_at, vec![128, 160, 192, 224, 256]);
    }

    #[test]
    fn timestamp_tracks_last_sample_of_window() {
        let settings = WindowSettings {
            capacity: 64,
            stride: 64,
        };
        let mut extractor = EmgExtractor::new(&settings, 512.0);
        let mut features = None;
        for i in 0..64 {
            features = extractor.push(i as f32);
        }
        let features = features.expect("window should be due at sample 64");
        assert!((features.timestamp_s - 64.0 / 512.0).abs() < 1e-9);
    }
}
