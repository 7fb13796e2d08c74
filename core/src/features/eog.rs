use crate::features::FeatureVector;
use crate::math::StatsHelper;
use log::debug;
use serde::{Deserialize, Serialize};

/// Thresholds governing blink-episode collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BlinkSettings {
    pub amp_threshold: f32,
    pub min_duration_ms: f32,
    pub max_duration_ms: f32,
    pub baseline_alpha: f32,
}

impl Default for BlinkSettings {
    fn default() -> Self {
        Self {
            amp_threshold: 1.5,
            min_duration_ms: 100.0,
            max_duration_ms: 500.0,
            baseline_alpha: 0.01,
        }
    }
}

/// Edge-triggered blink-candidate extractor for one EOG channel.
///
/// Unlike the stride-based extractors, features are computed once per
/// threshold-crossing episode: collection starts when the baseline-centered
/// value exceeds the amplitude threshold and ends when it decays below a
/// quarter of it (after the minimum duration) or hits the maximum duration.
pub struct BlinkEpisodeExtractor {
    settings: BlinkSettings,
    sample_rate: f32,
    baseline: f32,
    seen: u64,
    episode: Vec<f32>,
    collecting: bool,
}

impl BlinkEpisodeExtractor {
    pub fn new(settings: BlinkSettings, sample_rate: f32) -> Self {
        Self {
            settings,
            sample_rate,
            baseline: 0.0,
            seen: 0,
            episode: Vec::new(),
            collecting: false,
        }
    }

    pub fn push(&mut self, sample: f32) -> Option<FeatureVector> {
        self.seen += 1;
        if self.seen == 1 {
            self.baseline = sample;
        } else {
            // slow-moving average keeps electrode drift out of the episode
            self.baseline = self.settings.baseline_alpha * sample
                + (1.0 - self.settings.baseline_alpha) * self.baseline;
        }
        let centered = sample - self.baseline;

        if !self.collecting {
            if centered.abs() > self.settings.amp_threshold {
                self.collecting = true;
                self.episode.clear();
                self.episode.push(centered);
                debug!("blink candidate started at sample {}", self.seen);
            }
            return None;
        }

        self.episode.push(centered);

        let samples_per_ms = self.sample_rate / 1000.0;
        let max_samples = (self.settings.max_duration_ms * samples_per_ms) as usize;
        let min_samples = (self.settings.min_duration_ms * samples_per_ms) as usize;

        let over_max = self.episode.len() > max_samples;
        let settled = centered.abs() < self.settings.amp_threshold / 4.0
            && self.episode.len() > min_samples;

        if over_max || settled {
            self.collecting = false;
            let features = self.extract();
            self.episode.clear();
            return Some(features);
        }
        None
    }

    fn extract(&self) -> FeatureVector {
        let data = &self.episode;
        let timestamp_s = self.seen as f64 / self.sample_rate as f64;
        let mut features = FeatureVector::new(timestamp_s);
        if data.is_empty() {
            return features;
        }

        let (peak_idx, peak_amp) = data
            .iter()
            .map(|v| v.abs())
            .enumerate()
            .fold((0, 0.0f32), |(best_i, best_v), (i, v)| {
                if v > best_v {
                    (i, v)
                } else {
                    (best_i, best_v)
                }
            });

        let ms_per_sample = 1000.0 / self.sample_rate;
        let duration_ms = data.len() as f32 * ms_per_sample;
        let rise_ms = peak_idx as f32 * ms_per_sample;
        let fall_ms = (data.len() - peak_idx) as f32 * ms_per_sample;

        features.insert("amplitude", peak_amp);
        features.insert("duration_ms", duration_ms);
        features.insert("rise_time_ms", rise_ms);
        features.insert("fall_time_ms", fall_ms);
        features.insert("asymmetry", rise_ms / (fall_ms + 1e-6));
        features.insert("kurtosis", StatsHelper::kurtosis(data));
        features.insert("skewness", StatsHelper::skewness(data));
        features
    }

    pub fn reset(&mut self) {
        self.baseline = 0.0;
        self.seen = 0;
        self.episode.clear();
        self.collecting = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> BlinkSettings {
        BlinkSettings {
            amp_threshold: 1.0,
            min_duration_ms: 20.0,
            max_duration_ms: 400.0,
            baseline_alpha: 0.0,
        }
    }

    /// Triangular pulse: `rise` samples up to `peak`, `fall` samples down.
    fn pulse(rise: usize, fall: usize, peak: f32) -> Vec<f32> {
        let mut samples = Vec::new();
        for i in 0..rise {
            samples.push(peak * (i + 1) as f32 / rise as f32);
        }
        for i in 0..fall {
            samples.push(peak * (fall - i - 1) as f32 / fall as f32);
        }
        samples
    }

    #[test]
    fn quiet_signal_never_emits() {
        let mut extractor = BlinkEpisodeExtractor::new(settings(), 512.0);
        for _ in 0..2000 {
            assert!(extractor.push(0.1).is_none());
        }
    }

    #[test]
    fn threshold_crossing_episode_yields_features_once() {
        let mut extractor = BlinkEpisodeExtractor::new(settings(), 512.0);
        let mut emitted = Vec::new();
        extractor.push(0.0); // settle the baseline at rest
        for sample in pulse(40, 80, 5.0) {
            if let Some(features) = extractor.push(sample) {
                emitted.push(features);
            }
        }
        // trailing quiet period: no further emission
        for _ in 0..200 {
            if let Some(features) = extractor.push(0.0) {
                emitted.push(features);
            }
        }
        assert_eq!(emitted.len(), 1);
        let features = &emitted[0];
        assert!(features.get("amplitude").unwrap() > 4.0);
        assert!(features.get("duration_ms").unwrap() > 20.0);
    }

    #[test]
    fn asymmetry_reflects_rise_fall_ratio() {
        let mut extractor = BlinkEpisodeExtractor::new(settings(), 1000.0);
        let mut captured = None;
        extractor.push(0.0);
        for sample in pulse(30, 90, 4.0) {
            if let Some(features) = extractor.push(sample) {
                captured = Some(features);
            }
        }
        let features = captured.expect("episode should complete");
        let asymmetry = features.get("asymmetry").unwrap();
        // rise is about a third of the fall
        assert!(asymmetry > 0.2 && asymmetry < 0.5, "asymmetry = {asymmetry}");
    }

    #[test]
    fn runaway_episode_is_cut_at_max_duration() {
        let mut extractor = BlinkEpisodeExtractor::new(settings(), 1000.0);
        let mut emitted = 0;
        extractor.push(0.0);
        // signal sticks above threshold far past max_duration_ms
        for _ in 0..1000 {
            if extractor.push(3.0).is_some() {
                emitted += 1;
            }
        }
        assert!(emitted >= 1);
    }
}
