use crate::features::FeatureVector;
use serde::{Deserialize, Serialize};

/// Inclusive acceptance range for one named feature.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureRange {
    pub feature: String,
    pub min: f32,
    pub max: f32,
}

impl FeatureRange {
    pub fn new(feature: &str, min: f32, max: f32) -> Self {
        Self {
            feature: feature.to_string(),
            min,
            max,
        }
    }

    fn contains(&self, value: f32) -> bool {
        value >= self.min && value <= self.max
    }
}

/// Multi-feature acceptance profile for one candidate label. Declaration
/// order across profiles doubles as the tie-break order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelProfile {
    pub label: String,
    pub ranges: Vec<FeatureRange>,
}

/// Rule-based detector: a label wins when the fraction of its evaluable
/// ranges that match meets the consensus threshold, best fraction first.
pub struct ProfileDetector {
    profiles: Vec<LabelProfile>,
    consensus: f32,
}

impl ProfileDetector {
    pub fn new(profiles: Vec<LabelProfile>, consensus: f32) -> Self {
        Self {
            profiles,
            consensus,
        }
    }

    /// Best label and its match fraction, regardless of consensus. Ranges
    /// whose feature is absent from the vector are left out of the
    /// denominator; a profile with nothing evaluable scores nothing.
    pub fn best_match(&self, features: &FeatureVector) -> Option<(&str, f32)> {
        let mut best: Option<(&str, f32)> = None;
        for profile in &self.profiles {
            let mut matched = 0usize;
            let mut evaluated = 0usize;
            for range in &profile.ranges {
                if let Some(value) = features.get(&range.feature) {
                    evaluated += 1;
                    if range.contains(value) {
                        matched += 1;
                    }
                }
            }
            if evaluated == 0 {
                continue;
            }
            let score = matched as f32 / evaluated as f32;
            // strict comparison keeps the earliest profile on ties
            if best.map(|(_, s)| score > s).unwrap_or(true) {
                best = Some((profile.label.as_str(), score));
            }
        }
        best
    }

    pub fn detect(&self, features: &FeatureVector) -> Option<&str> {
        self.best_match(features)
            .filter(|(_, score)| *score >= self.consensus)
            .map(|(label, _)| label)
    }
}

/// Validity screen applied to blink episodes before profile matching.
///
/// Real blinks rise faster than they fall: a waveform whose rise/fall
/// ratio sits inside the symmetry band is treated as a movement artifact,
/// and a flat (low-kurtosis) episode as a noise burst.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BlinkGate {
    pub symmetry_low: f32,
    pub symmetry_high: f32,
    pub min_kurtosis: f32,
}

impl Default for BlinkGate {
    fn default() -> Self {
        Self {
            symmetry_low: 0.9,
            symmetry_high: 1.1,
            min_kurtosis: 0.5,
        }
    }
}

impl BlinkGate {
    pub fn admits(&self, features: &FeatureVector) -> bool {
        let asymmetry = match features.get("asymmetry") {
            Some(value) => value,
            None => return false,
        };
        if asymmetry >= self.symmetry_low && asymmetry <= self.symmetry_high {
            return false;
        }
        features
            .get("kurtosis")
            .map(|k| k >= self.min_kurtosis)
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vector(pairs: &[(&str, f32)]) -> FeatureVector {
        let mut features = FeatureVector::new(0.0);
        for (name, value) in pairs {
            features.insert(name, *value);
        }
        features
    }

    fn three_feature_profile(label: &str) -> LabelProfile {
        LabelProfile {
            label: label.to_string(),
            ranges: vec![
                FeatureRange::new("a", 0.0, 1.0),
                FeatureRange::new("b", 0.0, 1.0),
                FeatureRange::new("c", 0.0, 1.0),
            ],
        }
    }

    #[test]
    fn two_of_three_matches_meets_default_consensus() {
        let detector = ProfileDetector::new(vec![three_feature_profile("focus")], 0.6);
        let features = vector(&[("a", 0.5), ("b", 0.5), ("c", 5.0)]);
        assert_eq!(detector.detect(&features), Some("focus"));
    }

    #[test]
    fn one_of_three_matches_is_rejected() {
        let detector = ProfileDetector::new(vec![three_feature_profile("focus")], 0.6);
        let features = vector(&[("a", 0.5), ("b", 5.0), ("c", 5.0)]);
        assert_eq!(detector.detect(&features), None);
    }

    #[test]
    fn highest_fraction_wins_across_profiles() {
        let strict = LabelProfile {
            label: "strict".to_string(),
            ranges: vec![
                FeatureRange::new("a", 0.0, 1.0),
                FeatureRange::new("b", 10.0, 20.0),
            ],
        };
        let loose = LabelProfile {
            label: "loose".to_string(),
            ranges: vec![
                FeatureRange::new("a", 0.0, 1.0),
                FeatureRange::new("b", 0.0, 1.0),
            ],
        };
        let detector = ProfileDetector::new(vec![strict, loose], 0.6);
        let features = vector(&[("a", 0.5), ("b", 0.5)]);
        assert_eq!(detector.detect(&features), Some("loose"));
    }

    #[test]
    fn declaration_order_breaks_ties() {
        let detector = ProfileDetector::new(
            vec![three_feature_profile("first"), three_feature_profile("second")],
            0.6,
        );
        let features = vector(&[("a", 0.5), ("b", 0.5), ("c", 0.5)]);
        assert_eq!(detector.detect(&features), Some("first"));
    }

    #[test]
    fn profile_with_no_evaluable_features_scores_nothing() {
        let detector = ProfileDetector::new(vec![three_feature_profile("focus")], 0.6);
        let features = vector(&[("unrelated", 1.0)]);
        assert_eq!(detector.detect(&features), None);
    }

    #[test]
    fn blink_gate_rejects_symmetric_waveforms() {
        let gate = BlinkGate::default();
        let symmetric = vector(&[("asymmetry", 1.0), ("kurtosis", 3.0)]);
        let skewed = vector(&[("asymmetry", 0.4), ("kurtosis", 3.0)]);
        assert!(!gate.admits(&symmetric));
        assert!(gate.admits(&skewed));
    }

    #[test]
    fn blink_gate_enforces_kurtosis_floor() {
        let gate = BlinkGate::default();
        let flat = vector(&[("asymmetry", 0.4), ("kurtosis", -1.0)]);
        assert!(!gate.admits(&flat));
    }
}
