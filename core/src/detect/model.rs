use crate::detect::profile::ProfileDetector;
use crate::features::FeatureVector;
use serde::{Deserialize, Serialize};

/// Instantaneous output of a frozen classifier.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub label: String,
    pub confidence: f32,
}

/// Opaque prediction capability supplied at session start. Training and
/// persistence live elsewhere; the pipeline only consumes predictions.
pub trait Classifier: Send {
    fn predict(&self, features: &FeatureVector) -> Prediction;
}

/// Hysteresis parameters for the model-based detector.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HysteresisSettings {
    pub min_confidence: f32,
    pub debounce: u32,
}

impl Default for HysteresisSettings {
    fn default() -> Self {
        Self {
            min_confidence: 0.7,
            debounce: 3,
        }
    }
}

/// Debounced wrapper around a classifier.
///
/// A candidate label must repeat for `debounce` consecutive windows above
/// the confidence floor before it replaces the stable label; a single
/// disagreeing window restarts the streak, and a low-confidence window
/// clears it without touching the stable label. Single-frame
/// misclassifications therefore never flicker the output.
pub struct HysteresisDetector {
    classifier: Box<dyn Classifier>,
    settings: HysteresisSettings,
    stable: Option<String>,
    pending: Option<String>,
    pending_count: u32,
}

impl HysteresisDetector {
    pub fn new(classifier: Box<dyn Classifier>, settings: HysteresisSettings) -> Self {
        Self {
            classifier,
            settings,
            stable: None,
            pending: None,
            pending_count: 0,
        }
    }

    /// Feeds one feature vector and returns the stable label afterwards.
    pub fn detect(&mut self, features: &FeatureVector) -> Option<&str> {
        let prediction = self.classifier.predict(features);

        if prediction.confidence < self.settings.min_confidence {
            self.pending = None;
            self.pending_count = 0;
            return self.stable.as_deref();
        }

        if self.pending.as_deref() == Some(prediction.label.as_str()) {
            self.pending_count += 1;
        } else {
            self.pending = Some(prediction.label);
            self.pending_count = 1;
        }

        if self.pending_count >= self.settings.debounce && self.pending != self.stable {
            self.stable = self.pending.clone();
        }
        self.stable.as_deref()
    }

    pub fn stable_label(&self) -> Option<&str> {
        self.stable.as_deref()
    }

    pub fn reset(&mut self) {
        self.stable = None;
        self.pending = None;
        self.pending_count = 0;
    }
}

/// Adapter exposing a profile detector through the classifier contract,
/// with the match fraction standing in for confidence. Lets a session run
/// rule-based channels and model-based channels through the same
/// hysteresis machinery.
pub struct ProfileClassifier {
    detector: ProfileDetector,
}

impl ProfileClassifier {
    pub fn new(detector: ProfileDetector) -> Self {
        Self { detector }
    }
}

impl Classifier for ProfileClassifier {
    fn predict(&self, features: &FeatureVector) -> Prediction {
        match self.detector.best_match(features) {
            Some((label, score)) => Prediction {
                label: label.to_string(),
                confidence: score,
            },
            None => Prediction {
                label: String::new(),
                confidence: 0.0,
            },
        }
    }
}
