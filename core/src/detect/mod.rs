pub mod model;
pub mod profile;

pub use model::{Classifier, HysteresisDetector, HysteresisSettings, Prediction, ProfileClassifier};
pub use profile::{BlinkGate, FeatureRange, LabelProfile, ProfileDetector};
