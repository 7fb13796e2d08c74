pub mod eeg;
pub mod emg;
pub mod eog;
pub mod window;

pub use eeg::EegExtractor;
pub use emg::EmgExtractor;
pub use eog::{BlinkEpisodeExtractor, BlinkSettings};
pub use window::SlidingWindow;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Named feature values computed over one window, stamped with the time
/// of the window's last sample.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FeatureVector {
    pub values: BTreeMap<String, f32>,
    pub timestamp_s: f64,
}

impl FeatureVector {
    pub fn new(timestamp_s: f64) -> Self {
        Self {
            values: BTreeMap::new(),
            timestamp_s,
        }
    }

    pub fn insert(&mut self, name: &str, value: f32) {
        self.values.insert(name.to_string(), value);
    }

    pub fn get(&self, name: &str) -> Option<f32> {
        self.values.get(name).copied()
    }
}

/// Windowing parameters shared by the stride-based extractors.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowSettings {
    pub capacity: usize,
    pub stride: usize,
}

impl Default for WindowSettings {
    fn default() -> Self {
        // one second of data at 512 Hz, refreshed every 125 ms
        Self {
            capacity: 512,
            stride: 64,
        }
    }
}
