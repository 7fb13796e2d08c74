use crate::filters::stage::{BandpassStage, EnvelopeStage, NotchStage};
use crate::prelude::{FilterStage, SignalKind};
use serde::{Deserialize, Serialize};

/// Cutoffs for one modality's chain. Stage order is fixed per modality
/// (bandpass, then notch where configured, then envelope where
/// configured); only the frequencies are configuration-supplied.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModalityFilterSettings {
    pub band_low_hz: f32,
    pub band_high_hz: f32,
    pub notch_hz: Option<f32>,
    pub notch_q: f32,
    pub envelope_hz: Option<f32>,
}

impl Default for ModalityFilterSettings {
    fn default() -> Self {
        Self {
            band_low_hz: 0.5,
            band_high_hz: 45.0,
            notch_hz: None,
            notch_q: 30.0,
            envelope_hz: None,
        }
    }
}

/// Per-modality chain settings with the reference system's defaults at a
/// 512 Hz sampling rate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterSettings {
    pub emg: ModalityFilterSettings,
    pub eog: ModalityFilterSettings,
    pub eeg: ModalityFilterSettings,
}

impl Default for FilterSettings {
    fn default() -> Self {
        Self {
            emg: ModalityFilterSettings {
                band_low_hz: 20.0,
                band_high_hz: 250.0,
                notch_hz: Some(50.0),
                notch_q: 30.0,
                envelope_hz: Some(10.0),
            },
            eog: ModalityFilterSettings {
                band_low_hz: 0.5,
                band_high_hz: 10.0,
                notch_hz: None,
                notch_q: 30.0,
                envelope_hz: Some(5.0),
            },
            eeg: ModalityFilterSettings {
                band_low_hz: 0.5,
                band_high_hz: 45.0,
                notch_hz: Some(50.0),
                notch_q: 30.0,
                envelope_hz: None,
            },
        }
    }
}

impl FilterSettings {
    pub fn for_kind(&self, kind: SignalKind) -> Option<&ModalityFilterSettings> {
        match kind {
            SignalKind::Emg => Some(&self.emg),
            SignalKind::Eog => Some(&self.eog),
            SignalKind::Eeg => Some(&self.eeg),
            SignalKind::Unknown => None,
        }
    }
}

/// Ordered stack of streaming stages for one channel.
pub struct FilterChain {
    stages: Vec<Box<dyn FilterStage>>,
}

impl FilterChain {
    /// Builds the fixed stage order for `kind`, or `None` for channels
    /// with no registered chain (they pass through unfiltered).
    pub fn for_kind(kind: SignalKind, settings: &FilterSettings, sample_rate: f32) -> Option<Self> {
        let modality = settings.for_kind(kind)?;
        let mut stages: Vec<Box<dyn FilterStage>> = vec![Box::new(BandpassStage::new(
            sample_rate,
            modality.band_low_hz,
            modality.band_high_hz,
        ))];
        if let Some(center_hz) = modality.notch_hz {
            stages.push(Box::new(NotchStage::new(sample_rate, center_hz, modality.notch_q)));
        }
        if let Some(cutoff_hz) = modality.envelope_hz {
            stages.push(Box::new(EnvelopeStage::new(sample_rate, cutoff_hz)));
        }
        Some(Self { stages })
    }

    pub fn process(&mut self, sample: f32) -> f32 {
        self.stages
            .iter_mut()
            .fold(sample, |acc, stage| stage.process(acc))
    }

    pub fn reset(&mut self) {
        for stage in self.stages.iter_mut() {
            stage.reset();
        }
    }

    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }
}
