use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Modality tag assigned to each hardware channel at configuration time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SignalKind {
    Emg,
    Eog,
    Eeg,
    Unknown,
}

impl Default for SignalKind {
    fn default() -> Self {
        SignalKind::Unknown
    }
}

/// One decoded multi-channel sample produced by the packet parser.
///
/// `channels` always holds exactly one raw ADC value per configured
/// channel. `dropped_before` is the number of packets lost between this
/// sample and the previously accepted one (wrapping counter arithmetic).
#[derive(Debug, Clone)]
pub struct ParsedSample {
    pub sequence: u8,
    pub channels: Vec<u16>,
    pub dropped_before: u8,
    pub timestamp: Instant,
}

/// Fatal error type for session-level operations.
///
/// Per-packet anomalies (checksum mismatches, duplicates, sequence gaps)
/// are not errors; they are absorbed as counters and outcome variants so
/// the consumer loop never unwinds.
#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    #[error("connection failure: {0}")]
    Connection(String),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("internal failure: {0}")]
    Internal(String),
}

pub type PipelineResult<T> = Result<T, PipelineError>;

/// Trait for streaming filter stages applied one sample at a time.
///
/// Implementations retain their own history so output is continuous
/// across calls; whole-buffer re-filtering is never performed on the
/// streaming path.
pub trait FilterStage: Send {
    fn process(&mut self, sample: f32) -> f32;
    fn reset(&mut self);
}
