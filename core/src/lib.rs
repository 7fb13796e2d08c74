//! Acquisition-to-detection core for multi-channel physiological streams.
//!
//! The modules follow the data path end to end: bytes from the hardware
//! link are framed and parsed, routed through per-modality streaming
//! filters, windowed into feature vectors, and classified into debounced
//! state labels.

pub mod acquisition;
pub mod detect;
pub mod features;
pub mod filters;
pub mod framing;
pub mod math;
pub mod prelude;
pub mod session;
pub mod telemetry;

pub use prelude::{FilterStage, ParsedSample, PipelineError, PipelineResult, SignalKind};
pub use session::{Session, SessionConfig, Sinks};
