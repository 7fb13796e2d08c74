pub mod biquad;
pub mod chain;
pub mod router;
pub mod stage;

pub use biquad::Biquad;
pub use chain::{FilterChain, FilterSettings, ModalityFilterSettings};
pub use router::{ChannelReading, ChannelSettings, FilterRouter, RoutedSample};
pub use stage::{BandpassStage, EnvelopeStage, NotchStage};
