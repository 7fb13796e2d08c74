pub mod format;
pub mod parser;
pub mod sync;

pub use format::PacketFormat;
pub use parser::{PacketParser, ParseOutcome, RejectReason};
pub use sync::FrameSynchronizer;
