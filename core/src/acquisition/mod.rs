pub mod link;
pub mod reader;

pub use link::{ByteLink, SerialLink};
pub use reader::{AcquisitionReader, ReaderEvent, ReaderHandle};
