use crate::prelude::{PipelineError, PipelineResult};
use std::io::{self, Read, Write};
use std::time::Duration;

/// Byte-oriented duplex channel to the acquisition hardware.
///
/// `read` must be bounded by a timeout and report it as `Ok(0)` — absence
/// of data is not an error. Any `Err` is treated as a hard link failure by
/// the reader loop.
pub trait ByteLink: Send {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;
    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()>;
}

/// Physical serial link backed by the `serialport` crate.
pub struct SerialLink {
    port: Box<dyn serialport::SerialPort>,
}

impl SerialLink {
    /// Opens the port at the configured baud rate.
    ///
    /// A failure is surfaced to the caller; retry policy is the caller's
    /// decision, never an internal loop.
    pub fn open(path: &str, baud: u32, timeout: Duration) -> PipelineResult<Self> {
        let port = serialport::new(path, baud)
            .timeout(timeout)
            .data_bits(serialport::DataBits::Eight)
            .stop_bits(serialport::StopBits::One)
            .parity(serialport::Parity::None)
            .open()
            .map_err(|e| PipelineError::Connection(format!("opening {path}: {e}")))?;
        Ok(Self { port })
    }
}

impl ByteLink for SerialLink {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.port.read(buf) {
            Ok(n) => Ok(n),
            Err(e) if e.kind() == io::ErrorKind::TimedOut => Ok(0),
            Err(e) => Err(e),
        }
    }

    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.port.write_all(bytes)?;
        self.port.flush()
    }
}
