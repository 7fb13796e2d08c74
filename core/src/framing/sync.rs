use crate::framing::format::PacketFormat;
use std::collections::VecDeque;

/// Locates packet boundaries in a raw byte stream.
///
/// The synchronizer never trusts a previously believed boundary: a marker
/// candidate whose trailer byte does not line up advances the scan by a
/// single byte, so a corrupted region costs at most one frame length of
/// discarded garbage before lock is regained.
pub struct FrameSynchronizer {
    format: PacketFormat,
    buf: VecDeque<u8>,
    sync_errors: u64,
}

impl FrameSynchronizer {
    pub fn new(format: PacketFormat) -> Self {
        Self {
            format,
            buf: VecDeque::with_capacity(format.frame_len() * 16),
            sync_errors: 0,
        }
    }

    pub fn extend(&mut self, bytes: &[u8]) {
        self.buf.extend(bytes.iter().copied());
    }

    /// Returns the next aligned frame, or `None` until enough bytes arrive.
    pub fn next_frame(&mut self) -> Option<Vec<u8>> {
        let len = self.format.frame_len();
        while self.buf.len() >= len {
            let at_marker = self.buf[0] == self.format.sync[0] && self.buf[1] == self.format.sync[1];
            if at_marker && self.buf[len - 1] == self.format.trailer {
                return Some(self.buf.drain(..len).collect());
            }
            // marker missing or stale boundary: skip one byte and rescan
            self.buf.pop_front();
            self.sync_errors += 1;
        }
        None
    }

    /// Count of bytes discarded while hunting for a valid boundary.
    pub fn sync_errors(&self) -> u64 {
        self.sync_errors
    }

    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    pub fn clear(&mut self) {
        self.buf.clear();
    }
}
