use serde::{Deserialize, Serialize};

/// Wire layout of one fixed-length sample packet.
///
/// Layout: `[SYNC0, SYNC1, CTR, CH0_H, CH0_L, ..., CHn_H, CHn_L, TRAILER]`.
/// Channel values are big-endian unsigned 16-bit ADC counts. The layout is
/// supplied by channel-configuration metadata, never assumed by the
/// pipeline itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PacketFormat {
    pub sync: [u8; 2],
    pub channel_count: usize,
    pub trailer: u8,
}

impl Default for PacketFormat {
    fn default() -> Self {
        // layout of the reference acquisition firmware
        Self {
            sync: [0xC7, 0x7C],
            channel_count: 2,
            trailer: 0x01,
        }
    }
}

impl PacketFormat {
    /// Total frame length in bytes: marker + counter + channels + trailer.
    pub fn frame_len(&self) -> usize {
        2 + 1 + 2 * self.channel_count + 1
    }

    /// Encodes one frame; used by loopback tests and the synthetic source.
    pub fn encode_frame(&self, counter: u8, values: &[u16]) -> Vec<u8> {
        debug_assert_eq!(values.len(), self.channel_count);
        let mut frame = Vec::with_capacity(self.frame_len());
        frame.extend_from_slice(&self.sync);
        frame.push(counter);
        for value in values.iter().take(self.channel_count) {
            frame.extend_from_slice(&value.to_be_bytes());
        }
        frame.push(self.trailer);
        frame
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_format_matches_firmware_layout() {
        let format = PacketFormat::default();
        assert_eq!(format.frame_len(), 8);
        assert_eq!(format.sync, [0xC7, 0x7C]);
    }

    #[test]
    fn encode_frame_produces_expected_bytes() {
        let format = PacketFormat::default();
        let frame = format.encode_frame(7, &[0x0102, 0xA0B0]);
        assert_eq!(frame, vec![0xC7, 0x7C, 7, 0x01, 0x02, 0xA0, 0xB0, 0x01]);
    }
}
