use biocore::acquisition::ByteLink;
use biocore::framing::PacketFormat;
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::f32::consts::PI;
use std::io;

/// Configuration for generating a synthetic packet byte stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamSettings {
    pub frames: usize,
    pub seed: u64,
    pub frequency_hz: f32,
    pub amplitude: f32,
    pub noise: f32,
    pub sample_rate_hz: f32,
    /// Inject this many random bytes before the frame at the given index.
    pub garbage_at: Option<usize>,
    pub garbage_len: usize,
    /// Repeat every n-th frame verbatim to exercise duplicate suppression.
    pub duplicate_every: Option<usize>,
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            frames: 2048,
            seed: 0,
            frequency_hz: 12.0,
            amplitude: 800.0,
            noise: 0.02,
            sample_rate_hz: 512.0,
            garbage_at: None,
            garbage_len: 16,
            duplicate_every: None,
        }
    }
}

/// Encodes a seeded multi-channel sine (around ADC midscale) into
/// wire-format packets, optionally corrupted for recovery demos.
pub fn build_stream(format: &PacketFormat, settings: &StreamSettings) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(settings.seed);
    let mut bytes = Vec::with_capacity(settings.frames * format.frame_len());

    for index in 0..settings.frames {
        let phase = 2.0 * PI * settings.frequency_hz * index as f32 / settings.sample_rate_hz;
        let values: Vec<u16> = (0..format.channel_count)
            .map(|channel| {
                let offset = channel as f32 * 0.5;
                let jitter = if settings.noise > 0.0 {
                    rng.gen_range(-settings.noise..settings.noise)
                } else {
                    0.0
                };
                let value = 2048.0 + settings.amplitude * ((phase + offset).sin() + jitter);
                value.clamp(0.0, 4095.0) as u16
            })
            .collect();

        if settings.garbage_at == Some(index) {
            for _ in 0..settings.garbage_len {
                // injected noise must stay free of the sync byte so the
                // corrupted span has a known, exact length
                let byte: u8 = rng.gen();
                bytes.push(if byte == format.sync[0] { !byte } else { byte });
            }
        }

        let frame = format.encode_frame((index % 256) as u8, &values);
        bytes.extend_from_slice(&frame);
        if settings
            .duplicate_every
            .map(|n| n > 0 && index % n == 0 && index > 0)
            .unwrap_or(false)
        {
            bytes.extend_from_slice(&frame);
        }
    }
    bytes
}

/// Replays a prebuilt byte stream through the `ByteLink` contract, then
/// fails like an unplugged device so the session ends cleanly.
pub struct SyntheticLink {
    data: Vec<u8>,
    cursor: usize,
    chunk: usize,
}

impl SyntheticLink {
    pub fn new(data: Vec<u8>) -> Self {
        Self {
            data,
            cursor: 0,
            chunk: 256,
        }
    }
}

impl ByteLink for SyntheticLink {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.cursor >= self.data.len() {
            return Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "synthetic stream ended",
            ));
        }
        let n = (self.data.len() - self.cursor)
            .min(buf.len())
            .min(self.chunk);
        buf[..n].copy_from_slice(&self.data[self.cursor..self.cursor + n]);
        self.cursor += n;
        Ok(n)
    }

    fn write_all(&mut self, _bytes: &[u8]) -> io::Result<()> {
        Ok(())
    }
}
