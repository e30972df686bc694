//! PCM audio frame definitions.
//!
//! All PCM in the system is signed 16-bit little-endian. The realtime room
//! expects 20 ms packets, which at the default 48 kHz mono rate is 960
//! samples or 1920 bytes per frame.

/// Bytes per PCM sample (16-bit).
pub const BYTES_PER_SAMPLE: usize = 2;

/// Sample rate published to the realtime room.
pub const DEFAULT_SAMPLE_RATE: u32 = 48_000;

/// Channel count published to the realtime room.
pub const DEFAULT_CHANNELS: u16 = 1;

/// Samples per frame (20 ms at 48 kHz).
pub const DEFAULT_FRAME_SAMPLES: usize = 960;

/// One fixed-size slice of s16le PCM.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioFrame {
    data: Vec<u8>,
    sample_rate: u32,
}

impl AudioFrame {
    /// Wraps raw s16le bytes recorded at `sample_rate`.
    pub fn new(data: Vec<u8>, sample_rate: u32) -> Self {
        Self { data, sample_rate }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of samples held by this frame.
    pub fn sample_count(&self) -> usize {
        self.data.len() / BYTES_PER_SAMPLE
    }

    /// Decodes the frame into signed samples.
    pub fn samples(&self) -> Vec<i16> {
        self.data
            .chunks_exact(BYTES_PER_SAMPLE)
            .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
            .collect()
    }

    /// Playback duration of this frame in milliseconds.
    pub fn duration_ms(&self) -> u64 {
        if self.sample_rate == 0 {
            return 0;
        }
        (self.sample_count() as u64 * 1000) / u64::from(self.sample_rate)
    }
}
