use serde::{Deserialize, Serialize};

use super::audio_models::{BufferStrategy, ByteOrder, SampleFormat};

/// Configuration for a recording session.
///
/// Every field is a plain value. Changing any of them on an active
/// [`Recorder`](crate::session::recorder::Recorder) restarts the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecorderConfig {
    /// Input device identifier, or None for the system default.
    pub device_id: Option<String>,

    /// Sample rate in Hz (default: 16000).
    pub sample_rate: u32,

    /// Number of interleaved channels (default: 1). Valid values: 1, 2.
    pub channel_count: u16,

    /// Format requested from the device stream (default: I16).
    pub sample_format: SampleFormat,

    /// Requested device buffer size in frames; 0 lets the device decide.
    pub buffer_size_frames: usize,

    /// Byte order of the serialized drain output (default: little-endian).
    pub byte_order: ByteOrder,

    /// Which buffering structure the session uses.
    pub strategy: BufferStrategy,

    /// Drop whatever the device buffered before the session started.
    pub discard_initial_frames: bool,
}

impl RecorderConfig {
    /// Largest device buffer a config may request (about 5 s at 192 kHz stereo).
    pub const MAX_BUFFER_SIZE_FRAMES: usize = 1 << 21;

    pub fn validate(&self) -> Result<(), String> {
        if !(8_000..=192_000).contains(&self.sample_rate) {
            return Err(format!("unsupported sample rate: {}", self.sample_rate));
        }
        if ![1, 2].contains(&self.channel_count) {
            return Err(format!("unsupported channel count: {}", self.channel_count));
        }
        if self.buffer_size_frames > Self::MAX_BUFFER_SIZE_FRAMES {
            return Err(format!(
                "buffer size {} exceeds {} frames",
                self.buffer_size_frames,
                Self::MAX_BUFFER_SIZE_FRAMES
            ));
        }
        if let BufferStrategy::Slotted { slots } = self.strategy {
            if !(BufferStrategy::MIN_SLOTS..=BufferStrategy::MAX_SLOTS).contains(&slots) {
                return Err(format!(
                    "slotted strategy needs {} to {} slots, got {}",
                    BufferStrategy::MIN_SLOTS,
                    BufferStrategy::MAX_SLOTS,
                    slots
                ));
            }
        }
        Ok(())
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            device_id: None,
            sample_rate: 16_000,
            channel_count: 1,
            sample_format: SampleFormat::I16,
            buffer_size_frames: 0,
            byte_order: ByteOrder::LittleEndian,
            strategy: BufferStrategy::Ring,
            discard_initial_frames: true,
        }
    }
}

/// A single-field configuration change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigChange {
    DeviceId(Option<String>),
    SampleRate(u32),
    ChannelCount(u16),
    SampleFormat(SampleFormat),
    BufferSizeFrames(usize),
}

impl ConfigChange {
    /// Apply the change to `config`. Returns false when the value was already set.
    pub fn apply(self, config: &mut RecorderConfig) -> bool {
        match self {
            Self::DeviceId(id) => replace_if_changed(&mut config.device_id, id),
            Self::SampleRate(rate) => replace_if_changed(&mut config.sample_rate, rate),
            Self::ChannelCount(count) => replace_if_changed(&mut config.channel_count, count),
            Self::SampleFormat(format) => replace_if_changed(&mut config.sample_format, format),
            Self::BufferSizeFrames(frames) => {
                replace_if_changed(&mut config.buffer_size_frames, frames)
            }
        }
    }
}

fn replace_if_changed<T: PartialEq>(slot: &mut T, value: T) -> bool {
    if *slot == value {
        return false;
    }
    *slot = value;
    true
}
