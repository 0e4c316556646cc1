use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Sample format requested from the device stream.
///
/// Frames are always stored as `i16`; inputs convert `F32` streams on the way in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SampleFormat {
    I16,
    F32,
}

impl SampleFormat {
    pub fn bytes_per_sample(self) -> usize {
        match self {
            Self::I16 => 2,
            Self::F32 => 4,
        }
    }
}

/// Byte order of serialized samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ByteOrder {
    LittleEndian,
    BigEndian,
}

/// Buffering structure used between the producer thread and consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BufferStrategy {
    /// One circular array with region-based access.
    Ring,
    /// A fixed set of rotating slots (triple buffering when `slots == 3`).
    Slotted { slots: usize },
}

impl BufferStrategy {
    pub const MIN_SLOTS: usize = 3;
    pub const MAX_SLOTS: usize = 64;
}

/// Parameters the device actually granted when the stream was opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamInfo {
    pub sample_rate: u32,
    pub channel_count: u16,
    /// Device buffer size in frames; 0 when the device does not report one.
    pub buffer_size_frames: usize,
}

/// An audio input device available for capture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputDevice {
    pub id: String,
    pub name: String,
    pub is_default: bool,
}

/// Identity and sizing of one recording session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionInfo {
    pub id: Uuid,
    pub started_at: DateTime<Utc>,
    pub strategy: BufferStrategy,
    /// Readable capacity of the session's buffer, in frames.
    pub capacity: usize,
    /// Frames requested from the input per producer iteration.
    pub frames_per_read: usize,
    pub sample_rate: u32,
    pub channel_count: u16,
}

/// Producer statistics for debugging capture sessions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecorderDiagnostics {
    pub frames_captured: u64,
    pub frames_dropped: u64,
    pub source_errors: u64,
    pub source_waits: u64,
    pub iterations: u64,
}
