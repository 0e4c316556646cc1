//! Shared-mode stream parameters and endpoint choice derived from a [`RecorderConfig`].
//!
//! Kept free of Windows types so the arithmetic is testable on any host.

use mic_relay_core::models::audio_models::SampleFormat;
use mic_relay_core::models::config::RecorderConfig;

/// `WAVE_FORMAT_PCM` format tag.
pub const FORMAT_TAG_PCM: u16 = 1;
/// `WAVE_FORMAT_IEEE_FLOAT` format tag.
pub const FORMAT_TAG_IEEE_FLOAT: u16 = 3;

/// Device buffer requested when the config leaves the size to the device.
pub const DEFAULT_BUFFER_DURATION_HNS: i64 = 1_000_000; // 100ms

const HNS_PER_SECOND: i64 = 10_000_000;

/// Field values for the `WAVEFORMATEX` passed to `IAudioClient::Initialize`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamFormat {
    pub format_tag: u16,
    pub channels: u16,
    pub sample_rate: u32,
    pub avg_bytes_per_sec: u32,
    pub block_align: u16,
    pub bits_per_sample: u16,
}

impl StreamFormat {
    pub fn from_config(config: &RecorderConfig) -> Self {
        let bytes_per_sample = config.sample_format.bytes_per_sample() as u16;
        let block_align = config.channel_count * bytes_per_sample;
        Self {
            format_tag: match config.sample_format {
                SampleFormat::I16 => FORMAT_TAG_PCM,
                SampleFormat::F32 => FORMAT_TAG_IEEE_FLOAT,
            },
            channels: config.channel_count,
            sample_rate: config.sample_rate,
            avg_bytes_per_sec: config.sample_rate * block_align as u32,
            block_align,
            bits_per_sample: bytes_per_sample * 8,
        }
    }
}

/// Buffer duration in 100-nanosecond units for `IAudioClient::Initialize`.
pub fn buffer_duration_hns(config: &RecorderConfig) -> i64 {
    if config.buffer_size_frames == 0 || config.sample_rate == 0 {
        return DEFAULT_BUFFER_DURATION_HNS;
    }
    config.buffer_size_frames as i64 * HNS_PER_SECOND / config.sample_rate as i64
}

/// Endpoint to open: the config's device, else `fallback`, else `None` for
/// the system default.
pub fn endpoint_id(config: &RecorderConfig, fallback: Option<&str>) -> Option<String> {
    config
        .device_id
        .as_deref()
        .or(fallback)
        .map(str::to_owned)
}
