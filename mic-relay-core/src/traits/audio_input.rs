use crate::models::audio_models::{InputDevice, StreamInfo};
use crate::models::config::RecorderConfig;
use crate::models::error::RecorderError;

/// Interface for the external audio source feeding a recorder.
///
/// Implemented by platform backends (`WasapiInput` on Windows) and by test
/// doubles. The recorder owns the input for its whole life; during a session
/// only the producer thread calls `read`, and lifecycle calls (`open`,
/// `close`) never overlap it.
pub trait AudioInput: Send + 'static {
    /// Open the device stream with the requested parameters.
    ///
    /// Failure here is a configuration failure and aborts `start()`.
    fn open(&mut self, config: &RecorderConfig) -> Result<StreamInfo, RecorderError>;

    /// Whether the stream can currently deliver frames.
    fn is_ready(&self) -> bool;

    /// Read up to `frames.len()` interleaved `i16` samples that are available now.
    ///
    /// Must not wait for the device: the producer calls this while holding a
    /// region of the session store. Returns `Ok(0)` when nothing is pending.
    /// Errors are treated by the caller as zero frames.
    fn read(&mut self, frames: &mut [i16]) -> Result<usize, RecorderError>;

    /// Stop and release the device stream. Safe to call when not open.
    fn close(&mut self);

    /// The device backing this input.
    fn device_info(&self) -> InputDevice;
}
