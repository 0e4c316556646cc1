//! # mic-relay-core
//!
//! Platform-agnostic microphone frame relay.
//!
//! A [`Recorder`] owns an [`AudioInput`] and, while recording, a producer
//! thread that moves interleaved `i16` frames from the input into a shared
//! buffer. Consumers drain frames natively or as bytes in a chosen byte order.
//! Platform backends (Windows WASAPI) implement `AudioInput`.
//!
//! ## Architecture
//!
//! ```text
//! mic-relay-core (this crate)
//! ├── traits/       ← AudioInput, FrameStore
//! ├── models/       ← RecorderError, RecorderState, RecorderConfig, SessionInfo, etc.
//! ├── processing/   ← RegionRingBuffer, SlottedBuffer, byte order, sample conversion
//! └── session/      ← Recorder, producer loop, consumer drains
//! ```

pub mod models;
pub mod processing;
pub mod session;
pub mod traits;

// Re-export key types at crate root for convenience.
pub use models::audio_models::{
    BufferStrategy, ByteOrder, InputDevice, RecorderDiagnostics, SampleFormat, SessionInfo,
    StreamInfo,
};
pub use models::config::{ConfigChange, RecorderConfig};
pub use models::error::RecorderError;
pub use models::state::RecorderState;
pub use processing::ring_buffer::RegionRingBuffer;
pub use processing::slotted_buffer::SlottedBuffer;
pub use session::recorder::Recorder;
pub use traits::audio_input::AudioInput;
pub use traits::frame_store::FrameStore;
