//! # mic-relay-windows
//!
//! Windows WASAPI input for mic-relay.
//!
//! Provides:
//! - `WasapiInput`: shared-mode microphone capture implementing `AudioInput`
//! - `DeviceEnumerator`: capture endpoint listing via the MMDevice API
//! - `permissions`: Windows microphone privacy check
//!
//! ## Usage
//! ```ignore
//! use mic_relay_core::{Recorder, RecorderConfig};
//! use mic_relay_windows::WasapiInput;
//!
//! let mut recorder = Recorder::new(WasapiInput::default_device(), RecorderConfig::default());
//! recorder.start()?;
//! let mut frames = vec![0i16; 480];
//! recorder.drain_blocking(&mut frames)?;
//! ```

pub mod staging;
pub mod stream_format;

#[cfg(target_os = "windows")]
mod com;
#[cfg(target_os = "windows")]
pub mod device_enumerator;
#[cfg(target_os = "windows")]
pub mod error;
#[cfg(target_os = "windows")]
pub mod permissions;
#[cfg(target_os = "windows")]
pub mod wasapi_input;

#[cfg(target_os = "windows")]
pub use device_enumerator::DeviceEnumerator;
#[cfg(target_os = "windows")]
pub use error::WasapiError;
#[cfg(target_os = "windows")]
pub use permissions::{check_microphone_access, MicrophoneAccess};
#[cfg(target_os = "windows")]
pub use wasapi_input::WasapiInput;
