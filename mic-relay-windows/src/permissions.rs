//! Windows microphone privacy check.
//!
//! On Windows 10 1803+ microphone access is gated by Settings > Privacy >
//! Microphone. Unpackaged desktop apps get no consent prompt: a disabled
//! toggle shows up as `E_ACCESSDENIED` when activating the audio client.

use windows::Win32::Foundation::E_ACCESSDENIED;
use windows::Win32::Media::Audio::*;
use windows::Win32::System::Com::*;

use crate::com::ComGuard;
use crate::error::{CallContext, WasapiError};

/// Microphone availability as seen from privacy settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MicrophoneAccess {
    Granted,
    Denied,
    NoDevice,
}

/// Probe the default capture endpoint.
pub fn check_microphone_access() -> Result<MicrophoneAccess, WasapiError> {
    let _com = ComGuard::init()?;
    unsafe {
        let enumerator: IMMDeviceEnumerator =
            CoCreateInstance(&MMDeviceEnumerator, None, CLSCTX_ALL).call("CoCreateInstance")?;

        let device = match enumerator.GetDefaultAudioEndpoint(eCapture, eConsole) {
            Ok(device) => device,
            Err(_) => return Ok(MicrophoneAccess::NoDevice),
        };

        match device.Activate::<IAudioClient>(CLSCTX_ALL, None) {
            Ok(_) => Ok(MicrophoneAccess::Granted),
            Err(e) if e.code() == E_ACCESSDENIED || e.code() == AUDCLNT_E_DEVICE_IN_USE => {
                Ok(MicrophoneAccess::Denied)
            }
            Err(e) => {
                log::warn!("unexpected error probing microphone access: {}", e);
                Ok(MicrophoneAccess::Granted)
            }
        }
    }
}
