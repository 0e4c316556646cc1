//! Capture endpoint enumeration via the MMDevice API.

use windows::core::PCWSTR;
use windows::Win32::Devices::FunctionDiscovery::PKEY_Device_FriendlyName;
use windows::Win32::Media::Audio::*;
use windows::Win32::System::Com::*;

use mic_relay_core::models::audio_models::InputDevice;

use crate::error::{CallContext, WasapiError};

/// Lists microphones and other capture endpoints.
///
/// Requires COM to be initialized on the calling thread.
pub struct DeviceEnumerator {
    enumerator: IMMDeviceEnumerator,
}

impl DeviceEnumerator {
    pub fn new() -> Result<Self, WasapiError> {
        let enumerator = unsafe { CoCreateInstance(&MMDeviceEnumerator, None, CLSCTX_ALL) }
            .call("CoCreateInstance")?;
        Ok(Self { enumerator })
    }

    /// Active capture endpoints, with the default one flagged.
    pub fn list_capture_devices(&self) -> Result<Vec<InputDevice>, WasapiError> {
        unsafe {
            let collection = self
                .enumerator
                .EnumAudioEndpoints(eCapture, DEVICE_STATE_ACTIVE)
                .call("EnumAudioEndpoints")?;
            let count = collection.GetCount().call("GetCount")?;
            let default_id = self.default_capture_device_id().ok();

            let mut devices = Vec::with_capacity(count as usize);
            for i in 0..count {
                let Ok(device) = collection.Item(i) else {
                    continue;
                };
                let Some(id) = device_id(&device) else {
                    continue;
                };
                let name = friendly_name(&device).unwrap_or_else(|| format!("Microphone {}", i + 1));
                let is_default = default_id.as_deref() == Some(id.as_str());
                devices.push(InputDevice { id, name, is_default });
            }
            Ok(devices)
        }
    }

    pub fn default_capture_device_id(&self) -> Result<String, WasapiError> {
        let device = self.default_capture_device()?;
        device_id(&device).ok_or(WasapiError::DeviceNotFound)
    }

    pub(crate) fn default_capture_device(&self) -> Result<IMMDevice, WasapiError> {
        unsafe { self.enumerator.GetDefaultAudioEndpoint(eCapture, eConsole) }
            .map_err(|_| WasapiError::DeviceNotFound)
    }

    /// Resolve an endpoint id, or the default capture endpoint for `None`.
    pub(crate) fn capture_device(&self, id: Option<&str>) -> Result<IMMDevice, WasapiError> {
        let Some(id) = id else {
            return self.default_capture_device();
        };
        let wide: Vec<u16> = id.encode_utf16().chain(std::iter::once(0)).collect();
        unsafe { self.enumerator.GetDevice(PCWSTR(wide.as_ptr())) }
            .map_err(|_| WasapiError::DeviceNotFound)
    }
}

pub(crate) fn device_id(device: &IMMDevice) -> Option<String> {
    unsafe {
        let id = device.GetId().ok()?;
        let text = id.to_string().ok();
        CoTaskMemFree(Some(id.0 as *const _));
        text
    }
}

/// `PKEY_Device_FriendlyName`, e.g. "Microphone (USB Audio Device)".
pub(crate) fn friendly_name(device: &IMMDevice) -> Option<String> {
    unsafe {
        let store = device.OpenPropertyStore(STGM_READ).ok()?;
        let value = store.GetValue(&PKEY_Device_FriendlyName).ok()?;
        let name = value.to_string();
        (!name.is_empty()).then_some(name)
    }
}
