use windows::Win32::System::Com::{CoInitializeEx, CoUninitialize, COINIT_MULTITHREADED};

use crate::error::{CallContext, WasapiError};

/// Initializes COM (MTA) on the current thread and uninitializes on drop.
pub(crate) struct ComGuard;

impl ComGuard {
    pub(crate) fn init() -> Result<Self, WasapiError> {
        unsafe { CoInitializeEx(None, COINIT_MULTITHREADED) }
            .ok()
            .call("CoInitializeEx")?;
        Ok(Self)
    }
}

impl Drop for ComGuard {
    fn drop(&mut self) {
        unsafe {
            CoUninitialize();
        }
    }
}
