//! WASAPI microphone input.
//!
//! Opens a capture endpoint in shared mode, asking the audio engine to convert
//! to the requested rate, channel count and sample format. A dedicated capture
//! thread converts each packet to `i16` and stages it for `AudioInput::read`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use windows::core::w;
use windows::Win32::Media::Audio::*;
use windows::Win32::System::Com::*;
use windows::Win32::System::Threading::AvSetMmThreadCharacteristicsW;

use mic_relay_core::models::audio_models::{InputDevice, SampleFormat, StreamInfo};
use mic_relay_core::models::config::RecorderConfig;
use mic_relay_core::models::error::RecorderError;
use mic_relay_core::processing::sample_convert::{f32_bytes_to_i16, pcm16_bytes_to_i16};
use mic_relay_core::traits::audio_input::AudioInput;

use crate::com::ComGuard;
use crate::device_enumerator::{friendly_name, DeviceEnumerator};
use crate::error::{CallContext, WasapiError};
use crate::permissions::{check_microphone_access, MicrophoneAccess};
use crate::staging::Staging;
use crate::stream_format::{buffer_duration_hns, endpoint_id, StreamFormat};

/// Poll interval of the capture thread.
const CAPTURE_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Staged audio kept for the producer, in seconds of stream time.
const STAGING_SECONDS: usize = 1;

/// Parameters handed to the capture thread for one stream.
struct CaptureRequest {
    device_id: Option<String>,
    format: StreamFormat,
    sample_format: SampleFormat,
    buffer_duration: i64,
}

/// What the capture thread reports once the stream is running.
struct OpenedStream {
    info: StreamInfo,
    device_name: Option<String>,
}

/// Shared-mode WASAPI capture implementing [`AudioInput`].
pub struct WasapiInput {
    /// Endpoint chosen at construction; used when the config names none.
    fallback_id: Option<String>,
    /// Endpoint of the current or last opened stream.
    device_id: Option<String>,
    device_name: String,
    running: Arc<AtomicBool>,
    staging: Arc<Staging>,
    capture_handle: Option<thread::JoinHandle<()>>,
}

impl WasapiInput {
    /// Input for the system default microphone. Device ids in the recorder
    /// config override this at `open`.
    pub fn default_device() -> Self {
        Self::new(None, "Default Microphone".into())
    }

    /// Input for a specific endpoint, as listed by [`DeviceEnumerator`].
    pub fn with_device(device: &InputDevice) -> Self {
        Self::new(Some(device.id.clone()), device.name.clone())
    }

    fn new(device_id: Option<String>, device_name: String) -> Self {
        Self {
            fallback_id: device_id.clone(),
            device_id,
            device_name,
            running: Arc::new(AtomicBool::new(false)),
            staging: Arc::new(Staging::new(1)),
            capture_handle: None,
        }
    }
}

impl AudioInput for WasapiInput {
    fn open(&mut self, config: &RecorderConfig) -> Result<StreamInfo, RecorderError> {
        self.close();

        match check_microphone_access() {
            Ok(MicrophoneAccess::Denied) => return Err(WasapiError::AccessDenied.into()),
            Ok(_) => {}
            Err(e) => log::debug!("microphone access probe failed: {}", e),
        }

        self.device_id = endpoint_id(config, self.fallback_id.as_deref());

        let format = StreamFormat::from_config(config);
        let request = CaptureRequest {
            device_id: self.device_id.clone(),
            format,
            sample_format: config.sample_format,
            buffer_duration: buffer_duration_hns(config),
        };

        let staging_limit = format.sample_rate as usize * format.channels as usize * STAGING_SECONDS;
        self.staging = Arc::new(Staging::new(staging_limit));
        self.running.store(true, Ordering::SeqCst);

        let running = Arc::clone(&self.running);
        let staging = Arc::clone(&self.staging);
        let (opened_tx, opened_rx) = mpsc::channel();

        let handle = thread::Builder::new()
            .name("wasapi-mic-capture".into())
            .spawn(move || {
                if let Err(e) = capture_loop(&running, &staging, request, &opened_tx) {
                    log::error!("mic capture error: {}", e);
                    // Reaches `open` only if the stream never came up.
                    let _ = opened_tx.send(Err(e));
                }
                running.store(false, Ordering::SeqCst);
            })
            .map_err(|e| RecorderError::ThreadSpawn(e.to_string()))?;
        self.capture_handle = Some(handle);

        let opened = opened_rx
            .recv()
            .unwrap_or(Err(WasapiError::ThreadExited));
        match opened {
            Ok(stream) => {
                if let Some(name) = stream.device_name {
                    self.device_name = name;
                }
                log::info!(
                    "opened '{}': {} Hz, {} ch, {} frame buffer",
                    self.device_name,
                    stream.info.sample_rate,
                    stream.info.channel_count,
                    stream.info.buffer_size_frames
                );
                Ok(stream.info)
            }
            Err(e) => {
                self.close();
                Err(e.into())
            }
        }
    }

    fn is_ready(&self) -> bool {
        self.capture_handle.is_some() && self.running.load(Ordering::SeqCst)
    }

    fn read(&mut self, frames: &mut [i16]) -> Result<usize, RecorderError> {
        if self.capture_handle.is_none() {
            return Err(RecorderError::SourceReadFailed("stream not open".into()));
        }
        Ok(self.staging.pop_into(frames))
    }

    fn close(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.capture_handle.take() {
            if handle.join().is_err() {
                log::error!("mic capture thread panicked");
            }
        }
        self.staging.clear();
    }

    fn device_info(&self) -> InputDevice {
        InputDevice {
            id: self.device_id.clone().unwrap_or_else(|| "default-mic".into()),
            name: self.device_name.clone(),
            is_default: self.device_id.is_none(),
        }
    }
}

impl Drop for WasapiInput {
    fn drop(&mut self) {
        self.close();
    }
}

/// Capture thread body.
///
/// Sequence:
/// 1. CoInitializeEx (MTA)
/// 2. Resolve the capture endpoint (default or by id)
/// 3. Activate IAudioClient and initialize shared mode with PCM auto-conversion
/// 4. Report the negotiated stream back to `open`
/// 5. Register with MMCSS, start, and poll for packets until `running` clears
fn capture_loop(
    running: &AtomicBool,
    staging: &Staging,
    request: CaptureRequest,
    opened_tx: &mpsc::Sender<Result<OpenedStream, WasapiError>>,
) -> Result<(), WasapiError> {
    let _com = ComGuard::init()?;
    let enumerator = DeviceEnumerator::new()?;
    let device = enumerator.capture_device(request.device_id.as_deref())?;

    unsafe {
        let audio_client: IAudioClient = device.Activate(CLSCTX_ALL, None).call("Activate")?;

        let format = WAVEFORMATEX {
            wFormatTag: request.format.format_tag,
            nChannels: request.format.channels,
            nSamplesPerSec: request.format.sample_rate,
            nAvgBytesPerSec: request.format.avg_bytes_per_sec,
            nBlockAlign: request.format.block_align,
            wBitsPerSample: request.format.bits_per_sample,
            cbSize: 0,
        };

        audio_client
            .Initialize(
                AUDCLNT_SHAREMODE_SHARED,
                AUDCLNT_STREAMFLAGS_NOPERSIST
                    | AUDCLNT_STREAMFLAGS_AUTOCONVERTPCM
                    | AUDCLNT_STREAMFLAGS_SRC_DEFAULT_QUALITY,
                request.buffer_duration,
                0,
                &format,
                None,
            )
            .call("IAudioClient::Initialize")?;

        let buffer_frames = audio_client.GetBufferSize().call("GetBufferSize")?;
        let capture_client: IAudioCaptureClient =
            audio_client.GetService().call("GetService")?;

        let mut task_index: u32 = 0;
        if let Err(e) = AvSetMmThreadCharacteristicsW(w!("Pro Audio"), &mut task_index) {
            log::debug!("MMCSS registration failed: {}", e);
        }

        audio_client.Start().call("IAudioClient::Start")?;

        let _ = opened_tx.send(Ok(OpenedStream {
            info: StreamInfo {
                sample_rate: request.format.sample_rate,
                channel_count: request.format.channels,
                buffer_size_frames: buffer_frames as usize,
            },
            device_name: friendly_name(&device),
        }));

        let channels = request.format.channels as usize;
        let block_align = request.format.block_align as usize;
        let mut converted: Vec<i16> = Vec::new();

        while running.load(Ordering::SeqCst) {
            thread::sleep(CAPTURE_POLL_INTERVAL);

            let mut packet_length = capture_client
                .GetNextPacketSize()
                .call("GetNextPacketSize")?;

            while packet_length > 0 {
                let mut buffer_ptr: *mut u8 = std::ptr::null_mut();
                let mut num_frames: u32 = 0;
                let mut flags: u32 = 0;

                capture_client
                    .GetBuffer(&mut buffer_ptr, &mut num_frames, &mut flags, None, None)
                    .call("GetBuffer")?;

                if num_frames > 0 && !buffer_ptr.is_null() {
                    let samples = num_frames as usize * channels;
                    converted.resize(samples, 0);

                    if flags & (AUDCLNT_BUFFERFLAGS_SILENT.0 as u32) != 0 {
                        converted.fill(0);
                    } else {
                        let bytes = std::slice::from_raw_parts(
                            buffer_ptr,
                            num_frames as usize * block_align,
                        );
                        match request.sample_format {
                            SampleFormat::I16 => pcm16_bytes_to_i16(bytes, &mut converted),
                            SampleFormat::F32 => f32_bytes_to_i16(bytes, &mut converted),
                        };
                    }

                    let dropped = staging.push(&converted);
                    if dropped > 0 {
                        log::trace!("staging full, dropped {} samples", dropped);
                    }
                }

                capture_client.ReleaseBuffer(num_frames).call("ReleaseBuffer")?;
                packet_length = capture_client
                    .GetNextPacketSize()
                    .call("GetNextPacketSize")?;
            }
        }

        let _ = audio_client.Stop();
    }

    Ok(())
}
