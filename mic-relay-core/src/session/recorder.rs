use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use chrono::Utc;
use parking_lot::Mutex;
use uuid::Uuid;

use crate::models::audio_models::{BufferStrategy, InputDevice, RecorderDiagnostics, SessionInfo};
use crate::models::config::{ConfigChange, RecorderConfig};
use crate::models::error::RecorderError;
use crate::models::state::RecorderState;
use crate::processing::byte_order::needs_swap;
use crate::processing::ring_buffer::RegionRingBuffer;
use crate::processing::slotted_buffer::SlottedBuffer;
use crate::session::constants::{
    DEFAULT_FRAMES_PER_READ, MAX_WARMUP_READS, MIN_RING_CAPACITY, MIN_SLOT_CAPACITY,
};
use crate::session::drain;
use crate::session::producer::{spawn_producer, ProducerContext, ProducerStats};
use crate::traits::audio_input::AudioInput;
use crate::traits::frame_store::FrameStore;

/// Everything that exists only while a session is recording.
struct ActiveSession {
    info: SessionInfo,
    store: Arc<dyn FrameStore<i16>>,
    running: Arc<AtomicBool>,
    producer: Option<thread::JoinHandle<()>>,
    stats: Arc<ProducerStats>,
    swap_bytes: bool,
}

impl ActiveSession {
    fn diagnostics(&self) -> RecorderDiagnostics {
        self.stats.snapshot(self.store.overwritten())
    }
}

/// Owns an audio input and at most one recording session.
///
/// ```text
/// [AudioInput] → producer thread → [FrameStore] → drain / drain_bytes (consumer)
/// ```
///
/// Lifecycle methods take `&mut self` and consumer methods take `&self`, so a
/// stop or restart can never overlap an in-flight drain. Share a recorder
/// across threads behind a lock if several callers need it.
pub struct Recorder<I: AudioInput> {
    input: Arc<Mutex<I>>,
    config: RecorderConfig,
    session: Option<ActiveSession>,
    last_diagnostics: RecorderDiagnostics,
}

impl<I: AudioInput> Recorder<I> {
    pub fn new(input: I, config: RecorderConfig) -> Self {
        Self {
            input: Arc::new(Mutex::new(input)),
            config,
            session: None,
            last_diagnostics: RecorderDiagnostics::default(),
        }
    }

    // --- Lifecycle ---

    /// Open the input and start a session. An active session is stopped first.
    ///
    /// On error the recorder is left idle with the input closed.
    pub fn start(&mut self) -> Result<(), RecorderError> {
        if self.session.is_some() {
            log::debug!("restarting active session");
            self.stop();
        }

        self.config
            .validate()
            .map_err(RecorderError::InvalidConfiguration)?;

        let stream = {
            let mut input = self.input.lock();
            match input.open(&self.config) {
                Ok(stream) => stream,
                Err(e) => {
                    input.close();
                    log::error!("failed to open audio input: {}", e);
                    return Err(e);
                }
            }
        };

        let frames_per_read = match (stream.buffer_size_frames, self.config.buffer_size_frames) {
            (0, 0) => DEFAULT_FRAMES_PER_READ,
            (0, requested) => requested,
            (negotiated, requested) => {
                if requested != 0 && negotiated != requested {
                    log::debug!("buffer size changed from {} to {} frames", requested, negotiated);
                }
                negotiated
            }
        };

        if self.config.discard_initial_frames {
            let discarded = self.discard_initial_frames(frames_per_read);
            if discarded > 0 {
                log::debug!("discarded {} stale frames", discarded);
            }
        }

        let store: Arc<dyn FrameStore<i16>> = match self.config.strategy {
            BufferStrategy::Ring => Arc::new(RegionRingBuffer::<i16>::new(
                frames_per_read.max(MIN_RING_CAPACITY),
            )),
            BufferStrategy::Slotted { slots } => Arc::new(SlottedBuffer::<i16>::new(
                slots,
                frames_per_read.max(MIN_SLOT_CAPACITY),
            )),
        };

        let running = Arc::new(AtomicBool::new(true));
        let stats = Arc::new(ProducerStats::default());
        let producer = spawn_producer(ProducerContext {
            store: Arc::clone(&store),
            input: Arc::clone(&self.input),
            running: Arc::clone(&running),
            stats: Arc::clone(&stats),
            frames_per_read,
        });
        let producer = match producer {
            Ok(handle) => handle,
            Err(e) => {
                self.input.lock().close();
                log::error!("{}", e);
                return Err(e);
            }
        };

        let info = SessionInfo {
            id: Uuid::new_v4(),
            started_at: Utc::now(),
            strategy: self.config.strategy,
            capacity: store.capacity(),
            frames_per_read,
            sample_rate: stream.sample_rate,
            channel_count: stream.channel_count,
        };
        log::info!(
            "recording session {} started: {} Hz, {} ch, {:?}, capacity {} frames",
            info.id,
            info.sample_rate,
            info.channel_count,
            info.strategy,
            info.capacity
        );

        self.session = Some(ActiveSession {
            info,
            store,
            running,
            producer: Some(producer),
            stats,
            swap_bytes: needs_swap(self.config.byte_order),
        });
        Ok(())
    }

    /// Adopt `config` and start, restarting any active session.
    pub fn start_with(&mut self, config: RecorderConfig) -> Result<(), RecorderError> {
        self.config = config;
        self.start()
    }

    /// Stop the producer, close the input and release the buffer.
    ///
    /// Does nothing when idle.
    pub fn stop(&mut self) {
        let Some(mut session) = self.session.take() else {
            return;
        };

        session.running.store(false, Ordering::Release);
        if let Some(handle) = session.producer.take() {
            if handle.join().is_err() {
                log::error!("producer thread for session {} panicked", session.info.id);
            }
        }
        self.input.lock().close();

        self.last_diagnostics = session.diagnostics();
        log::info!(
            "recording session {} stopped: {} frames captured, {} dropped",
            session.info.id,
            self.last_diagnostics.frames_captured,
            self.last_diagnostics.frames_dropped
        );
    }

    /// Replace the whole configuration, restarting an active session if it changed.
    pub fn configure(&mut self, config: RecorderConfig) -> Result<(), RecorderError> {
        if config == self.config {
            return Ok(());
        }
        self.config = config;
        self.restart_if_active()
    }

    /// Change one stream parameter. Unchanged values are a no-op; a change on
    /// an active session runs a full stop and start.
    pub fn reconfigure(&mut self, change: ConfigChange) -> Result<(), RecorderError> {
        let description = format!("{:?}", change);
        if !change.apply(&mut self.config) {
            return Ok(());
        }
        log::debug!("reconfigured: {}", description);
        self.restart_if_active()
    }

    fn restart_if_active(&mut self) -> Result<(), RecorderError> {
        if self.session.is_none() {
            return Ok(());
        }
        self.start()
    }

    /// Read and drop whatever the device buffered before the session began.
    fn discard_initial_frames(&self, frames_per_read: usize) -> usize {
        let mut scratch = vec![0i16; frames_per_read.max(1)];
        let mut input = self.input.lock();
        let mut discarded = 0;
        for _ in 0..MAX_WARMUP_READS {
            match input.read(&mut scratch) {
                Ok(0) | Err(_) => break,
                Ok(n) => discarded += n,
            }
        }
        discarded
    }

    // --- Consumer ---

    /// Copy up to `dest.len()` buffered frames without waiting. Returns 0 when idle.
    pub fn drain(&self, dest: &mut [i16]) -> usize {
        match &self.session {
            Some(session) => drain::drain_available(&*session.store, dest),
            None => 0,
        }
    }

    /// Fill `dest` completely, waiting for the producer as needed.
    ///
    /// Returns the frames delivered, which is `dest.len()` unless the producer
    /// thread died mid-session.
    pub fn drain_blocking(&self, dest: &mut [i16]) -> Result<usize, RecorderError> {
        let session = self.session.as_ref().ok_or(RecorderError::NotRecording)?;
        Ok(drain::drain_exact(&*session.store, dest, &session.running, None))
    }

    /// Like [`drain_blocking`](Self::drain_blocking) but gives up after `timeout`.
    ///
    /// Frames delivered before the timeout stay in `dest`; the error reports how many.
    pub fn drain_blocking_for(&self, dest: &mut [i16], timeout: Duration) -> Result<(), RecorderError> {
        let session = self.session.as_ref().ok_or(RecorderError::NotRecording)?;
        let deadline = Instant::now() + timeout;
        let drained = drain::drain_exact(&*session.store, dest, &session.running, Some(deadline));
        if drained < dest.len() {
            return Err(RecorderError::Timeout {
                drained,
                requested: dest.len(),
            });
        }
        Ok(())
    }

    /// Serialize buffered frames into `dest` in the configured byte order
    /// without waiting. Returns bytes written, always even.
    pub fn drain_bytes(&self, dest: &mut [u8]) -> usize {
        match &self.session {
            Some(session) => drain::drain_bytes_available(&*session.store, dest, session.swap_bytes),
            None => 0,
        }
    }

    /// Byte form of [`drain_blocking`](Self::drain_blocking). Fills
    /// `dest.len() / 2` frames; returns bytes written.
    pub fn drain_bytes_blocking(&self, dest: &mut [u8]) -> Result<usize, RecorderError> {
        let session = self.session.as_ref().ok_or(RecorderError::NotRecording)?;
        Ok(drain::drain_bytes_exact(
            &*session.store,
            dest,
            session.swap_bytes,
            &session.running,
            None,
        ))
    }

    /// Discard everything currently buffered.
    pub fn clear_buffer(&self) {
        if let Some(session) = &self.session {
            session.store.clear();
        }
    }

    // --- Introspection ---

    pub fn is_empty(&self) -> bool {
        self.session.as_ref().map_or(true, |s| s.store.is_empty())
    }

    pub fn len(&self) -> usize {
        self.session.as_ref().map_or(0, |s| s.store.len())
    }

    pub fn capacity(&self) -> usize {
        self.session.as_ref().map_or(0, |s| s.store.capacity())
    }

    pub fn has_active_session(&self) -> bool {
        self.session.is_some()
    }

    pub fn state(&self) -> RecorderState {
        match &self.session {
            Some(session) => RecorderState::Recording(session.info.clone()),
            None => RecorderState::Idle,
        }
    }

    pub fn config(&self) -> &RecorderConfig {
        &self.config
    }

    pub fn session_info(&self) -> Option<&SessionInfo> {
        self.session.as_ref().map(|s| &s.info)
    }

    /// Statistics of the active session, or of the last one once stopped.
    pub fn diagnostics(&self) -> RecorderDiagnostics {
        match &self.session {
            Some(session) => session.diagnostics(),
            None => self.last_diagnostics.clone(),
        }
    }

    pub fn device_info(&self) -> InputDevice {
        self.input.lock().device_info()
    }
}

impl<I: AudioInput> Drop for Recorder<I> {
    fn drop(&mut self) {
        self.stop();
    }
}
