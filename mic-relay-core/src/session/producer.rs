//! The producer loop: pulls frames from the audio input into the session's store.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use parking_lot::Mutex;

use crate::models::audio_models::RecorderDiagnostics;
use crate::models::error::RecorderError;
use crate::session::constants::{IDLE_BACKOFF, SOURCE_RETRY_INTERVAL};
use crate::traits::audio_input::AudioInput;
use crate::traits::frame_store::FrameStore;

/// Counters updated by the producer thread.
#[derive(Debug, Default)]
pub struct ProducerStats {
    frames_captured: AtomicU64,
    frames_dropped: AtomicU64,
    source_errors: AtomicU64,
    source_waits: AtomicU64,
    iterations: AtomicU64,
}

impl ProducerStats {
    /// Snapshot the counters. `overwritten` adds frames the store itself discarded.
    pub fn snapshot(&self, overwritten: u64) -> RecorderDiagnostics {
        RecorderDiagnostics {
            frames_captured: self.frames_captured.load(Ordering::Relaxed),
            frames_dropped: self.frames_dropped.load(Ordering::Relaxed) + overwritten,
            source_errors: self.source_errors.load(Ordering::Relaxed),
            source_waits: self.source_waits.load(Ordering::Relaxed),
            iterations: self.iterations.load(Ordering::Relaxed),
        }
    }
}

/// Everything the producer thread needs for one session.
pub struct ProducerContext<I> {
    pub store: Arc<dyn FrameStore<i16>>,
    pub input: Arc<Mutex<I>>,
    pub running: Arc<AtomicBool>,
    pub stats: Arc<ProducerStats>,
    pub frames_per_read: usize,
}

/// Clears the running flag when the producer thread exits, panics included,
/// so blocking drains see the producer is gone.
struct ClearOnExit(Arc<AtomicBool>);

impl Drop for ClearOnExit {
    fn drop(&mut self) {
        if thread::panicking() {
            log::error!("producer thread panicked");
        }
        self.0.store(false, Ordering::Release);
    }
}

/// Spawn the named producer thread. It runs until `running` is cleared.
pub fn spawn_producer<I: AudioInput>(
    ctx: ProducerContext<I>,
) -> Result<JoinHandle<()>, RecorderError> {
    thread::Builder::new()
        .name("mic-relay-producer".into())
        .spawn(move || {
            let _exit = ClearOnExit(Arc::clone(&ctx.running));
            run_producer(&ctx);
        })
        .map_err(|e| RecorderError::ThreadSpawn(e.to_string()))
}

/// The producer loop body, run on the calling thread.
pub fn run_producer<I: AudioInput>(ctx: &ProducerContext<I>) {
    let frames_per_read = ctx.frames_per_read.max(1);
    let mut scratch = vec![0i16; frames_per_read];
    log::debug!("producer started, {} frames per read", frames_per_read);

    while ctx.running.load(Ordering::Acquire) {
        ctx.stats.iterations.fetch_add(1, Ordering::Relaxed);

        let mut input = ctx.input.lock();
        if !input.is_ready() {
            drop(input);
            ctx.stats.source_waits.fetch_add(1, Ordering::Relaxed);
            thread::sleep(SOURCE_RETRY_INTERVAL);
            continue;
        }

        let stored = ctx.store.produce_with(frames_per_read, &mut |frames| {
            if frames.is_empty() {
                // Store is full: keep the device draining and lose the newest frames.
                let dropped = read_frames(&mut *input, &mut scratch, &ctx.stats);
                ctx.stats
                    .frames_dropped
                    .fetch_add(dropped as u64, Ordering::Relaxed);
                return 0;
            }
            read_frames(&mut *input, frames, &ctx.stats)
        });
        drop(input);

        if stored == 0 {
            thread::sleep(IDLE_BACKOFF);
        } else {
            ctx.stats
                .frames_captured
                .fetch_add(stored as u64, Ordering::Relaxed);
        }
    }

    log::debug!("producer stopped");
}

/// Read into `frames`, treating a failed read as zero frames.
fn read_frames<I: AudioInput>(input: &mut I, frames: &mut [i16], stats: &ProducerStats) -> usize {
    match input.read(frames) {
        Ok(n) => n.min(frames.len()),
        Err(e) => {
            stats.source_errors.fetch_add(1, Ordering::Relaxed);
            log::trace!("input read failed: {}", e);
            0
        }
    }
}
