pub mod drain;
pub mod producer;
pub mod recorder;

/// Tunable timing and sizing constants for recording sessions.
pub mod constants {
    use std::time::Duration;

    /// Producer sleep while the audio source reports it is not ready.
    pub const SOURCE_RETRY_INTERVAL: Duration = Duration::from_millis(10);

    /// Producer sleep after an iteration that stored nothing (source idle or buffer full).
    pub const IDLE_BACKOFF: Duration = Duration::from_millis(1);

    /// Sleep between partial drains while a blocking drain waits for frames.
    pub const DRAIN_POLL_INTERVAL: Duration = Duration::from_millis(2);

    /// Smallest ring buffer a session allocates, in frames.
    pub const MIN_RING_CAPACITY: usize = 16_000;

    /// Smallest slot a slotted session allocates, in frames.
    pub const MIN_SLOT_CAPACITY: usize = 256;

    /// Frames requested per read when neither the device nor the config sets a size.
    pub const DEFAULT_FRAMES_PER_READ: usize = 480;

    /// Upper bound on reads spent discarding stale frames at session start.
    pub const MAX_WARMUP_READS: usize = 64;
}
