//! Consumer-side drains over any [`FrameStore`].
//!
//! Non-blocking drains take whatever is buffered right now. Exact drains keep
//! polling until the destination is full, a deadline passes, or the producer
//! has stopped and nothing is left to read.

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Instant;

use crate::processing::byte_order::{write_samples, SAMPLE_BYTES};
use crate::session::constants::DRAIN_POLL_INTERVAL;
use crate::traits::frame_store::FrameStore;

/// Copy up to `dest.len()` buffered frames into `dest`. Returns frames copied.
pub fn drain_available(store: &dyn FrameStore<i16>, dest: &mut [i16]) -> usize {
    let wanted = dest.len();
    drain_runs(store, 0, wanted, &mut |frames, at| {
        dest[at..at + frames.len()].copy_from_slice(frames);
        frames.len()
    })
}

/// Fill `dest` completely, waiting for the producer as needed.
///
/// Returns early with fewer frames only if `deadline` passes or the producer
/// stopped with the store empty.
pub fn drain_exact(
    store: &dyn FrameStore<i16>,
    dest: &mut [i16],
    running: &AtomicBool,
    deadline: Option<Instant>,
) -> usize {
    let wanted = dest.len();
    drain_until(store, wanted, running, deadline, &mut |frames, at| {
        dest[at..at + frames.len()].copy_from_slice(frames);
        frames.len()
    })
}

/// Serialize up to `dest.len() / 2` buffered frames into `dest`, swapping
/// each sample's bytes when `swap` is set. Returns bytes written.
///
/// A trailing odd byte in `dest` is left untouched.
pub fn drain_bytes_available(store: &dyn FrameStore<i16>, dest: &mut [u8], swap: bool) -> usize {
    let wanted = dest.len() / SAMPLE_BYTES;
    let frames = drain_runs(store, 0, wanted, &mut |frames, at| {
        write_samples(frames, &mut dest[at * SAMPLE_BYTES..], swap)
    });
    frames * SAMPLE_BYTES
}

/// Byte form of [`drain_exact`]. Returns bytes written.
pub fn drain_bytes_exact(
    store: &dyn FrameStore<i16>,
    dest: &mut [u8],
    swap: bool,
    running: &AtomicBool,
    deadline: Option<Instant>,
) -> usize {
    let wanted = dest.len() / SAMPLE_BYTES;
    let frames = drain_until(store, wanted, running, deadline, &mut |frames, at| {
        write_samples(frames, &mut dest[at * SAMPLE_BYTES..], swap)
    });
    frames * SAMPLE_BYTES
}

/// Pull contiguous runs until `wanted` frames arrived or the store runs dry.
///
/// `sink` receives each run and the destination offset (in frames) it starts at.
fn drain_runs(
    store: &dyn FrameStore<i16>,
    offset: usize,
    wanted: usize,
    sink: &mut dyn FnMut(&[i16], usize) -> usize,
) -> usize {
    let mut copied = 0;
    while copied < wanted {
        let at = offset + copied;
        let n = store.consume_with(wanted - copied, &mut |frames| sink(frames, at));
        if n == 0 {
            break;
        }
        copied += n;
    }
    copied
}

fn drain_until(
    store: &dyn FrameStore<i16>,
    wanted: usize,
    running: &AtomicBool,
    deadline: Option<Instant>,
    sink: &mut dyn FnMut(&[i16], usize) -> usize,
) -> usize {
    let mut filled = 0;
    loop {
        filled += drain_runs(store, filled, wanted - filled, sink);
        if filled == wanted {
            break;
        }
        if deadline.is_some_and(|d| Instant::now() >= d) {
            break;
        }
        if !running.load(Ordering::Acquire) && store.is_empty() {
            log::debug!("producer gone, blocking drain ends at {}/{} frames", filled, wanted);
            break;
        }
        thread::sleep(DRAIN_POLL_INTERVAL);
    }
    filled
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::audio_models::ByteOrder;
    use crate::processing::byte_order::read_samples;
    use crate::processing::ring_buffer::RegionRingBuffer;
    use crate::processing::slotted_buffer::SlottedBuffer;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn available_drain_crosses_the_wrap_point() {
        let ring = RegionRingBuffer::<i16>::new(8);
        ring.write_from(&[0; 6]);
        let mut sink = [0i16; 6];
        ring.read_into(&mut sink);
        ring.write_from(&[1, 2, 3, 4, 5]);

        let mut out = [0i16; 8];
        assert_eq!(drain_available(&ring, &mut out), 5);
        assert_eq!(&out[..5], &[1, 2, 3, 4, 5]);
    }

    #[test]
    fn available_drain_on_empty_store_returns_zero() {
        let ring = RegionRingBuffer::<i16>::new(8);
        let mut out = [0i16; 4];
        assert_eq!(drain_available(&ring, &mut out), 0);
        assert_eq!(drain_bytes_available(&ring, &mut [0u8; 8], false), 0);
    }

    #[test]
    fn available_drain_spans_several_slots() {
        let slots = SlottedBuffer::<i16>::new(4, 2);
        for chunk in [[1, 2], [3, 4], [5, 6]] {
            slots.produce_with(2, &mut |spare| {
                spare[..2].copy_from_slice(&chunk);
                2
            });
        }
        let mut out = [0i16; 6];
        assert_eq!(drain_available(&slots, &mut out), 6);
        assert_eq!(out, [1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn byte_drain_honors_target_order() {
        let ring = RegionRingBuffer::<i16>::new(8);
        ring.write_from(&[0x1234, 0x5678]);

        let target = ByteOrder::native().opposite();
        let mut out = [0u8; 5];
        let written = drain_bytes_available(&ring, &mut out, true);
        assert_eq!(written, 4);
        assert_eq!(out[4], 0);
        assert_eq!(read_samples(&out[..written], target), vec![0x1234, 0x5678]);
    }

    #[test]
    fn exact_drain_waits_for_a_concurrent_producer() {
        let ring = Arc::new(RegionRingBuffer::<i16>::new(32));
        let running = Arc::new(AtomicBool::new(true));

        let writer = {
            let ring = Arc::clone(&ring);
            thread::spawn(move || {
                for v in 0..100i16 {
                    while ring.write_from(&[v]) == 0 {
                        thread::yield_now();
                    }
                    if v % 10 == 0 {
                        thread::sleep(Duration::from_millis(1));
                    }
                }
            })
        };

        let mut out = vec![0i16; 100];
        let deadline = Instant::now() + Duration::from_secs(5);
        assert_eq!(drain_exact(&*ring, &mut out, &running, Some(deadline)), 100);
        writer.join().unwrap();
        assert_eq!(out, (0..100).collect::<Vec<i16>>());
    }

    #[test]
    fn exact_drain_stops_at_deadline() {
        let ring = RegionRingBuffer::<i16>::new(8);
        ring.write_from(&[7, 8]);
        let running = AtomicBool::new(true);

        let mut out = [0i16; 4];
        let deadline = Instant::now() + Duration::from_millis(20);
        assert_eq!(drain_exact(&ring, &mut out, &running, Some(deadline)), 2);
        assert_eq!(&out[..2], &[7, 8]);
    }

    #[test]
    fn exact_drain_returns_when_producer_is_gone() {
        let ring = RegionRingBuffer::<i16>::new(8);
        ring.write_from(&[1, 2, 3]);
        let running = AtomicBool::new(false);

        let mut bytes = [0u8; 16];
        assert_eq!(drain_bytes_exact(&ring, &mut bytes, false, &running, None), 6);
    }
}
