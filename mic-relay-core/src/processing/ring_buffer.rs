//! Region-based circular frame buffer.
//!
//! Callers read and write straight into the backing storage through
//! short-lived regions instead of copying through an intermediate buffer.
//! A region holds the buffer's lock from open until close, so at most one
//! region (read or write) exists at any instant.
//!
//! ```text
//!            read_cursor            write_cursor
//!                 │                      │
//!  [ . . . . . . .|x x x x x x x x x x x |. . . . ]
//!                 └──────── size ────────┘
//! ```
//!
//! A region never crosses the end of the storage: a logical read or write
//! that wraps takes two open/close cycles (see [`RegionRingBuffer::read_into`]).

use parking_lot::{Mutex, MutexGuard};

use crate::traits::frame_store::FrameStore;

struct RingState<T> {
    storage: Box<[T]>,
    size: usize,
    read_cursor: usize,
    write_cursor: usize,
}

impl<T> RingState<T> {
    fn capacity(&self) -> usize {
        self.storage.len()
    }
}

/// Fixed-capacity circular buffer with region access.
///
/// Overflow behavior: a full buffer grants zero-length write regions, so the
/// newest frames are the ones lost. Nothing already buffered is overwritten.
pub struct RegionRingBuffer<T = i16> {
    state: Mutex<RingState<T>>,
    capacity: usize,
}

impl<T: Copy + Default> RegionRingBuffer<T> {
    /// Create a buffer holding `capacity` frames (at least one).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            state: Mutex::new(RingState {
                storage: vec![T::default(); capacity].into_boxed_slice(),
                size: 0,
                read_cursor: 0,
                write_cursor: 0,
            }),
            capacity,
        }
    }

    /// Lock the buffer and expose up to `requested` buffered frames.
    ///
    /// The granted length is `min(requested, size, capacity - read_cursor)`.
    pub fn open_read_region(&self, requested: usize) -> ReadRegion<'_, T> {
        let guard = self.state.lock();
        let len = requested
            .min(guard.size)
            .min(guard.capacity() - guard.read_cursor);
        ReadRegion {
            guard,
            len,
            closed: false,
        }
    }

    /// Lock the buffer and expose up to `requested` free frames for writing.
    ///
    /// The granted length is `min(requested, capacity - size, capacity - write_cursor)`;
    /// a full buffer grants an empty region.
    pub fn open_write_region(&self, requested: usize) -> WriteRegion<'_, T> {
        let guard = self.state.lock();
        let len = requested
            .min(guard.capacity() - guard.size)
            .min(guard.capacity() - guard.write_cursor);
        WriteRegion {
            guard,
            len,
            closed: false,
        }
    }

    /// Copy up to `dest.len()` frames out of the buffer, crossing the wrap point if needed.
    pub fn read_into(&self, dest: &mut [T]) -> usize {
        let mut copied = 0;
        // At most one wrap per logical read.
        for _ in 0..2 {
            if copied == dest.len() {
                break;
            }
            let region = self.open_read_region(dest.len() - copied);
            let n = region.len();
            if n == 0 {
                break;
            }
            dest[copied..copied + n].copy_from_slice(region.frames());
            region.close(n);
            copied += n;
        }
        copied
    }

    /// Copy as much of `src` into the buffer as fits, crossing the wrap point if needed.
    pub fn write_from(&self, src: &[T]) -> usize {
        let mut written = 0;
        for _ in 0..2 {
            if written == src.len() {
                break;
            }
            let mut region = self.open_write_region(src.len() - written);
            let n = region.len();
            if n == 0 {
                break;
            }
            region
                .frames_mut()
                .copy_from_slice(&src[written..written + n]);
            region.close(n);
            written += n;
        }
        written
    }
}

impl<T> RegionRingBuffer<T> {
    /// Reset both cursors and the size to zero.
    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.read_cursor = 0;
        state.write_cursor = 0;
        state.size = 0;
        log::debug!("ring buffer cleared");
    }

    /// Number of frames currently buffered.
    pub fn len(&self) -> usize {
        self.state.lock().size
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().size == 0
    }

    /// Fixed frame capacity. Immutable after construction, so no lock is taken.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn free_space(&self) -> usize {
        self.capacity - self.state.lock().size
    }
}

/// Clamp a close count to what the paired open granted.
///
/// Reporting more than was granted is a caller bug; clamping keeps the
/// cursor and the size in step with each other.
fn clamp_to_granted(reported: usize, granted: usize, kind: &str) -> usize {
    if reported > granted {
        log::warn!(
            "{} region closed with {} frames but only {} were granted; clamping",
            kind,
            reported,
            granted
        );
        return granted;
    }
    reported
}

/// Exclusive view of buffered frames, valid until closed or dropped.
///
/// Dropping an unclosed region closes it with zero frames consumed.
pub struct ReadRegion<'a, T> {
    guard: MutexGuard<'a, RingState<T>>,
    len: usize,
    closed: bool,
}

impl<T> ReadRegion<'_, T> {
    pub fn frames(&self) -> &[T] {
        let start = self.guard.read_cursor;
        &self.guard.storage[start..start + self.len]
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Release the region, marking `consumed` frames as read.
    ///
    /// Returns the number of frames actually removed from the buffer.
    pub fn close(mut self, consumed: usize) -> usize {
        self.finish(consumed)
    }

    fn finish(&mut self, consumed: usize) -> usize {
        self.closed = true;
        let consumed = clamp_to_granted(consumed, self.len, "read");
        let state = &mut *self.guard;
        state.read_cursor = (state.read_cursor + consumed) % state.capacity();
        state.size -= consumed.min(state.size);
        if consumed > 0 {
            log::trace!("ring buffer: read {} frames", consumed);
        }
        consumed
    }
}

impl<T> Drop for ReadRegion<'_, T> {
    fn drop(&mut self) {
        if !self.closed {
            self.finish(0);
        }
    }
}

/// Exclusive view of free storage, valid until closed or dropped.
///
/// Dropping an unclosed region closes it with zero frames produced.
pub struct WriteRegion<'a, T> {
    guard: MutexGuard<'a, RingState<T>>,
    len: usize,
    closed: bool,
}

impl<T> WriteRegion<'_, T> {
    pub fn frames_mut(&mut self) -> &mut [T] {
        let start = self.guard.write_cursor;
        &mut self.guard.storage[start..start + self.len]
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Release the region, publishing `produced` frames to readers.
    ///
    /// Returns the number of frames actually added to the buffer.
    pub fn close(mut self, produced: usize) -> usize {
        self.finish(produced)
    }

    fn finish(&mut self, produced: usize) -> usize {
        self.closed = true;
        let produced = clamp_to_granted(produced, self.len, "write");
        let state = &mut *self.guard;
        let capacity = state.capacity();
        state.write_cursor = (state.write_cursor + produced) % capacity;
        state.size = (state.size + produced).min(capacity);
        if produced > 0 {
            log::trace!("ring buffer: wrote {} frames", produced);
        }
        produced
    }
}

impl<T> Drop for WriteRegion<'_, T> {
    fn drop(&mut self) {
        if !self.closed {
            self.finish(0);
        }
    }
}

impl<T: Copy + Default + Send> FrameStore<T> for RegionRingBuffer<T> {
    fn produce_with(&self, max_frames: usize, fill: &mut dyn FnMut(&mut [T]) -> usize) -> usize {
        let mut region = self.open_write_region(max_frames);
        let produced = fill(region.frames_mut());
        region.close(produced)
    }

    fn consume_with(&self, max_frames: usize, drain: &mut dyn FnMut(&[T]) -> usize) -> usize {
        let region = self.open_read_region(max_frames);
        let consumed = drain(region.frames());
        region.close(consumed)
    }

    fn len(&self) -> usize {
        RegionRingBuffer::len(self)
    }

    fn capacity(&self) -> usize {
        RegionRingBuffer::capacity(self)
    }

    fn clear(&self) {
        RegionRingBuffer::clear(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Arc;
    use std::thread;

    use proptest::prelude::*;

    fn seq(start: i16, count: usize) -> Vec<i16> {
        (0..count as i16).map(|i| start + i).collect()
    }

    #[test]
    fn basic_write_read() {
        let buf = RegionRingBuffer::<i16>::new(10);
        assert_eq!(buf.write_from(&[1, 2, 3]), 3);
        assert_eq!(buf.len(), 3);

        let mut out = [0i16; 3];
        assert_eq!(buf.read_into(&mut out), 3);
        assert_eq!(out, [1, 2, 3]);
        assert!(buf.is_empty());
    }

    #[test]
    fn read_region_is_capped_by_size() {
        let buf = RegionRingBuffer::<i16>::new(10);
        buf.write_from(&[7, 8]);

        let region = buf.open_read_region(5);
        assert_eq!(region.len(), 2);
        assert_eq!(region.frames(), &[7, 8]);
        assert_eq!(region.close(1), 1);

        assert_eq!(buf.len(), 1);
    }

    #[test]
    fn wrap_takes_two_write_regions_and_preserves_order() {
        const C: usize = 8;
        let buf = RegionRingBuffer::<i16>::new(C);

        assert_eq!(buf.write_from(&seq(0, C - 1)), C - 1);
        let mut drained = vec![0i16; C - 2];
        assert_eq!(buf.read_into(&mut drained), C - 2);
        assert_eq!(drained, seq(0, C - 2));

        // One short region up to the array end...
        let mut first = buf.open_write_region(5);
        assert_eq!(first.len(), 1);
        first.frames_mut().copy_from_slice(&[100]);
        first.close(1);

        // ...and one continuing from index 0.
        let mut second = buf.open_write_region(4);
        assert_eq!(second.len(), 4);
        second.frames_mut().copy_from_slice(&[101, 102, 103, 104]);
        second.close(4);

        assert_eq!(buf.len(), 6);
        let mut rest = vec![0i16; 6];
        assert_eq!(buf.read_into(&mut rest), 6);
        assert_eq!(rest, vec![(C - 2) as i16, 100, 101, 102, 103, 104]);
    }

    #[test]
    fn full_buffer_grants_empty_write_region() {
        let buf = RegionRingBuffer::<i16>::new(4);
        assert_eq!(buf.write_from(&[1, 2, 3, 4, 5]), 4);

        let mut region = buf.open_write_region(16);
        assert!(region.is_empty());
        assert!(region.frames_mut().is_empty());
        assert_eq!(region.close(0), 0);

        // Nothing buffered was overwritten.
        let mut out = [0i16; 4];
        buf.read_into(&mut out);
        assert_eq!(out, [1, 2, 3, 4]);
    }

    #[test]
    fn over_close_is_clamped_to_granted_length() {
        let buf = RegionRingBuffer::<i16>::new(8);
        buf.write_from(&[1, 2, 3]);

        let region = buf.open_read_region(2);
        assert_eq!(region.close(50), 2);
        assert_eq!(buf.len(), 1);

        let mut region = buf.open_write_region(2);
        region.frames_mut().copy_from_slice(&[4, 5]);
        assert_eq!(region.close(9), 2);
        assert_eq!(buf.len(), 3);

        let mut out = [0i16; 3];
        assert_eq!(buf.read_into(&mut out), 3);
        assert_eq!(out, [3, 4, 5]);
    }

    #[test]
    fn dropped_region_releases_lock_without_consuming() {
        let buf = RegionRingBuffer::<i16>::new(8);
        buf.write_from(&[1, 2]);
        {
            let region = buf.open_read_region(2);
            assert_eq!(region.len(), 2);
        }
        // Lock released and nothing consumed.
        assert_eq!(buf.len(), 2);
        {
            let mut region = buf.open_write_region(2);
            region.frames_mut()[0] = 9;
        }
        assert_eq!(buf.len(), 2);
    }

    #[test]
    fn clear_resets_cursors() {
        let buf = RegionRingBuffer::<i16>::new(4);
        buf.write_from(&[1, 2, 3]);
        buf.read_into(&mut [0i16; 2]);
        buf.clear();

        assert!(buf.is_empty());
        assert_eq!(buf.free_space(), 4);
        // Cursors are back at zero, so a full-capacity region is available.
        assert_eq!(buf.open_write_region(4).len(), 4);
    }

    #[test]
    fn zero_capacity_is_raised_to_one() {
        let buf = RegionRingBuffer::<i16>::new(0);
        assert_eq!(buf.capacity(), 1);
        assert_eq!(buf.write_from(&[1, 2]), 1);
    }

    #[test]
    fn frame_store_produce_and_consume() {
        let buf = RegionRingBuffer::<i16>::new(4);
        let store: &dyn FrameStore<i16> = &buf;

        let produced = store.produce_with(3, &mut |frames| {
            frames.copy_from_slice(&[5, 6, 7]);
            frames.len()
        });
        assert_eq!(produced, 3);
        assert_eq!(store.len(), 3);

        let mut seen = Vec::new();
        let consumed = store.consume_with(8, &mut |frames| {
            seen.extend_from_slice(frames);
            frames.len()
        });
        assert_eq!(consumed, 3);
        assert_eq!(seen, vec![5, 6, 7]);
        assert!(store.is_empty());
    }

    #[test]
    fn concurrent_producer_and_consumer_keep_order() {
        const TOTAL: usize = 20_000;
        let buf = Arc::new(RegionRingBuffer::<u32>::new(64));

        let producer = {
            let buf = Arc::clone(&buf);
            thread::spawn(move || {
                let mut next = 0u32;
                while (next as usize) < TOTAL {
                    let mut region = buf.open_write_region(16);
                    let n = region.len().min(TOTAL - next as usize);
                    for slot in &mut region.frames_mut()[..n] {
                        *slot = next;
                        next += 1;
                    }
                    region.close(n);
                    if n == 0 {
                        thread::yield_now();
                    }
                }
            })
        };

        let mut received = Vec::with_capacity(TOTAL);
        let mut chunk = [0u32; 24];
        while received.len() < TOTAL {
            let n = buf.read_into(&mut chunk);
            received.extend_from_slice(&chunk[..n]);
            if n == 0 {
                thread::yield_now();
            }
        }
        producer.join().unwrap();

        assert!(received.iter().enumerate().all(|(i, &v)| v == i as u32));
    }

    #[derive(Debug, Clone)]
    enum Op {
        Write(usize),
        Read(usize),
        RawWrite { requested: usize, produced: usize },
        RawRead { requested: usize, consumed: usize },
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0usize..24).prop_map(Op::Write),
            (0usize..24).prop_map(Op::Read),
            (0usize..24, 0usize..24)
                .prop_map(|(requested, produced)| Op::RawWrite { requested, produced }),
            (0usize..24, 0usize..24)
                .prop_map(|(requested, consumed)| Op::RawRead { requested, consumed }),
        ]
    }

    proptest! {
        #[test]
        fn interleaved_regions_match_fifo_model(
            capacity in 1usize..32,
            ops in proptest::collection::vec(op(), 0..64),
        ) {
            let buf = RegionRingBuffer::<u32>::new(capacity);
            let mut model: VecDeque<u32> = VecDeque::new();
            let mut next = 0u32;

            for op in ops {
                match op {
                    Op::Write(n) => {
                        let src: Vec<u32> = (next..next + n as u32).collect();
                        let written = buf.write_from(&src);
                        prop_assert_eq!(written, n.min(capacity - model.len()));
                        model.extend(&src[..written]);
                        next += written as u32;
                    }
                    Op::Read(n) => {
                        let mut dest = vec![0u32; n];
                        let read = buf.read_into(&mut dest);
                        prop_assert_eq!(read, n.min(model.len()));
                        let expected: Vec<u32> = model.drain(..read).collect();
                        prop_assert_eq!(&dest[..read], &expected[..]);
                    }
                    Op::RawWrite { requested, produced } => {
                        let mut region = buf.open_write_region(requested);
                        let produced = produced.min(region.len());
                        for (i, slot) in region.frames_mut()[..produced].iter_mut().enumerate() {
                            *slot = next + i as u32;
                        }
                        prop_assert_eq!(region.close(produced), produced);
                        model.extend(next..next + produced as u32);
                        next += produced as u32;
                    }
                    Op::RawRead { requested, consumed } => {
                        let region = buf.open_read_region(requested);
                        let consumed = consumed.min(region.len());
                        let expected: Vec<u32> = model.iter().take(consumed).copied().collect();
                        prop_assert_eq!(&region.frames()[..consumed], &expected[..]);
                        region.close(consumed);
                        model.drain(..consumed);
                    }
                }
                prop_assert_eq!(buf.len(), model.len());
                prop_assert!(buf.len() <= capacity);
            }
        }
    }
}
