//! Fixed set of rotating frame slots (triple buffering for three slots).
//!
//! The producer fills the slot at the write index and the consumer drains
//! the slot at the read index. The two indices never coincide:
//!
//! - when the writer advances onto the reader's slot, the reader is pushed
//!   one slot further and the oldest unread slot is overwritten;
//! - when the reader catches up with the writer, it stays parked on the slot
//!   it just drained until the writer completes another slot.
//!
//! Slot storage is guarded per slot. Because the indices differ, the
//! producer and consumer lock different slots and never contend in steady
//! state. Counts and indices live behind a separate cursor lock that is only
//! held for bookkeeping. Lock order is always slot storage, then cursors.

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::{Mutex, MutexGuard};

use crate::models::audio_models::BufferStrategy;
use crate::traits::frame_store::FrameStore;

struct Cursors {
    write: usize,
    read: usize,
    valid: Vec<usize>,
    consumed: Vec<usize>,
    /// Bumped by `clear()` so guards opened before it commit nothing.
    generation: u64,
}

impl Cursors {
    fn new(slot_count: usize) -> Self {
        Self {
            write: 1,
            read: 0,
            valid: vec![0; slot_count],
            consumed: vec![0; slot_count],
            generation: 0,
        }
    }

    fn slot_count(&self) -> usize {
        self.valid.len()
    }

    fn unread(&self, index: usize) -> usize {
        self.valid[index] - self.consumed[index]
    }
}

/// N ≥ 3 fixed-capacity slots with rotating read and write indices.
pub struct SlottedBuffer<T = i16> {
    slots: Box<[Mutex<Box<[T]>>]>,
    slot_capacity: usize,
    cursors: Mutex<Cursors>,
    overwritten: AtomicU64,
}

impl<T: Copy + Default> SlottedBuffer<T> {
    /// Allocate `slot_count` slots (at least 3) of `slot_capacity` frames (at least 1).
    pub fn new(slot_count: usize, slot_capacity: usize) -> Self {
        let slot_count = slot_count.max(BufferStrategy::MIN_SLOTS);
        let slot_capacity = slot_capacity.max(1);
        let slots = (0..slot_count)
            .map(|_| Mutex::new(vec![T::default(); slot_capacity].into_boxed_slice()))
            .collect();
        Self {
            slots,
            slot_capacity,
            cursors: Mutex::new(Cursors::new(slot_count)),
            overwritten: AtomicU64::new(0),
        }
    }
}

impl<T> SlottedBuffer<T> {
    /// Lock the slot at the write index for appending.
    pub fn write_slot(&self) -> SlotWriter<'_, T> {
        loop {
            let index = self.cursors.lock().write;
            let storage = self.slots[index].lock();
            let cursors = self.cursors.lock();
            if cursors.write != index {
                continue;
            }
            return SlotWriter {
                cursors: &self.cursors,
                index,
                offset: cursors.valid[index],
                generation: cursors.generation,
                storage,
            };
        }
    }

    /// Lock the slot at the read index for draining.
    pub fn read_slot(&self) -> SlotReader<'_, T> {
        loop {
            let index = self.cursors.lock().read;
            let storage = self.slots[index].lock();
            let cursors = self.cursors.lock();
            // The writer may have pushed the reader on while we waited for the slot.
            if cursors.read != index {
                continue;
            }
            return SlotReader {
                cursors: &self.cursors,
                index,
                start: cursors.consumed[index],
                end: cursors.valid[index],
                generation: cursors.generation,
                storage,
            };
        }
    }

    /// Move the write index to the next slot and empty it.
    ///
    /// If that slot is the reader's, the reader skips ahead one more slot and
    /// the frames it had not read yet are lost. Returns how many were lost.
    pub fn advance_write(&self) -> usize {
        let mut cursors = self.cursors.lock();
        let next = (cursors.write + 1) % cursors.slot_count();
        cursors.write = next;

        let mut lost = 0;
        if next == cursors.read {
            lost = cursors.unread(next);
            cursors.read = (next + 1) % cursors.slot_count();
        }
        cursors.valid[next] = 0;
        cursors.consumed[next] = 0;
        drop(cursors);

        if lost > 0 {
            self.overwritten.fetch_add(lost as u64, Ordering::Relaxed);
            log::debug!("slotted buffer: overwrote {} unread frames", lost);
        }
        lost
    }

    /// Empty the current read slot and move to the next one.
    ///
    /// Returns false, leaving the reader parked, when the next slot is the
    /// one being written.
    pub fn advance_read(&self) -> bool {
        let mut cursors = self.cursors.lock();
        let vacated = cursors.read;
        let next = (vacated + 1) % cursors.slot_count();
        if next == cursors.write {
            return false;
        }
        cursors.valid[vacated] = 0;
        cursors.consumed[vacated] = 0;
        cursors.read = next;
        true
    }

    /// Zero every slot's count and return both indices to their starting slots.
    pub fn clear(&self) {
        let mut cursors = self.cursors.lock();
        let generation = cursors.generation.wrapping_add(1);
        let slot_count = cursors.slot_count();
        *cursors = Cursors::new(slot_count);
        cursors.generation = generation;
        log::debug!("slotted buffer cleared");
    }

    pub fn read_index(&self) -> usize {
        self.cursors.lock().read
    }

    pub fn write_index(&self) -> usize {
        self.cursors.lock().write
    }

    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    pub fn slot_capacity(&self) -> usize {
        self.slot_capacity
    }

    /// Unread frames in completed slots. The slot being written is excluded.
    pub fn len(&self) -> usize {
        let cursors = self.cursors.lock();
        let mut total = 0;
        let mut index = cursors.read;
        while index != cursors.write {
            total += cursors.unread(index);
            index = (index + 1) % cursors.slot_count();
        }
        total
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Most frames that can be readable at once: every slot but the one being written.
    pub fn capacity(&self) -> usize {
        (self.slots.len() - 1) * self.slot_capacity
    }

    /// Total unread frames lost to the writer overtaking the reader.
    pub fn overwritten(&self) -> u64 {
        self.overwritten.load(Ordering::Relaxed)
    }
}

/// Exclusive access to the slot being written.
pub struct SlotWriter<'a, T> {
    cursors: &'a Mutex<Cursors>,
    index: usize,
    offset: usize,
    generation: u64,
    storage: MutexGuard<'a, Box<[T]>>,
}

impl<T> SlotWriter<'_, T> {
    pub fn index(&self) -> usize {
        self.index
    }

    /// Frames already in the slot.
    pub fn valid_count(&self) -> usize {
        self.offset
    }

    /// Free frames left in the slot.
    pub fn remaining(&self) -> usize {
        self.storage.len() - self.offset
    }

    /// The free tail of the slot, starting at its valid count.
    pub fn spare_mut(&mut self) -> &mut [T] {
        &mut self.storage[self.offset..]
    }

    /// Report `written` frames appended to the slot. Returns the frames committed.
    pub fn commit(self, written: usize) -> usize {
        let remaining = self.remaining();
        let written = if written > remaining {
            log::warn!(
                "slot {} committed {} frames but only {} were free; clamping",
                self.index,
                written,
                remaining
            );
            remaining
        } else {
            written
        };

        let mut cursors = self.cursors.lock();
        if cursors.generation != self.generation || cursors.write != self.index {
            return 0;
        }
        cursors.valid[self.index] = self.offset + written;
        written
    }
}

/// Exclusive access to the slot being drained.
pub struct SlotReader<'a, T> {
    cursors: &'a Mutex<Cursors>,
    index: usize,
    start: usize,
    end: usize,
    generation: u64,
    storage: MutexGuard<'a, Box<[T]>>,
}

impl<T> SlotReader<'_, T> {
    pub fn index(&self) -> usize {
        self.index
    }

    /// Valid frames not yet consumed.
    pub fn frames(&self) -> &[T] {
        &self.storage[self.start..self.end]
    }

    /// Report `count` frames taken from the front of [`frames`](Self::frames).
    pub fn consume(self, count: usize) -> usize {
        let count = count.min(self.end - self.start);
        let mut cursors = self.cursors.lock();
        if cursors.generation != self.generation || cursors.read != self.index {
            // The slot was overtaken by the writer; nothing left to consume.
            return 0;
        }
        cursors.consumed[self.index] = self.start + count;
        count
    }
}

impl<T: Copy + Default + Send> FrameStore<T> for SlottedBuffer<T> {
    fn produce_with(&self, max_frames: usize, fill: &mut dyn FnMut(&mut [T]) -> usize) -> usize {
        let mut writer = self.write_slot();
        let len = writer.remaining().min(max_frames);
        let produced = fill(&mut writer.spare_mut()[..len]);
        let remaining = writer.remaining();
        let committed = writer.commit(produced);
        if committed > 0 && committed == remaining {
            self.advance_write();
        }
        committed
    }

    fn consume_with(&self, max_frames: usize, drain: &mut dyn FnMut(&[T]) -> usize) -> usize {
        let mut reader = self.read_slot();
        if reader.frames().is_empty() {
            drop(reader);
            if !self.advance_read() {
                return 0;
            }
            reader = self.read_slot();
        }

        let available = reader.frames().len();
        let len = available.min(max_frames);
        let taken = drain(&reader.frames()[..len]);
        let consumed = reader.consume(taken);
        if consumed > 0 && consumed == available {
            self.advance_read();
        }
        consumed
    }

    fn len(&self) -> usize {
        SlottedBuffer::len(self)
    }

    fn capacity(&self) -> usize {
        SlottedBuffer::capacity(self)
    }

    fn clear(&self) {
        SlottedBuffer::clear(self)
    }

    fn overwritten(&self) -> u64 {
        SlottedBuffer::overwritten(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn fill_slots(buf: &SlottedBuffer<u32>, total: u32) {
        let mut next = 0u32;
        while next < total {
            buf.produce_with(usize::MAX, &mut |spare| {
                let n = spare.len().min((total - next) as usize);
                for slot in &mut spare[..n] {
                    *slot = next;
                    next += 1;
                }
                n
            });
        }
    }

    fn drain_all(buf: &SlottedBuffer<u32>) -> Vec<u32> {
        let mut out = Vec::new();
        loop {
            let n = buf.consume_with(usize::MAX, &mut |frames| {
                out.extend_from_slice(frames);
                frames.len()
            });
            if n == 0 {
                break;
            }
        }
        out
    }

    #[test]
    fn starts_with_distinct_indices() {
        let buf = SlottedBuffer::<i16>::new(3, 8);
        assert_ne!(buf.read_index(), buf.write_index());
        assert!(buf.is_empty());
        assert_eq!(buf.capacity(), 16);
    }

    #[test]
    fn slot_count_is_at_least_three() {
        let buf = SlottedBuffer::<i16>::new(1, 8);
        assert_eq!(buf.slot_count(), 3);
    }

    #[test]
    fn partial_slot_is_not_readable() {
        let buf = SlottedBuffer::<u32>::new(3, 4);
        let mut writer = buf.write_slot();
        writer.spare_mut()[..2].copy_from_slice(&[1, 2]);
        assert_eq!(writer.commit(2), 2);

        assert_eq!(buf.len(), 0);
        assert!(drain_all(&buf).is_empty());

        let mut writer = buf.write_slot();
        assert_eq!(writer.valid_count(), 2);
        writer.spare_mut().copy_from_slice(&[3, 4]);
        writer.commit(2);
        buf.advance_write();

        assert_eq!(buf.len(), 4);
        assert_eq!(drain_all(&buf), vec![1, 2, 3, 4]);
    }

    #[test]
    fn full_slot_rotates_and_reads_in_order() {
        let buf = SlottedBuffer::<u32>::new(3, 4);
        fill_slots(&buf, 8);
        assert_eq!(buf.len(), 8);
        assert_eq!(drain_all(&buf), (0..8).collect::<Vec<_>>());
        assert_ne!(buf.read_index(), buf.write_index());
    }

    #[test]
    fn overflow_sacrifices_oldest_unread_slot() {
        let buf = SlottedBuffer::<u32>::new(3, 4);
        // Five slots' worth with no reads in between.
        let mut next = 0u32;
        for _ in 0..20 {
            buf.produce_with(1, &mut |spare| {
                spare[0] = next;
                next += 1;
                1
            });
            assert_ne!(buf.read_index(), buf.write_index());
        }

        assert_eq!(buf.len(), buf.capacity());
        assert_eq!(buf.overwritten(), 12);
        assert_eq!(drain_all(&buf), (12..20).collect::<Vec<_>>());
    }

    #[test]
    fn reader_parks_behind_writer() {
        let buf = SlottedBuffer::<u32>::new(3, 2);
        fill_slots(&buf, 2);
        assert_eq!(drain_all(&buf), vec![0, 1]);

        let parked = buf.read_index();
        assert!(!buf.advance_read());
        assert_eq!(buf.read_index(), parked);

        // Once the writer completes another slot the reader moves on.
        buf.produce_with(2, &mut |spare| {
            spare.copy_from_slice(&[2, 3]);
            2
        });
        assert_eq!(drain_all(&buf), vec![2, 3]);
    }

    #[test]
    fn partial_consume_keeps_position() {
        let buf = SlottedBuffer::<u32>::new(4, 4);
        fill_slots(&buf, 8);

        let mut first = Vec::new();
        buf.consume_with(3, &mut |frames| {
            first.extend_from_slice(frames);
            frames.len()
        });
        assert_eq!(first, vec![0, 1, 2]);
        assert_eq!(buf.len(), 5);
        assert_eq!(drain_all(&buf), vec![3, 4, 5, 6, 7]);
    }

    #[test]
    fn clear_invalidates_open_writer() {
        let buf = SlottedBuffer::<u32>::new(3, 4);
        fill_slots(&buf, 4);

        let mut writer = buf.write_slot();
        writer.spare_mut()[0] = 99;
        // clear() only takes the cursor lock, so it can run with a slot open.
        buf.clear();
        assert_eq!(writer.commit(1), 0);

        assert!(buf.is_empty());
        assert_eq!(buf.read_index(), 0);
        assert_eq!(buf.write_index(), 1);
    }

    #[test]
    fn commit_is_clamped_to_free_space() {
        let buf = SlottedBuffer::<u32>::new(3, 2);
        let writer = buf.write_slot();
        assert_eq!(writer.commit(10), 2);
    }

    #[test]
    fn concurrent_use_never_reorders_or_duplicates() {
        const TOTAL: u32 = 50_000;
        let buf = Arc::new(SlottedBuffer::<u32>::new(3, 64));

        let producer = {
            let buf = Arc::clone(&buf);
            thread::spawn(move || {
                let mut next = 0u32;
                while next < TOTAL {
                    buf.produce_with(16, &mut |spare| {
                        let n = spare.len().min((TOTAL - next) as usize);
                        for slot in &mut spare[..n] {
                            *slot = next;
                            next += 1;
                        }
                        n
                    });
                }
            })
        };

        let mut received = Vec::new();
        while !producer.is_finished() || !buf.is_empty() {
            buf.consume_with(32, &mut |frames| {
                received.extend_from_slice(frames);
                frames.len()
            });
        }
        producer.join().unwrap();

        assert!(received.windows(2).all(|pair| pair[0] < pair[1]));
        let lost = TOTAL as usize - received.len();
        // Frames still in the unfinished write slot are neither read nor overwritten.
        assert!(lost as u64 >= buf.overwritten());
    }
}
