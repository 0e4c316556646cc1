//! Bounded queue between the WASAPI capture thread and `AudioInput::read`.

use std::collections::VecDeque;

use parking_lot::Mutex;

/// Converted samples waiting for the producer.
///
/// When full, newly captured samples are dropped so the queue keeps the
/// oldest audio in order.
pub struct Staging {
    queue: Mutex<VecDeque<i16>>,
    limit: usize,
}

impl Staging {
    pub fn new(limit: usize) -> Self {
        let limit = limit.max(1);
        Self {
            queue: Mutex::new(VecDeque::with_capacity(limit)),
            limit,
        }
    }

    /// Append samples. Returns how many were dropped for lack of room.
    pub fn push(&self, samples: &[i16]) -> usize {
        let mut queue = self.queue.lock();
        let room = self.limit - queue.len();
        let accepted = room.min(samples.len());
        queue.extend(&samples[..accepted]);
        samples.len() - accepted
    }

    /// Move up to `dest.len()` samples into `dest` without waiting.
    pub fn pop_into(&self, dest: &mut [i16]) -> usize {
        let mut queue = self.queue.lock();
        let n = dest.len().min(queue.len());
        for (slot, sample) in dest.iter_mut().zip(queue.drain(..n)) {
            *slot = sample;
        }
        n
    }

    pub fn len(&self) -> usize {
        self.queue.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.queue.lock().clear();
    }
}
