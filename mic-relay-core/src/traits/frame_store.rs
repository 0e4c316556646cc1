/// Capability shared by the buffering structures a session can use.
///
/// Both methods hand the callback a view into live storage so frames move
/// without an intermediate copy. The callback returns how many frames it
/// actually produced or consumed; the store commits at most that many.
pub trait FrameStore<T>: Send + Sync {
    /// Offer up to `max_frames` of free storage to `fill`.
    ///
    /// `fill` is called exactly once, with an empty slice when no space is
    /// available. Returns the number of frames committed.
    fn produce_with(&self, max_frames: usize, fill: &mut dyn FnMut(&mut [T]) -> usize) -> usize;

    /// Offer up to `max_frames` buffered frames to `drain`.
    ///
    /// The slice may be shorter than what is buffered (a wrap point or a slot
    /// boundary); callers loop for more. Returns the number of frames removed.
    fn consume_with(&self, max_frames: usize, drain: &mut dyn FnMut(&[T]) -> usize) -> usize;

    /// Frames currently readable.
    fn len(&self) -> usize;

    /// Maximum number of frames that can be readable at once.
    fn capacity(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn clear(&self);

    /// Buffered frames the store itself discarded to make room for new ones.
    fn overwritten(&self) -> u64 {
        0
    }
}
