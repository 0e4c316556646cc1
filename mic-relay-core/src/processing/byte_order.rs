//! Serialization of `i16` frames to bytes in a chosen byte order.
//!
//! Whether bytes need swapping is decided once per session
//! ([`needs_swap`]) and passed down, so the per-call path is either a plain
//! copy of native bytes or a per-sample swap.

use crate::models::audio_models::ByteOrder;

/// Width of one stored sample in bytes.
pub const SAMPLE_BYTES: usize = std::mem::size_of::<i16>();

impl ByteOrder {
    /// Byte order of the running platform.
    pub const fn native() -> Self {
        if cfg!(target_endian = "big") {
            Self::BigEndian
        } else {
            Self::LittleEndian
        }
    }

    pub const fn opposite(self) -> Self {
        match self {
            Self::LittleEndian => Self::BigEndian,
            Self::BigEndian => Self::LittleEndian,
        }
    }
}

/// Whether output in `target` order differs from native order.
pub fn needs_swap(target: ByteOrder) -> bool {
    target != ByteOrder::native()
}

/// Write `samples` into `dst` as bytes, swapping each sample when `swap` is set.
///
/// Writes `min(samples.len(), dst.len() / 2)` samples and returns how many.
pub fn write_samples(samples: &[i16], dst: &mut [u8], swap: bool) -> usize {
    let count = samples.len().min(dst.len() / SAMPLE_BYTES);
    for (sample, out) in samples[..count]
        .iter()
        .zip(dst.chunks_exact_mut(SAMPLE_BYTES))
    {
        let value = if swap { sample.swap_bytes() } else { *sample };
        out.copy_from_slice(&value.to_ne_bytes());
    }
    count
}

/// Decode bytes written in `order` back into samples.
pub fn read_samples(src: &[u8], order: ByteOrder) -> Vec<i16> {
    src.chunks_exact(SAMPLE_BYTES)
        .map(|pair| {
            let bytes = [pair[0], pair[1]];
            match order {
                ByteOrder::LittleEndian => i16::from_le_bytes(bytes),
                ByteOrder::BigEndian => i16::from_be_bytes(bytes),
            }
        })
        .collect()
}
