//! Conversions from device sample formats to the stored `i16` frames.

/// Decode native-endian `i16` PCM bytes into samples.
pub fn pcm16_bytes_to_i16(src: &[u8], dst: &mut [i16]) -> usize {
    let count = (src.len() / 2).min(dst.len());
    for (out, pair) in dst.iter_mut().zip(src.chunks_exact(2)).take(count) {
        *out = i16::from_ne_bytes([pair[0], pair[1]]);
    }
    count
}

/// Decode native-endian `f32` PCM bytes and convert them to `i16`.
pub fn f32_bytes_to_i16(src: &[u8], dst: &mut [i16]) -> usize {
    let count = (src.len() / 4).min(dst.len());
    for (out, quad) in dst.iter_mut().zip(src.chunks_exact(4)).take(count) {
        let sample = f32::from_ne_bytes([quad[0], quad[1], quad[2], quad[3]]);
        *out = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
    }
    count
}
