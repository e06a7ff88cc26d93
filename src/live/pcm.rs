//! 16-bit little-endian PCM ⇄ `f32` samples, base64 wrapped.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;

use crate::error::{AssistantError, Result};

/// Mime type for raw PCM at `sample_rate`.
pub fn pcm_mime(sample_rate: u32) -> String {
    format!("audio/pcm;rate={sample_rate}")
}

/// Sample rate from a `audio/pcm;rate=N` mime type.
pub fn rate_from_mime(mime: &str) -> Option<u32> {
    mime.split(';')
        .filter_map(|p| p.trim().strip_prefix("rate="))
        .find_map(|r| r.trim().parse().ok())
}

/// Clamp to [-1, 1], quantize to i16 LE and base64 encode.
pub fn encode_pcm16(samples: &[f32]) -> String {
    let mut bytes = Vec::with_capacity(samples.len() * 2);
    for &s in samples {
        let v = (s.clamp(-1.0, 1.0) * f32::from(i16::MAX)).round() as i16;
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    BASE64.encode(bytes)
}

/// Decode base64 i16 LE PCM into samples in [-1, 1).
///
/// A trailing odd byte is dropped.
///
/// # Errors
///
/// Returns [`AssistantError::AudioError`] for invalid base64.
pub fn decode_pcm16(data: &str) -> Result<Vec<f32>> {
    let bytes = BASE64
        .decode(data.trim())
        .map_err(|e| AssistantError::AudioError(format!("invalid base64 audio: {e}")))?;
    Ok(bytes
        .chunks_exact(2)
        .map(|pair| f32::from(i16::from_le_bytes([pair[0], pair[1]])) / 32768.0)
        .collect())
}
