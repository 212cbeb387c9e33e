use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine as _;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AudioError {
    #[error("invalid base64 audio payload: {0}")]
    Base64(String),

    #[error("pcm payload of {len} bytes is not a whole number of {width}-byte frames")]
    Misaligned { len: usize, width: usize },

    #[error("channel count must be at least 1")]
    NoChannels,
}

/// Decoded, de-interleaved audio ready for playback.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    pub sample_rate: u32,
    pub channels: Vec<Vec<f32>>,
}

impl AudioBuffer {
    pub fn frame_count(&self) -> usize {
        self.channels.first().map(Vec::len).unwrap_or(0)
    }

    /// Playback length in seconds.
    pub fn duration(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frame_count() as f64 / self.sample_rate as f64
    }

    /// First channel, which is all there is for mono streams.
    pub fn mono(&self) -> &[f32] {
        self.channels.first().map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Converts one float sample in `[-1, 1]` to signed 16-bit.
///
/// Out-of-range input saturates instead of wrapping; NaN maps to silence.
pub fn f32_to_i16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * 32768.0) as i16
}

pub fn i16_to_f32(sample: i16) -> f32 {
    sample as f32 / 32768.0
}

/// Float samples to raw little-endian 16-bit PCM bytes.
pub fn encode_pcm16(samples: &[f32]) -> Vec<u8> {
    let mut out = Vec::with_capacity(samples.len() * 2);
    for &s in samples {
        out.extend_from_slice(&f32_to_i16(s).to_le_bytes());
    }
    out
}

/// Float samples to the base64 payload carried by a realtime input chunk.
pub fn encode_base64(samples: &[f32]) -> String {
    B64.encode(encode_pcm16(samples))
}

/// Raw interleaved little-endian 16-bit PCM to a float buffer.
pub fn decode_pcm16(bytes: &[u8], sample_rate: u32, channels: usize) -> Result<AudioBuffer, AudioError> {
    if channels == 0 {
        return Err(AudioError::NoChannels);
    }
    let width = 2 * channels;
    if bytes.len() % width != 0 {
        return Err(AudioError::Misaligned {
            len: bytes.len(),
            width,
        });
    }

    let frame_count = bytes.len() / width;
    let mut out = vec![Vec::with_capacity(frame_count); channels];
    for (i, pair) in bytes.chunks_exact(2).enumerate() {
        let sample = i16::from_le_bytes([pair[0], pair[1]]);
        out[i % channels].push(i16_to_f32(sample));
    }

    Ok(AudioBuffer {
        sample_rate,
        channels: out,
    })
}

pub fn decode_base64(data: &str, sample_rate: u32, channels: usize) -> Result<AudioBuffer, AudioError> {
    let bytes = B64
        .decode(data.trim())
        .map_err(|e| AudioError::Base64(e.to_string()))?;
    decode_pcm16(&bytes, sample_rate, channels)
}

/// Client capture frames: little-endian `f32` samples.
pub fn f32_samples_from_le_bytes(bytes: &[u8]) -> Result<Vec<f32>, AudioError> {
    if bytes.len() % 4 != 0 {
        return Err(AudioError::Misaligned {
            len: bytes.len(),
            width: 4,
        });
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conversion_saturates_at_full_scale() {
        assert_eq!(f32_to_i16(0.0), 0);
        assert_eq!(f32_to_i16(1.0), i16::MAX);
        assert_eq!(f32_to_i16(-1.0), i16::MIN);
        assert_eq!(f32_to_i16(3.5), i16::MAX);
        assert_eq!(f32_to_i16(-7.0), i16::MIN);
        assert_eq!(f32_to_i16(f32::NAN), 0);
    }

    #[test]
    fn half_scale_maps_to_half_range() {
        assert_eq!(f32_to_i16(0.5), 16384);
        assert_eq!(f32_to_i16(-0.5), -16384);
    }

    #[test]
    fn encode_is_little_endian() {
        let bytes = encode_pcm16(&[0.5, -0.5]);
        assert_eq!(bytes, vec![0x00, 0x40, 0x00, 0xC0]);
    }

    #[test]
    fn decode_mono_24k() {
        let bytes = [0x00, 0x40, 0x00, 0xC0, 0x00, 0x00];
        let buffer = decode_pcm16(&bytes, 24_000, 1).unwrap();
        assert_eq!(buffer.frame_count(), 3);
        assert_eq!(buffer.mono(), &[0.5, -0.5, 0.0]);
        assert!((buffer.duration() - 3.0 / 24_000.0).abs() < 1e-12);
    }

    #[test]
    fn decode_deinterleaves_stereo() {
        let bytes = encode_pcm16(&[0.25, -0.25, 0.5, -0.5]);
        let buffer = decode_pcm16(&bytes, 24_000, 2).unwrap();
        assert_eq!(buffer.channels[0], vec![0.25, 0.5]);
        assert_eq!(buffer.channels[1], vec![-0.25, -0.5]);
    }

    #[test]
    fn decode_rejects_odd_length() {
        let err = decode_pcm16(&[0x01, 0x02, 0x03], 24_000, 1).unwrap_err();
        assert_eq!(err, AudioError::Misaligned { len: 3, width: 2 });
    }

    #[test]
    fn decode_rejects_zero_channels() {
        assert_eq!(decode_pcm16(&[], 24_000, 0).unwrap_err(), AudioError::NoChannels);
    }

    #[test]
    fn decode_base64_reports_bad_payload() {
        let err = decode_base64("not base64!!", 24_000, 1).unwrap_err();
        assert!(matches!(err, AudioError::Base64(_)));
    }

    #[test]
    fn base64_payload_survives_the_wire() {
        let samples = [0.0, 0.25, -0.75];
        let encoded = encode_base64(&samples);
        let decoded = decode_base64(&encoded, 16_000, 1).unwrap();
        assert_eq!(decoded.mono(), &samples);
    }

    #[test]
    fn client_frames_parse_as_f32() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&0.5f32.to_le_bytes());
        bytes.extend_from_slice(&(-1.0f32).to_le_bytes());
        assert_eq!(f32_samples_from_le_bytes(&bytes).unwrap(), vec![0.5, -1.0]);
        assert!(f32_samples_from_le_bytes(&bytes[..5]).is_err());
    }
}
