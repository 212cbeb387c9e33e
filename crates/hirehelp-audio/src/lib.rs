//! Audio plumbing for live voice mode.
//!
//! Microphone capture arrives as `f32` samples at 16 kHz mono and leaves as
//! base64 little-endian 16-bit PCM. Model audio arrives as 16-bit PCM at
//! 24 kHz mono and is decoded back to `f32` before being scheduled for
//! gap-free playback.

pub mod clock;
pub mod frame;
pub mod pcm;
pub mod playback;

pub use clock::{Clock, MonotonicClock};
pub use frame::CaptureFramer;
pub use pcm::{AudioBuffer, AudioError};
pub use playback::{PlaybackScheduler, ScheduledChunk};

/// Sample rate of microphone audio sent to the model.
pub const INPUT_SAMPLE_RATE: u32 = 16_000;
/// Sample rate of audio produced by the model.
pub const OUTPUT_SAMPLE_RATE: u32 = 24_000;
/// Samples per capture block.
pub const CAPTURE_FRAME_SAMPLES: usize = 4096;

/// Mime tag the streaming session expects on each audio chunk.
pub fn pcm_mime_type(sample_rate: u32) -> String {
    format!("audio/pcm;rate={sample_rate}")
}
