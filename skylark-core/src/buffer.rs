//! Decoded PCM storage.
//!
//! A [`Buffer`] holds interleaved f32 frames in fixed-size pages of
//! [`BUFFER_CHUNK_SIZE`](crate::config::BUFFER_CHUNK_SIZE) bytes. Paging
//! bounds the largest single allocation and keeps seeks O(1): a frame's page
//! and offset fall out of index math.
//!
//! Buffers are always stored at the engine sample rate; loading resamples as
//! needed.

use crate::config::{BUFFER_CHUNK_SIZE, SR};
use crate::decode;
use crate::error::{Result, SkylarkError};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

pub struct Buffer {
    pages: Vec<Box<[f32]>>,
    channels: usize,
    frames: usize,
    frames_per_page: usize,
}

impl fmt::Debug for Buffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Buffer")
            .field("channels", &self.channels)
            .field("frames", &self.frames)
            .finish()
    }
}

impl Buffer {
    /// Wraps already-decoded interleaved samples. Samples at a rate other
    /// than the engine's are resampled on the way in.
    pub fn from_samples(samples: &[f32], channels: u16, sample_rate: u32) -> Result<Arc<Self>> {
        if channels == 0 {
            return Err(SkylarkError::InvalidArgument(
                "buffer channel count must be greater than 0".into(),
            ));
        }
        if samples.len() % channels as usize != 0 {
            return Err(SkylarkError::InvalidArgument(format!(
                "sample count {} is not a multiple of channel count {}",
                samples.len(),
                channels
            )));
        }
        let resampled;
        let samples = if sample_rate != SR {
            resampled = decode::resample_interleaved(samples, channels, sample_rate, SR)?;
            &resampled[..]
        } else {
            samples
        };
        Ok(Arc::new(Self::paginate(samples, channels as usize)))
    }

    /// Decodes an audio file (WAV, MP3, FLAC, OGG, ...) into a buffer.
    pub fn from_file(path: &str) -> Result<Arc<Self>> {
        let decoded = decode::decode_file(path)?;
        Self::from_samples(&decoded.samples, decoded.channels, decoded.sample_rate)
    }

    /// Decodes an in-memory encoded stream into a buffer.
    pub fn from_encoded_bytes(bytes: Vec<u8>) -> Result<Arc<Self>> {
        let decoded = decode::decode_bytes(bytes)?;
        Self::from_samples(&decoded.samples, decoded.channels, decoded.sample_rate)
    }

    fn paginate(samples: &[f32], channels: usize) -> Self {
        let frames_per_page = (BUFFER_CHUNK_SIZE / (std::mem::size_of::<f32>() * channels)).max(1);
        let frames = samples.len() / channels;
        let pages = samples
            .chunks(frames_per_page * channels)
            .map(|chunk| chunk.to_vec().into_boxed_slice())
            .collect();
        Self {
            pages,
            channels,
            frames,
            frames_per_page,
        }
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn frames(&self) -> usize {
        self.frames
    }

    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.frames as f64 / SR as f64)
    }

    /// One sample, addressed by frame and channel. O(1).
    #[inline]
    pub fn sample(&self, frame: usize, channel: usize) -> f32 {
        debug_assert!(frame < self.frames && channel < self.channels);
        let page = frame / self.frames_per_page;
        let offset = frame % self.frames_per_page;
        self.pages[page][offset * self.channels + channel]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_round_trips() {
        let channels = 2usize;
        let frames = 10_000usize;
        let samples: Vec<f32> = (0..frames * channels).map(|i| i as f32).collect();
        let buffer = Buffer::from_samples(&samples, channels as u16, SR).unwrap();
        assert_eq!(buffer.frames(), frames);
        assert!(buffer.pages.len() > 1);
        for frame in [0, 1, 2047, 2048, 2049, frames - 1] {
            for ch in 0..channels {
                assert_eq!(
                    buffer.sample(frame, ch),
                    samples[frame * channels + ch],
                    "frame {frame} channel {ch}"
                );
            }
        }
    }

    #[test]
    fn rejects_mismatched_sample_count() {
        assert!(Buffer::from_samples(&[0.0, 0.0, 0.0], 2, SR).is_err());
        assert!(Buffer::from_samples(&[0.0], 0, SR).is_err());
    }
}
