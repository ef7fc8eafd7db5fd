//! Audio file decoding and offline resampling.
//!
//! Decoding runs entirely on user threads; only finished [`crate::Buffer`]s
//! ever reach the audio thread.

use crate::error::{Result, SkylarkError};
use std::fs::File;
use std::path::Path;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{Decoder, DecoderOptions};
use symphonia::core::errors::Error;
use symphonia::core::formats::{FormatOptions, FormatReader};
use symphonia::core::io::{MediaSource, MediaSourceStream};
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

pub(crate) struct DecodedAudio {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub channels: u16,
}

/// A probed container plus decoder, ready to pull packets from. Used both by
/// whole-file decoding and by the streaming generator's helper thread.
pub(crate) struct DecodeStream {
    format: Box<dyn FormatReader>,
    decoder: Box<dyn Decoder>,
    track_id: u32,
    pub sample_rate: u32,
    pub channels: u16,
}

impl DecodeStream {
    pub(crate) fn open_file(path: &str) -> Result<Self> {
        let file = File::open(path)?;
        let mut hint = Hint::new();
        if let Some(ext) = Path::new(path).extension().and_then(|e| e.to_str()) {
            hint.with_extension(ext);
        }
        Self::open(Box::new(file), hint)
    }

    pub(crate) fn open_bytes(bytes: Vec<u8>) -> Result<Self> {
        Self::open(Box::new(std::io::Cursor::new(bytes)), Hint::new())
    }

    fn open(source: Box<dyn MediaSource>, hint: Hint) -> Result<Self> {
        let mss = MediaSourceStream::new(source, Default::default());
        let probed = symphonia::default::get_probe()
            .format(
                &hint,
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| SkylarkError::Decode(format!("failed to probe audio format: {e:?}")))?;

        let format = probed.format;
        let track = format
            .default_track()
            .ok_or_else(|| SkylarkError::Decode("no default audio track found".to_string()))?;

        let sample_rate = track
            .codec_params
            .sample_rate
            .ok_or_else(|| SkylarkError::Decode("sample rate not found".to_string()))?;
        let channels = track
            .codec_params
            .channels
            .ok_or_else(|| SkylarkError::Decode("channel count not found".to_string()))?
            .count() as u16;
        let track_id = track.id;

        let decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .map_err(|e| SkylarkError::Decode(format!("failed to create decoder: {e:?}")))?;

        Ok(Self {
            format,
            decoder,
            track_id,
            sample_rate,
            channels,
        })
    }

    /// Decodes the next packet into interleaved f32 samples. `Ok(None)`
    /// signals end of stream; recoverable decode errors skip the packet.
    pub(crate) fn next_packet(&mut self) -> Result<Option<Vec<f32>>> {
        loop {
            let packet = match self.format.next_packet() {
                Ok(packet) => packet,
                Err(Error::IoError(_)) => return Ok(None),
                Err(e) => {
                    return Err(SkylarkError::Decode(format!("error reading packet: {e:?}")));
                }
            };
            if packet.track_id() != self.track_id {
                continue;
            }

            let decoded = match self.decoder.decode(&packet) {
                Ok(decoded) => decoded,
                Err(Error::IoError(_)) => return Ok(None),
                Err(Error::DecodeError(_)) => continue,
                Err(e) => {
                    return Err(SkylarkError::Decode(format!("error decoding packet: {e:?}")));
                }
            };

            let spec = *decoded.spec();
            let mut tmp = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
            tmp.copy_interleaved_ref(decoded);
            return Ok(Some(tmp.samples().to_vec()));
        }
    }

    /// Rewinds to the start of the stream, for looping playback.
    pub(crate) fn rewind(&mut self) -> Result<()> {
        use symphonia::core::formats::{SeekMode, SeekTo};
        use symphonia::core::units::Time;
        self.format
            .seek(
                SeekMode::Accurate,
                SeekTo::Time {
                    time: Time::default(),
                    track_id: Some(self.track_id),
                },
            )
            .map_err(|e| SkylarkError::Decode(format!("failed to rewind stream: {e:?}")))?;
        self.decoder.reset();
        Ok(())
    }
}

fn drain(mut stream: DecodeStream) -> Result<DecodedAudio> {
    let mut samples = Vec::new();
    while let Some(packet) = stream.next_packet()? {
        samples.extend_from_slice(&packet);
    }
    log::debug!(
        "decoded {} frames at {} Hz, {} channels",
        samples.len() / stream.channels.max(1) as usize,
        stream.sample_rate,
        stream.channels
    );
    Ok(DecodedAudio {
        samples,
        sample_rate: stream.sample_rate,
        channels: stream.channels,
    })
}

pub(crate) fn decode_file(path: &str) -> Result<DecodedAudio> {
    drain(DecodeStream::open_file(path)?)
}

pub(crate) fn decode_bytes(bytes: Vec<u8>) -> Result<DecodedAudio> {
    drain(DecodeStream::open_bytes(bytes)?)
}

/// Offline resampling of a whole interleaved clip, channel by channel.
pub(crate) fn resample_interleaved(
    samples: &[f32],
    channels: u16,
    source_rate: u32,
    target_rate: u32,
) -> Result<Vec<f32>> {
    use rubato::{FftFixedIn, Resampler};

    if source_rate == target_rate {
        return Ok(samples.to_vec());
    }
    if source_rate == 0 || target_rate == 0 {
        return Err(SkylarkError::InvalidArgument(
            "sample rates must be greater than 0".to_string(),
        ));
    }

    let channels_usize = channels as usize;
    let frames = samples.len() / channels_usize;
    const CHUNK: usize = 1024;

    let mut planar_out: Vec<Vec<f32>> = Vec::with_capacity(channels_usize);
    for ch in 0..channels_usize {
        let mut resampler = FftFixedIn::<f32>::new(
            source_rate as usize,
            target_rate as usize,
            CHUNK,
            2,
            1,
        )
        .map_err(|e| SkylarkError::Decode(format!("failed to create resampler: {e}")))?;

        let mut channel_out = Vec::new();
        let mut input_chunk = vec![0.0f32; CHUNK];
        let mut index = 0;
        while index < frames {
            let count = (frames - index).min(CHUNK);
            input_chunk.fill(0.0);
            for i in 0..count {
                input_chunk[i] = samples[(index + i) * channels_usize + ch];
            }
            let waves_out = resampler
                .process(&[input_chunk.clone()], None)
                .map_err(|e| SkylarkError::Decode(format!("resampling error: {e}")))?;
            if let Some(first) = waves_out.first() {
                channel_out.extend_from_slice(first);
            }
            index += count;
        }
        planar_out.push(channel_out);
    }

    let out_frames = planar_out.iter().map(|c| c.len()).min().unwrap_or(0);
    let mut interleaved = vec![0.0f32; out_frames * channels_usize];
    for (ch, channel) in planar_out.iter().enumerate() {
        for frame in 0..out_frames {
            interleaved[frame * channels_usize + ch] = channel[frame];
        }
    }
    log::debug!(
        "resampled {} -> {} Hz ({} -> {} frames)",
        source_rate,
        target_rate,
        frames,
        out_frames
    );
    Ok(interleaved)
}
