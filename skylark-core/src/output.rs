//! Device output via cpal.
//!
//! The stream is opened on the default output device at the engine sample
//! rate; the channel count is negotiated from the device's default
//! configuration, capped at [`MAX_CHANNELS`]. The callback pulls whole
//! engine blocks and carries any remainder across callback boundaries, so
//! the device buffer size does not have to match [`BLOCK_SIZE`].

use crate::config::{BLOCK_SIZE, MAX_CHANNELS, SR};
use crate::context::ContextShared;
use crate::error::{Result, SkylarkError};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, SizedSample};
use std::sync::atomic::Ordering;
use std::sync::Arc;

pub(crate) fn start(shared: &Arc<ContextShared>) -> Result<cpal::Stream> {
    let host = cpal::default_host();
    let device = host.default_output_device().ok_or_else(|| {
        SkylarkError::BackendUnavailable("no default output device available".into())
    })?;
    let device_config = device.default_output_config().map_err(|e| {
        SkylarkError::BackendUnavailable(format!("failed to get default config: {e}"))
    })?;

    let channels = (device_config.channels() as usize).clamp(1, MAX_CHANNELS);
    shared.set_channels(channels);

    let config = cpal::StreamConfig {
        channels: channels as u16,
        sample_rate: cpal::SampleRate(SR),
        buffer_size: select_buffer_size(&device_config),
    };
    log::info!(
        "opening device output: {} channels at {} Hz",
        channels,
        SR
    );

    let stream = match device_config.sample_format() {
        cpal::SampleFormat::F32 => build_stream::<f32>(&device, &config, shared.clone())?,
        cpal::SampleFormat::I16 => build_stream::<i16>(&device, &config, shared.clone())?,
        cpal::SampleFormat::U16 => build_stream::<u16>(&device, &config, shared.clone())?,
        other => {
            return Err(SkylarkError::BackendUnavailable(format!(
                "unsupported sample format {other:?}"
            )));
        }
    };

    stream
        .play()
        .map_err(|e| SkylarkError::BackendUnavailable(format!("failed to start stream: {e}")))?;
    Ok(stream)
}

/// Requests a fixed device buffer of one engine block where the device
/// allows it; the carry buffer in the callback absorbs any mismatch.
fn select_buffer_size(device_config: &cpal::SupportedStreamConfig) -> cpal::BufferSize {
    let requested = BLOCK_SIZE as u32;
    match device_config.buffer_size() {
        cpal::SupportedBufferSize::Range { min, max } => {
            if requested < *min || requested > *max {
                log::warn!(
                    "device buffer range [{min}, {max}] excludes {requested}; using device default"
                );
                cpal::BufferSize::Default
            } else {
                cpal::BufferSize::Fixed(requested)
            }
        }
        cpal::SupportedBufferSize::Unknown => {
            log::warn!("device buffer size range unknown, requesting {requested} frames");
            cpal::BufferSize::Fixed(requested)
        }
    }
}

/// Block remainder carried between device callbacks.
struct Carry {
    buffer: Vec<f32>,
    len: usize,
    position: usize,
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    shared: Arc<ContextShared>,
) -> Result<cpal::Stream>
where
    T: SizedSample + FromSample<f32>,
{
    let mut carry = Carry {
        buffer: vec![0.0; BLOCK_SIZE * MAX_CHANNELS],
        len: 0,
        position: 0,
    };

    let stream = device
        .build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                audio_callback(data, &shared, &mut carry);
            },
            move |err| {
                log::error!("audio stream error: {err}");
            },
            None,
        )
        .map_err(|e| SkylarkError::BackendUnavailable(format!("failed to build stream: {e}")))?;

    Ok(stream)
}

fn audio_callback<T>(data: &mut [T], shared: &Arc<ContextShared>, carry: &mut Carry)
where
    T: SizedSample + FromSample<f32>,
{
    if !shared.running.load(Ordering::Relaxed) {
        fill_silence(data);
        return;
    }

    shared.in_audio_callback.store(true, Ordering::Release);

    let channels = shared.channels();
    let block_samples = BLOCK_SIZE * channels;
    let mut written = 0;

    while written < data.len() {
        if carry.position >= carry.len {
            // Shutdown holds the state lock while tearing down; output
            // silence rather than stall the device thread.
            match shared.state.try_lock() {
                Ok(mut state) => {
                    state.generate_block(shared, &mut carry.buffer[..block_samples]);
                    carry.len = block_samples;
                    carry.position = 0;
                }
                Err(_) => {
                    log::warn!("engine state busy in audio callback, emitting silence");
                    for sample in data[written..].iter_mut() {
                        *sample = T::from_sample(0.0f32);
                    }
                    break;
                }
            }
        }
        data[written] = T::from_sample(carry.buffer[carry.position]);
        written += 1;
        carry.position += 1;
    }

    shared.in_audio_callback.store(false, Ordering::Release);
}

fn fill_silence<T>(data: &mut [T])
where
    T: SizedSample + FromSample<f32>,
{
    for sample in data.iter_mut() {
        *sample = T::from_sample(0.0f32);
    }
}
