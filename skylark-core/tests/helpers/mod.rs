//! Shared helpers for the headless integration tests.
#![allow(dead_code)]

use skylark_core::config::{BLOCK_SIZE, SR};
use skylark_core::{Property, SkylarkContext, SkylarkDesc};

/// A headless stereo context.
pub fn test_context() -> SkylarkContext {
    SkylarkContext::new_headless(SkylarkDesc::default()).expect("headless context")
}

pub fn test_context_mono() -> SkylarkContext {
    SkylarkContext::new_headless(SkylarkDesc::default().channels(1)).expect("headless context")
}

/// Renders `blocks` blocks and returns the concatenated interleaved output.
pub fn render(ctx: &SkylarkContext, blocks: usize) -> Vec<f32> {
    let channels = ctx.channels();
    let mut out = Vec::with_capacity(blocks * BLOCK_SIZE * channels);
    let mut block = vec![0.0f32; BLOCK_SIZE * channels];
    for _ in 0..blocks {
        ctx.generate_block(&mut block).expect("generate_block");
        out.extend_from_slice(&block);
    }
    out
}

pub fn rms(samples: &[f32]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum: f64 = samples.iter().map(|&s| (s as f64) * (s as f64)).sum();
    (sum / samples.len() as f64).sqrt()
}

pub fn is_silent(samples: &[f32]) -> bool {
    samples.iter().all(|&s| s.abs() < 1e-9)
}

/// One second of a unit-amplitude 440 Hz mono sine.
pub fn sine_440() -> Vec<f32> {
    (0..SR as usize)
        .map(|i| (2.0 * std::f32::consts::PI * 440.0 * i as f32 / SR as f32).sin())
        .collect()
}

/// Goertzel power of one channel at `frequency`, normalized by length.
pub fn goertzel_power(samples: &[f32], frequency: f64) -> f64 {
    let omega = 2.0 * std::f64::consts::PI * frequency / SR as f64;
    let coefficient = 2.0 * omega.cos();
    let mut s_prev = 0.0f64;
    let mut s_prev2 = 0.0f64;
    for &sample in samples {
        let s = sample as f64 + coefficient * s_prev - s_prev2;
        s_prev2 = s_prev;
        s_prev = s;
    }
    let power = s_prev * s_prev + s_prev2 * s_prev2 - coefficient * s_prev * s_prev2;
    power / (samples.len() as f64 * samples.len() as f64)
}

/// Attaches a looping generator playing `samples` (mono) to a new source of
/// the given constructor, returning (source, generator, buffer).
pub fn looping_source(
    ctx: &SkylarkContext,
    samples: &[f32],
    create: impl Fn() -> skylark_core::Handle,
) -> (
    skylark_core::Handle,
    skylark_core::Handle,
    skylark_core::Handle,
) {
    let buffer = ctx
        .create_buffer_from_samples(samples, 1, SR)
        .expect("buffer");
    let generator = ctx.create_buffer_generator().expect("generator");
    ctx.set_o(generator, Property::Buffer, Some(buffer))
        .expect("set buffer");
    ctx.set_i(generator, Property::Looping, 1).expect("looping");
    let source = create();
    ctx.source_add_generator(source, generator).expect("attach");
    (source, generator, buffer)
}
