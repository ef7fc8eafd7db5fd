//! Multichannel biquad filtering with a one-block crossfade on reconfigure.
//!
//! A [`BiquadBlock`] holds two filter instances and an active index.
//! `configure` writes the new coefficients into the inactive instance and
//! seeds it with the active instance's state; the next block is produced by
//! both filters blended under a linear ramp, after which the new instance is
//! authoritative. Crossfading between identical configurations is therefore
//! an exact no-op.
//!
//! Coefficient design (RBJ cookbook) is plain math over `f64` and is meant
//! to run on user threads; only [`BiquadConfig`] tuples cross into the audio
//! thread.

use crate::config::{BLOCK_SIZE, SR};
use crate::error::{Result, SkylarkError};
use std::f64::consts::PI;

/// Normalized biquad coefficients (a0 = 1).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BiquadConfig {
    pub b0: f64,
    pub b1: f64,
    pub b2: f64,
    pub a1: f64,
    pub a2: f64,
    pub gain: f64,
}

/// An identity filter.
pub fn design_wire() -> BiquadConfig {
    BiquadConfig {
        b0: 1.0,
        b1: 0.0,
        b2: 0.0,
        a1: 0.0,
        a2: 0.0,
        gain: 1.0,
    }
}

fn check_frequency(frequency: f64) -> Result<f64> {
    if !(frequency > 0.0 && frequency < SR as f64 / 2.0) {
        return Err(SkylarkError::InvalidArgument(format!(
            "filter frequency {frequency} outside (0, {})",
            SR as f64 / 2.0
        )));
    }
    Ok(2.0 * PI * frequency / SR as f64)
}

fn check_q(q: f64) -> Result<f64> {
    if !(q > 0.0 && q.is_finite()) {
        return Err(SkylarkError::InvalidArgument(format!(
            "filter q {q} must be positive"
        )));
    }
    Ok(q)
}

fn normalized(b0: f64, b1: f64, b2: f64, a0: f64, a1: f64, a2: f64) -> BiquadConfig {
    BiquadConfig {
        b0: b0 / a0,
        b1: b1 / a0,
        b2: b2 / a0,
        a1: a1 / a0,
        a2: a2 / a0,
        gain: 1.0,
    }
}

/// RBJ lowpass from cutoff frequency and Q.
pub fn design_lowpass(frequency: f64, q: f64) -> Result<BiquadConfig> {
    let w0 = check_frequency(frequency)?;
    let q = check_q(q)?;
    let alpha = w0.sin() / (2.0 * q);
    let cosw0 = w0.cos();
    Ok(normalized(
        (1.0 - cosw0) / 2.0,
        1.0 - cosw0,
        (1.0 - cosw0) / 2.0,
        1.0 + alpha,
        -2.0 * cosw0,
        1.0 - alpha,
    ))
}

/// RBJ highpass from cutoff frequency and Q.
pub fn design_highpass(frequency: f64, q: f64) -> Result<BiquadConfig> {
    let w0 = check_frequency(frequency)?;
    let q = check_q(q)?;
    let alpha = w0.sin() / (2.0 * q);
    let cosw0 = w0.cos();
    Ok(normalized(
        (1.0 + cosw0) / 2.0,
        -(1.0 + cosw0),
        (1.0 + cosw0) / 2.0,
        1.0 + alpha,
        -2.0 * cosw0,
        1.0 - alpha,
    ))
}

/// RBJ constant-peak bandpass from center frequency and bandwidth in
/// octaves.
pub fn design_bandpass(frequency: f64, bandwidth: f64) -> Result<BiquadConfig> {
    let w0 = check_frequency(frequency)?;
    let bw = check_q(bandwidth)?;
    let alpha = w0.sin() * (2f64.ln() / 2.0 * bw * w0 / w0.sin()).sinh();
    let cosw0 = w0.cos();
    Ok(normalized(
        alpha,
        0.0,
        -alpha,
        1.0 + alpha,
        -2.0 * cosw0,
        1.0 - alpha,
    ))
}

/// Per-channel direct form II transposed state.
#[derive(Debug, Clone, Copy, Default)]
struct IirState {
    z1: f32,
    z2: f32,
}

#[derive(Debug, Clone)]
struct FilterInstance {
    b0: f32,
    b1: f32,
    b2: f32,
    a1: f32,
    a2: f32,
    states: Vec<IirState>,
}

impl FilterInstance {
    fn new(channels: usize) -> Self {
        let mut instance = Self {
            b0: 1.0,
            b1: 0.0,
            b2: 0.0,
            a1: 0.0,
            a2: 0.0,
            states: vec![IirState::default(); channels],
        };
        instance.set_config(&design_wire());
        instance
    }

    fn set_config(&mut self, config: &BiquadConfig) {
        self.b0 = (config.b0 * config.gain) as f32;
        self.b1 = (config.b1 * config.gain) as f32;
        self.b2 = (config.b2 * config.gain) as f32;
        self.a1 = config.a1 as f32;
        self.a2 = config.a2 as f32;
    }

    #[inline]
    fn tick(&mut self, channel: usize, x: f32) -> f32 {
        let state = &mut self.states[channel];
        let y = self.b0 * x + state.z1;
        state.z1 = self.b1 * x - self.a1 * y + state.z2;
        state.z2 = self.b2 * x - self.a2 * y;
        y
    }
}

/// Block filter over interleaved audio with one-block crossfade on
/// reconfiguration.
#[derive(Debug, Clone)]
pub(crate) struct BiquadBlock {
    filters: [FilterInstance; 2],
    active: usize,
    crossfade: bool,
    channels: usize,
}

impl BiquadBlock {
    pub(crate) fn new(channels: usize) -> Self {
        Self {
            filters: [FilterInstance::new(channels), FilterInstance::new(channels)],
            active: 0,
            crossfade: false,
            channels,
        }
    }

    /// Installs new coefficients. The inactive instance takes the new
    /// configuration and inherits the active instance's state so the next
    /// block can blend the two without a transient of its own.
    pub(crate) fn configure(&mut self, config: &BiquadConfig) {
        let states = self.filters[self.active].states.clone();
        let inactive = &mut self.filters[self.active ^ 1];
        inactive.set_config(config);
        inactive.states = states;
        self.crossfade = true;
    }

    /// Filters one block of `BLOCK_SIZE * channels` interleaved samples.
    /// With `add` the result sums into `output`; otherwise it overwrites.
    pub(crate) fn process(&mut self, input: &[f32], output: &mut [f32], add: bool) {
        debug_assert_eq!(input.len(), BLOCK_SIZE * self.channels);
        debug_assert_eq!(output.len(), BLOCK_SIZE * self.channels);

        if self.crossfade {
            self.process_crossfade(input, output, add);
            self.crossfade = false;
            self.active ^= 1;
        } else {
            self.process_steady(input, output, add);
        }
    }

    /// Filters one block in place (overwrite semantics). Each sample is read
    /// before its slot is written, so no scratch buffer is needed.
    pub(crate) fn process_in_place(&mut self, buffer: &mut [f32]) {
        debug_assert_eq!(buffer.len(), BLOCK_SIZE * self.channels);
        let channels = self.channels;
        if self.crossfade {
            let inv = 1.0 / BLOCK_SIZE as f32;
            let (old_idx, new_idx) = (self.active, self.active ^ 1);
            for frame in 0..BLOCK_SIZE {
                let w_new = frame as f32 * inv;
                for ch in 0..channels {
                    let idx = frame * channels + ch;
                    let x = buffer[idx];
                    let y_old = self.filters[old_idx].tick(ch, x);
                    let y_new = self.filters[new_idx].tick(ch, x);
                    // Lerp form: exact when both filters agree.
                    buffer[idx] = y_old + (y_new - y_old) * w_new;
                }
            }
            self.crossfade = false;
            self.active ^= 1;
        } else {
            let active = &mut self.filters[self.active];
            for frame in 0..BLOCK_SIZE {
                for ch in 0..channels {
                    let idx = frame * channels + ch;
                    buffer[idx] = active.tick(ch, buffer[idx]);
                }
            }
        }
    }

    fn process_steady(&mut self, input: &[f32], output: &mut [f32], add: bool) {
        let channels = self.channels;
        let active = &mut self.filters[self.active];
        for frame in 0..BLOCK_SIZE {
            for ch in 0..channels {
                let idx = frame * channels + ch;
                let y = active.tick(ch, input[idx]);
                if add {
                    output[idx] += y;
                } else {
                    output[idx] = y;
                }
            }
        }
    }

    fn process_crossfade(&mut self, input: &[f32], output: &mut [f32], add: bool) {
        let channels = self.channels;
        let inv = 1.0 / BLOCK_SIZE as f32;
        let (old_idx, new_idx) = (self.active, self.active ^ 1);
        for frame in 0..BLOCK_SIZE {
            let w_new = frame as f32 * inv;
            for ch in 0..channels {
                let idx = frame * channels + ch;
                let x = input[idx];
                let y_old = self.filters[old_idx].tick(ch, x);
                let y_new = self.filters[new_idx].tick(ch, x);
                // Lerp form: exact when both filters agree.
                let y = y_old + (y_new - y_old) * w_new;
                if add {
                    output[idx] += y;
                } else {
                    output[idx] = y;
                }
            }
        }
    }
}
