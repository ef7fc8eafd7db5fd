//! Feedback delay network reverb.
//!
//! Eight modulated delay lines with a Householder feedback matrix. Line
//! lengths derive from the mean free path; per-line feedback gains derive
//! from T60, shaped in three bands (below the LF reference, between the
//! references, above the HF reference) so low and high frequencies can decay
//! at different rates. A pre-delay line implements the late reflections
//! delay.

use crate::config::{BLOCK_SIZE, SR};
use crate::dsp::delay::DelayLine;
use crate::effects::EffectShared;
use crate::properties::{Property, PropertyValue};

const LINES: usize = 8;

/// Mutually detuned length ratios, so the line lengths stay spread out for
/// any mean free path.
const LINE_RATIOS: [f64; LINES] = [1.0, 1.13, 1.27, 1.41, 1.53, 1.69, 1.83, 1.97];

/// Upper bounds used to size the delay lines once at construction.
const MAX_MEAN_FREE_PATH: f64 = 0.5;
const MAX_PREDELAY: f64 = 0.5;
const MAX_MODULATION_DEPTH: f64 = 0.3;

#[derive(Debug, Clone, Copy)]
struct ReverbParams {
    t60: f64,
    mean_free_path: f64,
    lf_rolloff: f64,
    lf_reference: f64,
    hf_rolloff: f64,
    hf_reference: f64,
    diffusion: f64,
    modulation_depth: f64,
    modulation_frequency: f64,
    late_delay: f64,
}

impl Default for ReverbParams {
    fn default() -> Self {
        Self {
            t60: 1.0,
            mean_free_path: 0.1,
            lf_rolloff: 1.0,
            lf_reference: 200.0,
            hf_rolloff: 0.5,
            hf_reference: 500.0,
            diffusion: 1.0,
            modulation_depth: 0.01,
            modulation_frequency: 0.5,
            late_delay: 0.03,
        }
    }
}

/// Derived per-line runtime state, recomputed when a parameter changes.
#[derive(Debug, Clone, Copy, Default)]
struct LineState {
    delay_samples: f32,
    gain_lf: f32,
    gain_mid: f32,
    gain_hf: f32,
    lp_lf: f32,
    lp_hf: f32,
    /// One-pole states for the two band splits.
    state_lf: f32,
    state_hf: f32,
    lfo_phase: f32,
}

pub(crate) struct ReverbEffect {
    pub(super) shared: EffectShared,
    pub(super) wet: Vec<f32>,
    params: ReverbParams,
    dirty: bool,
    lines: Vec<DelayLine>,
    line_states: [LineState; LINES],
    predelay: DelayLine,
    predelay_samples: usize,
    modulation_step: f32,
}

impl ReverbEffect {
    pub(crate) fn new() -> Self {
        let line_capacity =
            (MAX_MEAN_FREE_PATH * 2.0 * SR as f64 + MAX_MODULATION_DEPTH * SR as f64) as usize + 4;
        let mut reverb = Self {
            shared: EffectShared::new(1),
            wet: vec![0.0; BLOCK_SIZE * 2],
            params: ReverbParams::default(),
            dirty: true,
            lines: (0..LINES).map(|_| DelayLine::new(line_capacity)).collect(),
            line_states: [LineState::default(); LINES],
            predelay: DelayLine::new((MAX_PREDELAY * SR as f64) as usize + 1),
            predelay_samples: 0,
            modulation_step: 0.0,
        };
        reverb.recompute();
        reverb
    }

    /// Feedback gain giving a decay to -60 dB over `t60` seconds for a line
    /// of `delay_seconds`.
    fn t60_gain(delay_seconds: f64, t60: f64) -> f32 {
        if t60 <= 0.0 {
            return 0.0;
        }
        10f64.powf(-3.0 * delay_seconds / t60) as f32
    }

    fn one_pole_coefficient(cutoff: f64) -> f32 {
        let cutoff = cutoff.clamp(1.0, SR as f64 / 2.0 - 1.0);
        let x = (-2.0 * std::f64::consts::PI * cutoff / SR as f64).exp();
        (1.0 - x) as f32
    }

    fn recompute(&mut self) {
        let p = self.params;
        for (i, state) in self.line_states.iter_mut().enumerate() {
            let delay_seconds = (p.mean_free_path * LINE_RATIOS[i]).max(1.0 / SR as f64);
            state.delay_samples = (delay_seconds * SR as f64) as f32;
            state.gain_mid = Self::t60_gain(delay_seconds, p.t60);
            state.gain_lf = Self::t60_gain(delay_seconds, p.t60 * p.lf_rolloff);
            state.gain_hf = Self::t60_gain(delay_seconds, p.t60 * p.hf_rolloff);
            state.lp_lf = Self::one_pole_coefficient(p.lf_reference);
            state.lp_hf = Self::one_pole_coefficient(p.hf_reference);
            // Stagger the modulation phases so the lines don't breathe in
            // unison.
            state.lfo_phase = i as f32 / LINES as f32 * std::f32::consts::TAU;
        }
        self.predelay_samples =
            ((p.late_delay * SR as f64) as usize).min(self.predelay.capacity() - 1);
        self.modulation_step = (p.modulation_frequency * std::f64::consts::TAU / SR as f64) as f32;
        self.dirty = false;
    }

    pub(super) fn run_algorithm(&mut self) {
        if self.dirty {
            self.recompute();
        }
        let diffusion = self.params.diffusion as f32;
        let depth_samples = (self.params.modulation_depth * SR as f64) as f32;
        let input = &self.shared.filtered;

        for frame in 0..BLOCK_SIZE {
            self.predelay.write(input[frame]);
            let injected = self.predelay.read(self.predelay_samples);
            self.predelay.advance();

            let mut damped = [0.0f32; LINES];
            let mut sum = 0.0f32;
            for i in 0..LINES {
                let state = &mut self.line_states[i];
                let wobble = depth_samples * state.lfo_phase.sin().mul_add(0.5, 0.5);
                let raw = self.lines[i].read_fractional(state.delay_samples + wobble);
                state.lfo_phase = (state.lfo_phase + self.modulation_step) % std::f32::consts::TAU;

                // Three-band split with two one-pole lowpasses.
                state.state_lf += state.lp_lf * (raw - state.state_lf);
                let low = state.state_lf;
                let rest = raw - low;
                state.state_hf += state.lp_hf * (rest - state.state_hf);
                let mid = state.state_hf;
                let high = rest - mid;

                damped[i] = low * state.gain_lf + mid * state.gain_mid + high * state.gain_hf;
                sum += damped[i];
            }

            // Householder feedback, blended toward independent comb decay as
            // diffusion falls off.
            let householder = 2.0 / LINES as f32 * sum;
            let mut left = 0.0f32;
            let mut right = 0.0f32;
            for i in 0..LINES {
                let reflected = damped[i] - householder;
                let feedback = diffusion * reflected + (1.0 - diffusion) * damped[i];
                self.lines[i].write(injected + feedback);
                self.lines[i].advance();
                if i % 2 == 0 {
                    left += damped[i];
                } else {
                    right += damped[i];
                }
            }
            let scale = 2.0 / LINES as f32;
            self.wet[frame * 2] = left * scale;
            self.wet[frame * 2 + 1] = right * scale;
        }
    }

    pub(super) fn apply_property(&mut self, id: Property, value: &PropertyValue) {
        let Ok(v) = value.as_double() else {
            return;
        };
        match id {
            Property::T60 => self.params.t60 = v,
            Property::MeanFreePath => self.params.mean_free_path = v.min(MAX_MEAN_FREE_PATH),
            Property::LateReflectionsLfRolloff => self.params.lf_rolloff = v,
            Property::LateReflectionsLfReference => self.params.lf_reference = v,
            Property::LateReflectionsHfRolloff => self.params.hf_rolloff = v,
            Property::LateReflectionsHfReference => self.params.hf_reference = v,
            Property::LateReflectionsDiffusion => self.params.diffusion = v,
            Property::LateReflectionsModulationDepth => {
                self.params.modulation_depth = v.min(MAX_MODULATION_DEPTH)
            }
            Property::LateReflectionsModulationFrequency => self.params.modulation_frequency = v,
            Property::LateReflectionsDelay => self.params.late_delay = v.min(MAX_PREDELAY),
            _ => return,
        }
        self.dirty = true;
    }

    pub(super) fn fetch_property(&self, id: Property) -> Option<PropertyValue> {
        let p = &self.params;
        let v = match id {
            Property::T60 => p.t60,
            Property::MeanFreePath => p.mean_free_path,
            Property::LateReflectionsLfRolloff => p.lf_rolloff,
            Property::LateReflectionsLfReference => p.lf_reference,
            Property::LateReflectionsHfRolloff => p.hf_rolloff,
            Property::LateReflectionsHfReference => p.hf_reference,
            Property::LateReflectionsDiffusion => p.diffusion,
            Property::LateReflectionsModulationDepth => p.modulation_depth,
            Property::LateReflectionsModulationFrequency => p.modulation_frequency,
            Property::LateReflectionsDelay => p.late_delay,
            _ => return None,
        };
        Some(PropertyValue::Double(v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn energy(samples: &[f32]) -> f64 {
        samples.iter().map(|&s| (s as f64) * (s as f64)).sum()
    }

    #[test]
    fn impulse_produces_a_decaying_tail() {
        let mut reverb = ReverbEffect::new();
        reverb.apply_property(Property::T60, &PropertyValue::Double(0.5));

        reverb.shared.filtered[0] = 1.0;
        reverb.run_algorithm();
        reverb.shared.filtered.fill(0.0);

        let mut early = 0.0;
        let mut late = 0.0;
        // ~1.5 s of tail.
        for block in 0..260 {
            reverb.run_algorithm();
            let e = energy(&reverb.wet);
            if block < 30 {
                early += e;
            } else if block >= 200 {
                late += e;
            }
        }
        assert!(early > 0.0, "reverb produced no tail");
        assert!(late < early * 0.05, "tail failed to decay");
    }

    #[test]
    fn zero_t60_is_silent_feedback() {
        let mut reverb = ReverbEffect::new();
        reverb.apply_property(Property::T60, &PropertyValue::Double(0.0));
        reverb.shared.filtered[0] = 1.0;
        reverb.run_algorithm();
        reverb.shared.filtered.fill(0.0);
        for _ in 0..50 {
            reverb.run_algorithm();
        }
        assert!(energy(&reverb.wet) < 1e-12);
    }
}
