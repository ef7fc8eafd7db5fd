//! Global effects: objects that receive routed audio into an input
//! accumulation buffer, filter it, run their algorithm, and add the wet
//! signal into the engine output.

mod echo;
mod reverb;

pub use echo::EchoTapConfig;
pub(crate) use echo::EchoEffect;
pub(crate) use reverb::ReverbEffect;

use crate::config::BLOCK_SIZE;
use crate::dsp::biquad::{design_lowpass, BiquadBlock};
use crate::dsp::channel_mix::mix_channels;
use crate::generators::Reclaimed;
use crate::properties::{Property, PropertyValue};

/// State common to every global effect: the routed-input accumulation
/// buffer, the input lowpass, and the wet gain.
pub(crate) struct EffectShared {
    input_channels: usize,
    input_buffer: Vec<f32>,
    filtered: Vec<f32>,
    input_filter: BiquadBlock,
    filter_enabled: bool,
    filter_cutoff: f64,
    gain: f64,
}

impl EffectShared {
    fn new(input_channels: usize) -> Self {
        Self {
            input_channels,
            input_buffer: vec![0.0; BLOCK_SIZE * input_channels],
            filtered: vec![0.0; BLOCK_SIZE * input_channels],
            input_filter: BiquadBlock::new(input_channels),
            filter_enabled: true,
            filter_cutoff: 22_050.0,
            gain: 1.0,
        }
    }

    /// Runs the input filter, leaving the block to feed the algorithm in
    /// `self.filtered`.
    fn prepare_input(&mut self) {
        if self.filter_enabled {
            self.input_filter
                .process(&self.input_buffer, &mut self.filtered, false);
        } else {
            self.filtered.copy_from_slice(&self.input_buffer);
        }
    }

    fn apply_common_property(&mut self, id: Property, value: &PropertyValue) -> bool {
        match (id, value) {
            (Property::Gain, PropertyValue::Double(v)) => {
                self.gain = *v;
                true
            }
            (Property::InputFilterEnabled, PropertyValue::Int(v)) => {
                self.filter_enabled = *v != 0;
                true
            }
            (Property::InputFilterCutoff, PropertyValue::Double(v)) => {
                self.filter_cutoff = *v;
                // Pure coefficient math, allocation free, so running it on
                // the audio thread is fine.
                if let Ok(config) = design_lowpass(v.clamp(1.0, 22_049.0), 0.7071) {
                    self.input_filter.configure(&config);
                }
                true
            }
            _ => false,
        }
    }

    fn fetch_common_property(&self, id: Property) -> Option<PropertyValue> {
        match id {
            Property::Gain => Some(PropertyValue::Double(self.gain)),
            Property::InputFilterEnabled => {
                Some(PropertyValue::Int(self.filter_enabled as i64))
            }
            Property::InputFilterCutoff => Some(PropertyValue::Double(self.filter_cutoff)),
            _ => None,
        }
    }
}

pub(crate) enum EffectState {
    Echo(EchoEffect),
    Reverb(ReverbEffect),
}

impl EffectState {
    fn shared(&self) -> &EffectShared {
        match self {
            EffectState::Echo(e) => &e.shared,
            EffectState::Reverb(r) => &r.shared,
        }
    }

    fn shared_mut(&mut self) -> &mut EffectShared {
        match self {
            EffectState::Echo(e) => &mut e.shared,
            EffectState::Reverb(r) => &mut r.shared,
        }
    }

    /// The router writes into this.
    pub(crate) fn input_mut(&mut self) -> (&mut [f32], usize) {
        let shared = self.shared_mut();
        (shared.input_buffer.as_mut_slice(), shared.input_channels)
    }

    /// Consumes the accumulated input, producing one stereo block that is
    /// mixed into `dest` at the engine channel count, scaled by the wet
    /// gain. The input buffer ends the call zeroed for the next block.
    pub(crate) fn run(&mut self, channels: usize, dest: &mut [f32]) {
        self.shared_mut().prepare_input();
        match self {
            EffectState::Echo(e) => e.run_algorithm(),
            EffectState::Reverb(r) => r.run_algorithm(),
        }
        let gain = self.shared().gain as f32;
        if gain != 0.0 {
            // Wet output is always stereo; mix it up or down to the engine
            // channel count on the way out.
            let wet: &[f32] = match self {
                EffectState::Echo(e) => &e.wet,
                EffectState::Reverb(r) => &r.wet,
            };
            debug_assert_eq!(wet.len(), BLOCK_SIZE * 2);
            let mut scaled = [0.0f32; BLOCK_SIZE * 2];
            for (out, &sample) in scaled.iter_mut().zip(wet.iter()) {
                *out = sample * gain;
            }
            mix_channels(BLOCK_SIZE, &scaled, 2, dest, channels);
        }
        self.shared_mut().input_buffer.fill(0.0);
    }

    pub(crate) fn apply_property(
        &mut self,
        id: Property,
        value: &PropertyValue,
    ) -> Option<Reclaimed> {
        if self.shared_mut().apply_common_property(id, value) {
            return None;
        }
        match self {
            EffectState::Echo(_) => None,
            EffectState::Reverb(r) => {
                r.apply_property(id, value);
                None
            }
        }
    }

    pub(crate) fn fetch_property(&self, id: Property) -> Option<PropertyValue> {
        if let Some(value) = self.shared().fetch_common_property(id) {
            return Some(value);
        }
        match self {
            EffectState::Echo(_) => None,
            EffectState::Reverb(r) => r.fetch_property(id),
        }
    }
}
