//! Sources compose generators into the engine graph.
//!
//! Every source variant shares one pipeline per block: zero the accumulation
//! buffer, run each live generator into it (channel-mixing as needed), drive
//! the gain fader, optionally filter, deliver to the variant's output, and
//! pump the router so effect sends work for every source type.

mod panned;
mod spatial3d;

pub(crate) use panned::PannedData;
pub(crate) use spatial3d::SpatialData;

use crate::config::{BLOCK_SIZE, MAX_CHANNELS};
use crate::dsp::biquad::{BiquadBlock, BiquadConfig};
use crate::dsp::channel_mix::mix_channels;
use crate::dsp::fader::LinearFader;
use crate::effects::EffectState;
use crate::events::EventQueue;
use crate::generators::Generator;
use crate::handle::Handle;
use crate::math::Pose;
use crate::properties::{Property, PropertyValue};
use crate::router::Router;
use crate::spatial::panner::{PannerBank, PannerStrategy};
use std::collections::BTreeMap;

/// Everything a source needs from the engine for one block, as disjoint
/// borrows so sources can be iterated mutably alongside.
pub(crate) struct BlockEnv<'a> {
    pub generators: &'a mut BTreeMap<Handle, Box<dyn Generator>>,
    pub effects: &'a mut BTreeMap<Handle, EffectState>,
    pub panners: &'a mut PannerBank,
    pub router: &'a Router,
    pub listener: Pose,
    pub time: u64,
    pub events: &'a EventQueue,
    pub premix: &'a mut [f32],
    pub direct: &'a mut [f32],
}

pub(crate) enum SourceKind {
    Direct,
    Panned(PannedData),
    Spatial(SpatialData),
}

pub(crate) struct SourceState {
    generators: Vec<Handle>,
    block: Vec<f32>,
    gain: f64,
    gain_dirty: bool,
    fader: LinearFader,
    paused: bool,
    filter: BiquadBlock,
    filter_engaged: bool,
    pub(crate) kind: SourceKind,
}

impl SourceState {
    fn new(kind: SourceKind, fill_channels: usize) -> Self {
        Self {
            generators: Vec::new(),
            block: vec![0.0; BLOCK_SIZE * MAX_CHANNELS],
            gain: 1.0,
            gain_dirty: false,
            fader: LinearFader::new(1.0),
            paused: false,
            filter: BiquadBlock::new(fill_channels),
            filter_engaged: false,
            kind,
        }
    }

    pub(crate) fn new_direct(channels: usize) -> Self {
        Self::new(SourceKind::Direct, channels)
    }

    pub(crate) fn new_panned(strategy: PannerStrategy) -> Self {
        Self::new(SourceKind::Panned(PannedData::new(strategy)), 1)
    }

    pub(crate) fn new_spatial(strategy: PannerStrategy) -> Self {
        Self::new(SourceKind::Spatial(SpatialData::new(strategy)), 1)
    }

    /// Second-phase initialization, run on the audio thread before the
    /// source is inserted into the arena.
    pub(crate) fn init_audio_thread(&mut self, panners: &mut PannerBank) {
        match &mut self.kind {
            SourceKind::Direct => {}
            SourceKind::Panned(p) => p.ensure_lane(panners),
            SourceKind::Spatial(s) => s.panned.ensure_lane(panners),
        }
    }

    pub(crate) fn release_resources(&mut self, panners: &mut PannerBank) {
        match &mut self.kind {
            SourceKind::Direct => {}
            SourceKind::Panned(p) => p.release_lane(panners),
            SourceKind::Spatial(s) => s.panned.release_lane(panners),
        }
    }

    pub(crate) fn add_generator(&mut self, generator: Handle) {
        if !self.generators.contains(&generator) {
            self.generators.push(generator);
        }
    }

    pub(crate) fn remove_generator(&mut self, generator: Handle) {
        self.generators.retain(|&h| h != generator);
    }

    pub(crate) fn generator_handles(&self) -> Vec<Handle> {
        self.generators.clone()
    }

    pub(crate) fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    pub(crate) fn set_filter(&mut self, config: &BiquadConfig) {
        self.filter.configure(config);
        self.filter_engaged = true;
    }

    /// Runs the shared pipeline at `channels`, ending with the accumulation
    /// buffer gained (and filtered) in `self.block`. Returns false when the
    /// source is paused and contributed nothing.
    fn fill_block(&mut self, channels: usize, target_gain: f32, env: &mut BlockEnv<'_>) -> bool {
        let frames = BLOCK_SIZE * channels;
        self.block[..frames].fill(0.0);

        if self.paused {
            return false;
        }

        if self.gain_dirty || (target_gain - self.fader.target()).abs() > 1e-9 {
            self.fader.set_value(env.time, target_gain);
            self.gain_dirty = false;
        }

        // Prune dead generator handles, then run the live ones.
        let generator_map = &mut *env.generators;
        self.generators.retain(|h| generator_map.contains_key(h));
        for &gh in self.generators.iter() {
            let Some(generator) = generator_map.get_mut(&gh) else {
                continue;
            };
            let nch = generator.channels();
            if nch == 0 {
                continue;
            }
            if nch == channels {
                generator.generate(&mut self.block[..frames], gh, env.events);
            } else {
                let premix = &mut env.premix[..BLOCK_SIZE * nch];
                premix.fill(0.0);
                generator.generate(premix, gh, env.events);
                mix_channels(BLOCK_SIZE, premix, nch, &mut self.block[..frames], channels);
            }
        }

        let (start, step) = self.fader.block_ramp(env.time);
        for frame in 0..BLOCK_SIZE {
            let g = start + step * frame as f32;
            for ch in 0..channels {
                self.block[frame * channels + ch] *= g;
            }
        }

        if self.filter_engaged {
            self.filter.process_in_place(&mut self.block[..frames]);
        }
        true
    }

    fn panned_mut(&mut self) -> Option<&mut PannedData> {
        match &mut self.kind {
            SourceKind::Direct => None,
            SourceKind::Panned(p) => Some(p),
            SourceKind::Spatial(s) => Some(&mut s.panned),
        }
    }

    /// One block of this source: fill, deliver to the variant output, route
    /// to effects.
    pub(crate) fn run(&mut self, handle: Handle, channels: usize, env: &mut BlockEnv<'_>) {
        if matches!(self.kind, SourceKind::Direct) {
            let target = self.gain as f32;
            if !self.fill_block(channels, target, env) {
                return;
            }
            for i in 0..BLOCK_SIZE * channels {
                env.direct[i] += self.block[i];
            }
            env.router.route_audio(
                handle,
                &self.block[..BLOCK_SIZE * channels],
                channels,
                env.effects,
            );
            return;
        }

        // 3D sources derive their pan parameters and attenuation from the
        // listener before the shared pipeline runs.
        let mut target = self.gain as f32;
        if let SourceKind::Spatial(s) = &mut self.kind {
            target = (self.gain * s.update(env.listener)) as f32;
        }
        {
            let panned = self.panned_mut().expect("non-direct source has pan data");
            panned.ensure_lane(env.panners);
            panned.push_params(env.panners);
        }

        if !self.fill_block(1, target, env) {
            return;
        }

        if let Some(lane) = self.panned_mut().and_then(|p| p.lane()) {
            if let Some(dest) = env.panners.lane_input_mut(lane) {
                dest.copy_from_slice(&self.block[..BLOCK_SIZE]);
            }
        }
        env.router
            .route_audio(handle, &self.block[..BLOCK_SIZE], 1, env.effects);
    }

    pub(crate) fn apply_property(&mut self, id: Property, value: &PropertyValue) {
        match (id, &mut self.kind) {
            (Property::Gain, _) => {
                if let PropertyValue::Double(v) = value {
                    self.gain = *v;
                    self.gain_dirty = true;
                }
            }
            (_, SourceKind::Panned(p)) => p.apply_property(id, value),
            (_, SourceKind::Spatial(s)) => s.apply_property(id, value),
            (_, SourceKind::Direct) => {}
        }
    }

    pub(crate) fn fetch_property(&self, id: Property) -> Option<PropertyValue> {
        if id == Property::Gain {
            return Some(PropertyValue::Double(self.gain));
        }
        match &self.kind {
            SourceKind::Direct => None,
            SourceKind::Panned(p) => p.fetch_property(id),
            SourceKind::Spatial(s) => s.fetch_property(id),
        }
    }
}
