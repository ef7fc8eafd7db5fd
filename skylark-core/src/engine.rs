//! The audio-thread side of a context: the object arena and the per-block
//! loop.
//!
//! All audio-visible state lives here, keyed by handle in ordered maps so
//! iteration (and therefore mixing order) is deterministic. User threads
//! never touch this struct directly; they reach it through the property
//! ring, the command queue, and the deletion queue.

use crate::config::{BLOCK_SIZE, COMMAND_BUDGET, MAX_CHANNELS};
use crate::context::ContextShared;
use crate::dsp::fader::LinearFader;
use crate::effects::EffectState;
use crate::generators::Generator;
use crate::handle::Handle;
use crate::math::{Pose, Vec3};
use crate::properties::{Property, PropertyValue};
use crate::router::Router;
use crate::rt::deletion::{DeletionPayload, DeletionRecord};
use crate::rt::property_ring::PropertyWrite;
use crate::sources::{BlockEnv, SourceState};
use crate::spatial::distance::{DistanceModel, DistanceParams};
use crate::spatial::panner::PannerBank;
use std::any::Any;
use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::Ordering;

pub(crate) struct EngineState {
    pub channels: usize,
    pub context_handle: Handle,
    pub sources: BTreeMap<Handle, SourceState>,
    pub generators: BTreeMap<Handle, Box<dyn Generator>>,
    pub effects: BTreeMap<Handle, EffectState>,
    pub panners: PannerBank,
    pub router: Router,
    pub listener: Pose,
    pub default_distance: DistanceParams,
    master_gain: f64,
    master_dirty: bool,
    master_fader: LinearFader,
    direct_buffer: Vec<f32>,
    premix: Vec<f32>,
    deferred: VecDeque<DeletionRecord>,
    deferred_keep: VecDeque<DeletionRecord>,
}

impl EngineState {
    pub(crate) fn new(channels: usize, context_handle: Handle) -> Self {
        Self {
            channels,
            context_handle,
            sources: BTreeMap::new(),
            generators: BTreeMap::new(),
            effects: BTreeMap::new(),
            panners: PannerBank::new(),
            router: Router::new(),
            listener: Pose::identity(),
            default_distance: DistanceParams::default(),
            master_gain: 1.0,
            master_dirty: false,
            master_fader: LinearFader::new(1.0),
            direct_buffer: vec![0.0; BLOCK_SIZE * MAX_CHANNELS],
            premix: vec![0.0; BLOCK_SIZE * MAX_CHANNELS],
            deferred: VecDeque::new(),
            deferred_keep: VecDeque::new(),
        }
    }

    /// One full engine iteration, writing `BLOCK_SIZE * channels`
    /// interleaved samples into `destination`.
    pub(crate) fn generate_block(&mut self, shared: &ContextShared, destination: &mut [f32]) {
        let channels = self.channels;
        let time = shared.block_time.load(Ordering::Relaxed);
        debug_assert!(destination.len() >= BLOCK_SIZE * channels);

        self.drain_property_ring(shared);

        let mut budget = COMMAND_BUDGET;
        while budget > 0 {
            let Some(command) = shared.commands.try_dequeue() else {
                break;
            };
            // Writes enqueued before this command (by the same thread) must
            // be visible to it.
            self.drain_property_ring(shared);
            command(self, shared);
            budget -= 1;
        }

        destination[..BLOCK_SIZE * channels].fill(0.0);
        self.direct_buffer[..BLOCK_SIZE * channels].fill(0.0);

        if self.master_dirty {
            self.master_fader.set_value(time, self.master_gain as f32);
            self.master_dirty = false;
        }

        {
            let EngineState {
                sources,
                generators,
                effects,
                panners,
                router,
                listener,
                premix,
                direct_buffer,
                ..
            } = self;
            let mut env = BlockEnv {
                generators,
                effects,
                panners,
                router,
                listener: *listener,
                time,
                events: &shared.events,
                premix,
                direct: direct_buffer,
            };
            for (&handle, source) in sources.iter_mut() {
                source.run(handle, channels, &mut env);
            }
        }

        self.panners.run(channels, destination);

        for effect in self.effects.values_mut() {
            effect.run(channels, &mut self.direct_buffer);
        }
        for i in 0..BLOCK_SIZE * channels {
            destination[i] += self.direct_buffer[i];
        }

        let (start, step) = self.master_fader.block_ramp(time);
        if start != 1.0 || step != 0.0 {
            for frame in 0..BLOCK_SIZE {
                let gain = start + step * frame as f32;
                for ch in 0..channels {
                    destination[frame * channels + ch] *= gain;
                }
            }
        }

        {
            let EngineState {
                router,
                sources,
                effects,
                ..
            } = self;
            router.finish_block(
                |h| sources.contains_key(&h),
                |h| effects.contains_key(&h),
            );
        }

        self.drain_deletions(shared, time);
        shared.block_time.store(time + 1, Ordering::Release);
    }

    pub(crate) fn drain_property_ring(&mut self, shared: &ContextShared) {
        while let Some(write) = shared.properties.try_dequeue() {
            self.apply_property_write(write, shared);
        }
    }

    /// Applies one validated write. Writes to objects that died in the
    /// meantime are silently discarded.
    pub(crate) fn apply_property_write(&mut self, write: PropertyWrite, shared: &ContextShared) {
        let PropertyWrite {
            target,
            property,
            value,
        } = write;

        if target == self.context_handle {
            self.apply_context_property(property, &value);
            return;
        }
        if let Some(source) = self.sources.get_mut(&target) {
            source.apply_property(property, &value);
            return;
        }
        if let Some(generator) = self.generators.get_mut(&target) {
            if let Some(garbage) = generator.apply_property(property, &value) {
                self.dispose(garbage, shared);
            }
            return;
        }
        if let Some(effect) = self.effects.get_mut(&target) {
            if let Some(garbage) = effect.apply_property(property, &value) {
                self.dispose(garbage, shared);
            }
            return;
        }
        // Dead target: the write is discarded, but a shared-object payload
        // must still be freed off the audio thread.
        if let PropertyValue::Object(Some(object)) = value {
            self.dispose(Box::new(object), shared);
        }
    }

    fn apply_context_property(&mut self, id: Property, value: &PropertyValue) {
        match (id, value) {
            (Property::Gain, PropertyValue::Double(v)) => {
                self.master_gain = *v;
                self.master_dirty = true;
            }
            (Property::Position, PropertyValue::Double3(v)) => {
                self.listener.position = Vec3::new(v[0] as f32, v[1] as f32, v[2] as f32);
            }
            (Property::Orientation, PropertyValue::Double6(v)) => {
                self.listener = Pose::new(
                    self.listener.position,
                    Vec3::new(v[0] as f32, v[1] as f32, v[2] as f32),
                    Vec3::new(v[3] as f32, v[4] as f32, v[5] as f32),
                );
            }
            (Property::DistanceModel, PropertyValue::Int(v)) => {
                if let Some(model) = DistanceModel::from_i64(*v) {
                    self.default_distance.model = model;
                }
            }
            (Property::DistanceRef, PropertyValue::Double(v)) => {
                self.default_distance.distance_ref = *v;
            }
            (Property::DistanceMax, PropertyValue::Double(v)) => {
                self.default_distance.distance_max = *v;
            }
            (Property::Rolloff, PropertyValue::Double(v)) => {
                self.default_distance.rolloff = *v;
            }
            (Property::ClosenessBoost, PropertyValue::Double(v)) => {
                self.default_distance.closeness_boost = *v;
            }
            (Property::ClosenessBoostDistance, PropertyValue::Double(v)) => {
                self.default_distance.closeness_boost_distance = *v;
            }
            _ => {}
        }
    }

    fn fetch_context_property(&self, id: Property) -> Option<PropertyValue> {
        match id {
            Property::Gain => Some(PropertyValue::Double(self.master_gain)),
            Property::Position => {
                let p = self.listener.position;
                Some(PropertyValue::Double3([
                    p.x as f64, p.y as f64, p.z as f64,
                ]))
            }
            Property::Orientation => {
                let f = self.listener.forward;
                let u = self.listener.up;
                Some(PropertyValue::Double6([
                    f.x as f64, f.y as f64, f.z as f64, u.x as f64, u.y as f64, u.z as f64,
                ]))
            }
            Property::DistanceModel => {
                Some(PropertyValue::Int(self.default_distance.model as i64))
            }
            Property::DistanceRef => {
                Some(PropertyValue::Double(self.default_distance.distance_ref))
            }
            Property::DistanceMax => {
                Some(PropertyValue::Double(self.default_distance.distance_max))
            }
            Property::Rolloff => Some(PropertyValue::Double(self.default_distance.rolloff)),
            Property::ClosenessBoost => {
                Some(PropertyValue::Double(self.default_distance.closeness_boost))
            }
            Property::ClosenessBoostDistance => Some(PropertyValue::Double(
                self.default_distance.closeness_boost_distance,
            )),
            _ => None,
        }
    }

    /// Synchronous property read, run on the audio thread via `call`.
    pub(crate) fn fetch_property(&self, target: Handle, id: Property) -> Option<PropertyValue> {
        if target == self.context_handle {
            return self.fetch_context_property(id);
        }
        if let Some(source) = self.sources.get(&target) {
            return source.fetch_property(id);
        }
        if let Some(generator) = self.generators.get(&target) {
            return generator.fetch_property(id);
        }
        if let Some(effect) = self.effects.get(&target) {
            return effect.fetch_property(id);
        }
        None
    }

    pub(crate) fn dispose(&self, garbage: Box<dyn Any + Send>, shared: &ContextShared) {
        if shared.deletion.delete_directly() {
            drop(garbage);
        } else {
            shared.reclaimer.reclaim(garbage);
        }
    }

    fn drain_deletions(&mut self, shared: &ContextShared, time: u64) {
        while let Some(record) = shared.deletion.try_dequeue() {
            self.deferred.push_back(record);
        }
        while let Some(record) = self.deferred.pop_front() {
            if record.iteration < time {
                self.process_deletion(record, shared);
            } else {
                self.deferred_keep.push_back(record);
            }
        }
        std::mem::swap(&mut self.deferred, &mut self.deferred_keep);
    }

    pub(crate) fn process_deletion(&mut self, record: DeletionRecord, shared: &ContextShared) {
        match record.payload {
            DeletionPayload::Object { handle, kind } => {
                let garbage: Option<Box<dyn Any + Send>> = if kind.is_source() {
                    self.sources.remove(&handle).map(|mut source| {
                        source.release_resources(&mut self.panners);
                        Box::new(source) as Box<dyn Any + Send>
                    })
                } else if kind.is_generator() {
                    self.generators
                        .remove(&handle)
                        .map(|generator| Box::new(generator) as Box<dyn Any + Send>)
                } else if kind.is_effect() {
                    self.effects
                        .remove(&handle)
                        .map(|effect| Box::new(effect) as Box<dyn Any + Send>)
                } else {
                    None
                };
                if let Some(garbage) = garbage {
                    self.dispose(garbage, shared);
                }
            }
            DeletionPayload::Reclaim(garbage) => self.dispose(garbage, shared),
        }
    }

    /// Shutdown path: processes every pending record regardless of its
    /// iteration tag.
    pub(crate) fn drain_all_deletions(&mut self, shared: &ContextShared) {
        while let Some(record) = shared.deletion.try_dequeue() {
            self.deferred.push_back(record);
        }
        while let Some(record) = self.deferred.pop_front() {
            self.process_deletion(record, shared);
        }
    }
}
