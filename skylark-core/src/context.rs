//! The context: public API surface of one engine instance.
//!
//! [`SkylarkContext`] owns the audio device (or the headless pull) and is
//! the entry point for creating objects. [`SkylarkClient`] is the cheaply
//! cloneable half that any thread can use to create objects, write
//! properties, and poll events; every mutation travels to the audio thread
//! through the property ring, the command queue, or the deletion queue.
//!
//! # Architecture
//!
//! - **User threads**: validate arguments against the handle table and the
//!   static property tables, then enqueue.
//! - **Audio thread**: drains the queues at block boundaries and is the only
//!   mutator of audio-visible state.

use crate::buffer::Buffer;
use crate::config::{BLOCK_SIZE, EVENT_QUEUE_CAPACITY, MAX_CHANNELS, SkylarkDesc};
use crate::dsp::biquad::BiquadConfig;
use crate::effects::{EchoEffect, EchoTapConfig, EffectState, ReverbEffect};
use crate::engine::EngineState;
use crate::error::{stash, Result, SkylarkError};
use crate::events::{EventQueue, SkylarkEvent};
use crate::generators::{BufferGenerator, NoiseGenerator, StreamingGenerator};
use crate::handle::{Handle, HandleTable, ObjectKind};
use crate::output;
use crate::properties::{self, ObjectValue, Property, PropertyValue};
use crate::rt::commands::CommandQueue;
use crate::rt::deletion::{DeletionPayload, DeletionQueue, DeletionRecord, Reclaimer};
use crate::rt::property_ring::{PropertyRing, PropertyWrite};
use crate::sources::{SourceKind, SourceState};
use crossbeam_channel::{bounded, Receiver};
use std::ops::Deref;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// State shared between the user-facing API and the audio thread.
pub(crate) struct ContextShared {
    pub handle: Handle,
    pub handles: HandleTable,
    pub commands: CommandQueue,
    pub properties: PropertyRing,
    pub deletion: DeletionQueue,
    pub events: EventQueue,
    pub events_rx: Receiver<SkylarkEvent>,
    pub block_time: AtomicU64,
    pub running: AtomicBool,
    pub in_audio_callback: AtomicBool,
    pub headless: bool,
    pub reclaimer: Reclaimer,
    channels: AtomicUsize,
    pub state: Mutex<EngineState>,
}

impl ContextShared {
    pub(crate) fn channels(&self) -> usize {
        self.channels.load(Ordering::Relaxed)
    }

    pub(crate) fn set_channels(&self, channels: usize) {
        self.channels.store(channels, Ordering::Relaxed);
        if let Ok(mut state) = self.state.lock() {
            state.channels = channels;
        }
    }
}

/// Cloneable handle to a context, usable from any thread.
#[derive(Clone)]
pub struct SkylarkClient {
    shared: Arc<ContextShared>,
}

/// An engine instance bound to one audio device (or running headless).
///
/// Derefs to [`SkylarkClient`], which carries the whole mutation API.
pub struct SkylarkContext {
    client: SkylarkClient,
    stream: Option<cpal::Stream>,
}

impl Deref for SkylarkContext {
    type Target = SkylarkClient;

    fn deref(&self) -> &SkylarkClient {
        &self.client
    }
}

fn build_shared(desc: &SkylarkDesc, headless: bool) -> Arc<ContextShared> {
    let handles = HandleTable::new();
    let handle = handles.allocate(ObjectKind::Context, None);
    let (events, events_rx) = EventQueue::new(EVENT_QUEUE_CAPACITY);
    let channels = (desc.channels as usize).clamp(1, MAX_CHANNELS);
    Arc::new(ContextShared {
        handle,
        handles,
        commands: CommandQueue::new(),
        properties: PropertyRing::new(),
        deletion: DeletionQueue::new(),
        events,
        events_rx,
        block_time: AtomicU64::new(0),
        running: AtomicBool::new(true),
        in_audio_callback: AtomicBool::new(false),
        headless,
        reclaimer: Reclaimer::spawn(),
        channels: AtomicUsize::new(channels),
        state: Mutex::new(EngineState::new(channels, handle)),
    })
}

impl SkylarkContext {
    /// Opens the default output device and starts producing audio
    /// immediately. The channel count is negotiated with the device.
    pub fn new(desc: SkylarkDesc) -> Result<Self> {
        stash(Self::new_impl(desc))
    }

    fn new_impl(desc: SkylarkDesc) -> Result<Self> {
        let shared = build_shared(&desc, false);
        let stream = output::start(&shared)?;
        log::info!(
            "context {} started on device output, {} channels",
            shared.handle,
            shared.channels()
        );
        Ok(Self {
            client: SkylarkClient { shared },
            stream: Some(stream),
        })
    }

    /// Creates a context with no device; the caller drives it by pulling
    /// blocks through [`Self::generate_block`].
    pub fn new_headless(desc: SkylarkDesc) -> Result<Self> {
        let shared = build_shared(&desc, true);
        log::info!(
            "context {} started headless, {} channels",
            shared.handle,
            shared.channels()
        );
        Ok(Self {
            client: SkylarkClient { shared },
            stream: None,
        })
    }

    /// Headless pull: produce exactly one block of interleaved output.
    /// `destination` must hold `BLOCK_SIZE * channels` samples.
    pub fn generate_block(&self, destination: &mut [f32]) -> Result<()> {
        stash(self.generate_block_impl(destination))
    }

    fn generate_block_impl(&self, destination: &mut [f32]) -> Result<()> {
        let shared = &self.client.shared;
        if !shared.headless {
            return Err(SkylarkError::InvalidArgument(
                "generate_block is only available on headless contexts".into(),
            ));
        }
        self.client.ensure_running()?;
        let needed = BLOCK_SIZE * shared.channels();
        if destination.len() != needed {
            return Err(SkylarkError::InvalidArgument(format!(
                "destination holds {} samples, expected {}",
                destination.len(),
                needed
            )));
        }
        let mut state = lock_state(shared)?;
        state.generate_block(shared, destination);
        Ok(())
    }

    /// Stops audio, then runs the final deletion drain. Blocks until the
    /// audio callback has observed the stop. All subsequent calls on this
    /// context return [`SkylarkError::ShutdownInProgress`].
    pub fn shutdown(&mut self) -> Result<()> {
        let shared = self.client.shared.clone();
        if !shared.running.swap(false, Ordering::SeqCst) {
            return Ok(());
        }
        log::debug!("context {} shutting down", shared.handle);
        if let Some(stream) = self.stream.take() {
            drop(stream);
        }
        while shared.in_audio_callback.load(Ordering::Acquire) {
            std::thread::yield_now();
        }
        shared.deletion.set_delete_directly();
        shared.deletion.wait_for_enqueues();

        let mut state = lock_state(&shared)?;
        // Complete any in-flight waitable calls, then run every enqueued
        // destructor.
        while let Some(command) = shared.commands.try_dequeue() {
            command(&mut state, &shared);
        }
        state.drain_property_ring(&shared);
        state.drain_all_deletions(&shared);
        Ok(())
    }
}

impl Drop for SkylarkContext {
    fn drop(&mut self) {
        let _ = self.shutdown();
    }
}

fn lock_state<'a>(shared: &'a ContextShared) -> Result<std::sync::MutexGuard<'a, EngineState>> {
    shared
        .state
        .lock()
        .map_err(|_| SkylarkError::Internal("engine state poisoned".into()))
}

impl SkylarkClient {
    fn ensure_running(&self) -> Result<()> {
        if self.shared.running.load(Ordering::Relaxed) {
            Ok(())
        } else {
            Err(SkylarkError::ShutdownInProgress)
        }
    }

    /// The context's own handle, target for listener and default-distance
    /// properties.
    pub fn context_handle(&self) -> Handle {
        self.shared.handle
    }

    /// Output channel count.
    pub fn channels(&self) -> usize {
        self.shared.channels()
    }

    /// Number of blocks produced so far.
    pub fn block_time(&self) -> u64 {
        self.shared.block_time.load(Ordering::Relaxed)
    }

    /// Runs `f` on the audio thread and returns its result. The calling
    /// thread blocks until the next block boundary; on headless contexts the
    /// closure runs inline after a property-ring drain.
    pub(crate) fn call<R, F>(&self, f: F) -> Result<R>
    where
        R: Send + 'static,
        F: FnOnce(&mut EngineState) -> R + Send + 'static,
    {
        if self.shared.headless {
            let shared = &self.shared;
            let mut state = lock_state(shared)?;
            state.drain_property_ring(shared);
            return Ok(f(&mut state));
        }
        let (tx, rx) = bounded(1);
        self.shared.commands.enqueue(Box::new(move |state, _shared| {
            let _ = tx.send(f(state));
        }))?;
        rx.recv()
            .map_err(|_| SkylarkError::Internal("audio thread unavailable".into()))
    }

    fn enqueue_command(
        &self,
        f: impl FnOnce(&mut EngineState, &ContextShared) + Send + 'static,
    ) -> Result<()> {
        self.shared.commands.enqueue(Box::new(f))?;
        if self.shared.headless {
            // No audio thread will drain for us until the next pull; keep
            // command effects ordered with synchronous calls by draining
            // eagerly here.
            let shared = &self.shared;
            let mut state = lock_state(shared)?;
            state.drain_property_ring(shared);
            while let Some(command) = shared.commands.try_dequeue() {
                command(&mut state, shared);
            }
        }
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Object creation
    // ---------------------------------------------------------------------

    /// Decodes a file into a new buffer handle.
    pub fn create_buffer_from_file(&self, path: &str) -> Result<Handle> {
        stash(self.ensure_running().and_then(|_| {
            let buffer = Buffer::from_file(path)?;
            Ok(self.shared.handles.allocate(ObjectKind::Buffer, Some(buffer)))
        }))
    }

    /// Wraps already-decoded interleaved samples in a buffer handle.
    pub fn create_buffer_from_samples(
        &self,
        samples: &[f32],
        channels: u16,
        sample_rate: u32,
    ) -> Result<Handle> {
        stash(self.ensure_running().and_then(|_| {
            let buffer = Buffer::from_samples(samples, channels, sample_rate)?;
            Ok(self.shared.handles.allocate(ObjectKind::Buffer, Some(buffer)))
        }))
    }

    /// Decodes an in-memory encoded stream into a buffer handle.
    pub fn create_buffer_from_encoded_bytes(&self, bytes: Vec<u8>) -> Result<Handle> {
        stash(self.ensure_running().and_then(|_| {
            let buffer = Buffer::from_encoded_bytes(bytes)?;
            Ok(self.shared.handles.allocate(ObjectKind::Buffer, Some(buffer)))
        }))
    }

    fn register_source(&self, kind: ObjectKind, source: SourceState) -> Result<Handle> {
        let handle = self.shared.handles.allocate(kind, None);
        self.call(move |state| {
            let mut source = source;
            if let SourceKind::Spatial(s) = &mut source.kind {
                s.distance = state.default_distance;
            }
            source.init_audio_thread(&mut state.panners);
            state.sources.insert(handle, source);
        })?;
        Ok(handle)
    }

    /// A source that mixes its generators straight into the context output.
    pub fn create_direct_source(&self) -> Result<Handle> {
        stash(self.ensure_running().and_then(|_| {
            let source = SourceState::new_direct(self.shared.channels());
            self.register_source(ObjectKind::DirectSource, source)
        }))
    }

    /// A mono source panned by azimuth/elevation or a panning scalar.
    /// Defaults to the HRTF strategy.
    pub fn create_panned_source(&self) -> Result<Handle> {
        stash(self.ensure_running().and_then(|_| {
            let source = SourceState::new_panned(crate::spatial::panner::PannerStrategy::Hrtf);
            self.register_source(ObjectKind::PannedSource, source)
        }))
    }

    /// A fully positional source; pan parameters and attenuation derive from
    /// the listener pose each block.
    pub fn create_source3d(&self) -> Result<Handle> {
        stash(self.ensure_running().and_then(|_| {
            let source = SourceState::new_spatial(crate::spatial::panner::PannerStrategy::Hrtf);
            self.register_source(ObjectKind::Source3D, source)
        }))
    }

    fn register_generator(
        &self,
        kind: ObjectKind,
        generator: Box<dyn crate::generators::Generator>,
    ) -> Result<Handle> {
        let handle = self.shared.handles.allocate(kind, None);
        self.call(move |state| {
            state.generators.insert(handle, generator);
        })?;
        Ok(handle)
    }

    /// A generator that plays a decoded buffer (set its BUFFER property).
    pub fn create_buffer_generator(&self) -> Result<Handle> {
        stash(self.ensure_running().and_then(|_| {
            self.register_generator(
                ObjectKind::BufferGenerator,
                Box::new(BufferGenerator::new()),
            )
        }))
    }

    /// A noise generator with the given channel count.
    pub fn create_noise_generator(&self, channels: u16) -> Result<Handle> {
        stash(self.ensure_running().and_then(|_| {
            if channels == 0 || channels as usize > MAX_CHANNELS {
                return Err(SkylarkError::InvalidArgument(format!(
                    "noise generator channels {channels} outside [1, {MAX_CHANNELS}]"
                )));
            }
            self.register_generator(
                ObjectKind::NoiseGenerator,
                Box::new(NoiseGenerator::new(channels as usize)),
            )
        }))
    }

    /// A generator that streams a file through a helper decode thread.
    pub fn create_streaming_generator(&self, path: &str) -> Result<Handle> {
        stash(self.ensure_running().and_then(|_| {
            let generator = StreamingGenerator::new(path)?;
            self.register_generator(ObjectKind::StreamingGenerator, Box::new(generator))
        }))
    }

    /// A global stereo multi-tap echo (configure with
    /// [`Self::echo_set_taps`]).
    pub fn create_echo(&self) -> Result<Handle> {
        stash(self.ensure_running().and_then(|_| {
            let handle = self.shared.handles.allocate(ObjectKind::EchoEffect, None);
            let effect = EffectState::Echo(EchoEffect::new());
            self.call(move |state| {
                state.effects.insert(handle, effect);
            })?;
            Ok(handle)
        }))
    }

    /// A global FDN reverb.
    pub fn create_reverb(&self) -> Result<Handle> {
        stash(self.ensure_running().and_then(|_| {
            let handle = self.shared.handles.allocate(ObjectKind::ReverbEffect, None);
            let effect = EffectState::Reverb(ReverbEffect::new());
            self.call(move |state| {
                state.effects.insert(handle, effect);
            })?;
            Ok(handle)
        }))
    }

    /// Releases a handle. The object's destruction is deferred until the
    /// audio thread has fully moved past the current block.
    pub fn handle_free(&self, handle: Handle) -> Result<()> {
        stash(self.handle_free_impl(handle))
    }

    fn handle_free_impl(&self, handle: Handle) -> Result<()> {
        self.ensure_running()?;
        if handle == self.shared.handle {
            return Err(SkylarkError::InvalidArgument(
                "the context handle cannot be freed".into(),
            ));
        }
        let entry = self.shared.handles.remove(handle)?;
        if let Some(buffer) = entry.buffer {
            // Buffers live in the table, not the arena; any generator still
            // using this buffer keeps its own strong reference.
            self.shared.reclaimer.reclaim(Box::new(buffer));
            return Ok(());
        }
        let record = DeletionRecord {
            iteration: self.shared.block_time.load(Ordering::Relaxed),
            payload: DeletionPayload::Object {
                handle,
                kind: entry.kind,
            },
        };
        if self.shared.deletion.delete_directly() {
            let mut state = lock_state(&self.shared)?;
            state.process_deletion(record, &self.shared);
        } else {
            self.shared.deletion.enqueue(record);
        }
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Graph edits
    // ---------------------------------------------------------------------

    /// Appends a generator to a source's generator list. Duplicates are
    /// ignored; insertion order is the mixing order.
    pub fn source_add_generator(&self, source: Handle, generator: Handle) -> Result<()> {
        stash(self.ensure_running().and_then(|_| {
            self.shared
                .handles
                .expect_kind(source, |k| k.is_source(), "a source")?;
            self.shared
                .handles
                .expect_kind(generator, |k| k.is_generator(), "a generator")?;
            self.enqueue_command(move |state, _| {
                if let Some(s) = state.sources.get_mut(&source) {
                    s.add_generator(generator);
                }
            })
        }))
    }

    pub fn source_remove_generator(&self, source: Handle, generator: Handle) -> Result<()> {
        stash(self.ensure_running().and_then(|_| {
            self.shared
                .handles
                .expect_kind(source, |k| k.is_source(), "a source")?;
            self.enqueue_command(move |state, _| {
                if let Some(s) = state.sources.get_mut(&source) {
                    s.remove_generator(generator);
                }
            })
        }))
    }

    /// The source's generator list, in mixing order.
    pub fn source_generator_handles(&self, source: Handle) -> Result<Vec<Handle>> {
        stash(self.ensure_running().and_then(|_| {
            self.shared
                .handles
                .expect_kind(source, |k| k.is_source(), "a source")?;
            self.call(move |state| {
                state
                    .sources
                    .get(&source)
                    .map(|s| s.generator_handles())
                    .unwrap_or_default()
            })
        }))
    }

    pub fn source_play(&self, source: Handle) -> Result<()> {
        self.set_source_paused(source, false)
    }

    /// A paused source contributes exactly zero and resumes
    /// phase-continuously.
    pub fn source_pause(&self, source: Handle) -> Result<()> {
        self.set_source_paused(source, true)
    }

    fn set_source_paused(&self, source: Handle, paused: bool) -> Result<()> {
        stash(self.ensure_running().and_then(|_| {
            self.shared
                .handles
                .expect_kind(source, |k| k.is_source(), "a source")?;
            self.enqueue_command(move |state, _| {
                if let Some(s) = state.sources.get_mut(&source) {
                    s.set_paused(paused);
                }
            })
        }))
    }

    /// Installs a designed biquad on a source's output. Use the
    /// `design_*` functions to produce the configuration.
    pub fn source_set_filter(&self, source: Handle, config: BiquadConfig) -> Result<()> {
        stash(self.ensure_running().and_then(|_| {
            self.shared
                .handles
                .expect_kind(source, |k| k.is_source(), "a source")?;
            self.enqueue_command(move |state, _| {
                if let Some(s) = state.sources.get_mut(&source) {
                    s.set_filter(&config);
                }
            })
        }))
    }

    /// Creates (or retargets) a routing edge from a source to a global
    /// effect. A new edge fades in from silence over `fade_blocks` blocks.
    pub fn effect_connect(
        &self,
        source: Handle,
        effect: Handle,
        gain: f64,
        fade_blocks: u64,
    ) -> Result<()> {
        stash(self.ensure_running().and_then(|_| {
            self.shared
                .handles
                .expect_kind(source, |k| k.is_source(), "a source")?;
            self.shared
                .handles
                .expect_kind(effect, |k| k.is_effect(), "an effect")?;
            if !(0.0..=16.0).contains(&gain) {
                return Err(SkylarkError::InvalidArgument(format!(
                    "route gain {gain} outside [0, 16]"
                )));
            }
            self.enqueue_command(move |state, _| {
                state
                    .router
                    .configure_route(source, effect, gain as f32, fade_blocks);
            })
        }))
    }

    /// Fades the edge to silence and drops it.
    pub fn effect_disconnect(
        &self,
        source: Handle,
        effect: Handle,
        fade_blocks: u64,
    ) -> Result<()> {
        stash(self.ensure_running().and_then(|_| {
            self.shared
                .handles
                .expect_kind(source, |k| k.is_source(), "a source")?;
            self.enqueue_command(move |state, _| {
                state.router.remove_route(source, effect, fade_blocks);
            })
        }))
    }

    /// Number of live routing edges.
    pub fn route_count(&self) -> Result<usize> {
        stash(
            self.ensure_running()
                .and_then(|_| self.call(|state| state.router.route_count())),
        )
    }

    /// Replaces an echo's tap set. The new taps fade in over one block.
    pub fn echo_set_taps(&self, effect: Handle, taps: &[EchoTapConfig]) -> Result<()> {
        stash(self.ensure_running().and_then(|_| {
            self.shared
                .handles
                .expect_kind(effect, |k| k == ObjectKind::EchoEffect, "an echo effect")?;
            let prepared = EchoEffect::prepare_taps(taps)?;
            self.enqueue_command(move |state, shared| {
                if let Some(EffectState::Echo(echo)) = state.effects.get_mut(&effect) {
                    let old = echo.install_taps(prepared);
                    state.dispose(Box::new(old), shared);
                }
            })
        }))
    }

    // ---------------------------------------------------------------------
    // Properties
    // ---------------------------------------------------------------------

    /// Validates and enqueues a property write through the ring, falling
    /// back to the command path when the ring is full.
    pub fn set_property(&self, target: Handle, id: Property, value: PropertyValue) -> Result<()> {
        stash(self.set_property_impl(target, id, value, false))
    }

    /// Like [`Self::set_property`] but applied synchronously via the command
    /// path; returns once the audio thread has the value.
    pub fn set_property_sync(
        &self,
        target: Handle,
        id: Property,
        value: PropertyValue,
    ) -> Result<()> {
        stash(self.set_property_impl(target, id, value, true))
    }

    fn set_property_impl(
        &self,
        target: Handle,
        id: Property,
        value: PropertyValue,
        synchronous: bool,
    ) -> Result<()> {
        self.ensure_running()?;
        let kind = self.shared.handles.kind_of(target)?;
        properties::validate(kind, id, &value)?;
        let write = PropertyWrite {
            target,
            property: id,
            value,
        };
        if synchronous {
            if self.shared.headless {
                return self.enqueue_command(move |state, shared| {
                    state.apply_property_write(write, shared);
                });
            }
            let (tx, rx) = bounded(1);
            self.shared.commands.enqueue(Box::new(move |state, shared| {
                state.apply_property_write(write, shared);
                let _ = tx.send(());
            }))?;
            return rx
                .recv()
                .map_err(|_| SkylarkError::Internal("audio thread unavailable".into()));
        }
        if let Err(write) = self.shared.properties.enqueue(write) {
            log::debug!("property ring full, falling back to command path");
            self.enqueue_command(move |state, shared| {
                state.apply_property_write(write, shared);
            })?;
        }
        Ok(())
    }

    pub fn get_property(&self, target: Handle, id: Property) -> Result<PropertyValue> {
        stash(self.get_property_impl(target, id))
    }

    fn get_property_impl(&self, target: Handle, id: Property) -> Result<PropertyValue> {
        self.ensure_running()?;
        let kind = self.shared.handles.kind_of(target)?;
        properties::lookup(kind, id)?;
        self.call(move |state| state.fetch_property(target, id))?
            .ok_or_else(|| {
                SkylarkError::Internal(format!("object {target} missing from engine"))
            })
    }

    pub fn set_i(&self, target: Handle, id: Property, value: i64) -> Result<()> {
        self.set_property(target, id, PropertyValue::Int(value))
    }

    pub fn set_d(&self, target: Handle, id: Property, value: f64) -> Result<()> {
        self.set_property(target, id, PropertyValue::Double(value))
    }

    pub fn set_d3(&self, target: Handle, id: Property, value: [f64; 3]) -> Result<()> {
        self.set_property(target, id, PropertyValue::Double3(value))
    }

    pub fn set_d6(&self, target: Handle, id: Property, value: [f64; 6]) -> Result<()> {
        self.set_property(target, id, PropertyValue::Double6(value))
    }

    /// Sets a shared-object property (currently only BUFFER).
    pub fn set_o(&self, target: Handle, id: Property, object: Option<Handle>) -> Result<()> {
        stash(self.ensure_running().and_then(|_| {
            let value = match object {
                None => PropertyValue::Object(None),
                Some(h) => {
                    let buffer = self.shared.handles.buffer_of(h)?;
                    PropertyValue::Object(Some(ObjectValue { handle: h, buffer }))
                }
            };
            self.set_property_impl(target, id, value, false)
        }))
    }

    pub fn get_i(&self, target: Handle, id: Property) -> Result<i64> {
        self.get_property(target, id)?.as_int()
    }

    pub fn get_d(&self, target: Handle, id: Property) -> Result<f64> {
        self.get_property(target, id)?.as_double()
    }

    pub fn get_d3(&self, target: Handle, id: Property) -> Result<[f64; 3]> {
        self.get_property(target, id)?.as_double3()
    }

    pub fn get_d6(&self, target: Handle, id: Property) -> Result<[f64; 6]> {
        self.get_property(target, id)?.as_double6()
    }

    pub fn get_o(&self, target: Handle, id: Property) -> Result<Option<Handle>> {
        Ok(self
            .get_property(target, id)?
            .as_object()?
            .map(|o| o.handle))
    }

    // ---------------------------------------------------------------------
    // Events
    // ---------------------------------------------------------------------

    /// Pops the oldest pending event, if any.
    pub fn poll_event(&self) -> Option<SkylarkEvent> {
        self.shared.events_rx.try_recv().ok()
    }
}
