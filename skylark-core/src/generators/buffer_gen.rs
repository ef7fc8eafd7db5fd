//! Generator that plays a decoded buffer, with looping and pitch bend.

use crate::buffer::Buffer;
use crate::config::{BLOCK_SIZE, SR};
use crate::events::EventQueue;
use crate::events::SkylarkEvent;
use crate::generators::{Generator, Reclaimed};
use crate::handle::Handle;
use crate::properties::{ObjectValue, Property, PropertyValue};
use std::sync::Arc;

pub(crate) struct BufferGenerator {
    buffer: Option<ObjectValue>,
    /// Fractional read cursor in frames. Pitch bend advances it by a
    /// non-unit step; reads interpolate linearly around it.
    position: f64,
    pitch_bend: f64,
    looping: bool,
    finished: bool,
}

impl BufferGenerator {
    pub(crate) fn new() -> Self {
        Self {
            buffer: None,
            position: 0.0,
            pitch_bend: 1.0,
            looping: false,
            finished: false,
        }
    }

    #[inline]
    fn read_frame(buffer: &Arc<Buffer>, position: f64, looping: bool, out: &mut [f32]) {
        let frames = buffer.frames();
        let i0 = position as usize;
        let frac = (position - i0 as f64) as f32;
        let i1 = if i0 + 1 < frames {
            i0 + 1
        } else if looping {
            0
        } else {
            i0
        };
        for (channel, sample) in out.iter_mut().enumerate() {
            let a = buffer.sample(i0, channel);
            let b = buffer.sample(i1, channel);
            *sample = a + (b - a) * frac;
        }
    }
}

impl Generator for BufferGenerator {
    fn channels(&self) -> usize {
        self.buffer.as_ref().map_or(0, |b| b.buffer.channels())
    }

    fn generate(&mut self, output: &mut [f32], handle: Handle, events: &EventQueue) {
        let Some(object) = self.buffer.as_ref() else {
            return;
        };
        let buffer = &object.buffer;
        let channels = buffer.channels();
        let frames = buffer.frames();
        if frames == 0 || self.finished {
            return;
        }

        let mut frame_samples = [0.0f32; crate::config::MAX_CHANNELS];
        for frame in 0..BLOCK_SIZE {
            // Wrap (or finish) before reading so a cursor parked exactly on
            // the end, e.g. by a seek, never reads past the last frame.
            while self.position >= frames as f64 {
                if self.looping {
                    self.position -= frames as f64;
                    events.emit(SkylarkEvent::Looped { generator: handle });
                } else {
                    events.emit(SkylarkEvent::Finished { generator: handle });
                    self.finished = true;
                    self.position = frames as f64;
                    break;
                }
            }
            if self.finished {
                break;
            }

            Self::read_frame(
                buffer,
                self.position,
                self.looping,
                &mut frame_samples[..channels],
            );
            for channel in 0..channels {
                output[frame * channels + channel] += frame_samples[channel];
            }
            self.position += self.pitch_bend;
        }
    }

    fn apply_property(&mut self, id: Property, value: &PropertyValue) -> Option<Reclaimed> {
        match (id, value) {
            (Property::Buffer, PropertyValue::Object(object)) => {
                let old = self.buffer.take();
                self.buffer = object.clone();
                self.position = 0.0;
                self.finished = false;
                old.map(|o| Box::new(o) as Reclaimed)
            }
            (Property::Looping, PropertyValue::Int(v)) => {
                self.looping = *v != 0;
                if self.looping {
                    self.finished = false;
                }
                None
            }
            (Property::PitchBend, PropertyValue::Double(v)) => {
                self.pitch_bend = *v;
                None
            }
            (Property::PlaybackPosition, PropertyValue::Double(seconds)) => {
                let frames = self.buffer.as_ref().map_or(0, |b| b.buffer.frames());
                self.position = (seconds * SR as f64).clamp(0.0, frames as f64);
                self.finished = false;
                None
            }
            _ => None,
        }
    }

    fn fetch_property(&self, id: Property) -> Option<PropertyValue> {
        match id {
            Property::Buffer => Some(PropertyValue::Object(self.buffer.clone())),
            Property::Looping => Some(PropertyValue::Int(self.looping as i64)),
            Property::PitchBend => Some(PropertyValue::Double(self.pitch_bend)),
            Property::PlaybackPosition => {
                Some(PropertyValue::Double(self.position / SR as f64))
            }
            _ => None,
        }
    }
}
