//! Generator that streams a file through a helper decode thread.
//!
//! The helper thread decodes ahead into a single-producer single-consumer
//! ring of interleaved samples. The audio thread pops whatever is available
//! and substitutes silence on underrun without ever blocking. Until the ring
//! has buffered a full block the generator reports zero channels, so its
//! source skips it.

use crate::config::BLOCK_SIZE;
use crate::decode::DecodeStream;
use crate::error::Result;
use crate::events::{EventQueue, SkylarkEvent};
use crate::generators::{Generator, Reclaimed};
use crate::handle::Handle;
use crate::properties::{Property, PropertyValue};
use std::cell::Cell;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// How many blocks of lookahead the decode thread keeps buffered.
const LOOKAHEAD_BLOCKS: usize = 16;

pub(crate) struct StreamingGenerator {
    channels: usize,
    consumer: rtrb::Consumer<f32>,
    looping: Arc<AtomicBool>,
    eof: Arc<AtomicBool>,
    shutdown: Arc<AtomicBool>,
    primed: Cell<bool>,
    finished_reported: bool,
}

impl StreamingGenerator {
    /// Probes the file on the calling thread (so format errors surface
    /// immediately), then spawns the decode thread.
    pub(crate) fn new(path: &str) -> Result<Self> {
        let stream = DecodeStream::open_file(path)?;
        let channels = stream.channels as usize;
        let capacity = BLOCK_SIZE * channels * LOOKAHEAD_BLOCKS;
        let (producer, consumer) = rtrb::RingBuffer::new(capacity);

        let looping = Arc::new(AtomicBool::new(false));
        let eof = Arc::new(AtomicBool::new(false));
        let shutdown = Arc::new(AtomicBool::new(false));

        let thread_looping = looping.clone();
        let thread_eof = eof.clone();
        let thread_shutdown = shutdown.clone();
        let thread_path = path.to_string();
        if let Err(e) = thread::Builder::new()
            .name("skylark-stream".to_string())
            .spawn(move || {
                decode_worker(
                    stream,
                    producer,
                    thread_looping,
                    thread_eof,
                    thread_shutdown,
                    thread_path,
                );
            })
        {
            log::error!("failed to spawn streaming decode thread: {e}");
        }

        Ok(Self {
            channels,
            consumer,
            looping,
            eof,
            shutdown,
            primed: Cell::new(false),
            finished_reported: false,
        })
    }
}

fn decode_worker(
    mut stream: DecodeStream,
    mut producer: rtrb::Producer<f32>,
    looping: Arc<AtomicBool>,
    eof: Arc<AtomicBool>,
    shutdown: Arc<AtomicBool>,
    path: String,
) {
    let mut pending: Vec<f32> = Vec::new();
    let mut pending_pos = 0;

    loop {
        if shutdown.load(Ordering::Relaxed) {
            return;
        }

        // Flush what we already decoded before pulling more.
        if pending_pos < pending.len() {
            while pending_pos < pending.len() {
                if producer.push(pending[pending_pos]).is_err() {
                    // Ring full; let the audio thread catch up.
                    thread::sleep(Duration::from_millis(2));
                    if shutdown.load(Ordering::Relaxed) {
                        return;
                    }
                    continue;
                }
                pending_pos += 1;
            }
            continue;
        }

        match stream.next_packet() {
            Ok(Some(samples)) => {
                pending = samples;
                pending_pos = 0;
            }
            Ok(None) => {
                if looping.load(Ordering::Relaxed) {
                    if let Err(e) = stream.rewind() {
                        log::error!("streaming rewind failed for {path}: {e}");
                        eof.store(true, Ordering::Release);
                        return;
                    }
                    continue;
                }
                eof.store(true, Ordering::Release);
                // Stay alive in case looping gets enabled later.
                loop {
                    thread::sleep(Duration::from_millis(10));
                    if shutdown.load(Ordering::Relaxed) {
                        return;
                    }
                    if looping.load(Ordering::Relaxed) {
                        if stream.rewind().is_err() {
                            return;
                        }
                        eof.store(false, Ordering::Release);
                        break;
                    }
                }
            }
            Err(e) => {
                log::error!("streaming decode failed for {path}: {e}");
                eof.store(true, Ordering::Release);
                return;
            }
        }
    }
}

impl Generator for StreamingGenerator {
    fn channels(&self) -> usize {
        if self.primed.get() {
            return self.channels;
        }
        let ready = self.consumer.slots() >= BLOCK_SIZE * self.channels;
        if ready || self.eof.load(Ordering::Acquire) {
            self.primed.set(true);
            return self.channels;
        }
        0
    }

    fn generate(&mut self, output: &mut [f32], handle: Handle, events: &EventQueue) {
        let wanted = BLOCK_SIZE * self.channels;
        let mut read = 0;
        while read < wanted {
            match self.consumer.pop() {
                Ok(sample) => {
                    output[read] += sample;
                    read += 1;
                }
                Err(_) => break,
            }
        }
        // The untouched remainder of `output` is the underrun silence.

        if read < wanted
            && self.eof.load(Ordering::Acquire)
            && self.consumer.is_empty()
            && !self.finished_reported
        {
            events.emit(SkylarkEvent::Finished { generator: handle });
            self.finished_reported = true;
        }
    }

    fn apply_property(&mut self, id: Property, value: &PropertyValue) -> Option<Reclaimed> {
        if id == Property::Looping {
            if let PropertyValue::Int(v) = value {
                self.looping.store(*v != 0, Ordering::Relaxed);
                if *v != 0 {
                    self.finished_reported = false;
                }
            }
        }
        None
    }

    fn fetch_property(&self, id: Property) -> Option<PropertyValue> {
        match id {
            Property::Looping => Some(PropertyValue::Int(
                self.looping.load(Ordering::Relaxed) as i64
            )),
            _ => None,
        }
    }
}

impl Drop for StreamingGenerator {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }
}
