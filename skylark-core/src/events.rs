//! Event types for Skylark.

use crate::handle::Handle;
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};

/// Events emitted by generators, polled from the context's event queue.
///
/// Within one block events arrive in order of occurrence, oldest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkylarkEvent {
    /// A looping generator wrapped around its end.
    Looped { generator: Handle },
    /// A non-looping generator ran out of data and will emit silence from
    /// now on.
    Finished { generator: Handle },
}

impl SkylarkEvent {
    pub fn generator(&self) -> Handle {
        match self {
            SkylarkEvent::Looped { generator } | SkylarkEvent::Finished { generator } => *generator,
        }
    }
}

/// Bounded event channel. The audio thread emits without blocking; events
/// that arrive while the queue is full are counted and dropped.
pub(crate) struct EventQueue {
    tx: Sender<SkylarkEvent>,
    dropped: std::sync::atomic::AtomicU64,
}

impl EventQueue {
    pub(crate) fn new(capacity: usize) -> (Self, Receiver<SkylarkEvent>) {
        let (tx, rx) = bounded(capacity);
        (
            Self {
                tx,
                dropped: std::sync::atomic::AtomicU64::new(0),
            },
            rx,
        )
    }

    pub(crate) fn emit(&self, event: SkylarkEvent) {
        if let Err(TrySendError::Full(_)) = self.tx.try_send(event) {
            self.dropped
                .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        }
    }
}
