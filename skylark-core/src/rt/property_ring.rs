//! The bounded property-write ring.
//!
//! User threads batch typed property writes through this fixed-capacity
//! channel; the audio thread drains it at the start of every block and again
//! before each command so that a command observes every write enqueued
//! before it by the same thread. On overflow the caller falls back to the
//! command path, which is unbounded but slower.

use crate::config::PROPERTY_RING_CAPACITY;
use crate::handle::Handle;
use crate::properties::{Property, PropertyValue};
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};

#[derive(Debug, Clone)]
pub(crate) struct PropertyWrite {
    pub target: Handle,
    pub property: Property,
    pub value: PropertyValue,
}

pub(crate) struct PropertyRing {
    tx: Sender<PropertyWrite>,
    rx: Receiver<PropertyWrite>,
}

impl PropertyRing {
    pub(crate) fn new() -> Self {
        let (tx, rx) = bounded(PROPERTY_RING_CAPACITY);
        Self { tx, rx }
    }

    /// Attempts to enqueue a write. A full ring hands the write back so the
    /// caller can take the command path instead.
    pub(crate) fn enqueue(&self, write: PropertyWrite) -> std::result::Result<(), PropertyWrite> {
        match self.tx.try_send(write) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(write)) => Err(write),
            // Only possible mid-teardown; the write is moot.
            Err(TrySendError::Disconnected(_)) => Ok(()),
        }
    }

    pub(crate) fn try_dequeue(&self) -> Option<PropertyWrite> {
        self.rx.try_recv().ok()
    }
}
