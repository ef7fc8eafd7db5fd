//! Deferred destruction.
//!
//! Dropping the last user handle to an engine object must not destroy state
//! the audio thread may still be iterating. Instead the user thread enqueues
//! an iteration-tagged record; the audio thread removes the object from its
//! arena only once the tagged iteration has fully elapsed, then forwards the
//! carcass to a background reclaimer thread so the actual free never runs on
//! the realtime path.
//!
//! During shutdown `delete_directly` flips the whole mechanism to
//! synchronous deletion, and the final drain spin-waits on the
//! `in_progress` gate so no user thread is still mid-enqueue.

use crate::handle::{Handle, ObjectKind};
use crossbeam_channel::{unbounded, Receiver, Sender};
use std::any::Any;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;

pub(crate) enum DeletionPayload {
    /// Remove this object from the audio-thread arena.
    Object { handle: Handle, kind: ObjectKind },
    /// An already-detached allocation that just needs to be freed off the
    /// audio thread.
    Reclaim(Box<dyn Any + Send>),
}

pub(crate) struct DeletionRecord {
    /// `block_time` observed when the record was enqueued. The record is
    /// only processed once the engine has advanced past this iteration.
    pub iteration: u64,
    pub payload: DeletionPayload,
}

pub(crate) struct DeletionQueue {
    tx: Sender<DeletionRecord>,
    rx: Receiver<DeletionRecord>,
    in_progress: AtomicUsize,
    delete_directly: AtomicBool,
}

impl DeletionQueue {
    pub(crate) fn new() -> Self {
        let (tx, rx) = unbounded();
        Self {
            tx,
            rx,
            in_progress: AtomicUsize::new(0),
            delete_directly: AtomicBool::new(false),
        }
    }

    pub(crate) fn enqueue(&self, record: DeletionRecord) {
        self.in_progress.fetch_add(1, Ordering::Relaxed);
        let _ = self.tx.send(record);
        self.in_progress.fetch_sub(1, Ordering::Release);
    }

    pub(crate) fn try_dequeue(&self) -> Option<DeletionRecord> {
        self.rx.try_recv().ok()
    }

    pub(crate) fn delete_directly(&self) -> bool {
        self.delete_directly.load(Ordering::Relaxed)
    }

    pub(crate) fn set_delete_directly(&self) {
        self.delete_directly.store(true, Ordering::Relaxed);
    }

    /// Spin until no thread is mid-enqueue. Called once during shutdown,
    /// before the final drain.
    pub(crate) fn wait_for_enqueues(&self) {
        while self.in_progress.load(Ordering::Acquire) != 0 {
            thread::yield_now();
        }
    }
}

/// Background thread that performs the actual frees. Dropping the last
/// sender ends the thread.
pub(crate) struct Reclaimer {
    tx: Sender<Box<dyn Any + Send>>,
}

impl Reclaimer {
    pub(crate) fn spawn() -> Self {
        let (tx, rx): (Sender<Box<dyn Any + Send>>, Receiver<Box<dyn Any + Send>>) = unbounded();
        if let Err(e) = thread::Builder::new()
            .name("skylark-reclaim".to_string())
            .spawn(move || {
                while let Ok(garbage) = rx.recv() {
                    drop(garbage);
                }
                log::debug!("reclaimer thread exiting");
            })
        {
            log::warn!("failed to spawn reclaimer thread: {e}; frees will be inline");
        }
        Self { tx }
    }

    /// Hands an allocation to the reclaimer thread. If the thread is gone
    /// the drop happens inline, which is only reachable during teardown.
    pub(crate) fn reclaim(&self, garbage: Box<dyn Any + Send>) {
        let _ = self.tx.send(garbage);
    }
}
