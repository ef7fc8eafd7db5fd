//! Type-erased commands executed on the audio thread.
//!
//! Any thread may enqueue an invokable; the audio thread runs each exactly
//! once per block, up to [`crate::config::COMMAND_BUDGET`], in FIFO order per
//! producer. Waitable submission (the synchronous `call` primitive) pairs an
//! invokable with a one-shot completion channel and is assembled in
//! `context.rs`.

use crate::context::ContextShared;
use crate::engine::EngineState;
use crate::error::{Result, SkylarkError};
use crossbeam_channel::{unbounded, Receiver, Sender};

/// A closure run on the audio thread with full access to the engine arena
/// and the context's queues (for disposing displaced allocations).
pub(crate) type Invokable = Box<dyn FnOnce(&mut EngineState, &ContextShared) + Send + 'static>;

pub(crate) struct CommandQueue {
    tx: Sender<Invokable>,
    rx: Receiver<Invokable>,
}

impl CommandQueue {
    pub(crate) fn new() -> Self {
        let (tx, rx) = unbounded();
        Self { tx, rx }
    }

    pub(crate) fn enqueue(&self, invokable: Invokable) -> Result<()> {
        self.tx
            .send(invokable)
            .map_err(|_| SkylarkError::Internal("command queue disconnected".into()))
    }

    pub(crate) fn try_dequeue(&self) -> Option<Invokable> {
        self.rx.try_recv().ok()
    }
}
