//! Opaque handles and the handle table.
//!
//! Every user-visible object is referred to by a monotonically allocated
//! integer handle. The table's mutex is held only for allocation, lookup and
//! removal; the audio thread never touches it.

use crate::buffer::Buffer;
use crate::error::{Result, SkylarkError};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Opaque identifier for a user-visible engine object. Handles are never
/// reused within one context lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Handle(pub(crate) u64);

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What a handle refers to. Used for dynamic type checks at API boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    Context,
    Buffer,
    DirectSource,
    PannedSource,
    Source3D,
    BufferGenerator,
    StreamingGenerator,
    NoiseGenerator,
    EchoEffect,
    ReverbEffect,
}

impl ObjectKind {
    pub(crate) fn is_source(&self) -> bool {
        matches!(
            self,
            ObjectKind::DirectSource | ObjectKind::PannedSource | ObjectKind::Source3D
        )
    }

    pub(crate) fn is_generator(&self) -> bool {
        matches!(
            self,
            ObjectKind::BufferGenerator
                | ObjectKind::StreamingGenerator
                | ObjectKind::NoiseGenerator
        )
    }

    pub(crate) fn is_effect(&self) -> bool {
        matches!(self, ObjectKind::EchoEffect | ObjectKind::ReverbEffect)
    }
}

pub(crate) struct HandleEntry {
    pub kind: ObjectKind,
    /// Buffers keep their decoded data in the table; every other kind lives
    /// in the audio-thread arena and carries no payload here.
    pub buffer: Option<Arc<Buffer>>,
}

pub(crate) struct HandleTable {
    next: AtomicU64,
    entries: Mutex<HashMap<Handle, HandleEntry>>,
}

impl HandleTable {
    pub(crate) fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub(crate) fn allocate(&self, kind: ObjectKind, buffer: Option<Arc<Buffer>>) -> Handle {
        let handle = Handle(self.next.fetch_add(1, Ordering::Relaxed));
        self.entries
            .lock()
            .expect("handle table poisoned")
            .insert(handle, HandleEntry { kind, buffer });
        handle
    }

    pub(crate) fn kind_of(&self, handle: Handle) -> Result<ObjectKind> {
        self.entries
            .lock()
            .expect("handle table poisoned")
            .get(&handle)
            .map(|e| e.kind)
            .ok_or_else(|| SkylarkError::InvalidHandle(format!("no object for handle {handle}")))
    }

    pub(crate) fn buffer_of(&self, handle: Handle) -> Result<Arc<Buffer>> {
        let entries = self.entries.lock().expect("handle table poisoned");
        let entry = entries
            .get(&handle)
            .ok_or_else(|| SkylarkError::InvalidHandle(format!("no object for handle {handle}")))?;
        entry.buffer.clone().ok_or_else(|| {
            SkylarkError::HandleTypeMismatch(format!("handle {handle} is not a buffer"))
        })
    }

    /// Removes the entry. The caller is responsible for enqueueing the
    /// matching arena deletion (or reclaiming the buffer payload).
    pub(crate) fn remove(&self, handle: Handle) -> Result<HandleEntry> {
        self.entries
            .lock()
            .expect("handle table poisoned")
            .remove(&handle)
            .ok_or_else(|| SkylarkError::InvalidHandle(format!("no object for handle {handle}")))
    }

    /// Checks that `handle` exists and has one of the expected kinds.
    pub(crate) fn expect_kind(
        &self,
        handle: Handle,
        pred: impl Fn(ObjectKind) -> bool,
        wanted: &str,
    ) -> Result<ObjectKind> {
        let kind = self.kind_of(handle)?;
        if pred(kind) {
            Ok(kind)
        } else {
            Err(SkylarkError::HandleTypeMismatch(format!(
                "handle {handle} is a {kind:?}, expected {wanted}"
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handles_are_monotonic_and_not_reused() {
        let table = HandleTable::new();
        let a = table.allocate(ObjectKind::DirectSource, None);
        let b = table.allocate(ObjectKind::NoiseGenerator, None);
        assert!(b.0 > a.0);
        table.remove(a).unwrap();
        let c = table.allocate(ObjectKind::DirectSource, None);
        assert!(c.0 > b.0);
        assert!(table.kind_of(a).is_err());
    }
}
