//! Error types for Skylark.

use std::cell::RefCell;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SkylarkError {
    #[error("Invalid handle: {0}")]
    InvalidHandle(String),

    #[error("Handle type mismatch: {0}")]
    HandleTypeMismatch(String),

    #[error("Unknown property: {0}")]
    UnknownProperty(String),

    #[error("Property kind mismatch: {0}")]
    PropertyKindMismatch(String),

    #[error("Property out of range: {0}")]
    PropertyOutOfRange(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Resource exhausted: {0}")]
    ResourceExhausted(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Audio backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("Shutdown in progress")]
    ShutdownInProgress,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl SkylarkError {
    /// Stable integer code for this error kind.
    pub fn code(&self) -> i32 {
        match self {
            SkylarkError::InvalidHandle(_) => 1,
            SkylarkError::HandleTypeMismatch(_) => 2,
            SkylarkError::UnknownProperty(_) => 3,
            SkylarkError::PropertyKindMismatch(_) => 4,
            SkylarkError::PropertyOutOfRange(_) => 5,
            SkylarkError::InvalidArgument(_) => 6,
            SkylarkError::ResourceExhausted(_) => 7,
            SkylarkError::Io(_) => 8,
            SkylarkError::Decode(_) => 9,
            SkylarkError::BackendUnavailable(_) => 10,
            SkylarkError::ShutdownInProgress => 11,
            SkylarkError::Internal(_) => 12,
        }
    }
}

pub type Result<T> = std::result::Result<T, SkylarkError>;

thread_local! {
    static LAST_ERROR: RefCell<Option<(i32, String)>> = const { RefCell::new(None) };
}

/// Records `err` in thread-local storage so it can be retrieved after the
/// originating call has returned. Every public entry point routes its
/// failures through here.
pub(crate) fn stash<T>(result: Result<T>) -> Result<T> {
    if let Err(err) = &result {
        LAST_ERROR.with(|slot| {
            *slot.borrow_mut() = Some((err.code(), err.to_string()));
        });
    }
    result
}

/// Message of the most recent error raised on this thread, if any.
pub fn last_error_message() -> Option<String> {
    LAST_ERROR.with(|slot| slot.borrow().as_ref().map(|(_, m)| m.clone()))
}

/// Code of the most recent error raised on this thread, if any.
pub fn last_error_code() -> Option<i32> {
    LAST_ERROR.with(|slot| slot.borrow().as_ref().map(|(c, _)| *c))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stash_records_code_and_message() {
        let r: Result<()> = stash(Err(SkylarkError::InvalidHandle("handle 42".into())));
        assert!(r.is_err());
        assert_eq!(last_error_code(), Some(1));
        assert!(last_error_message().unwrap().contains("handle 42"));
    }
}
