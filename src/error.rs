//! Error types for bridge operations

use crate::handle::Handle;
use thiserror::Error;

/// Result type alias for bridge operations
pub type BridgeResult<T> = Result<T, BridgeError>;

/// Errors that can occur while servicing a call from the embedding module.
///
/// Asynchronous transport failures (refused connections, abrupt disconnects)
/// are never reported here; they arrive as [`SocketEvent::Closed`] events.
///
/// [`SocketEvent::Closed`]: crate::SocketEvent::Closed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BridgeError {
    /// The handle is not in the table (already closed or never opened)
    #[error("Unknown socket handle: {0}")]
    UnknownHandle(Handle),

    /// The connection has not reached the open state, or is closing
    #[error("Socket {0} is not open")]
    NotOpen(Handle),

    /// A configuration value or event payload could not be serialized
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// A buffer for a cross-boundary return value could not be allocated
    #[error("Out of memory: failed to allocate {requested} bytes")]
    OutOfMemory { requested: usize },

    /// The underlying transport refused a request
    #[error("Transport error: {0}")]
    Transport(String),

    /// Every representable handle has been handed out
    #[error("Socket handles exhausted")]
    HandlesExhausted,

    /// A boundary argument could not be read (null pointer, invalid UTF-8)
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The boundary was called from a thread other than the one that owns it
    #[error("Bridge is owned by another thread")]
    ForeignThread,
}

impl BridgeError {
    /// Stable code reported across the C boundary. Always negative.
    pub fn code(&self) -> i32 {
        match self {
            BridgeError::UnknownHandle(_) => -1,
            BridgeError::NotOpen(_) => -2,
            BridgeError::Encoding(_) => -3,
            BridgeError::OutOfMemory { .. } => -4,
            BridgeError::Transport(_) => -5,
            BridgeError::HandlesExhausted => -6,
            BridgeError::InvalidArgument(_) => -7,
            BridgeError::ForeignThread => -8,
        }
    }
}

impl From<serde_json::Error> for BridgeError {
    fn from(e: serde_json::Error) -> Self {
        BridgeError::Encoding(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_distinct_and_negative() {
        let errors = [
            BridgeError::UnknownHandle(Handle::from_raw(1)),
            BridgeError::NotOpen(Handle::from_raw(1)),
            BridgeError::Encoding("x".to_string()),
            BridgeError::OutOfMemory { requested: 1 },
            BridgeError::Transport("x".to_string()),
            BridgeError::HandlesExhausted,
            BridgeError::InvalidArgument("x".to_string()),
            BridgeError::ForeignThread,
        ];
        let mut codes: Vec<i32> = errors.iter().map(BridgeError::code).collect();
        assert!(codes.iter().all(|c| *c < 0));
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
    }

    #[test]
    fn test_serde_error_maps_to_encoding() {
        let err = serde_json::from_str::<u8>("nope").unwrap_err();
        assert!(matches!(BridgeError::from(err), BridgeError::Encoding(_)));
    }

    #[test]
    fn test_display() {
        let err = BridgeError::UnknownHandle(Handle::from_raw(7));
        assert_eq!(err.to_string(), "Unknown socket handle: 7");
    }
}
