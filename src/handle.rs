//! Integer handles naming open connections across the boundary

use crate::error::{BridgeError, BridgeResult};
use std::fmt;

/// Largest handle the allocator hands out, so every handle fits a C `int`.
pub const MAX_HANDLE: u32 = i32::MAX as u32;

/// An opaque positive integer naming one connection in a [`SocketBridge`].
///
/// Handles are issued in strictly increasing order starting at 1 and are
/// never reused within the lifetime of a bridge, even after close.
///
/// [`SocketBridge`]: crate::SocketBridge
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Handle(u32);

impl Handle {
    /// Wrap a raw value received from the embedding module.
    ///
    /// No check is made that the value was ever issued; lookups in the
    /// bridge reject unknown handles.
    pub fn from_raw(raw: u32) -> Self {
        Handle(raw)
    }

    /// The raw integer value
    pub fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Monotonic source of fresh handles.
#[derive(Debug)]
pub struct HandleAllocator {
    next: u32,
}

impl HandleAllocator {
    pub fn new() -> Self {
        Self { next: 1 }
    }

    /// Issue the next handle. Fails once [`MAX_HANDLE`] has been issued.
    pub fn allocate(&mut self) -> BridgeResult<Handle> {
        if self.next > MAX_HANDLE {
            return Err(BridgeError::HandlesExhausted);
        }
        let handle = Handle(self.next);
        self.next += 1;
        Ok(handle)
    }

    /// The handle the next call to [`allocate`](Self::allocate) would return
    pub fn peek(&self) -> Handle {
        Handle(self.next)
    }
}

impl Default for HandleAllocator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_at_one_and_increments() {
        let mut alloc = HandleAllocator::new();
        assert_eq!(alloc.allocate().unwrap().get(), 1);
        assert_eq!(alloc.allocate().unwrap().get(), 2);
        assert_eq!(alloc.peek().get(), 3);
    }

    #[test]
    fn test_exhaustion() {
        let mut alloc = HandleAllocator { next: MAX_HANDLE };
        assert_eq!(alloc.allocate().unwrap().get(), MAX_HANDLE);
        assert_eq!(alloc.allocate(), Err(BridgeError::HandlesExhausted));
        assert_eq!(alloc.allocate(), Err(BridgeError::HandlesExhausted));
    }
}
