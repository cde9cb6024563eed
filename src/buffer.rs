//! NUL-terminated buffers handed across the boundary

use crate::error::{BridgeError, BridgeResult};
use std::ffi::{CStr, CString};
use std::os::raw::c_char;

/// An owned, NUL-terminated UTF-8 buffer returned to the embedding module.
///
/// The buffer is sized to the encoded length plus the terminator. Allocation
/// is fallible so an exhausted heap surfaces as [`BridgeError::OutOfMemory`]
/// rather than an abort. Ownership moves to the caller with
/// [`into_raw`](Self::into_raw); it must come back through
/// [`from_raw`](Self::from_raw) (the `bridge_free` export) to be released.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostBuffer(CString);

impl HostBuffer {
    /// Allocate a buffer and copy `text` into it
    pub fn from_text(text: &str) -> BridgeResult<Self> {
        let requested = text.len() + 1;
        let mut bytes = Vec::new();
        bytes
            .try_reserve_exact(requested)
            .map_err(|_| BridgeError::OutOfMemory { requested })?;
        bytes.extend_from_slice(text.as_bytes());

        CString::new(bytes).map(HostBuffer).map_err(|e| {
            BridgeError::Encoding(format!("interior NUL byte at offset {}", e.nul_position()))
        })
    }

    /// Encoded length, excluding the terminator
    pub fn len(&self) -> usize {
        self.0.as_bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_str(&self) -> &str {
        // Only ever built from a &str.
        self.0.to_str().unwrap_or_default()
    }

    /// Give up ownership of the buffer
    pub fn into_raw(self) -> *mut c_char {
        self.0.into_raw()
    }

    /// Reclaim a buffer previously released with [`into_raw`](Self::into_raw).
    ///
    /// # Safety
    ///
    /// `ptr` must come from `HostBuffer::into_raw` and must not have been
    /// reclaimed already.
    pub unsafe fn from_raw(ptr: *mut c_char) -> Self {
        HostBuffer(CString::from_raw(ptr))
    }
}

/// Copy a NUL-terminated UTF-8 string passed in by the embedding module.
///
/// # Safety
///
/// `ptr` must be null or point to a NUL-terminated string that stays valid
/// for the duration of the call.
pub unsafe fn read_c_str(ptr: *const c_char, what: &str) -> BridgeResult<String> {
    if ptr.is_null() {
        return Err(BridgeError::InvalidArgument(format!("{what} is null")));
    }
    CStr::from_ptr(ptr)
        .to_str()
        .map(str::to_owned)
        .map_err(|e| BridgeError::InvalidArgument(format!("{what} is not UTF-8: {e}")))
}
