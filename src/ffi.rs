//! C boundary called by the embedding module
//!
//! | Export | Returns |
//! |---|---|
//! | `get_config()` | JSON buffer, or null on failure |
//! | `ws_open(address, port)` | positive handle, or 0 on failure |
//! | `ws_poll(handle)` | JSON event buffer, or null when nothing is queued or on failure |
//! | `ws_send(handle, message)` | 0, or a negative error code |
//! | `ws_close(handle)` | 0, or a negative error code |
//!
//! Buffers belong to the caller and must be released with `bridge_free`.
//! After a null or 0 return, `bridge_last_error()` tells failure (negative
//! code, see [`BridgeError::code`]) apart from an empty queue (0).
//!
//! There is one handle table per process. On wasm32 the host runs everything
//! on one thread. Natively the first thread to call in becomes the owner of
//! the table for the life of the process; calls from any other thread fail
//! with [`BridgeError::ForeignThread`] (`-8`) and leave the table untouched.

use crate::bridge::{ClosePolicy, SocketBridge};
use crate::buffer::{read_c_str, HostBuffer};
use crate::config::{ConfigExporter, ConfigSource};
use crate::error::{BridgeError, BridgeResult};
use crate::handle::Handle;
use crate::transport::PlatformConnector;
use std::cell::{Cell, RefCell};
use std::os::raw::c_char;
use std::ptr;

#[cfg(not(target_arch = "wasm32"))]
static OWNER: std::sync::OnceLock<std::thread::ThreadId> = std::sync::OnceLock::new();

// Only the owner thread ever initializes or touches BRIDGE and CONFIG.
thread_local! {
    static BRIDGE: RefCell<SocketBridge<PlatformConnector>> =
        RefCell::new(SocketBridge::new(PlatformConnector::default()));
    static CONFIG: RefCell<ConfigExporter> = RefCell::new(ConfigExporter::platform_default());
    static LAST_ERROR: Cell<i32> = const { Cell::new(0) };
}

fn claim() -> BridgeResult<()> {
    #[cfg(not(target_arch = "wasm32"))]
    {
        let current = std::thread::current().id();
        if *OWNER.get_or_init(|| current) != current {
            return Err(BridgeError::ForeignThread);
        }
    }
    Ok(())
}

/// Replace the configuration source behind `get_config`
pub fn set_host_config<S: ConfigSource + 'static>(source: S) -> BridgeResult<()> {
    claim()?;
    CONFIG.with(|config| config.borrow_mut().set_source(source));
    Ok(())
}

fn with_bridge<T>(
    f: impl FnOnce(&mut SocketBridge<PlatformConnector>) -> BridgeResult<T>,
) -> BridgeResult<T> {
    claim()?;
    BRIDGE.with(|bridge| f(&mut bridge.borrow_mut()))
}

fn record<T>(result: BridgeResult<T>) -> Option<T> {
    match result {
        Ok(value) => {
            LAST_ERROR.with(|last| last.set(0));
            Some(value)
        }
        Err(e) => {
            tracing::warn!("Boundary call failed: {}", e);
            LAST_ERROR.with(|last| last.set(e.code()));
            None
        }
    }
}

fn status(result: BridgeResult<()>) -> i32 {
    let code = result.as_ref().err().map_or(0, BridgeError::code);
    record(result);
    code
}

// Never-issued handles (0 and anything negative) fail the table lookup.
fn handle_arg(raw: i32) -> Handle {
    Handle::from_raw(u32::try_from(raw).unwrap_or(0))
}

/// Serialize the host configuration to a NUL-terminated JSON buffer.
#[no_mangle]
pub extern "C" fn get_config() -> *mut c_char {
    let result = claim().and_then(|()| CONFIG.with(|config| config.borrow().export()));
    record(result).map_or(ptr::null_mut(), HostBuffer::into_raw)
}

/// Start connecting to `ws://address:port/`.
///
/// # Safety
///
/// `address` must be null or a NUL-terminated string valid for the call.
#[no_mangle]
pub unsafe extern "C" fn ws_open(address: *const c_char, port: i32) -> i32 {
    let result = read_c_str(address, "address")
        .and_then(|address| with_bridge(|bridge| bridge.open(&address, port)))
        .and_then(|handle| {
            i32::try_from(handle.get()).map_err(|_| BridgeError::HandlesExhausted)
        });
    record(result).unwrap_or(0)
}

/// Pop the oldest event of `handle` as a JSON buffer.
#[no_mangle]
pub extern "C" fn ws_poll(handle: i32) -> *mut c_char {
    let result = with_bridge(|bridge| bridge.poll_encoded(handle_arg(handle)));
    match record(result) {
        Some(Some(buffer)) => buffer.into_raw(),
        _ => ptr::null_mut(),
    }
}

/// Send a text message on `handle`.
///
/// # Safety
///
/// `message` must be null or a NUL-terminated string valid for the call.
#[no_mangle]
pub unsafe extern "C" fn ws_send(handle: i32, message: *const c_char) -> i32 {
    let result = read_c_str(message, "message")
        .and_then(|message| with_bridge(|bridge| bridge.send(handle_arg(handle), &message)));
    status(result)
}

/// Close `handle` under the current close policy.
#[no_mangle]
pub extern "C" fn ws_close(handle: i32) -> i32 {
    status(with_bridge(|bridge| bridge.close(handle_arg(handle))))
}

/// Select what `ws_close` does with queued events: 0 discards them and
/// retires the handle at once, 1 keeps the handle until the close event
/// has been polled.
#[no_mangle]
pub extern "C" fn ws_set_close_policy(policy: i32) -> i32 {
    let result = ClosePolicy::from_code(policy)
        .ok_or_else(|| BridgeError::InvalidArgument(format!("close policy {}", policy)))
        .and_then(|policy| {
            with_bridge(|bridge| {
                bridge.set_close_policy(policy);
                Ok(())
            })
        });
    status(result)
}

/// Code of the last failed boundary call on this thread, 0 if the last call succeeded.
#[no_mangle]
pub extern "C" fn bridge_last_error() -> i32 {
    LAST_ERROR.with(Cell::get)
}

/// Release a buffer returned by `get_config` or `ws_poll`.
///
/// # Safety
///
/// `buffer` must be null or a pointer returned by this library that has not
/// been freed yet.
#[no_mangle]
pub unsafe extern "C" fn bridge_free(buffer: *mut c_char) {
    if !buffer.is_null() {
        drop(HostBuffer::from_raw(buffer));
    }
}

/// Route this library's logs to the console.
#[no_mangle]
pub extern "C" fn bridge_init_logging() {
    crate::logging::init_logging();
}
