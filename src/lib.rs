//! # WASM Host Bridge
//!
//! Exposes two host capabilities to a compiled module running inside a
//! JavaScript host: the host's JSON configuration, and browser WebSocket
//! connections addressed by small integer handles.
//!
//! ## Features
//!
//! - **Handle table**: [`SocketBridge`] maps handles to connections. Handles
//!   start at 1, increase with every open and are never reused
//! - **Poll, don't push**: web-sys callbacks queue [`SocketEvent`]s per
//!   connection; the caller drains them in arrival order without blocking
//! - **Typed errors**: unknown handles, premature sends and encoding failures
//!   are [`BridgeError`]s, never host-level crashes
//! - **C boundary**: `get_config`, `ws_open`, `ws_poll`, `ws_send` and
//!   `ws_close` exchange NUL-terminated JSON buffers with the module
//! - **Native builds**: the same API compiles off wasm32, where every
//!   connection reports an abnormal close
//!
//! ## Example
//!
//! ```rust,no_run
//! use wasm_host_bridge::{PlatformConnector, SocketBridge, SocketEvent};
//!
//! let mut bridge = SocketBridge::new(PlatformConnector::default());
//! let ws = bridge.open("localhost", 8080).unwrap();
//!
//! // once per frame
//! while let Some(event) = bridge.poll(ws).unwrap() {
//!     match event {
//!         SocketEvent::Opened => bridge.send(ws, "hello").unwrap(),
//!         SocketEvent::MessageReceived(text) => println!("Received: {}", text),
//!         SocketEvent::Closed(frame) => println!("Closed: {}", frame.code),
//!     }
//! }
//! ```

mod bridge;
mod buffer;
mod client;
mod config;
mod connection;
mod error;
mod event;
pub mod ffi;
mod handle;
mod logging;
mod transport;

#[cfg(target_arch = "wasm32")]
mod web_socket;

pub use bridge::{socket_url, BridgeConfig, ClosePolicy, SocketBridge};
pub use buffer::HostBuffer;
pub use client::{shared, SharedBridge, SocketClient};
pub use config::{
    ConfigExporter, ConfigSource, DisplayConfig, HostConfig, StaticConfig, HOST_CONFIG_GLOBAL,
};
pub use connection::Connection;
pub use error::{BridgeError, BridgeResult};
pub use event::{CloseFrame, EventKind, SocketEvent, CLOSE_ABNORMAL, CLOSE_NORMAL};
pub use handle::{Handle, HandleAllocator, MAX_HANDLE};
pub use logging::init_logging;
pub use transport::{
    ConnectionState, Connector, EventSink, PlatformConnector, Transport, UnsupportedConnector,
};

#[cfg(target_arch = "wasm32")]
pub use config::JsGlobalConfig;

#[cfg(target_arch = "wasm32")]
pub use web_socket::{WebSysConnector, WebSysTransport};
