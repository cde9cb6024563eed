//! Seams between the bridge and the host's duplex transport

use crate::error::{BridgeError, BridgeResult};
use crate::event::{CloseFrame, SocketEvent};
use std::cell::Cell;
use std::rc::Rc;
use tokio::sync::mpsc;

/// Lifecycle of one connection. `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    Connecting,
    Open,
    Closed,
}

impl ConnectionState {
    pub fn is_open(&self) -> bool {
        matches!(self, ConnectionState::Open)
    }
}

/// One live duplex connection owned by the bridge.
pub trait Transport {
    /// Forward a text message. No delivery confirmation.
    fn send_text(&self, message: &str) -> BridgeResult<()>;

    /// Request shutdown. Completion is reported, if at all, through the
    /// connection's [`EventSink`].
    fn close(&self) -> BridgeResult<()>;
}

/// Builds transports for `ws://` URLs.
///
/// Implementations register the host's open, message and close callbacks so
/// that each one pushes exactly one event into `sink`. Returning an error
/// means the host rejected the request synchronously; the bridge turns that
/// into a close event rather than failing the open.
pub trait Connector {
    fn connect(&mut self, url: &str, sink: EventSink) -> BridgeResult<Box<dyn Transport>>;
}

/// Producer side of a connection's event queue.
///
/// Cloned into every host callback. Pushing an event also advances the
/// connection state, and anything arriving after `Closed` is dropped.
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: mpsc::UnboundedSender<SocketEvent>,
    state: Rc<Cell<ConnectionState>>,
}

impl EventSink {
    pub(crate) fn new(
        tx: mpsc::UnboundedSender<SocketEvent>,
        state: Rc<Cell<ConnectionState>>,
    ) -> Self {
        Self { tx, state }
    }

    pub fn opened(&self) {
        self.push(SocketEvent::Opened);
    }

    pub fn message<S: Into<String>>(&self, text: S) {
        self.push(SocketEvent::MessageReceived(text.into()));
    }

    pub fn closed<S: Into<String>>(&self, code: u16, reason: S) {
        self.push(SocketEvent::Closed(CloseFrame::new(code, reason)));
    }

    /// Current state as seen by the transport
    pub fn state(&self) -> ConnectionState {
        self.state.get()
    }

    /// Queue an event in arrival order
    pub fn push(&self, event: SocketEvent) {
        let state = self.state.get();
        if state == ConnectionState::Closed {
            tracing::debug!("Dropping {:?} event after close", event.kind());
            return;
        }

        match &event {
            SocketEvent::Opened if state == ConnectionState::Connecting => {
                self.state.set(ConnectionState::Open);
            }
            SocketEvent::Closed(_) => self.state.set(ConnectionState::Closed),
            _ => {}
        }

        tracing::debug!("Queueing {:?} event", event.kind());
        tracing::trace!("Event payload: {:?}", event);
        if self.tx.send(event).is_err() {
            tracing::trace!("Event queue already released, event discarded");
        }
    }
}

/// Connector for targets without a browser WebSocket.
///
/// Every connect is refused, so each open yields a handle whose first event
/// is an abnormal close.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnsupportedConnector;

impl Connector for UnsupportedConnector {
    fn connect(&mut self, url: &str, _sink: EventSink) -> BridgeResult<Box<dyn Transport>> {
        Err(BridgeError::Transport(format!(
            "WebSocket is only supported on WASM target (requested {url})"
        )))
    }
}

/// The connector used by the C boundary on this target
#[cfg(target_arch = "wasm32")]
pub type PlatformConnector = crate::web_socket::WebSysConnector;

/// The connector used by the C boundary on this target
#[cfg(not(target_arch = "wasm32"))]
pub type PlatformConnector = UnsupportedConnector;

/// Transport left behind when the host refused to create one
#[derive(Debug, Default)]
pub(crate) struct DetachedTransport;

impl Transport for DetachedTransport {
    fn send_text(&self, _message: &str) -> BridgeResult<()> {
        Err(BridgeError::Transport("transport was never created".to_string()))
    }

    fn close(&self) -> BridgeResult<()> {
        Ok(())
    }
}
