//! Handle table mapping integer handles to live connections

use crate::buffer::HostBuffer;
use crate::connection::Connection;
use crate::error::{BridgeError, BridgeResult};
use crate::event::{SocketEvent, CLOSE_ABNORMAL};
use crate::handle::{Handle, HandleAllocator};
use crate::transport::{ConnectionState, Connector, DetachedTransport, Transport};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::task::{Context, Poll};

/// What `close` does with a connection's remaining events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClosePolicy {
    /// Remove the handle at once and discard anything still queued. The
    /// caller never observes the close event of a socket it closed itself.
    #[default]
    Immediate,
    /// Keep the handle until the close event has been polled. Sends are
    /// refused with `NotOpen` in the meantime.
    Drain,
}

impl ClosePolicy {
    /// Decode the integer used by the C boundary (0 immediate, 1 drain)
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(ClosePolicy::Immediate),
            1 => Some(ClosePolicy::Drain),
            _ => None,
        }
    }
}

/// Tunables for a [`SocketBridge`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub close_policy: ClosePolicy,
}

/// Address of the transport for `address` and `port`. Scheme and path are fixed.
pub fn socket_url(address: &str, port: i32) -> String {
    format!("ws://{}:{}/", address, port)
}

/// Registry of open connections keyed by [`Handle`].
///
/// The bridge is the sole owner of every connection. It is driven entirely
/// by the caller: open, poll, send and close run synchronously and never
/// wait on the network. Events produced by the host's callbacks sit in each
/// connection's queue until polled.
pub struct SocketBridge<C> {
    connector: C,
    connections: HashMap<Handle, Connection>,
    handles: HandleAllocator,
    config: BridgeConfig,
}

impl<C: Connector> SocketBridge<C> {
    pub fn new(connector: C) -> Self {
        Self::with_config(connector, BridgeConfig::default())
    }

    pub fn with_config(connector: C, config: BridgeConfig) -> Self {
        Self {
            connector,
            connections: HashMap::new(),
            handles: HandleAllocator::new(),
            config,
        }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn set_close_policy(&mut self, policy: ClosePolicy) {
        tracing::debug!("Close policy set to {:?}", policy);
        self.config.close_policy = policy;
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }

    pub fn connector_mut(&mut self) -> &mut C {
        &mut self.connector
    }

    /// Start connecting to `ws://address:port/` and return its handle.
    ///
    /// Returns before any network activity completes. Neither argument is
    /// validated here: if the host rejects the address, the handle's first
    /// event is an abnormal close carrying the host's reason.
    pub fn open(&mut self, address: &str, port: i32) -> BridgeResult<Handle> {
        self.open_url(socket_url(address, port))
    }

    fn open_url(&mut self, url: String) -> BridgeResult<Handle> {
        let handle = self.handles.allocate()?;
        let (sink, pending) = Connection::channel();

        let transport: Box<dyn Transport> = match self.connector.connect(&url, sink.clone()) {
            Ok(transport) => {
                tracing::info!("Socket {} connecting to {}", handle, url);
                transport
            }
            Err(e) => {
                tracing::warn!("Socket {} could not reach {}: {}", handle, url, e);
                sink.closed(CLOSE_ABNORMAL, e.to_string());
                Box::new(DetachedTransport)
            }
        };

        self.connections.insert(handle, pending.attach(url, transport));
        Ok(handle)
    }

    /// Pop the oldest queued event for `handle`, or `None` if nothing is queued.
    pub fn poll(&mut self, handle: Handle) -> BridgeResult<Option<SocketEvent>> {
        let event = self.connection_mut(handle)?.try_next();
        self.after_poll(handle, event.as_ref());
        Ok(event)
    }

    /// [`poll`](Self::poll), encoded for the boundary
    pub fn poll_encoded(&mut self, handle: Handle) -> BridgeResult<Option<HostBuffer>> {
        self.poll_with(handle, |event| {
            let json = event.to_json()?;
            tracing::trace!("Socket {} event {}", handle, json);
            HostBuffer::from_text(&json)
        })
    }

    /// Pop the oldest event only if `encode` succeeds on it.
    ///
    /// On failure the event stays at the front of the queue and the handle
    /// is not retired, so a later poll sees it again.
    pub fn poll_with<T>(
        &mut self,
        handle: Handle,
        encode: impl FnOnce(&SocketEvent) -> BridgeResult<T>,
    ) -> BridgeResult<Option<T>> {
        let Some(event) = self.connection_mut(handle)?.try_next() else {
            self.after_poll(handle, None);
            return Ok(None);
        };

        match encode(&event) {
            Ok(encoded) => {
                self.after_poll(handle, Some(&event));
                Ok(Some(encoded))
            }
            Err(e) => {
                self.connection_mut(handle)?.requeue(event);
                Err(e)
            }
        }
    }

    /// Waker-aware poll used by async consumers.
    ///
    /// `Ready(None)` means every producer is gone and the queue is drained.
    pub fn poll_event(
        &mut self,
        handle: Handle,
        cx: &mut Context<'_>,
    ) -> Poll<Option<BridgeResult<SocketEvent>>> {
        let polled = match self.connection_mut(handle) {
            Ok(conn) => conn.poll_next(cx),
            Err(e) => return Poll::Ready(Some(Err(e))),
        };

        match polled {
            Poll::Ready(Some(event)) => {
                self.after_poll(handle, Some(&event));
                Poll::Ready(Some(Ok(event)))
            }
            Poll::Ready(None) => {
                self.after_poll(handle, None);
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }

    /// Forward a text message. Fails with `NotOpen` until the open event has
    /// arrived and after a close has been requested.
    pub fn send(&mut self, handle: Handle, message: &str) -> BridgeResult<()> {
        let conn = self.connection(handle)?;
        if !conn.can_send() {
            return Err(BridgeError::NotOpen(handle));
        }
        tracing::trace!("Socket {} sending {} bytes", handle, message.len());
        conn.send_text(message)
    }

    /// Close using the configured [`ClosePolicy`]
    pub fn close(&mut self, handle: Handle) -> BridgeResult<()> {
        self.close_with(handle, self.config.close_policy)
    }

    /// Request transport shutdown and retire the handle according to `policy`.
    ///
    /// Transport refusals are logged, not returned; the handle is retired
    /// regardless.
    pub fn close_with(&mut self, handle: Handle, policy: ClosePolicy) -> BridgeResult<()> {
        let conn = self.connection_mut(handle)?;
        if let Err(e) = conn.request_close() {
            tracing::warn!("Socket {} close request failed: {}", handle, e);
        }

        match policy {
            ClosePolicy::Immediate => {
                if let Some(conn) = self.connections.remove(&handle) {
                    let discarded = conn.queued();
                    if discarded > 0 {
                        tracing::debug!("Socket {} discarded {} queued events", handle, discarded);
                    }
                }
                tracing::info!("Socket {} closed", handle);
            }
            ClosePolicy::Drain => {
                tracing::info!("Socket {} closing, draining events", handle);
                self.after_poll(handle, None);
            }
        }
        Ok(())
    }

    pub fn state(&self, handle: Handle) -> BridgeResult<ConnectionState> {
        self.connection(handle).map(Connection::state)
    }

    pub fn contains(&self, handle: Handle) -> bool {
        self.connections.contains_key(&handle)
    }

    /// Number of handles currently in the table
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    pub fn connection(&self, handle: Handle) -> BridgeResult<&Connection> {
        self.connections
            .get(&handle)
            .ok_or(BridgeError::UnknownHandle(handle))
    }

    fn connection_mut(&mut self, handle: Handle) -> BridgeResult<&mut Connection> {
        self.connections
            .get_mut(&handle)
            .ok_or(BridgeError::UnknownHandle(handle))
    }

    // A draining connection leaves the table once its close event has been
    // handed out, or once it is closed with nothing left to hand out.
    fn after_poll(&mut self, handle: Handle, event: Option<&SocketEvent>) {
        let Some(conn) = self.connections.get(&handle) else {
            return;
        };
        if !conn.is_closing() {
            return;
        }

        let delivered_close = event.is_some_and(SocketEvent::is_closed);
        let exhausted = conn.state() == ConnectionState::Closed && conn.queued() == 0;
        if delivered_close || exhausted {
            self.connections.remove(&handle);
            tracing::info!("Socket {} closed", handle);
        }
    }
}

impl<C> std::fmt::Debug for SocketBridge<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SocketBridge")
            .field("connections", &self.connections)
            .field("next_handle", &self.handles.peek())
            .field("config", &self.config)
            .finish()
    }
}
