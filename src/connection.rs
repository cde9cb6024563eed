//! A single transport together with its queue of inbound events

use crate::error::BridgeResult;
use crate::event::SocketEvent;
use crate::transport::{ConnectionState, EventSink, Transport};
use std::cell::Cell;
use std::rc::Rc;
use std::task::{Context, Poll};
use tokio::sync::mpsc;

/// Owns one transport and the FIFO queue its callbacks feed.
pub struct Connection {
    url: String,
    transport: Box<dyn Transport>,
    events: mpsc::UnboundedReceiver<SocketEvent>,
    // Event handed back by a consumer that could not deliver it
    held: Option<SocketEvent>,
    state: Rc<Cell<ConnectionState>>,
    close_requested: bool,
}

impl Connection {
    /// Create the queue and the sink handed to the connector
    pub(crate) fn channel() -> (EventSink, PendingConnection) {
        let (tx, rx) = mpsc::unbounded_channel();
        let state = Rc::new(Cell::new(ConnectionState::Connecting));
        let sink = EventSink::new(tx, state.clone());
        (sink, PendingConnection { events: rx, state })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn state(&self) -> ConnectionState {
        self.state.get()
    }

    /// True once [`request_close`](Self::request_close) has been called
    pub fn is_closing(&self) -> bool {
        self.close_requested
    }

    /// Whether a send would be accepted
    pub fn can_send(&self) -> bool {
        self.state().is_open() && !self.close_requested
    }

    /// Pop the oldest queued event without waiting
    pub fn try_next(&mut self) -> Option<SocketEvent> {
        self.held.take().or_else(|| self.events.try_recv().ok())
    }

    /// Put back an event taken by [`try_next`](Self::try_next) so it is
    /// returned again before anything newer.
    pub fn requeue(&mut self, event: SocketEvent) {
        debug_assert!(self.held.is_none());
        self.held = Some(event);
    }

    /// Waker-aware variant of [`try_next`](Self::try_next).
    ///
    /// Resolves to `None` once every producer is gone and the queue is drained.
    pub fn poll_next(&mut self, cx: &mut Context<'_>) -> Poll<Option<SocketEvent>> {
        if let Some(event) = self.held.take() {
            return Poll::Ready(Some(event));
        }
        self.events.poll_recv(cx)
    }

    /// Number of events waiting to be polled
    pub fn queued(&self) -> usize {
        self.events.len() + usize::from(self.held.is_some())
    }

    pub fn send_text(&self, message: &str) -> BridgeResult<()> {
        self.transport.send_text(message)
    }

    /// Ask the transport to shut down
    pub fn request_close(&mut self) -> BridgeResult<()> {
        self.close_requested = true;
        self.transport.close()
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("url", &self.url)
            .field("state", &self.state())
            .field("queued", &self.queued())
            .field("close_requested", &self.close_requested)
            .finish()
    }
}

/// Queue half of a connection whose transport is still being built
pub(crate) struct PendingConnection {
    events: mpsc::UnboundedReceiver<SocketEvent>,
    state: Rc<Cell<ConnectionState>>,
}

impl PendingConnection {
    pub(crate) fn attach(self, url: String, transport: Box<dyn Transport>) -> Connection {
        Connection {
            url,
            transport,
            events: self.events,
            held: None,
            state: self.state,
            close_requested: false,
        }
    }
}
