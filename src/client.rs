//! SocketClient - owns one handle and turns its events into callbacks or a Stream

use crate::bridge::{ClosePolicy, SocketBridge};
use crate::error::{BridgeError, BridgeResult};
use crate::event::{CloseFrame, SocketEvent};
use crate::handle::Handle;
use crate::transport::{ConnectionState, Connector};
use futures::Stream;
use std::cell::RefCell;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll};

/// A bridge shared between several clients on the same thread
pub type SharedBridge<C> = Rc<RefCell<SocketBridge<C>>>;

/// Wrap a bridge so clients can share it
pub fn shared<C: Connector>(bridge: SocketBridge<C>) -> SharedBridge<C> {
    Rc::new(RefCell::new(bridge))
}

/// A single connection of a [`SocketBridge`].
///
/// Events can be consumed two ways:
/// - [`dispatch`](Self::dispatch) drains the queue and invokes the registered
///   `on_open`, `on_message` and `on_close` callbacks, meant to be called once
///   per frame of the embedding application
/// - the `Stream` impl yields events as they arrive and ends after the close
///   event
///
/// Dropping the client closes the connection immediately.
///
/// # Example
///
/// ```rust,no_run
/// use wasm_host_bridge::{shared, SocketBridge, SocketClient, PlatformConnector};
///
/// let bridge = shared(SocketBridge::new(PlatformConnector::default()));
/// let mut client = SocketClient::connect(&bridge, "localhost", 8080).unwrap();
/// client.on_message(|text| println!("received {}", text));
///
/// // later, once per frame
/// client.dispatch().unwrap();
/// ```
pub struct SocketClient<C: Connector> {
    bridge: SharedBridge<C>,
    handle: Handle,
    finished: bool,
    on_open: Box<dyn FnMut()>,
    on_message: Box<dyn FnMut(&str)>,
    on_close: Box<dyn FnMut(&CloseFrame)>,
}

impl<C: Connector> SocketClient<C> {
    /// Open `ws://address:port/` on the shared bridge
    pub fn connect(bridge: &SharedBridge<C>, address: &str, port: i32) -> BridgeResult<Self> {
        let handle = bridge.borrow_mut().open(address, port)?;
        Ok(Self {
            bridge: bridge.clone(),
            handle,
            finished: false,
            on_open: Box::new(|| {}),
            on_message: Box::new(|_| {}),
            on_close: Box::new(|_| {}),
        })
    }

    pub fn handle(&self) -> Handle {
        self.handle
    }

    pub fn state(&self) -> BridgeResult<ConnectionState> {
        self.bridge.borrow().state(self.handle)
    }

    pub fn on_open<F: FnMut() + 'static>(&mut self, callback: F) {
        self.on_open = Box::new(callback);
    }

    pub fn on_message<F: FnMut(&str) + 'static>(&mut self, callback: F) {
        self.on_message = Box::new(callback);
    }

    pub fn on_close<F: FnMut(&CloseFrame) + 'static>(&mut self, callback: F) {
        self.on_close = Box::new(callback);
    }

    /// Deliver every queued event to its callback, oldest first.
    ///
    /// Returns the number of events delivered. The bridge is not borrowed
    /// while a callback runs, so callbacks may send on this or other clients.
    pub fn dispatch(&mut self) -> BridgeResult<usize> {
        let mut delivered = 0;
        loop {
            let event = self.bridge.borrow_mut().poll(self.handle)?;
            let Some(event) = event else {
                break;
            };
            delivered += 1;
            match &event {
                SocketEvent::Opened => (self.on_open)(),
                SocketEvent::MessageReceived(text) => (self.on_message)(text),
                SocketEvent::Closed(frame) => (self.on_close)(frame),
            }
        }
        Ok(delivered)
    }

    pub fn send(&self, message: &str) -> BridgeResult<()> {
        self.bridge.borrow_mut().send(self.handle, message)
    }
}

impl<C: Connector> Stream for SocketClient<C> {
    type Item = BridgeResult<SocketEvent>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.finished {
            return Poll::Ready(None);
        }

        let polled = this.bridge.borrow_mut().poll_event(this.handle, cx);
        match polled {
            Poll::Ready(Some(Ok(event))) => {
                this.finished = event.is_closed();
                Poll::Ready(Some(Ok(event)))
            }
            Poll::Ready(Some(Err(BridgeError::UnknownHandle(_)))) | Poll::Ready(None) => {
                this.finished = true;
                Poll::Ready(None)
            }
            other => other,
        }
    }
}

impl<C: Connector> Drop for SocketClient<C> {
    fn drop(&mut self) {
        let Ok(mut bridge) = self.bridge.try_borrow_mut() else {
            tracing::warn!("Bridge busy, socket {} left open", self.handle);
            return;
        };
        match bridge.close_with(self.handle, ClosePolicy::Immediate) {
            Ok(()) | Err(BridgeError::UnknownHandle(_)) => {}
            Err(e) => tracing::debug!("Closing socket {} on drop failed: {}", self.handle, e),
        }
    }
}
