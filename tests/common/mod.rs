//! In-memory connector standing in for the browser
#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;
use wasm_host_bridge::{BridgeResult, Connector, EventSink, Transport};

/// What the test can see of one connection it handed out
#[derive(Clone)]
pub struct Remote {
    pub url: String,
    pub sink: EventSink,
    pub sent: Rc<RefCell<Vec<String>>>,
    pub close_requests: Rc<RefCell<usize>>,
}

impl Remote {
    pub fn sent(&self) -> Vec<String> {
        self.sent.borrow().clone()
    }

    pub fn close_requests(&self) -> usize {
        *self.close_requests.borrow()
    }
}

/// Hands out transports whose events the test fires by hand
#[derive(Clone, Default)]
pub struct ScriptedConnector {
    remotes: Rc<RefCell<Vec<Remote>>>,
}

impl ScriptedConnector {
    /// The `index`-th connection opened through this connector
    pub fn remote(&self, index: usize) -> Remote {
        self.remotes.borrow()[index].clone()
    }

    pub fn opened(&self) -> usize {
        self.remotes.borrow().len()
    }
}

struct ScriptedTransport {
    sent: Rc<RefCell<Vec<String>>>,
    close_requests: Rc<RefCell<usize>>,
}

impl Transport for ScriptedTransport {
    fn send_text(&self, message: &str) -> BridgeResult<()> {
        self.sent.borrow_mut().push(message.to_string());
        Ok(())
    }

    fn close(&self) -> BridgeResult<()> {
        *self.close_requests.borrow_mut() += 1;
        Ok(())
    }
}

impl Connector for ScriptedConnector {
    fn connect(&mut self, url: &str, sink: EventSink) -> BridgeResult<Box<dyn Transport>> {
        let remote = Remote {
            url: url.to_string(),
            sink,
            sent: Rc::new(RefCell::new(Vec::new())),
            close_requests: Rc::new(RefCell::new(0)),
        };
        let transport = ScriptedTransport {
            sent: remote.sent.clone(),
            close_requests: remote.close_requests.clone(),
        };
        self.remotes.borrow_mut().push(remote);
        Ok(Box::new(transport))
    }
}
