//! Frame loop driving a `SocketClient` through its callbacks
//!
//! This example demonstrates:
//! - Sharing one bridge between clients
//! - Registering open/message/close callbacks
//! - Calling `dispatch` once per frame until the socket closes
//!
//! Off wasm32 there is no browser to connect through, so the client sees a
//! single abnormal close (1006).

use std::cell::Cell;
use std::rc::Rc;
use wasm_host_bridge::{init_logging, shared, PlatformConnector, SocketBridge, SocketClient};

const MAX_FRAMES: usize = 600;

fn main() {
    init_logging();

    let bridge = shared(SocketBridge::new(PlatformConnector::default()));
    let mut client = match SocketClient::connect(&bridge, "localhost", 8080) {
        Ok(client) => client,
        Err(e) => {
            tracing::error!("Failed to open socket: {}", e);
            return;
        }
    };

    let finished = Rc::new(Cell::new(false));
    client.on_open(|| tracing::info!("Connected"));
    client.on_message(|text| tracing::info!("Received: {}", text));
    {
        let finished = finished.clone();
        client.on_close(move |frame| {
            tracing::info!("Closed with code {} ({})", frame.code, frame.reason);
            finished.set(true);
        });
    }

    for frame in 0..MAX_FRAMES {
        match client.dispatch() {
            Ok(0) => {}
            Ok(n) => tracing::debug!("Frame {} handled {} events", frame, n),
            Err(e) => {
                tracing::error!("Dispatch failed: {}", e);
                break;
            }
        }
        if finished.get() {
            break;
        }
        if client.send(&format!("frame {}", frame)).is_err() {
            tracing::trace!("Not open yet, skipping send");
        }
    }
}
