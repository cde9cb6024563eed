//! Transport backed by the browser's `WebSocket`

use crate::error::{BridgeError, BridgeResult};
use crate::event::CLOSE_NORMAL;
use crate::transport::{Connector, EventSink, Transport};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{BinaryType, CloseEvent, ErrorEvent, MessageEvent, WebSocket};

/// Opens `web_sys::WebSocket`s whose callbacks feed an [`EventSink`]
#[derive(Debug, Default, Clone, Copy)]
pub struct WebSysConnector;

impl Connector for WebSysConnector {
    fn connect(&mut self, url: &str, sink: EventSink) -> BridgeResult<Box<dyn Transport>> {
        let ws = WebSocket::new(url).map_err(|e| {
            tracing::error!("Failed to create WebSocket for {}: {:?}", url, e);
            BridgeError::Transport(js_error_message(&e))
        })?;
        tracing::debug!("WebSocket instance created for {}", url);

        // Binary frames arrive as ArrayBuffer rather than Blob
        ws.set_binary_type(BinaryType::Arraybuffer);

        let sink_open = sink.clone();
        let on_open = Closure::wrap(Box::new(move |_: JsValue| {
            tracing::info!("WebSocket connection opened");
            sink_open.opened();
        }) as Box<dyn FnMut(JsValue)>);
        ws.set_onopen(Some(on_open.as_ref().unchecked_ref()));

        let sink_message = sink.clone();
        let on_message = Closure::wrap(Box::new(move |e: MessageEvent| {
            if let Ok(txt) = e.data().dyn_into::<js_sys::JsString>() {
                sink_message.message(String::from(txt));
            } else if let Ok(array_buffer) = e.data().dyn_into::<js_sys::ArrayBuffer>() {
                let data = js_sys::Uint8Array::new(&array_buffer).to_vec();
                tracing::debug!("Received binary message of {} bytes", data.len());
                sink_message.message(String::from_utf8_lossy(&data).into_owned());
            } else {
                tracing::warn!("Ignoring WebSocket message of unsupported type");
            }
        }) as Box<dyn FnMut(MessageEvent)>);
        ws.set_onmessage(Some(on_message.as_ref().unchecked_ref()));

        let on_close = Closure::wrap(Box::new(move |e: CloseEvent| {
            tracing::info!("WebSocket closed: code={}, reason={}", e.code(), e.reason());
            sink.closed(e.code(), e.reason());
        }) as Box<dyn FnMut(CloseEvent)>);
        ws.set_onclose(Some(on_close.as_ref().unchecked_ref()));

        // Browsers follow every error with a close event, which carries the report
        let on_error = Closure::wrap(Box::new(move |e: ErrorEvent| {
            tracing::error!("WebSocket error event: {:?}", e.message());
        }) as Box<dyn FnMut(ErrorEvent)>);
        ws.set_onerror(Some(on_error.as_ref().unchecked_ref()));

        Ok(Box::new(WebSysTransport {
            ws,
            _on_open: on_open,
            _on_message: on_message,
            _on_close: on_close,
            _on_error: on_error,
        }))
    }
}

/// A browser `WebSocket` plus the closures registered on it
pub struct WebSysTransport {
    ws: WebSocket,
    _on_open: Closure<dyn FnMut(JsValue)>,
    _on_message: Closure<dyn FnMut(MessageEvent)>,
    _on_close: Closure<dyn FnMut(CloseEvent)>,
    _on_error: Closure<dyn FnMut(ErrorEvent)>,
}

impl Transport for WebSysTransport {
    fn send_text(&self, message: &str) -> BridgeResult<()> {
        self.ws.send_with_str(message).map_err(|e| {
            tracing::error!("Failed to send message to WebSocket: {:?}", e);
            BridgeError::Transport(js_error_message(&e))
        })
    }

    fn close(&self) -> BridgeResult<()> {
        tracing::info!("Closing WebSocket connection");
        self.ws
            .close()
            .map_err(|e| BridgeError::Transport(js_error_message(&e)))
    }
}

impl Drop for WebSysTransport {
    fn drop(&mut self) {
        // The closures die with us; the browser must not call them afterwards.
        self.ws.set_onopen(None);
        self.ws.set_onmessage(None);
        self.ws.set_onclose(None);
        self.ws.set_onerror(None);
        if self.ws.ready_state() < WebSocket::CLOSING {
            let _ = self.ws.close_with_code(CLOSE_NORMAL);
        }
    }
}

fn js_error_message(value: &JsValue) -> String {
    if let Some(text) = value.as_string() {
        return text;
    }
    if let Some(err) = value.dyn_ref::<js_sys::Error>() {
        return String::from(err.message());
    }
    format!("{:?}", value)
}
