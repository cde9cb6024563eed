//! Connection events and their wire encoding
//!
//! Every event crosses the boundary as a JSON object tagged by a small integer:
//!
//! ```text
//! {"type":0}                                               opened
//! {"type":1,"message":"<text>"}                            message received
//! {"type":2,"message":{"code":<int>,"reason":"<text>"}}    closed
//! ```

use crate::error::{BridgeError, BridgeResult};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

/// Close code reported when the connection dropped without a close frame
pub const CLOSE_ABNORMAL: u16 = 1006;

/// Close code of an orderly shutdown
pub const CLOSE_NORMAL: u16 = 1000;

/// Integer tags of the wire encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum EventKind {
    Opened = 0,
    MessageReceived = 1,
    Closed = 2,
}

impl EventKind {
    pub fn tag(self) -> u8 {
        self as u8
    }

    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(EventKind::Opened),
            1 => Some(EventKind::MessageReceived),
            2 => Some(EventKind::Closed),
            _ => None,
        }
    }
}

/// Code and reason carried by a close event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloseFrame {
    pub code: u16,
    pub reason: String,
}

impl CloseFrame {
    pub fn new<S: Into<String>>(code: u16, reason: S) -> Self {
        Self {
            code,
            reason: reason.into(),
        }
    }

    /// Whether the peer closed with code 1000
    pub fn is_normal(&self) -> bool {
        self.code == CLOSE_NORMAL
    }
}

/// Something that happened on a connection, queued until polled
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SocketEvent {
    /// The transport finished its handshake
    Opened,
    /// A text message arrived
    MessageReceived(String),
    /// The transport closed; transport errors also end up here
    Closed(CloseFrame),
}

impl SocketEvent {
    /// Create a message event
    pub fn message<S: Into<String>>(text: S) -> Self {
        SocketEvent::MessageReceived(text.into())
    }

    /// Create a close event
    pub fn closed<S: Into<String>>(code: u16, reason: S) -> Self {
        SocketEvent::Closed(CloseFrame::new(code, reason))
    }

    pub fn kind(&self) -> EventKind {
        match self {
            SocketEvent::Opened => EventKind::Opened,
            SocketEvent::MessageReceived(_) => EventKind::MessageReceived,
            SocketEvent::Closed(_) => EventKind::Closed,
        }
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, SocketEvent::Closed(_))
    }

    /// Get the text content if this is a message event
    pub fn as_message(&self) -> Option<&str> {
        match self {
            SocketEvent::MessageReceived(text) => Some(text),
            _ => None,
        }
    }

    /// Get the close frame if this is a close event
    pub fn as_close(&self) -> Option<&CloseFrame> {
        match self {
            SocketEvent::Closed(frame) => Some(frame),
            _ => None,
        }
    }

    /// Encode to the tagged JSON form handed to the embedding module
    pub fn to_json(&self) -> BridgeResult<String> {
        serde_json::to_string(self).map_err(BridgeError::from)
    }

    /// Decode the tagged JSON form
    pub fn from_json(json: &str) -> BridgeResult<Self> {
        let raw: RawEvent = serde_json::from_str(json)?;
        let kind = EventKind::from_tag(raw.kind)
            .ok_or_else(|| BridgeError::Encoding(format!("unknown event type {}", raw.kind)))?;

        match (kind, raw.message) {
            (EventKind::Opened, _) => Ok(SocketEvent::Opened),
            (EventKind::MessageReceived, Some(serde_json::Value::String(text))) => {
                Ok(SocketEvent::MessageReceived(text))
            }
            (EventKind::Closed, Some(value)) => {
                Ok(SocketEvent::Closed(serde_json::from_value(value)?))
            }
            (kind, _) => Err(BridgeError::Encoding(format!(
                "missing or malformed message for event type {}",
                kind.tag()
            ))),
        }
    }
}

impl Serialize for SocketEvent {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            SocketEvent::Opened => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("type", &EventKind::Opened.tag())?;
                map.end()
            }
            SocketEvent::MessageReceived(text) => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("type", &EventKind::MessageReceived.tag())?;
                map.serialize_entry("message", text)?;
                map.end()
            }
            SocketEvent::Closed(frame) => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("type", &EventKind::Closed.tag())?;
                map.serialize_entry("message", frame)?;
                map.end()
            }
        }
    }
}

#[derive(Deserialize)]
struct RawEvent {
    #[serde(rename = "type")]
    kind: u8,
    #[serde(default)]
    message: Option<serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_encoding() {
        assert_eq!(SocketEvent::Opened.to_json().unwrap(), r#"{"type":0}"#);
        assert_eq!(
            SocketEvent::message("ping").to_json().unwrap(),
            r#"{"type":1,"message":"ping"}"#
        );
        assert_eq!(
            SocketEvent::closed(1000, "normal").to_json().unwrap(),
            r#"{"type":2,"message":{"code":1000,"reason":"normal"}}"#
        );
    }

    #[test]
    fn test_message_text_is_escaped() {
        let json = SocketEvent::message("say \"hi\"\n\0").to_json().unwrap();
        assert_eq!(json, r#"{"type":1,"message":"say \"hi\"\n\u0000"}"#);
        assert_eq!(
            SocketEvent::from_json(&json).unwrap(),
            SocketEvent::message("say \"hi\"\n\0")
        );
    }

    #[test]
    fn test_decode() {
        assert_eq!(
            SocketEvent::from_json(r#"{"type":2,"message":{"code":1006,"reason":""}}"#).unwrap(),
            SocketEvent::closed(1006, "")
        );
        assert_eq!(
            SocketEvent::from_json(r#"{"type":0}"#).unwrap(),
            SocketEvent::Opened
        );
    }

    #[test]
    fn test_decode_rejects_malformed() {
        assert!(matches!(
            SocketEvent::from_json(r#"{"type":9}"#),
            Err(BridgeError::Encoding(_))
        ));
        assert!(matches!(
            SocketEvent::from_json(r#"{"type":1}"#),
            Err(BridgeError::Encoding(_))
        ));
        assert!(matches!(
            SocketEvent::from_json(r#"{"type":2,"message":"bye"}"#),
            Err(BridgeError::Encoding(_))
        ));
    }

    #[test]
    fn test_accessors() {
        let closed = SocketEvent::closed(CLOSE_NORMAL, "done");
        assert!(closed.is_closed());
        assert!(closed.as_close().unwrap().is_normal());
        assert_eq!(closed.kind(), EventKind::Closed);
        assert_eq!(SocketEvent::message("a").as_message(), Some("a"));
        assert_eq!(SocketEvent::Opened.as_message(), None);
    }
}
