mod common;

use common::ScriptedConnector;
use wasm_host_bridge::{
    BridgeConfig, BridgeError, ClosePolicy, ConfigExporter, ConnectionState, SocketBridge,
    SocketEvent, StaticConfig,
};

fn bridge() -> (SocketBridge<ScriptedConnector>, ScriptedConnector) {
    let connector = ScriptedConnector::default();
    (SocketBridge::new(connector.clone()), connector)
}

#[test]
fn handles_increase_and_are_never_reused() {
    let (mut bridge, _) = bridge();
    let first = bridge.open("example.org", 80).unwrap();
    let second = bridge.open("example.org", 80).unwrap();
    assert_eq!(first.get(), 1);
    assert_eq!(second.get(), 2);

    bridge.close(first).unwrap();
    let third = bridge.open("example.org", 80).unwrap();
    assert_eq!(third.get(), 3);

    let mut last = third;
    for _ in 0..20 {
        let h = bridge.open("example.org", 80).unwrap();
        assert!(h > last);
        bridge.close(h).unwrap();
        last = h;
    }
}

#[test]
fn open_returns_before_any_network_activity() {
    let (mut bridge, remote) = bridge();
    let h = bridge.open("example.org", 80).unwrap();
    assert_eq!(remote.remote(0).url, "ws://example.org:80/");
    assert_eq!(bridge.state(h).unwrap(), ConnectionState::Connecting);
    assert_eq!(bridge.poll(h).unwrap(), None);
}

#[test]
fn open_then_message_is_polled_in_order() {
    let (mut bridge, remote) = bridge();
    let h = bridge.open("example.org", 80).unwrap();
    let sink = remote.remote(0).sink;
    sink.opened();
    sink.message("ping");

    let first = bridge.poll_encoded(h).unwrap().unwrap();
    let second = bridge.poll_encoded(h).unwrap().unwrap();
    assert_eq!(first.as_str(), r#"{"type":0}"#);
    assert_eq!(second.as_str(), r#"{"type":1,"message":"ping"}"#);
    assert!(bridge.poll_encoded(h).unwrap().is_none());
}

#[test]
fn close_event_carries_code_and_reason() {
    let (mut bridge, remote) = bridge();
    let h = bridge.open("example.org", 80).unwrap();
    remote.remote(0).sink.closed(1000, "normal");

    let event = bridge.poll_encoded(h).unwrap().unwrap();
    assert_eq!(
        event.as_str(),
        r#"{"type":2,"message":{"code":1000,"reason":"normal"}}"#
    );
    assert_eq!(bridge.state(h).unwrap(), ConnectionState::Closed);
}

#[test]
fn messages_are_never_reordered() {
    let (mut bridge, remote) = bridge();
    let h = bridge.open("example.org", 80).unwrap();
    let sink = remote.remote(0).sink;
    sink.opened();
    for i in 0..50 {
        sink.message(format!("m{}", i));
    }

    assert_eq!(bridge.poll(h).unwrap(), Some(SocketEvent::Opened));
    for i in 0..50 {
        assert_eq!(
            bridge.poll(h).unwrap(),
            Some(SocketEvent::message(format!("m{}", i)))
        );
    }
    assert_eq!(bridge.poll(h).unwrap(), None);
}

#[test]
fn queues_are_per_connection() {
    let (mut bridge, remote) = bridge();
    let a = bridge.open("a.example", 1).unwrap();
    let b = bridge.open("b.example", 2).unwrap();
    remote.remote(1).sink.message("for b");
    remote.remote(0).sink.message("for a");

    assert_eq!(bridge.poll(a).unwrap(), Some(SocketEvent::message("for a")));
    assert_eq!(bridge.poll(a).unwrap(), None);
    assert_eq!(bridge.poll(b).unwrap(), Some(SocketEvent::message("for b")));
}

#[test]
fn send_reaches_transport_only_when_open() {
    let (mut bridge, remote) = bridge();
    let h = bridge.open("example.org", 80).unwrap();
    assert_eq!(bridge.send(h, "too early"), Err(BridgeError::NotOpen(h)));

    remote.remote(0).sink.opened();
    bridge.send(h, "one").unwrap();
    bridge.send(h, "two").unwrap();
    assert_eq!(remote.remote(0).sent(), vec!["one", "two"]);

    remote.remote(0).sink.closed(1001, "going away");
    assert_eq!(bridge.send(h, "three"), Err(BridgeError::NotOpen(h)));
}

#[test]
fn operations_after_close_fail_with_unknown_handle() {
    let (mut bridge, remote) = bridge();
    let h = bridge.open("example.org", 80).unwrap();
    remote.remote(0).sink.opened();
    remote.remote(0).sink.message("never seen");

    bridge.close(h).unwrap();
    assert_eq!(remote.remote(0).close_requests(), 1);
    assert!(bridge.is_empty());
    assert_eq!(bridge.poll(h), Err(BridgeError::UnknownHandle(h)));
    assert_eq!(bridge.send(h, "x"), Err(BridgeError::UnknownHandle(h)));
    assert_eq!(bridge.close(h), Err(BridgeError::UnknownHandle(h)));

    // The host may still fire callbacks for the retired connection
    remote.remote(0).sink.closed(1000, "");
}

#[test]
fn drain_policy_waits_for_close_event() {
    let connector = ScriptedConnector::default();
    let config = BridgeConfig {
        close_policy: ClosePolicy::Drain,
    };
    let mut bridge = SocketBridge::with_config(connector.clone(), config);
    let h = bridge.open("example.org", 80).unwrap();
    let sink = connector.remote(0).sink;
    sink.opened();
    sink.message("in flight");

    bridge.close(h).unwrap();
    assert!(bridge.contains(h));
    assert_eq!(bridge.poll(h).unwrap(), Some(SocketEvent::Opened));
    assert_eq!(
        bridge.poll(h).unwrap(),
        Some(SocketEvent::message("in flight"))
    );
    assert_eq!(bridge.poll(h).unwrap(), None);
    assert!(bridge.contains(h));

    sink.closed(1000, "bye");
    assert_eq!(
        bridge.poll(h).unwrap(),
        Some(SocketEvent::closed(1000, "bye"))
    );
    assert_eq!(bridge.poll(h), Err(BridgeError::UnknownHandle(h)));
}

#[test]
fn config_round_trips() {
    let config = serde_json::json!({
        "display": {"width": 800, "height": 600},
        "volume": 0.3,
        "name": "käse"
    });
    let exporter = ConfigExporter::new(StaticConfig(config.clone()));
    let buffer = exporter.export().unwrap();
    let parsed: serde_json::Value = serde_json::from_str(buffer.as_str()).unwrap();
    assert_eq!(parsed, config);
    assert_eq!(buffer.len(), buffer.as_str().len());
}
