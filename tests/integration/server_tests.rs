//! End-to-end tests over a loopback WebSocket

use futures_util::{SinkExt, StreamExt};
use phone_os::server::{self, ServerState};
use phone_os::{ServerConfig, UnknownTypePolicy};
use phoneos_protocol::{AppData, ServerMessage};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn start_server(config: ServerConfig) -> (SocketAddr, Arc<ServerState>) {
    let listener = server::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let state = Arc::new(ServerState::new(&config));
    tokio::spawn(server::serve(listener, Arc::clone(&state)));
    (addr, state)
}

async fn connect(addr: SocketAddr, path: &str) -> Client {
    let (client, _) = connect_async(format!("ws://{}{}", addr, path)).await.unwrap();
    client
}

async fn next_message(client: &mut Client) -> ServerMessage {
    loop {
        let frame = tokio::time::timeout(Duration::from_secs(5), client.next())
            .await
            .expect("timed out waiting for a frame")
            .expect("connection closed")
            .unwrap();
        if let Message::Text(text) = frame {
            return serde_json::from_str(text.as_str()).unwrap();
        }
    }
}

/// Next message that is not a periodic status push
async fn next_reply(client: &mut Client) -> ServerMessage {
    loop {
        match next_message(client).await {
            ServerMessage::Status(_) => continue,
            other => return other,
        }
    }
}

async fn send(client: &mut Client, value: serde_json::Value) {
    client.send(Message::text(value.to_string())).await.unwrap();
}

#[tokio::test]
async fn test_connect_receives_status_then_apps() {
    let (addr, _) = start_server(ServerConfig::default()).await;
    let mut client = connect(addr, "/").await;

    match next_message(&mut client).await {
        ServerMessage::Status(status) => {
            assert_eq!(status.current_app, "home");
            assert_eq!(status.battery, 85);
        }
        other => panic!("expected status first, got {other:?}"),
    }
    match next_message(&mut client).await {
        ServerMessage::Apps { apps } => {
            assert_eq!(apps.len(), 12);
            assert_eq!(apps.ids().next(), Some("home"));
        }
        other => panic!("expected apps second, got {other:?}"),
    }
}

#[tokio::test]
async fn test_command_round_trips() {
    let (addr, state) = start_server(ServerConfig::default()).await;
    let mut client = connect(addr, "/ws").await;
    next_message(&mut client).await;
    next_message(&mut client).await;

    send(&mut client, json!({"type": "open_app", "app_id": "weather"})).await;
    match next_reply(&mut client).await {
        ServerMessage::AppOpened { app, app_data } => {
            assert_eq!(app, "weather");
            assert!(matches!(app_data, AppData::Weather { .. }));
        }
        other => panic!("unexpected reply {other:?}"),
    }
    assert_eq!(state.store.current_app(), "weather");

    // Garbage is dropped without closing the connection
    client.send(Message::text("{oops")).await.unwrap();

    send(&mut client, json!({"type": "settings_change", "brightness": 42})).await;
    assert_eq!(next_reply(&mut client).await, ServerMessage::SettingsUpdated);

    send(&mut client, json!({"type": "calculator", "expression": "(1+2)*3"})).await;
    assert_eq!(
        next_reply(&mut client).await,
        ServerMessage::CalculatorResult { result: 9.into() }
    );

    send(&mut client, json!({"type": "home"})).await;
    assert_eq!(next_reply(&mut client).await, ServerMessage::AppClosed);

    let status = state.store.snapshot();
    assert_eq!(status.current_app, "home");
    assert_eq!(status.brightness, 42);
    assert_eq!(status.volume, 60);
}

#[tokio::test]
async fn test_state_is_shared_between_clients() {
    let (addr, _) = start_server(ServerConfig::default()).await;
    let mut first = connect(addr, "/").await;
    next_message(&mut first).await;
    next_message(&mut first).await;

    send(&mut first, json!({"type": "open_app", "app_id": "music"})).await;
    next_reply(&mut first).await;

    let mut second = connect(addr, "/").await;
    match next_message(&mut second).await {
        ServerMessage::Status(status) => assert_eq!(status.current_app, "music"),
        other => panic!("expected status, got {other:?}"),
    }
}

#[tokio::test]
async fn test_unknown_type_reply_policy() {
    let config = ServerConfig {
        unknown_type_policy: UnknownTypePolicy::Reply,
        ..ServerConfig::default()
    };
    let (addr, _) = start_server(config).await;
    let mut client = connect(addr, "/").await;
    next_message(&mut client).await;
    next_message(&mut client).await;

    send(&mut client, json!({"type": "reboot"})).await;
    assert_eq!(
        next_reply(&mut client).await,
        ServerMessage::error("Unknown message type: reboot")
    );
}

#[tokio::test]
async fn test_periodic_status_push() {
    let config = ServerConfig {
        status_interval_ms: 100,
        ..ServerConfig::default()
    };
    let (addr, _) = start_server(config).await;
    let mut client = connect(addr, "/").await;
    next_message(&mut client).await;
    next_message(&mut client).await;

    assert!(matches!(next_message(&mut client).await, ServerMessage::Status(_)));
}

#[tokio::test]
async fn test_disconnect_does_not_affect_other_clients() {
    let (addr, _) = start_server(ServerConfig::default()).await;
    let mut leaving = connect(addr, "/").await;
    next_message(&mut leaving).await;
    leaving.close(None).await.unwrap();

    let mut staying = connect(addr, "/").await;
    next_message(&mut staying).await;
    next_message(&mut staying).await;
    send(&mut staying, json!({"type": "get_apps"})).await;
    assert!(matches!(next_reply(&mut staying).await, ServerMessage::Apps { .. }));
}
