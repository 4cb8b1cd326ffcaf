//! Shared helpers: in-process broker and raw WebSocket clients.

#![allow(dead_code, clippy::panic)]

use std::net::SocketAddr;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use relay_broker::app_state::AppState;
use relay_broker::config::BrokerConfig;
use relay_broker::domain::{ConnectionRegistry, Envelope, EventType};
use relay_broker::server::build_app;

/// Raw client connection to the broker.
pub type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Broker running on an ephemeral port.
pub struct TestServer {
    /// Bound address.
    pub addr: SocketAddr,
    /// Shared state, for inspecting the registry.
    pub state: AppState,
}

impl TestServer {
    /// WebSocket URL of the relay endpoint.
    pub fn ws_url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }
}

/// Default configuration with optional overrides.
pub fn test_config(overrides: &[(&str, &str)]) -> BrokerConfig {
    let owned: Vec<(String, String)> = overrides
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect();
    let Ok(config) = BrokerConfig::from_lookup(move |key| {
        owned
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
    }) else {
        panic!("test config must load");
    };
    config
}

/// Starts the broker in the background.
pub async fn spawn_server(config: BrokerConfig) -> TestServer {
    let Ok(listener) = TcpListener::bind("127.0.0.1:0").await else {
        panic!("cannot bind test listener");
    };
    let Ok(addr) = listener.local_addr() else {
        panic!("listener has no address");
    };
    let state = AppState::new(&config);
    let app = build_app(state.clone());
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    TestServer { addr, state }
}

/// Waits until exactly `n` connections are registered.
pub async fn wait_for_connections(server: &TestServer, n: usize) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while server.state.registry.len() != n {
        if tokio::time::Instant::now() > deadline {
            panic!(
                "expected {n} connections, registry has {}",
                server.state.registry.len()
            );
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// Opens a raw client connection.
pub async fn connect(server: &TestServer) -> Client {
    let Ok((stream, _)) = tokio_tungstenite::connect_async(server.ws_url()).await else {
        panic!("cannot connect to test broker");
    };
    stream
}

/// Sends one envelope.
pub async fn emit(client: &mut Client, event: impl Into<EventType>, data: Value) {
    let Ok(text) = Envelope::new(event, data).encode() else {
        panic!("cannot encode envelope");
    };
    send_text(client, &text).await;
}

/// Sends a raw text frame.
pub async fn send_text(client: &mut Client, text: &str) {
    if client.send(Message::text(text)).await.is_err() {
        panic!("send failed");
    }
}

/// Next envelope within `wait`, or `None` on timeout or close.
pub async fn try_next(client: &mut Client, wait: Duration) -> Option<Envelope> {
    let result = tokio::time::timeout(wait, async {
        while let Some(Ok(msg)) = client.next().await {
            if let Message::Text(text) = msg {
                return Envelope::decode(text.as_str()).ok();
            }
        }
        None
    })
    .await;
    result.ok().flatten()
}

/// Next envelope, failing the test after two seconds.
pub async fn next_envelope(client: &mut Client) -> Envelope {
    let Some(envelope) = try_next(client, Duration::from_secs(2)).await else {
        panic!("expected an envelope");
    };
    envelope
}

/// Asserts nothing arrives for a short while.
pub async fn assert_silent(client: &mut Client) {
    if let Some(envelope) = try_next(client, Duration::from_millis(200)).await {
        panic!("unexpected envelope: {envelope:?}");
    }
}
