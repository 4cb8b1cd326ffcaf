//! Dashboard client against an in-process broker.

#![allow(clippy::panic)]

mod common;

use std::time::Duration;

use serde_json::json;
use tokio::sync::mpsc;

use common::{assert_silent, connect, emit, next_envelope, spawn_server, test_config, wait_for_connections};
use relay_broker::client::{ClientHandle, ConnectionStatus, DashboardClient};
use relay_broker::config::{ClientConfig, LogFormat};
use relay_broker::domain::{Envelope, EventType};
use relay_broker::error::BrokerError;

fn client_config(url: String, base_ms: u64, max_attempts: u32) -> ClientConfig {
    ClientConfig {
        broker_url: url,
        reconnect_base_delay: Duration::from_millis(base_ms),
        reconnect_max_attempts: max_attempts,
        race_duration: Duration::from_secs(1),
        log_format: LogFormat::Pretty,
    }
}

async fn wait_for_status(handle: &ClientHandle, wanted: ConnectionStatus) {
    let mut status = handle.status();
    let waited = tokio::time::timeout(
        Duration::from_secs(5),
        status.wait_for(|current| *current == wanted),
    )
    .await;
    if !matches!(waited, Ok(Ok(_))) {
        panic!("client never reached {wanted:?}");
    }
}

#[tokio::test]
async fn dashboard_receives_normalized_attention() {
    let server = spawn_server(test_config(&[])).await;
    let mut producer = connect(&server).await;

    let (seen_tx, mut seen_rx) = mpsc::unbounded_channel();
    let handle = DashboardClient::new(client_config(server.ws_url(), 50, 3))
        .on(EventType::Attention, move |data| {
            let _ = seen_tx.send(data.clone());
        })
        .spawn();
    wait_for_status(&handle, ConnectionStatus::Connected).await;
    wait_for_connections(&server, 2).await;

    // handshake and requestState are not relayed
    assert_silent(&mut producer).await;

    emit(&mut producer, EventType::Attention, json!({"attention": 55})).await;

    let Ok(Some(data)) = tokio::time::timeout(Duration::from_secs(2), seen_rx.recv()).await else {
        panic!("dashboard handler never ran");
    };
    assert_eq!(data["attention"], 55);
    assert_eq!(data["player"], "1");
    assert!(data["timestamp"].as_i64().is_some());

    // broadcast-all echoes back to the producer too
    assert_eq!(next_envelope(&mut producer).await.event, EventType::Attention);

    let Ok(()) = handle.disconnect().await else {
        panic!("intentional disconnect must succeed");
    };
    wait_for_connections(&server, 1).await;
}

#[tokio::test]
async fn dashboard_send_reaches_other_clients() {
    let server = spawn_server(test_config(&[])).await;
    let mut producer = connect(&server).await;

    let handle = DashboardClient::new(client_config(server.ws_url(), 50, 3)).spawn();
    wait_for_status(&handle, ConnectionStatus::Connected).await;
    wait_for_connections(&server, 2).await;

    assert!(handle.send(Envelope::new(EventType::Collision, json!({"player": 2}))));

    let env = next_envelope(&mut producer).await;
    assert_eq!(env.event, EventType::Collision);
    assert_eq!(env.data["player"], 2);

    let Ok(()) = handle.disconnect().await else {
        panic!("intentional disconnect must succeed");
    };
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn send_right_after_connect_is_delivered() {
    let server = spawn_server(test_config(&[])).await;
    let mut producer = connect(&server).await;
    wait_for_connections(&server, 1).await;

    for round in 0..20 {
        let handle = DashboardClient::new(client_config(server.ws_url(), 50, 3)).spawn();
        wait_for_status(&handle, ConnectionStatus::Connected).await;
        assert!(handle.send(Envelope::new(EventType::Collision, json!({"round": round}))));

        let env = next_envelope(&mut producer).await;
        assert_eq!(env.event, EventType::Collision);
        assert_eq!(env.data["round"], round);

        let Ok(()) = handle.disconnect().await else {
            panic!("intentional disconnect must succeed");
        };
    }
}

#[tokio::test]
async fn unreachable_broker_exhausts_reconnects() {
    let handle = DashboardClient::new(client_config("ws://127.0.0.1:1/ws".to_string(), 10, 2)).spawn();

    assert!(!handle.send(Envelope::new(EventType::Blink, json!(1))));
    wait_for_status(&handle, ConnectionStatus::Lost).await;

    match handle.disconnect().await {
        Err(BrokerError::ReconnectExhausted { attempts }) => assert_eq!(attempts, 2),
        other => panic!("expected exhaustion, got {other:?}"),
    }
}
