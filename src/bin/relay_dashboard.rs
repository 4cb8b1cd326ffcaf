//! relay-dashboard: headless dashboard that logs every relayed event.
//!
//! Connects to the broker with automatic reconnection and prints the live
//! attention feed and race events. Exits non-zero once the reconnect budget
//! is exhausted.

use anyhow::Context;

use relay_broker::client::{ConnectionStatus, DashboardClient};
use relay_broker::config::ClientConfig;
use relay_broker::domain::EventType;
use relay_broker::logging;
use relay_broker::server::shutdown_signal;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ClientConfig::from_env();
    logging::init(config.log_format);
    tracing::info!(
        url = %config.broker_url,
        max_attempts = config.reconnect_max_attempts,
        "starting relay-dashboard"
    );

    let mut client = DashboardClient::new(config)
        .on(EventType::Attention, |data| {
            tracing::info!(
                player = %data["player"],
                attention = %data["attention"],
                timestamp = %data["timestamp"],
                "attention"
            );
        })
        .on(EventType::ESense, |data| {
            tracing::info!(
                player = %data["player"],
                attention = %data["attention"],
                status = %data["status"],
                "eSense"
            );
        });
    for event in [
        EventType::Blink,
        EventType::HandGesture,
        EventType::RaceConfigure,
        EventType::RaceStarted,
        EventType::Collision,
        EventType::Overtake,
        EventType::HasFinished,
        EventType::GameEvent,
    ] {
        let name = event.to_string();
        client = client.on(event, move |data| {
            tracing::info!(event = %name, payload = %data, "event");
        });
    }

    let handle = client.spawn();
    let mut status = handle.status();

    let watcher = async {
        loop {
            if status.changed().await.is_err() {
                break;
            }
            let current = *status.borrow_and_update();
            tracing::info!(status = current.label(), "connection status");
            if current == ConnectionStatus::Lost {
                break;
            }
        }
    };

    tokio::select! {
        () = shutdown_signal() => {}
        () = watcher => {}
    }

    handle.disconnect().await.context("dashboard connection lost")?;
    tracing::info!("relay-dashboard stopped");
    Ok(())
}
