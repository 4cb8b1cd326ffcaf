//! relay-emit: producer that plays one scripted race session.
//!
//! Connects to the broker, announces a race between two players, emits
//! random collisions and overtakes once per second, then sends both finish
//! times and the closing `hasFinished`.

use std::time::Duration;

use anyhow::Context;
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use relay_broker::client::RaceSession;
use relay_broker::config::ClientConfig;
use relay_broker::domain::Envelope;
use relay_broker::logging;

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;

const PLAYER_EMAILS: [&str; 2] = ["player.alpha@neurorace.com", "player.beta@neurorace.com"];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ClientConfig::from_env();
    logging::init(config.log_format);

    let (stream, _response) = tokio_tungstenite::connect_async(config.broker_url.as_str())
        .await
        .with_context(|| format!("cannot connect to {}", config.broker_url))?;
    tracing::info!(url = %config.broker_url, "connected as race simulator");

    let (mut ws_tx, mut ws_rx) = stream.split();
    let drain = tokio::spawn(async move {
        while let Some(Ok(msg)) = ws_rx.next().await {
            if let Message::Text(text) = msg {
                tracing::debug!(frame = %text, "relayed from broker");
            }
        }
    });

    let race = RaceSession::new(PLAYER_EMAILS.map(str::to_string));
    tracing::info!(session_id = race.session_id(), "race started");
    send(&mut ws_tx, &race.start()).await?;

    for _ in 0..config.race_duration.as_secs() {
        tokio::time::sleep(Duration::from_secs(1)).await;
        let incident = race.tick(&mut rand::rng());
        if let Some(envelope) = incident {
            tracing::info!(
                player = %envelope.data["player"],
                incident = %envelope.data["eventType"],
                "in-race event"
            );
            send(&mut ws_tx, &envelope).await?;
        }
    }

    // player 2 crosses the line first
    send(&mut ws_tx, &race.finish(2, 121.5)).await?;
    tokio::time::sleep(Duration::from_millis(1500)).await;
    send(&mut ws_tx, &race.finish(1, 123.0)).await?;
    send(&mut ws_tx, &race.end()).await?;
    tracing::info!(session_id = race.session_id(), "race finished");

    if let Err(err) = ws_tx.close().await {
        tracing::debug!(error = %err, "close failed");
    }
    let _ = tokio::time::timeout(Duration::from_secs(2), drain).await;
    Ok(())
}

async fn send(ws_tx: &mut WsSink, envelope: &Envelope) -> anyhow::Result<()> {
    let text = envelope.encode().context("cannot encode envelope")?;
    ws_tx
        .send(Message::text(text))
        .await
        .context("broker connection lost")
}
