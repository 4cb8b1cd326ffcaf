//! relay-broker server entry point.
//!
//! Starts the Axum server with the `/ws` relay endpoint and the HTTP API.

use anyhow::Context;

use relay_broker::app_state::AppState;
use relay_broker::config::BrokerConfig;
use relay_broker::domain::ConnectionRegistry;
use relay_broker::error::BrokerError;
use relay_broker::logging;
use relay_broker::server::{build_app, shutdown_signal};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = BrokerConfig::from_env().context("invalid broker configuration")?;
    logging::init(config.log_format);
    tracing::info!(
        addr = %config.listen_addr,
        events = config.policies.len(),
        "starting relay-broker"
    );

    let state = AppState::new(&config);
    let registry = std::sync::Arc::clone(&state.registry);
    let app = build_app(state);

    // Bind failure is fatal
    let listener = match tokio::net::TcpListener::bind(config.listen_addr).await {
        Ok(listener) => listener,
        Err(source) => {
            let err = BrokerError::Bind {
                addr: config.listen_addr,
                source,
            };
            tracing::error!(error = %err, "cannot start relay");
            return Err(err.into());
        }
    };
    tracing::info!(addr = %config.listen_addr, "relay listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!(
        open_connections = registry.len(),
        "relay stopped"
    );
    Ok(())
}
