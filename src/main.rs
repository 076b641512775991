//! iptv-live entry point.
//!
//! Connects to the configured dashboard's event channel, logs readiness
//! changes and handled events, and tears down cleanly on Ctrl-C.

use anyhow::Context;
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::EnvFilter;

use iptv_live::config::ClientConfig;
use iptv_live::service::LiveClient;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json")) {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    // Load configuration
    let config = ClientConfig::from_env().context("loading configuration")?;
    tracing::info!(page = %config.page_url, mode = ?config.mode, "starting iptv-live");

    // Build and start the client
    let client = LiveClient::from_config(&config).context("building live client")?;
    let mut context = client.context();
    let mut events = client.state().event_bus.subscribe();
    client.start().context("starting live client")?;

    let mut was_ready = context.is_ready();
    loop {
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                result.context("waiting for Ctrl-C")?;
                tracing::info!("shutdown requested");
                break;
            }
            event = events.recv() => match event {
                Ok(event) => tracing::info!(event_type = %event.event_type, "server event handled"),
                Err(RecvError::Lagged(missed)) => tracing::warn!(missed, "event log lagging"),
                Err(RecvError::Closed) => break,
            },
            snapshot = context.changed() => {
                let Some(snapshot) = snapshot else {
                    break;
                };
                if snapshot.is_ready != was_ready {
                    was_ready = snapshot.is_ready;
                    tracing::info!(ready = was_ready, "connection readiness changed");
                }
                if context.status().is_disconnected() {
                    tracing::error!("reconnect attempts exhausted");
                    break;
                }
            }
        }
    }

    client.shutdown().await;
    Ok(())
}
