//! relayhub bridge
//!
//! Loopback WebSocket/HTTP surface for the desktop client, relayed to the hub
//! over the overlay network. Config: first argument, default `bridge.yaml`.

use std::sync::Arc;

use tokio::sync::watch;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use relayhub_core::error::Result;
use relayhub_gateway::{
    bridge::{self, BridgeState, HealthCascade, HealthReport},
    config,
    overlay::{HostOverlay, Overlay},
    shutdown,
};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = run().await {
        tracing::error!(error = %e, "bridge exited with error");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let path = std::env::args().nth(1).unwrap_or_else(|| "bridge.yaml".into());
    let cfg = config::load_bridge_from_file(&path)?;
    let listen = cfg.bridge.listen.clone();
    let overlay: Arc<dyn Overlay> = Arc::new(HostOverlay);

    let (health_tx, health_rx) = watch::channel(HealthReport::unknown());
    let cascade = HealthCascade::from_config(&cfg, overlay.clone());
    let state = BridgeState::new(cfg, overlay, health_rx);

    let probes = tokio::spawn(cascade.run(health_tx, state.shutdown_rx()));
    let pusher = state.spawn_status_push();

    // The local surface is loopback only; it is not an overlay listener.
    let listener = tokio::net::TcpListener::bind(&listen)
        .await
        .map_err(|e| relayhub_core::RelayError::Transport(format!("listen {listen} failed: {e}")))?;
    tracing::info!(%listen, hub = %state.cfg().bridge.hub_addr, "relayhub bridge starting");

    let app = bridge::build_router(state.clone());
    let server_state = state.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown::signal().await;
            server_state.begin_shutdown();
        })
        .await
        .map_err(|e| relayhub_core::RelayError::Internal(format!("server failed: {e}")))?;

    state.begin_shutdown();
    let _ = probes.await;
    let _ = pusher.await;
    tracing::info!("bridge stopped");
    Ok(())
}
