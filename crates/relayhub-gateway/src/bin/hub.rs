//! relayhub hub
//!
//! - WebSocket endpoint: /ws?userId=...&userName=...&token=...
//! - HTTP: /health, /api/messages, /api/unread, /api/users, /api/admin/delete
//! - Config: first argument, default `hub.yaml`

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use relayhub_core::error::Result;
use relayhub_gateway::{
    app_state::AppState,
    config,
    overlay::{HostOverlay, Overlay},
    router, shutdown,
};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = run().await {
        tracing::error!(error = %e, "hub exited with error");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let path = std::env::args().nth(1).unwrap_or_else(|| "hub.yaml".into());
    let cfg = config::load_hub_from_file(&path)?;
    let listen = cfg.hub.listen.clone();

    let state = AppState::from_config(cfg);
    let app = router::build_router(state.clone());

    let listener = HostOverlay.listen(&listen).await?;
    tracing::info!(%listen, config = %path, "relayhub hub starting");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown::signal().await;
            state.begin_shutdown();
        })
        .await
        .map_err(|e| relayhub_core::RelayError::Internal(format!("server failed: {e}")))?;

    tracing::info!("hub stopped");
    Ok(())
}
