use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use speech_client::GeminiClient;
use tokio::net::TcpListener;
use tracing::info;

use server::{
    app::build_app, config::ServerConfig, controller::PlaybackController, sink::build_sink,
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let _ = dotenv::dotenv();

    async_main().await
}

async fn async_main() -> anyhow::Result<()> {
    info!("Starting speech session server...");

    let config = ServerConfig::from_env();
    info!(
        "Server configuration loaded: port={}, model={}, sink={:?}, gemini_timeout={}s",
        config.port, config.gemini_model, config.sink, config.gemini_timeout_secs
    );

    let client = GeminiClient::new(config.client_config())
        .context("failed to build the Gemini HTTP client")?;
    let sink = build_sink(config.sink)?;
    let controller = Arc::new(PlaybackController::new(Arc::new(client), sink));

    let state = AppState {
        controller,
        config: config.clone(),
    };
    let app = build_app(state, &config);

    let addr = SocketAddr::new(config.bind_addr, config.port);
    let listener = TcpListener::bind(addr).await.map_err(|e| {
        anyhow::anyhow!("Failed to bind {addr}: {e}. Try a different PORT.")
    })?;

    info!("Server listening on http://{addr}");
    axum::serve(listener, app).await?;
    Ok(())
}
