//! Relay HTTP server.
mod error;
mod routes;

use std::net::SocketAddr;

use chat_engine::{Relay, UpstreamSettings};
use chat_logging::chat_info;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

pub use error::ApiError;
pub use routes::{create_router, AppState, ChatRequest};

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub listen: SocketAddr,
    pub upstream: UpstreamSettings,
}

/// Serves the relay until `shutdown` is cancelled.
///
/// Open reply streams observe the same token and end at their next fragment
/// boundary, so shutdown does not wait for long generations.
pub async fn run_server(settings: ServerSettings, shutdown: CancellationToken) -> anyhow::Result<()> {
    let relay = Relay::with_reqwest(&settings.upstream)?;
    let listener = TcpListener::bind(settings.listen).await?;
    chat_info!(
        "relay listening on {} upstream={} model={}",
        listener.local_addr()?,
        settings.upstream.chat_url(),
        relay.model()
    );

    let app = create_router(AppState::new(relay, shutdown.clone()));
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;
    chat_info!("relay stopped");
    Ok(())
}
