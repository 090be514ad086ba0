use std::net::SocketAddr;

use anyhow::Context;
use stableroom_service::{router, AppState, AppStore};
use tokio::net::TcpListener;
use tracing::{info, warn};

pub async fn run() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let store = AppStore::from_env();
    let thresholds = store.load_thresholds().await.unwrap_or_else(|err| {
        warn!("failed to load thresholds from store: {err:#}");
        Default::default()
    });

    let token = std::env::var("STABLEROOM_TOKEN").unwrap_or_default();
    if token.is_empty() {
        warn!("STABLEROOM_TOKEN is not set, accepting unauthenticated requests");
    }

    let app = router(AppState::new(token, thresholds, Some(store)));

    let port = std::env::var("STABLEROOM_HTTP_PORT")
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(3000);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind service at {addr}"))?;

    info!("service listening on http://{addr}");
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;
    info!("service stopped");
    Ok(())
}
