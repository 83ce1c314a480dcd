use std::net::SocketAddr;

use anyhow::{Context, Result};
use bazaar::{AppState, Settings, build_router};
use dotenvy::dotenv;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    dotenv().ok();
    init_tracing();

    if let Err(err) = app_main().await {
        error!(?err, "application error");
        std::process::exit(1);
    }
}

async fn app_main() -> Result<()> {
    let settings = Settings::from_env()?;

    let state = AppState::new(&settings).await?;
    state.ensure_seed_admin(&settings).await?;

    let app = build_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], settings.port));
    info!(%addr, strict_bearer = settings.strict_bearer, "listening");

    let listener = TcpListener::bind(addr)
        .await
        .context("failed to bind listener")?;
    axum::serve(listener, app).await.context("server error")?;

    Ok(())
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}
