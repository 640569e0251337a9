// SPDX-License-Identifier: AGPL-3.0-or-later

use std::{env, net::SocketAddr, sync::Arc};

use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use trade_gateway::{api::router, config, engine::memory::MemoryEngine, state::AppState};

#[tokio::main]
async fn main() {
    init_tracing();

    let engine = Arc::new(MemoryEngine::new());
    seed_from_env(&engine);

    let state = AppState::new(engine.handles());
    let app = router(state);

    let host = env::var(config::HOST_ENV).unwrap_or_else(|_| config::DEFAULT_HOST.to_string());
    let port: u16 = env::var(config::PORT_ENV)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(config::DEFAULT_PORT);
    let addr: SocketAddr = format!("{host}:{port}")
        .parse()
        .expect("Failed to parse bind address");

    let listener = TcpListener::bind(addr)
        .await
        .expect("Failed to bind server address");
    tracing::info!(%addr, "trade gateway listening (docs at /docs)");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server failed");
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config::DEFAULT_LOG_FILTER));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match env::var(config::LOG_FORMAT_ENV).as_deref() {
        Ok("json") => builder.json().init(),
        _ => builder.pretty().init(),
    }
}

/// Seed the sandbox engine from the environment for local runs.
fn seed_from_env(engine: &MemoryEngine) {
    if let Ok(password) = env::var(config::WALLET_PASSWORD_ENV) {
        engine.set_encrypted_password(&password);
    }
    if let Some(balance) = env::var(config::SEED_BALANCE_ENV)
        .ok()
        .and_then(|value| value.parse().ok())
    {
        engine.set_available_balance(balance);
    }
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install SIGINT handler");
    tracing::info!("shutdown signal received");
}
