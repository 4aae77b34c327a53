mod config;
mod connection;
mod entity;
mod error;
mod geometry;
mod handlers;
mod ocean;
mod quadtree;
mod racing;
mod wire;

use std::sync::Arc;

use handlers::AppState;
use ocean::OceanWorld;
use racing::RacingWorld;
use tokio::sync::RwLock;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = Arc::new(config::Config::from_env());
    info!(bind_addr = %config.bind_addr, "starting fish-backend");

    let ocean_world = Arc::new(RwLock::new(OceanWorld::new()));
    let (ocean_input_tx, ocean_input_rx) = tokio::sync::mpsc::channel(config.input_channel_capacity);
    let racing_world = Arc::new(RwLock::new(RacingWorld::new()));

    tokio::spawn(ocean::run_tick_loop(ocean_world.clone(), ocean_input_rx, config.clone()));
    tokio::spawn(ocean::run_broadcast_loop(ocean_world.clone(), config.clone()));
    tokio::spawn(ocean::run_leaderboard_loop(ocean_world.clone(), config.clone()));
    tokio::spawn(ocean::run_shark_vision_loop(ocean_world.clone(), config.clone()));

    let state = AppState {
        config: config.clone(),
        ocean_world,
        ocean_input_tx,
        racing_world,
    };

    let cors = match &config.cors_allow_origin {
        Some(origin) => CorsLayer::new().allow_origin(origin.parse::<axum::http::HeaderValue>()?),
        None => CorsLayer::new().allow_origin(Any),
    };

    let app = handlers::router(state).layer(cors);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!(addr = %config.bind_addr, "listening");
    axum::serve(listener, app).await?;

    Ok(())
}
