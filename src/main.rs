use std::path::PathBuf;

use actix_web::{web, App, HttpServer};
use tracing::info;

use rex::app::{self, state::AppState};
use rex::config::ExchangeConfig;
use rex::core;

#[global_allocator]
static ALLOC: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let cfg_path = std::env::var("REX_CONFIG").map(PathBuf::from).unwrap_or_else(|_| PathBuf::from("rex.yaml"));

    let config = match ExchangeConfig::load(&cfg_path) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("failed to load config from {}: {err:#}, falling back to defaults", cfg_path.display());
            ExchangeConfig::default()
        }
    };

    core::observability::init(&config.logging)?;
    info!("exchange config loaded");

    let state = web::Data::new(AppState::build(config)?);
    let event_recorder = state.event_recorder.clone();

    info!("starting http server on 0.0.0.0:8080");
    let server = HttpServer::new(move || App::new().app_data(state.clone()).configure(app::handler::configure))
        .bind(("0.0.0.0", 8080))?
        .run();

    let server_handle = server.handle();
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        info!("shutdown signal received, stopping http server");
        server_handle.stop(true).await;
    });

    server.await?;

    if let Some(recorder) = event_recorder {
        info!("draining event recorder");
        recorder.close().await;
    }

    info!("shutdown complete");
    Ok(())
}
