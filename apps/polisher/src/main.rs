mod config;
mod database;
mod errors;
mod generation;
mod jobs;
mod llm_client;
mod routes;
mod state;

use anyhow::Result;
use std::net::SocketAddr;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::generation::generator::load_agent_instructions;
use crate::jobs::JobScraper;
use crate::llm_client::LlmGateway;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on malformed env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Polisher API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize LLM gateway (unconfigured until a session is posted, unless env provides one)
    let gateway = match config.llm.clone() {
        Some(llm) => LlmGateway::connect(llm, config.gateway)?,
        None => {
            warn!("LLM_PROVIDER not set; gateway starts unconfigured");
            LlmGateway::unconfigured()
        }
    };

    let agent_instructions =
        load_agent_instructions(config.agent_instructions_path.as_deref()).await;

    let scraper = JobScraper::new(config.scrape_timeout)?;

    // Build app state
    let state = AppState::new(config.clone(), gateway, agent_instructions, scraper);

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
