use std::sync::Arc;

use tokio::sync::RwLock;

use crate::config::Config;
use crate::jobs::JobScraper;
use crate::llm_client::LlmGateway;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// The active gateway. Handlers take a snapshot and drop the lock before
    /// calling the model; starting a new session swaps in a fresh gateway.
    gateway: Arc<RwLock<Arc<LlmGateway>>>,
    /// Agent instructions prepended to every resume generation prompt.
    pub agent_instructions: Arc<str>,
    pub scraper: JobScraper,
}

impl AppState {
    pub fn new(
        config: Config,
        gateway: LlmGateway,
        agent_instructions: String,
        scraper: JobScraper,
    ) -> Self {
        Self {
            config,
            gateway: Arc::new(RwLock::new(Arc::new(gateway))),
            agent_instructions: agent_instructions.into(),
            scraper,
        }
    }

    pub async fn gateway(&self) -> Arc<LlmGateway> {
        Arc::clone(&*self.gateway.read().await)
    }

    pub async fn replace_gateway(&self, gateway: LlmGateway) {
        *self.gateway.write().await = Arc::new(gateway);
    }
}
