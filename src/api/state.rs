use std::sync::Arc;

use crate::config::Config;
use crate::spotify::SpotifyClient;

/// Shared state handed to every route handler.
#[derive(Clone)]
pub struct AppState {
    pub client: Arc<SpotifyClient>,
    pub enrich_concurrency: usize,
}

impl AppState {
    pub fn new(client: Arc<SpotifyClient>, enrich_concurrency: usize) -> Self {
        Self {
            client,
            enrich_concurrency,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            Arc::new(SpotifyClient::from_config(config)),
            config.enrich_concurrency,
        )
    }
}
