use std::sync::Arc;

use super::{
    config::Config,
    database::{Store, init_store},
    error::AppError,
    gateway::Gateway,
    session::SessionKeys,
};

pub struct AppState {
    pub config: Config,
    pub gateway: Gateway,
    pub sessions: SessionKeys,
}

impl AppState {
    pub async fn new() -> Result<Arc<Self>, AppError> {
        let config = Config::load()?;
        let store = init_store(&config.store_url).await?;

        Ok(Self::with_store(config, store))
    }

    pub fn with_store(config: Config, store: Arc<dyn Store>) -> Arc<Self> {
        let sessions = SessionKeys::new(config.session_secret.as_bytes(), config.session_ttl);

        Arc::new(Self {
            gateway: Gateway::new(store),
            sessions,
            config,
        })
    }

    pub fn store(&self) -> Arc<dyn Store> {
        self.gateway.store()
    }
}
