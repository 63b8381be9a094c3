pub mod backoff;
pub mod client;
pub mod signing;
pub mod token_cache;
pub mod types;

pub use client::GatewayClient;
pub use token_cache::TokenCache;

use std::sync::Arc;

use crate::core::config::AbdmConfig;

pub struct GatewayModule {
    pub client: Arc<GatewayClient>,
}

impl GatewayModule {
    pub fn new(config: AbdmConfig) -> anyhow::Result<Self> {
        Ok(Self {
            client: Arc::new(GatewayClient::new(config)?),
        })
    }

    pub fn client(&self) -> Arc<GatewayClient> {
        self.client.clone()
    }
}
