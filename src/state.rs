use crate::auth::{BearerGuard, JwtKeys, RequestGuard};
use crate::backend::{IdentityClient, MemoryBackend, StoreClient, SupabaseClient};
use crate::config::{AppConfig, BackendKind, ConfigError};
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn StoreClient>,
    pub identity: Arc<dyn IdentityClient>,
    pub guard: Arc<dyn RequestGuard>,
    pub keys: JwtKeys,
}

impl AppState {
    pub fn init(config: AppConfig) -> anyhow::Result<Self> {
        let config = Arc::new(config);
        let keys = JwtKeys::from_config(&config.jwt);

        let (store, identity) = match config.backend {
            BackendKind::Supabase => {
                let supabase = config
                    .supabase
                    .as_ref()
                    .ok_or(ConfigError::Missing("SUPABASE_URL"))?;
                let client = Arc::new(SupabaseClient::new(supabase)?);
                info!(url = %supabase.url, "using hosted backend");
                (
                    client.clone() as Arc<dyn StoreClient>,
                    client as Arc<dyn IdentityClient>,
                )
            }
            BackendKind::Memory => {
                let backend = Arc::new(MemoryBackend::new(keys.clone()));
                info!("using in-memory backend");
                (
                    backend.clone() as Arc<dyn StoreClient>,
                    backend as Arc<dyn IdentityClient>,
                )
            }
        };

        Ok(Self::from_parts(config, store, identity, keys))
    }

    pub fn from_parts(
        config: Arc<AppConfig>,
        store: Arc<dyn StoreClient>,
        identity: Arc<dyn IdentityClient>,
        keys: JwtKeys,
    ) -> Self {
        Self {
            config,
            store,
            identity,
            guard: Arc::new(BearerGuard),
            keys,
        }
    }

    /// Replace the request guard. Tests use this to skip token checks.
    pub fn with_guard(mut self, guard: Arc<dyn RequestGuard>) -> Self {
        self.guard = guard;
        self
    }

    /// In-memory state with a fixed signing secret.
    pub fn fake() -> Self {
        let config = Arc::new(AppConfig::for_memory("test-secret"));
        let keys = JwtKeys::from_config(&config.jwt);
        let backend = Arc::new(MemoryBackend::new(keys.clone()));
        Self::from_parts(config, backend.clone(), backend, keys)
    }

    /// Release the outbound connection pool.
    pub async fn close(&self) {
        self.store.close().await;
    }
}
