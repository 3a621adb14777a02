use std::sync::Arc;

use crate::auth::Authenticator;
use crate::config::AppConfig;
use crate::database::Store;
use crate::provider::IdentityProvider;

/// Shared, read-only handles passed to every handler
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn Store>,
    pub provider: Arc<dyn IdentityProvider>,
    pub authenticator: Arc<Authenticator>,
}

impl AppState {
    pub fn new(config: AppConfig, store: Arc<dyn Store>, provider: Arc<dyn IdentityProvider>) -> Self {
        let authenticator = Arc::new(Authenticator::new(&config.provider, provider.clone()));
        Self {
            config: Arc::new(config),
            store,
            provider,
            authenticator,
        }
    }
}
