use std::sync::Arc;

use crate::auth::SessionProvider;
use crate::config::AppConfig;
use crate::proxy::Gateway;

/// Shared by every handler and middleware
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub sessions: Arc<dyn SessionProvider>,
    pub gateway: Arc<Gateway>,
}

impl AppState {
    pub fn new(config: AppConfig, sessions: Arc<dyn SessionProvider>, gateway: Gateway) -> Self {
        Self {
            config: Arc::new(config),
            sessions,
            gateway: Arc::new(gateway),
        }
    }
}
