use std::sync::Arc;

use crate::auth::AuthService;
use crate::config::AppConfig;
use crate::store::UserStore;

/// Shared application state handed to every handler. The store handle is
/// constructed once at startup and injected; nothing here is lazily
/// initialized or global.
#[derive(Clone)]
pub struct AppState {
    pub auth: AuthService,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn from_parts(store: Arc<dyn UserStore>, config: Arc<AppConfig>) -> Self {
        Self {
            auth: AuthService::new(store),
            config,
        }
    }
}
