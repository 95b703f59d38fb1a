//! Shared application state.

use std::sync::Arc;

use crate::auth::JwtManager;
use crate::config::ServerConfig;
use fiado_db::Database;

/// State handed to every handler. Cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub jwt: Arc<JwtManager>,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(db: Database, config: ServerConfig) -> Self {
        let jwt = Arc::new(JwtManager::new(
            config.jwt_secret.clone(),
            config.jwt_access_lifetime_secs,
            config.jwt_refresh_lifetime_secs,
        ));

        AppState {
            db,
            jwt,
            config: Arc::new(config),
        }
    }
}
