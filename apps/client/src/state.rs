use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use crate::auth_api::{AuthApi, HttpAuthApi};
use crate::config::Config;
use crate::gateway::Gateway;
use crate::session::{FileSnapshotStore, SessionStore, SnapshotStore};

/// Everything a front end needs, wired once at startup.
///
/// The session store is injected into the gateway rather than reached through
/// a global, so two `ClientState`s never share a session.
pub struct ClientState {
    pub config: Config,
    pub session: Arc<SessionStore>,
    pub gateway: Gateway,
}

impl ClientState {
    /// Restores the persisted session from `config.session_file`.
    pub fn from_config(config: Config) -> Result<Self> {
        let storage: Arc<dyn SnapshotStore> =
            Arc::new(FileSnapshotStore::new(config.session_file.clone()));
        Self::with_storage(config, storage)
    }

    /// Same wiring with a caller-chosen snapshot store.
    pub fn with_storage(config: Config, storage: Arc<dyn SnapshotStore>) -> Result<Self> {
        let http = config.build_http_client()?;
        let api: Arc<dyn AuthApi> = Arc::new(HttpAuthApi::new(http.clone(), config.api_url.clone()));
        let session = Arc::new(SessionStore::open(api, storage));
        let gateway = Gateway::new(http, config.api_url.clone(), session.clone());

        info!(api_url = %config.api_url, "Client initialized");

        Ok(Self {
            config,
            session,
            gateway,
        })
    }
}
