use std::sync::Arc;

use crate::{
    config::Config,
    errors::AppResult,
    gateways::{HttpAttemptGateway, RemoteAttemptGateway},
    services::{
        answer_store::AnswerStore,
        attempt_session::AttemptSession,
        save_coordinator::SaveCoordinator,
    },
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub gateway: Arc<dyn RemoteAttemptGateway>,
}

impl AppState {
    pub fn new(config: Config) -> AppResult<Self> {
        let gateway = Arc::new(HttpAttemptGateway::new(&config)?);
        Ok(Self::with_gateway(config, gateway))
    }

    pub fn with_gateway(config: Config, gateway: Arc<dyn RemoteAttemptGateway>) -> Self {
        Self {
            config: Arc::new(config),
            gateway,
        }
    }

    /// A fresh session for one attempt view.
    pub fn new_session(&self) -> Arc<AttemptSession> {
        Arc::new(AttemptSession::new(
            Arc::clone(&self.gateway),
            AnswerStore::new(),
            self.config.session_config(),
        ))
    }

    /// Starts auto-saving `session` on the configured interval.
    pub fn auto_save(&self, session: &Arc<AttemptSession>) -> SaveCoordinator {
        SaveCoordinator::spawn_default(Arc::clone(session))
    }
}
