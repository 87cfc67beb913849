use axum::extract::FromRef;
use std::sync::Arc;

use crate::config::Settings;
use crate::services::ChatService;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub chat_service: Arc<ChatService>,
}

impl FromRef<AppState> for Arc<ChatService> {
    fn from_ref(state: &AppState) -> Self {
        state.chat_service.clone()
    }
}
