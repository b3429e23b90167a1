//! Application state shared by every handler

use std::sync::Arc;

use crate::auth::{AuthState, JwtManager};
use crate::config::Config;
use crate::services::{
    AnalyticsService, BulkService, ChatService, CsatService, Notifier, SettingsService,
    WidgetService,
};
use crate::store::Store;
use crate::websocket::{ChatRelay, WebSocketState};

/// Services are built once here and cloned into handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub jwt_manager: Arc<JwtManager>,
    pub chat: ChatService,
    pub bulk: BulkService,
    pub analytics: AnalyticsService,
    pub csat: CsatService,
    pub settings: SettingsService,
    pub widget: WidgetService,
    pub ws_state: WebSocketState,
    pub relay: ChatRelay,
}

impl AppState {
    /// Wire every service to one backing store
    pub fn from_store<S: Store + 'static>(
        config: Config,
        store: Arc<S>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let jwt_manager = Arc::new(JwtManager::new(
            &config.jwt_secret,
            config.jwt_expiry_hours,
            config.customer_session_minutes,
        ));

        let chat = ChatService::new(store.clone());
        let analytics = AnalyticsService::new(store.clone(), store.clone());
        let ws_state = WebSocketState::new();
        let relay = ChatRelay::new(ws_state.clone(), chat.clone(), analytics.clone(), notifier);

        Self {
            bulk: BulkService::new(store.clone(), store.clone()),
            csat: CsatService::new(store.clone(), store.clone()),
            settings: SettingsService::new(store.clone()),
            widget: WidgetService::new(
                store,
                chat.clone(),
                Arc::clone(&jwt_manager),
                config.widget_script_url.clone(),
                config.public_url.clone(),
            ),
            config: Arc::new(config),
            jwt_manager,
            chat,
            analytics,
            ws_state,
            relay,
        }
    }

    /// Get auth state for middleware
    pub fn auth_state(&self) -> AuthState {
        AuthState {
            jwt_manager: Arc::clone(&self.jwt_manager),
        }
    }
}
