//! API routes

pub mod analytics;
pub mod bulk;
pub mod conversations;
pub mod health;
pub mod settings;
pub mod widget;

use std::path::Path;

use axum::{
    extract::DefaultBodyLimit,
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    services::{ServeDir, ServeFile},
    trace::TraceLayer,
};

use crate::{
    auth::require_auth,
    security::security_headers_middleware,
    state::AppState,
    websocket::ws_handler,
};

/// Create all routes
pub fn create_router(state: AppState) -> Router {
    let auth_state = state.auth_state();

    // Health check routes (at root level for infrastructure monitoring)
    let health_routes = Router::new()
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness));

    // Storefront widget bootstraps a customer token here
    let public_api_routes = Router::new()
        .route("/widget/session", post(widget::create_session));

    let protected_api_routes = Router::new()
        // Conversations
        .route(
            "/conversations",
            get(conversations::list_conversations).post(conversations::create_conversation),
        )
        .route(
            "/conversations/:id",
            get(conversations::get_conversation).patch(conversations::update_conversation),
        )
        .route(
            "/conversations/:id/messages",
            get(conversations::list_messages).post(conversations::send_message),
        )
        .route("/conversations/:id/read", post(conversations::mark_read))
        .route("/conversations/:id/csat", post(conversations::submit_csat))
        // Customization studio
        .route(
            "/settings",
            get(settings::get_settings).patch(settings::update_settings),
        )
        // Reporting
        .route("/analytics", get(analytics::get_analytics))
        .route("/csat", get(analytics::get_csat))
        // Widget installation
        .route("/widget", get(widget::get_status))
        .route("/widget/code", get(widget::get_code))
        .route("/widget/install", post(widget::install))
        .route("/widget/uninstall", post(widget::uninstall))
        // Bulk operations
        .route("/bulk", post(bulk::create_bulk_operation))
        .route("/bulk/:id", get(bulk::get_bulk_operation))
        .layer(middleware::from_fn_with_state(auth_state, require_auth));

    let chat_api_routes = Router::new()
        .merge(public_api_routes)
        .merge(protected_api_routes);

    // WebSocket routes (auth handled in handler via query parameter)
    let websocket_routes = Router::new().route("/ws/chat", get(ws_handler));

    let static_dir = Path::new(&state.config.static_dir);
    let spa = ServeDir::new(static_dir).fallback(ServeFile::new(static_dir.join("index.html")));

    Router::new()
        .merge(health_routes)
        .merge(websocket_routes)
        .nest("/api/chat", chat_api_routes)
        .fallback_service(spa)
        .layer(DefaultBodyLimit::max(1024 * 1024))
        .layer(middleware::from_fn(security_headers_middleware))
        .layer(cors_layer(&state.config.allowed_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// CORS for the dashboard and storefront widget. No configured origins means
/// any origin; tokens travel in headers, not cookies.
fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!(origin = %o, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    let allow_origin = if origins.is_empty() {
        AllowOrigin::from(Any)
    } else {
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
}
