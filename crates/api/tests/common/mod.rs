//! Shared harness for router tests.
//!
//! Builds the full router over a fresh `MemoryStore` and drives it with
//! `tower::ServiceExt::oneshot`, so no socket or database is needed.

#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::Value;
use tower::ServiceExt;

use trichat_api::{
    create_router,
    services::LogNotifier,
    store::MemoryStore,
    AppState, Config,
};
use trichat_shared::{AgentId, CustomerId, ShopId};

pub const TEST_SECRET: &str = "integration-test-secret-32-chars-min!";
pub const SHOP: &str = "demo-shop.myshopify.com";

pub struct TestApp {
    pub store: Arc<MemoryStore>,
    pub state: AppState,
    router: Router,
}

impl TestApp {
    pub fn new() -> Self {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();

        let store = Arc::new(MemoryStore::new());
        let state = AppState::from_store(
            Config::for_tests(TEST_SECRET),
            store.clone(),
            Arc::new(LogNotifier),
        );
        let router = create_router(state.clone());
        Self {
            store,
            state,
            router,
        }
    }

    pub fn agent_token(&self, shop: &str, agent: &str) -> String {
        self.state
            .jwt_manager
            .generate_agent_token(&AgentId::new(agent), &ShopId::new(shop))
            .unwrap()
    }

    pub fn customer_token(&self, shop: &str, customer: &str) -> String {
        self.state
            .jwt_manager
            .generate_customer_token(&CustomerId::new(customer), &ShopId::new(shop))
            .unwrap()
    }

    /// Send one request; returns the status and the parsed JSON body
    /// (`Value::Null` for an empty body)
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.request(Method::GET, uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, token, Some(body)).await
    }

    pub async fn patch(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.request(Method::PATCH, uri, token, Some(body)).await
    }

    /// Install the widget for `SHOP` and open a customer session
    pub async fn widget_session(&self, customer: Option<&str>) -> Value {
        let agent = self.agent_token(SHOP, "agent-1");
        let (status, _) = self
            .post("/api/chat/widget/install", Some(&agent), serde_json::json!({}))
            .await;
        assert_eq!(status, StatusCode::OK);

        let (status, session) = self
            .post(
                "/api/chat/widget/session",
                None,
                serde_json::json!({ "shop_id": SHOP, "customer_id": customer }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "session response: {}", session);
        session
    }
}
