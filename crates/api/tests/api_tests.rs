//! Router-level tests over the in-memory store

mod common;

use axum::http::StatusCode;
use serde_json::json;

use crate::common::{TestApp, SHOP};

// ============================================================================
// Health
// ============================================================================

#[tokio::test]
async fn health_reports_ok() {
    let app = TestApp::new();
    let (status, body) = app.get("/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "OK");
    assert!(body["timestamp"].is_string());
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn readiness_fails_when_store_is_down() {
    let app = TestApp::new();
    assert_eq!(app.get("/health/ready", None).await.0, StatusCode::OK);

    app.store.set_unavailable(true);
    assert_eq!(
        app.get("/health/ready", None).await.0,
        StatusCode::SERVICE_UNAVAILABLE
    );
    // Liveness does not depend on the store
    assert_eq!(app.get("/health/live", None).await.0, StatusCode::OK);
}

// ============================================================================
// Authentication
// ============================================================================

#[tokio::test]
async fn protected_routes_require_token() {
    let app = TestApp::new();
    let (status, body) = app.get("/api/chat/conversations", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");

    let (status, body) = app
        .get("/api/chat/conversations", Some("not-a-token"))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "INVALID_TOKEN");
}

#[tokio::test]
async fn customers_cannot_use_dashboard_routes() {
    let app = TestApp::new();
    let customer = app.customer_token(SHOP, "cust-1");

    for uri in [
        "/api/chat/conversations",
        "/api/chat/settings",
        "/api/chat/analytics",
        "/api/chat/widget",
    ] {
        let (status, _) = app.get(uri, Some(&customer)).await;
        assert_eq!(status, StatusCode::FORBIDDEN, "{}", uri);
    }
}

// ============================================================================
// Widget + conversations
// ============================================================================

#[tokio::test]
async fn session_requires_installed_widget() {
    let app = TestApp::new();
    let (status, _) = app
        .post("/api/chat/widget/session", None, json!({ "shop_id": SHOP }))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn customer_message_is_visible_to_agent() {
    let app = TestApp::new();
    let session = app.widget_session(Some("cust-1")).await;
    let customer = session["token"].as_str().unwrap().to_string();
    let conversation_id = session["conversation_id"].as_str().unwrap().to_string();
    assert_eq!(session["customer_id"], "cust-1");
    assert!(session["expires_in"].as_i64().unwrap() > 0);

    let (status, message) = app
        .post(
            &format!("/api/chat/conversations/{}/messages", conversation_id),
            Some(&customer),
            json!({ "content": "Where is my order?" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(message["sender"], "customer");
    assert_eq!(message["customer_id"], "cust-1");
    assert_eq!(message["message_type"], "text");

    let agent = app.agent_token(SHOP, "agent-1");
    let (status, messages) = app
        .get(
            &format!("/api/chat/conversations/{}/messages", conversation_id),
            Some(&agent),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let messages = messages.as_array().unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0]["id"], message["id"]);

    let (_, conversation) = app
        .get(
            &format!("/api/chat/conversations/{}", conversation_id),
            Some(&agent),
        )
        .await;
    assert_eq!(conversation["message_count"], 1);
    assert_eq!(conversation["unread_count"], 1);

    let (status, _) = app
        .post(
            &format!("/api/chat/conversations/{}/read", conversation_id),
            Some(&agent),
            json!({}),
        )
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (_, conversation) = app
        .get(
            &format!("/api/chat/conversations/{}", conversation_id),
            Some(&agent),
        )
        .await;
    assert_eq!(conversation["unread_count"], 0);
}

#[tokio::test]
async fn customer_cannot_read_another_customers_conversation() {
    let app = TestApp::new();
    let session = app.widget_session(Some("cust-1")).await;
    let conversation_id = session["conversation_id"].as_str().unwrap().to_string();

    let intruder = app.customer_token(SHOP, "cust-2");
    let (status, _) = app
        .get(
            &format!("/api/chat/conversations/{}/messages", conversation_id),
            Some(&intruder),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Same id under another shop does not exist
    let other_shop = app.agent_token("other-shop.myshopify.com", "agent-9");
    let (status, _) = app
        .get(
            &format!("/api/chat/conversations/{}", conversation_id),
            Some(&other_shop),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn session_resumes_own_conversation() {
    let app = TestApp::new();
    let first = app.widget_session(Some("cust-1")).await;

    let (status, resumed) = app
        .post(
            "/api/chat/widget/session",
            None,
            json!({
                "shop_id": SHOP,
                "customer_id": "cust-1",
                "conversation_id": first["conversation_id"],
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(resumed["conversation_id"], first["conversation_id"]);

    let (status, _) = app
        .post(
            "/api/chat/widget/session",
            None,
            json!({
                "shop_id": SHOP,
                "customer_id": "cust-2",
                "conversation_id": first["conversation_id"],
            }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn blank_message_is_rejected() {
    let app = TestApp::new();
    let session = app.widget_session(None).await;
    let customer = session["token"].as_str().unwrap();
    assert!(session["customer_id"]
        .as_str()
        .unwrap()
        .starts_with("visitor-"));

    let (status, body) = app
        .post(
            &format!(
                "/api/chat/conversations/{}/messages",
                session["conversation_id"].as_str().unwrap()
            ),
            Some(customer),
            json!({ "content": "   " }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn agent_updates_and_filters_conversations() {
    let app = TestApp::new();
    let agent = app.agent_token(SHOP, "agent-1");

    let (status, created) = app
        .post(
            "/api/chat/conversations",
            Some(&agent),
            json!({ "customer_id": "cust-7" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = created["id"].as_str().unwrap().to_string();

    let (status, updated) = app
        .patch(
            &format!("/api/chat/conversations/{}", id),
            Some(&agent),
            json!({ "status": "pending", "assigned_agent_id": "agent-1" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["status"], "pending");
    assert_eq!(updated["assigned_agent_id"], "agent-1");

    let (_, pending) = app
        .get("/api/chat/conversations?status=pending", Some(&agent))
        .await;
    assert_eq!(pending.as_array().unwrap().len(), 1);
    let (_, open) = app
        .get("/api/chat/conversations?status=open", Some(&agent))
        .await;
    assert!(open.as_array().unwrap().is_empty());

    let (status, _) = app
        .patch(
            &format!("/api/chat/conversations/{}", id),
            Some(&agent),
            json!({}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .patch(
            "/api/chat/conversations/missing",
            Some(&agent),
            json!({ "status": "closed" }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ============================================================================
// Settings, widget code
// ============================================================================

#[tokio::test]
async fn settings_patch_validates_and_persists() {
    let app = TestApp::new();
    let agent = app.agent_token(SHOP, "agent-1");

    let (status, defaults) = app.get("/api/chat/settings", Some(&agent)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(defaults["position"], "bottom-right");

    let (status, _) = app
        .patch(
            "/api/chat/settings",
            Some(&agent),
            json!({ "primary_color": "blue" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, updated) = app
        .patch(
            "/api/chat/settings",
            Some(&agent),
            json!({ "primary_color": "#FF8800", "launcher_text": "Help" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["primary_color"], "#ff8800");

    let (_, code) = app.get("/api/chat/widget/code", Some(&agent)).await;
    let snippet = code["snippet"].as_str().unwrap();
    assert!(snippet.contains("#ff8800"));
    assert!(snippet.contains(SHOP));
}

#[tokio::test]
async fn widget_install_and_uninstall() {
    let app = TestApp::new();
    let agent = app.agent_token(SHOP, "agent-1");

    let (_, status_body) = app.get("/api/chat/widget", Some(&agent)).await;
    assert_eq!(status_body["installed"], false);

    let (status, _) = app
        .post("/api/chat/widget/uninstall", Some(&agent), json!({}))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, installed) = app
        .post("/api/chat/widget/install", Some(&agent), json!({}))
        .await;
    assert_eq!(installed["installed"], true);
    let (_, again) = app
        .post("/api/chat/widget/install", Some(&agent), json!({}))
        .await;
    assert_eq!(again["installed_at"], installed["installed_at"]);

    let (status, uninstalled) = app
        .post("/api/chat/widget/uninstall", Some(&agent), json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(uninstalled["installed"], false);
}

// ============================================================================
// Bulk operations
// ============================================================================

#[tokio::test]
async fn bulk_close_reports_partial_success() {
    let app = TestApp::new();
    let agent = app.agent_token(SHOP, "agent-1");

    let mut ids = Vec::new();
    for customer in ["cust-1", "cust-2"] {
        let (_, conv) = app
            .post(
                "/api/chat/conversations",
                Some(&agent),
                json!({ "customer_id": customer }),
            )
            .await;
        ids.push(conv["id"].clone());
    }
    ids.push(json!("does-not-exist"));

    let (status, op) = app
        .post(
            "/api/chat/bulk",
            Some(&agent),
            json!({
                "action": { "type": "set_status", "status": "closed" },
                "conversation_ids": ids,
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(op["status"], "completed");
    assert_eq!(op["success_count"], 2);
    assert_eq!(op["error_count"], 1);
    assert_eq!(op["progress_percentage"], 100);
    assert_eq!(op["created_by"], "agent:agent-1");

    let (status, fetched) = app
        .get(
            &format!("/api/chat/bulk/{}", op["id"].as_str().unwrap()),
            Some(&agent),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["id"], op["id"]);

    let (_, closed) = app
        .get("/api/chat/conversations?status=closed", Some(&agent))
        .await;
    assert_eq!(closed.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn bulk_rejects_empty_tag_list() {
    let app = TestApp::new();
    let agent = app.agent_token(SHOP, "agent-1");
    let (status, _) = app
        .post(
            "/api/chat/bulk",
            Some(&agent),
            json!({
                "action": { "type": "add_tags", "tags": [] },
                "conversation_ids": ["c1"],
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ============================================================================
// CSAT + analytics
// ============================================================================

#[tokio::test]
async fn csat_flow() {
    let app = TestApp::new();
    let session = app.widget_session(Some("cust-1")).await;
    let customer = session["token"].as_str().unwrap();
    let uri = format!(
        "/api/chat/conversations/{}/csat",
        session["conversation_id"].as_str().unwrap()
    );

    let (status, _) = app
        .post(&uri, Some(customer), json!({ "rating": 6 }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, response) = app
        .post(
            &uri,
            Some(customer),
            json!({ "rating": 5, "comment": "Fast and friendly" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(response["rating"], 5);

    let agent = app.agent_token(SHOP, "agent-1");
    let (status, _) = app.post(&uri, Some(&agent), json!({ "rating": 5 })).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, summary) = app.get("/api/chat/csat", Some(&agent)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["total_responses"], 1);
    assert_eq!(summary["average_rating"], 5.0);
    assert_eq!(summary["distribution"].as_array().unwrap().len(), 5);
}

#[tokio::test]
async fn analytics_counts_conversations_and_rejects_bad_range() {
    let app = TestApp::new();
    let agent = app.agent_token(SHOP, "agent-1");
    app.post(
        "/api/chat/conversations",
        Some(&agent),
        json!({ "customer_id": "cust-1" }),
    )
    .await;

    let (status, summary) = app.get("/api/chat/analytics", Some(&agent)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["conversations"]["open"], 1);
    assert_eq!(summary["conversations"]["unassigned"], 1);
    assert_eq!(summary["daily"].as_array().unwrap().len(), 30);

    let (status, _) = app
        .get(
            "/api/chat/analytics?from=2025-02-01&to=2025-01-01",
            Some(&agent),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn database_outage_returns_generic_500() {
    let app = TestApp::new();
    let agent = app.agent_token(SHOP, "agent-1");
    app.store.set_unavailable(true);

    let (status, body) = app.get("/api/chat/conversations", Some(&agent)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"]["message"], "Database error");
}
