//! Security Headers Middleware
//!
//! The dashboard runs embedded in the Shopify admin, so framing is allowed
//! for Shopify origins only instead of being denied outright.

use axum::{
    body::Body,
    http::{HeaderValue, Request, Response},
    middleware::Next,
};

pub const FRAME_ANCESTORS_CSP: &str =
    "frame-ancestors 'self' https://admin.shopify.com https://*.myshopify.com";

/// Middleware that adds security headers to all responses
pub async fn security_headers_middleware(request: Request<Body>, next: Next) -> Response<Body> {
    let is_api = request.uri().path().starts_with("/api/");
    let mut response = next.run(request).await;
    let headers = response.headers_mut();

    // X-Content-Type-Options: Prevent MIME type sniffing
    headers.insert(
        "X-Content-Type-Options",
        HeaderValue::from_static("nosniff"),
    );

    // Referrer-Policy: Control referrer information leakage
    headers.insert(
        "Referrer-Policy",
        HeaderValue::from_static("strict-origin-when-cross-origin"),
    );

    // Content-Security-Policy: X-Frame-Options cannot express an allow-list
    headers.insert(
        "Content-Security-Policy",
        HeaderValue::from_static(FRAME_ANCESTORS_CSP),
    );

    // Cache-Control: API responses are per-shop; leave static assets alone
    if is_api && !headers.contains_key("Cache-Control") {
        headers.insert(
            "Cache-Control",
            HeaderValue::from_static("no-store, private"),
        );
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request, routing::get, Router};
    use tower::ServiceExt;

    async fn test_handler() -> &'static str {
        "ok"
    }

    fn app() -> Router {
        Router::new()
            .route("/", get(test_handler))
            .route("/api/chat/ping", get(test_handler))
            .layer(axum::middleware::from_fn(security_headers_middleware))
    }

    #[tokio::test]
    async fn test_security_headers_are_added() {
        let response = app()
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(
            response.headers().get("X-Content-Type-Options").unwrap(),
            "nosniff"
        );
        assert_eq!(
            response.headers().get("Referrer-Policy").unwrap(),
            "strict-origin-when-cross-origin"
        );
        let csp = response.headers().get("Content-Security-Policy").unwrap();
        assert!(csp.to_str().unwrap().contains("https://admin.shopify.com"));
        assert!(response.headers().get("X-Frame-Options").is_none());
        assert!(response.headers().get("Cache-Control").is_none());
    }

    #[tokio::test]
    async fn test_api_responses_are_not_cached() {
        let response = app()
            .oneshot(
                Request::builder()
                    .uri("/api/chat/ping")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(
            response.headers().get("Cache-Control").unwrap(),
            "no-store, private"
        );
    }
}
