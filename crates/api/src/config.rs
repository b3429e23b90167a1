//! Application configuration

use std::env;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    // Server
    pub bind_address: String,
    pub public_url: String,
    pub static_dir: String,
    pub allowed_origins: Vec<String>,

    // Database
    pub database_url: Option<String>,
    pub database_max_connections: u32,

    // Authentication
    pub jwt_secret: String,
    pub jwt_expiry_hours: i64,
    pub customer_session_minutes: i64,

    // Shopify embedded app
    pub shopify_api_key: String,
    pub shopify_api_secret: String,
    pub shopify_scopes: String,
    pub shopify_host: String,

    // Payments (checkout flows live in the dashboard; keys are read at start-up only)
    pub stripe_publishable_key: String,
    pub stripe_secret_key: String,
    pub razorpay_key_id: String,
    pub razorpay_key_secret: String,

    // Notifications
    pub notification_webhook_url: Option<String>,

    // Widget
    pub widget_script_url: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let public_url =
            env::var("PUBLIC_URL").unwrap_or_else(|_| "http://localhost:3000".to_string());

        Ok(Self {
            // Server
            bind_address: match env::var("BIND_ADDRESS") {
                Ok(addr) => addr,
                Err(_) => {
                    let port: u16 = env::var("PORT")
                        .unwrap_or_else(|_| "3000".to_string())
                        .parse()
                        .map_err(|_| ConfigError::Invalid("PORT must be a valid port number"))?;
                    format!("0.0.0.0:{}", port)
                }
            },
            static_dir: env::var("STATIC_DIR").unwrap_or_else(|_| "public".to_string()),
            allowed_origins: env::var("ALLOWED_ORIGINS")
                .map(|v| parse_origins(&v))
                .unwrap_or_default(),
            widget_script_url: env::var("WIDGET_SCRIPT_URL")
                .unwrap_or_else(|_| format!("{}/widget/trichat.js", public_url.trim_end_matches('/'))),
            public_url,

            // Database
            database_url: env::var("DATABASE_URL").ok().filter(|v| !v.is_empty()),
            database_max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "5".to_string())
                .parse()
                .unwrap_or(5),

            // Authentication
            jwt_secret: {
                let secret =
                    env::var("JWT_SECRET").map_err(|_| ConfigError::Missing("JWT_SECRET"))?;
                if secret.len() < 32 {
                    return Err(ConfigError::WeakSecret(
                        "JWT_SECRET must be at least 32 characters",
                    ));
                }
                secret
            },
            jwt_expiry_hours: env::var("JWT_EXPIRY_HOURS")
                .unwrap_or_else(|_| "24".to_string())
                .parse()
                .unwrap_or(24),
            customer_session_minutes: env::var("CUSTOMER_SESSION_MINUTES")
                .unwrap_or_else(|_| "120".to_string())
                .parse()
                .unwrap_or(120),

            // Shopify
            shopify_api_key: env::var("SHOPIFY_API_KEY").unwrap_or_default(),
            shopify_api_secret: env::var("SHOPIFY_API_SECRET").unwrap_or_default(),
            shopify_scopes: env::var("SHOPIFY_SCOPES")
                .unwrap_or_else(|_| "read_script_tags,write_script_tags".to_string()),
            shopify_host: env::var("SHOPIFY_HOST").unwrap_or_default(),

            // Payments
            stripe_publishable_key: env::var("STRIPE_PUBLISHABLE_KEY").unwrap_or_default(),
            stripe_secret_key: env::var("STRIPE_SECRET_KEY").unwrap_or_default(),
            razorpay_key_id: env::var("RAZORPAY_KEY_ID").unwrap_or_default(),
            razorpay_key_secret: env::var("RAZORPAY_KEY_SECRET").unwrap_or_default(),

            // Notifications
            notification_webhook_url: env::var("NOTIFICATION_WEBHOOK_URL")
                .ok()
                .filter(|v| !v.is_empty()),
        })
    }

    /// Minimal configuration for tests and local tooling
    pub fn for_tests(jwt_secret: &str) -> Self {
        Self {
            bind_address: "127.0.0.1:0".to_string(),
            public_url: "http://localhost:3000".to_string(),
            static_dir: "public".to_string(),
            allowed_origins: Vec::new(),
            database_url: None,
            database_max_connections: 1,
            jwt_secret: jwt_secret.to_string(),
            jwt_expiry_hours: 1,
            customer_session_minutes: 30,
            shopify_api_key: String::new(),
            shopify_api_secret: String::new(),
            shopify_scopes: String::new(),
            shopify_host: String::new(),
            stripe_publishable_key: String::new(),
            stripe_secret_key: String::new(),
            razorpay_key_id: String::new(),
            razorpay_key_secret: String::new(),
            notification_webhook_url: None,
            widget_script_url: "https://cdn.trichat.test/widget.js".to_string(),
        }
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|o| o.trim().trim_end_matches('/').to_string())
        .filter(|o| !o.is_empty())
        .collect()
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),
    #[error("Invalid configuration: {0}")]
    Invalid(&'static str),
    #[error("Weak secret: {0}")]
    WeakSecret(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn cleanup() {
        for key in [
            "JWT_SECRET",
            "BIND_ADDRESS",
            "PORT",
            "ALLOWED_ORIGINS",
            "DATABASE_URL",
            "WIDGET_SCRIPT_URL",
            "PUBLIC_URL",
        ] {
            env::remove_var(key);
        }
    }

    #[test]
    #[serial]
    fn test_missing_jwt_secret() {
        cleanup();
        match Config::from_env() {
            Err(ConfigError::Missing("JWT_SECRET")) => {}
            other => panic!("Expected Missing(JWT_SECRET), got: {:?}", other),
        }
    }

    #[test]
    #[serial]
    fn test_weak_jwt_secret_rejected() {
        cleanup();
        env::set_var("JWT_SECRET", "short");
        assert!(matches!(
            Config::from_env(),
            Err(ConfigError::WeakSecret(_))
        ));
        cleanup();
    }

    #[test]
    #[serial]
    fn test_port_and_origins() {
        cleanup();
        env::set_var("JWT_SECRET", "test-jwt-secret-must-be-at-least-32-characters-long");
        env::set_var("PORT", "8080");
        env::set_var(
            "ALLOWED_ORIGINS",
            "https://admin.shopify.com/, https://shop1.myshopify.com,,",
        );

        let config = Config::from_env().unwrap();
        assert_eq!(config.bind_address, "0.0.0.0:8080");
        assert_eq!(
            config.allowed_origins,
            vec![
                "https://admin.shopify.com".to_string(),
                "https://shop1.myshopify.com".to_string()
            ]
        );
        assert!(config.database_url.is_none());
        assert_eq!(
            config.widget_script_url,
            "http://localhost:3000/widget/trichat.js"
        );
        cleanup();
    }

    #[test]
    #[serial]
    fn test_invalid_port() {
        cleanup();
        env::set_var("JWT_SECRET", "test-jwt-secret-must-be-at-least-32-characters-long");
        env::set_var("PORT", "not-a-port");
        assert!(matches!(Config::from_env(), Err(ConfigError::Invalid(_))));
        cleanup();
    }
}
