//! Trichat API Library
//!
//! HTTP routes, the real-time chat relay and the domain services behind
//! them. The `trichat-api` binary wires these to a store and serves them.

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;
pub mod security;
pub mod services;
pub mod state;
pub mod store;
pub mod websocket;

pub use config::Config;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
