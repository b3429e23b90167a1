//! Authentication for dashboard agents and widget customers

pub mod jwt;
pub mod middleware;

pub use jwt::{Claims, JwtError, JwtManager};
pub use middleware::{authenticate, require_auth, AuthState, AuthUser};
