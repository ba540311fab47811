//! Admin authentication
//!
//! JWT bearer tokens gate the fulfillment admin surface. Webhook routes
//! never use this: their authenticity comes from payload signatures.

pub mod jwt;
pub mod middleware;

pub use jwt::{Claims, CurrentUser, JwtConfig, JwtError, JwtService};
pub use middleware::require_admin;
