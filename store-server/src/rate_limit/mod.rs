//! Rate limiting
//!
//! Fixed-window counters keyed by caller identity. Public mutating routes
//! take the strict tier; everything else the standard tier. State is
//! process-local and resets on restart.

pub mod limiter;
pub mod middleware;

pub use limiter::{RateLimitPolicy, RateLimiter};
pub use middleware::{client_identity, rate_limit_standard, rate_limit_strict};
