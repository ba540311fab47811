//! Core server plumbing: configuration, shared state, HTTP server and
//! background tasks.

pub mod config;
pub mod server;
pub mod state;
pub mod tasks;

pub use config::{Config, RateLimitSettings};
pub use server::Server;
pub use state::ServerState;
