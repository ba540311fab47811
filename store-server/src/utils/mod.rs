//! Utility modules
//!
//! - [`error`] - application error type and HTTP mapping
//! - [`result`] - unified result aliases
//! - [`logger`] - tracing setup
//! - [`signature`] - HMAC webhook signature verification

pub mod error;
pub mod logger;
pub mod result;
pub mod signature;

pub use error::AppError;
pub use result::AppResult;
pub use shared::ApiResponse;
