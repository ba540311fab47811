//! Authentication middleware
//!
//! Layered onto the `/api/admin` router only. Extracts the bearer token,
//! validates it and injects [`CurrentUser`] into request extensions.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::auth::{CurrentUser, JwtService};
use crate::core::ServerState;
use crate::utils::error::AppError;

/// Admin middleware: valid token AND admin role
///
/// | Failure | Status |
/// |---------|--------|
/// | Missing/malformed Authorization header | 401 |
/// | Expired or invalid token | 401 |
/// | Valid token, non-admin role | 403 |
pub async fn require_admin(
    State(state): State<ServerState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let auth_header = req
        .headers()
        .get(http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let token = match auth_header {
        Some(header) => {
            JwtService::extract_from_header(header).ok_or(AppError::InvalidToken)?
        }
        None => {
            tracing::warn!(uri = %req.uri(), "Admin request without credentials");
            return Err(AppError::Unauthorized);
        }
    };

    let claims = state.jwt.validate_token(token).map_err(|e| {
        tracing::warn!(uri = %req.uri(), error = %e, "Admin token rejected");
        AppError::InvalidToken
    })?;

    let user = CurrentUser::from(claims);
    if !user.is_admin() {
        tracing::warn!(operator = %user.id, role = %user.role, "Non-admin role on admin route");
        return Err(AppError::Forbidden("admin role required".to_string()));
    }

    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}
