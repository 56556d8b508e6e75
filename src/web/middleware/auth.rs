use axum::{
    body::Body as AxumBody,
    extract::State,
    http::{Request, header},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use std::sync::Arc;
use tracing::warn;

use crate::services::auth_service::{self, AuthError};
use crate::web::models::AuthenticatedUser;
use crate::web::{AppState, error::AppError};

pub const TOKEN_COOKIE: &str = "token";

pub async fn auth(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut req: Request<AxumBody>,
    next: Next,
) -> Result<Response, AppError> {
    // Try to get token from Authorization header first, then fall back to cookie
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|header| header.to_str().ok())
        .and_then(|header| header.strip_prefix("Bearer "))
        .map(|s| s.trim().to_string())
        .or_else(|| jar.get(TOKEN_COOKIE).map(|c| c.value().to_string()))
        .filter(|t| !t.is_empty())
        .ok_or(AuthError::MissingToken)?;

    let claims = auth_service::verify_access_token(
        &token,
        &state.config.jwt_secret,
        state.config.jwt_audience.as_deref(),
    )
    .map_err(|e| {
        warn!(error = %e, "Rejected access token.");
        e
    })?;

    let authenticated_user = AuthenticatedUser {
        id: claims.sub,
        email: claims.email,
    };
    req.extensions_mut().insert(authenticated_user);
    Ok(next.run(req).await)
}
