use axum::{
    Json, Router,
    extract::{Extension, State},
    http::HeaderMap,
    response::{IntoResponse, Redirect, Response},
    routing::get,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use std::sync::Arc;
use tracing::{info, warn};

use crate::services::auth_service::{self, SessionTokens};
use crate::web::middleware::auth::TOKEN_COOKIE;
use crate::web::models::{AuthenticatedUser, CallbackQuery};
use crate::web::AppState;
use crate::web::extract::AppQuery;

pub const REFRESH_TOKEN_COOKIE: &str = "refresh_token";
pub const CODE_VERIFIER_COOKIE: &str = "code_verifier";

fn session_cookie(name: &'static str, value: String, max_age: Option<i64>, secure: bool) -> Cookie<'static> {
    let mut builder = Cookie::build((name, value))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure);
    if let Some(seconds) = max_age {
        builder = builder.max_age(time::Duration::seconds(seconds));
    }
    builder.build()
}

fn store_session(jar: CookieJar, tokens: SessionTokens, secure: bool) -> CookieJar {
    let mut jar = jar
        .add(session_cookie(TOKEN_COOKIE, tokens.access_token, tokens.expires_in, secure))
        .remove(Cookie::build(CODE_VERIFIER_COOKIE).path("/"));
    if let Some(refresh_token) = tokens.refresh_token {
        jar = jar.add(session_cookie(REFRESH_TOKEN_COOKIE, refresh_token, None, secure));
    }
    jar
}

/// Completes the provider's authorization-code flow and redirects the browser.
async fn callback_handler(
    State(app_state): State<Arc<AppState>>,
    AppQuery(query): AppQuery<CallbackQuery>,
    headers: HeaderMap,
    jar: CookieJar,
) -> Response {
    let origin = app_state.config.frontend_url.as_str();
    let login_error = |error: &str| Redirect::temporary(&auth_service::login_error_url(origin, error)).into_response();

    if let Some(error) = query.error.as_deref() {
        let message = query.error_description.as_deref().unwrap_or(error);
        warn!(error, "Auth provider returned an error.");
        return login_error(message);
    }
    let Some(code) = query.code.as_deref().filter(|c| !c.is_empty()) else {
        return login_error("no_code_received");
    };
    let Some(exchanger) = app_state.auth_client.as_ref() else {
        return login_error("missing_auth_config");
    };

    let code_verifier = jar.get(CODE_VERIFIER_COOKIE).map(|c| c.value().to_string());
    let tokens = match exchanger.exchange_code(code, code_verifier.as_deref()).await {
        Ok(Some(tokens)) => tokens,
        Ok(None) => return login_error("no_session_returned"),
        Err(e) => {
            warn!(error = %e, "Authorization code exchange failed.");
            return login_error(&e.to_string());
        }
    };

    let is_local = app_state.config.is_local_env();
    let next = auth_service::sanitize_next(query.next.as_deref());
    let forwarded_host = headers
        .get("x-forwarded-host")
        .and_then(|v| v.to_str().ok());
    let target = auth_service::resolve_redirect_target(origin, &next, forwarded_host, is_local);

    info!(target = %target, "Session established, redirecting.");
    (store_session(jar, tokens, !is_local), Redirect::temporary(&target)).into_response()
}

async fn me_handler(Extension(user): Extension<AuthenticatedUser>) -> Json<AuthenticatedUser> {
    Json(user)
}

async fn logout_handler(jar: CookieJar) -> impl IntoResponse {
    let jar = jar
        .remove(Cookie::build(TOKEN_COOKIE).path("/"))
        .remove(Cookie::build(REFRESH_TOKEN_COOKIE).path("/"));
    (jar, axum::http::StatusCode::NO_CONTENT)
}

pub fn create_public_router() -> Router<Arc<AppState>> {
    Router::new().route("/callback", get(callback_handler))
}

pub fn create_protected_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/me", get(me_handler))
        .route("/logout", axum::routing::post(logout_handler))
}
