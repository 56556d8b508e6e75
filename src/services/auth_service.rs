use async_trait::async_trait;
use jsonwebtoken::{DecodingKey, Validation, decode};
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::web::models::Claims;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Missing access token")]
    MissingToken,
    #[error("Invalid access token: {0}")]
    InvalidToken(String),
    #[error("{0}")]
    Exchange(String),
    #[error("Network error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Verifies an HS256 access token issued by the auth provider.
pub fn verify_access_token(
    token: &str,
    secret: &str,
    audience: Option<&str>,
) -> Result<Claims, AuthError> {
    let mut validation = Validation::default();
    match audience {
        Some(aud) => validation.set_audience(&[aud]),
        None => validation.validate_aud = false,
    }
    let token_data = decode::<Claims>(token, &DecodingKey::from_secret(secret.as_ref()), &validation)
        .map_err(|e| AuthError::InvalidToken(e.to_string()))?;
    if token_data.claims.sub.is_empty() {
        return Err(AuthError::InvalidToken("empty subject".to_string()));
    }
    Ok(token_data.claims)
}

/// Tokens of a freshly established session.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SessionTokens {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_in: Option<i64>,
}

/// Trades an authorization code for a session.
#[async_trait]
pub trait CodeExchanger: Send + Sync {
    /// `Ok(None)` means the provider accepted the code but returned no session.
    async fn exchange_code(
        &self,
        code: &str,
        code_verifier: Option<&str>,
    ) -> Result<Option<SessionTokens>, AuthError>;
}

#[derive(Debug, Deserialize)]
struct TokenEndpointResponse {
    access_token: Option<String>,
    refresh_token: Option<String>,
    expires_in: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
struct TokenEndpointError {
    error_description: Option<String>,
    msg: Option<String>,
    error: Option<String>,
}

impl TokenEndpointError {
    fn message(self) -> Option<String> {
        self.error_description.or(self.msg).or(self.error)
    }
}

/// `CodeExchanger` for a hosted auth service's token endpoint.
pub struct AuthClient {
    client: Client,
    token_url: String,
    api_key: String,
}

impl AuthClient {
    pub fn new(token_url: String, api_key: String) -> Self {
        Self {
            client: Client::new(),
            token_url,
            api_key,
        }
    }
}

#[async_trait]
impl CodeExchanger for AuthClient {
    async fn exchange_code(
        &self,
        code: &str,
        code_verifier: Option<&str>,
    ) -> Result<Option<SessionTokens>, AuthError> {
        let body = serde_json::json!({
            "auth_code": code,
            "code_verifier": code_verifier,
        });
        let response = self
            .client
            .post(&self.token_url)
            .query(&[("grant_type", "pkce")])
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<TokenEndpointError>()
                .await
                .ok()
                .and_then(TokenEndpointError::message)
                .unwrap_or_else(|| format!("Code exchange failed with status {status}"));
            warn!(%status, %message, "Authorization code exchange rejected.");
            return Err(AuthError::Exchange(message));
        }

        let tokens = response.json::<TokenEndpointResponse>().await?;
        debug!(has_session = tokens.access_token.is_some(), "Authorization code exchanged.");
        Ok(tokens.access_token.map(|access_token| SessionTokens {
            access_token,
            refresh_token: tokens.refresh_token,
            expires_in: tokens.expires_in,
        }))
    }
}

/// Accepts only site-relative paths so the callback cannot be turned into an open redirect.
pub fn sanitize_next(next: Option<&str>) -> String {
    match next {
        Some(path) if path.starts_with('/') && !path.starts_with("//") && !path.contains('\\') => {
            path.to_string()
        }
        _ => "/".to_string(),
    }
}

/// Where to send the browser after a successful login.
pub fn resolve_redirect_target(
    origin: &str,
    next: &str,
    forwarded_host: Option<&str>,
    is_local_env: bool,
) -> String {
    let origin = origin.trim_end_matches('/');
    match forwarded_host.filter(|h| !h.is_empty()) {
        Some(host) if !is_local_env => format!("https://{host}{next}"),
        _ => format!("{origin}{next}"),
    }
}

/// Login page URL carrying an error code or message.
pub fn login_error_url(origin: &str, error: &str) -> String {
    format!(
        "{}/login?error={}",
        origin.trim_end_matches('/'),
        urlencoding::encode(error)
    )
}
