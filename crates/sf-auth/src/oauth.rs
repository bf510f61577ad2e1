//! OAuth request builders
//!
//! All three grants are form-encoded POSTs to `TOKEN_PATH` on the login host;
//! they differ only in `grant_type` and the accompanying fields. The
//! authorize URL is the redirect target for the web-server flow.

use common::{ClientConfig, Secret};
use sf_transport::{HttpRequest, Method, Url};

use crate::constants::{AUTHORIZE_PATH, TOKEN_PATH};
use crate::error::{Error, Result};

pub fn token_endpoint(config: &ClientConfig) -> String {
    format!("{}{}", config.login_url, TOKEN_PATH)
}

/// Username/password login, for integrations that know the user's
/// credentials in advance.
pub fn password_grant(config: &ClientConfig, username: &str, password: &Secret<String>) -> HttpRequest {
    HttpRequest::new(Method::POST, token_endpoint(config))
        .header("Accept", "application/json")
        .form([
            ("client_id", config.client_id.as_str()),
            ("client_secret", config.client_secret.expose().as_str()),
            ("grant_type", "password"),
            ("username", username),
            ("password", password.expose().as_str()),
        ])
}

/// Exchange the code returned to `redirect_url` after the user approved
/// access.
pub fn authorization_code_grant(config: &ClientConfig, code: &str, redirect_url: &str) -> HttpRequest {
    HttpRequest::new(Method::POST, token_endpoint(config))
        .header("Accept", "application/json")
        .form([
            ("grant_type", "authorization_code"),
            ("client_id", config.client_id.as_str()),
            ("client_secret", config.client_secret.expose().as_str()),
            ("code", code),
            ("redirect_uri", redirect_url),
        ])
}

pub fn refresh_grant(config: &ClientConfig, refresh_token: &str) -> HttpRequest {
    HttpRequest::new(Method::POST, token_endpoint(config))
        .header("Accept", "application/json")
        .form([
            ("grant_type", "refresh_token"),
            ("client_id", config.client_id.as_str()),
            ("client_secret", config.client_secret.expose().as_str()),
            ("refresh_token", refresh_token),
        ])
}

/// URL to send the user to when starting the web-server flow.
pub fn authorize_url(config: &ClientConfig, redirect_url: &str) -> Result<String> {
    let base = format!("{}{}", config.login_url, AUTHORIZE_PATH);
    let url = Url::parse_with_params(
        &base,
        [
            ("client_id", config.client_id.as_str()),
            ("redirect_uri", redirect_url),
            ("response_type", "code"),
            ("grant_type", "authorization_code"),
        ],
    )
    .map_err(|e| Error::Config(format!("invalid login_url {base:?}: {e}")))?;
    Ok(url.to_string())
}
