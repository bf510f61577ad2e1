//! Error taxonomy for authenticated requests
//!
//! Every failure surfaces as exactly one variant; nothing is retried or
//! swallowed here.
//!
//! - `Unauthenticated`: no credential set, no I/O attempted
//! - `Authentication`: the server rejected the bearer token (401)
//! - `Transport`: no response arrived (DNS, connect, timeout)
//! - `Request`: any other non-2xx, carrying the raw body
//! - `Superseded`: a refresh finished after another credential was set

use serde::Deserialize;
use sf_transport::TransportError;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("not authenticated: no access token set")]
    Unauthenticated,

    #[error("authentication failed ({code}): {message}")]
    Authentication { code: String, message: String },

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("{message}: {body}")]
    Request {
        status: u16,
        message: String,
        body: String,
    },

    #[error("unexpected response: {0}")]
    Decode(String),

    #[error(transparent)]
    Credential(#[from] sf_auth::Error),

    #[error("credential was replaced while the refresh was in flight")]
    Superseded,
}

impl Error {
    /// Stable label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Unauthenticated => "unauthenticated",
            Error::Authentication { .. } => "authentication",
            Error::Transport(_) => "transport",
            Error::Request { .. } => "request",
            Error::Decode(_) => "decode",
            Error::Credential(_) => "credential",
            Error::Superseded => "superseded",
        }
    }

    /// Build an `Authentication` error from a 401 body.
    ///
    /// REST endpoints answer with `[{"errorCode": .., "message": ..}]`; the
    /// first record is used. OAuth endpoints answer with
    /// `{"error": .., "error_description": ..}`. Anything else keeps the raw
    /// body as the message.
    pub fn from_unauthorized(body: &str) -> Self {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct ApiError {
            #[serde(default)]
            error_code: String,
            #[serde(default)]
            message: String,
        }

        #[derive(Deserialize)]
        struct OAuthError {
            error: String,
            #[serde(default)]
            error_description: String,
        }

        let first = serde_json::from_str::<Vec<ApiError>>(body)
            .ok()
            .and_then(|records| records.into_iter().next());
        if let Some(first) = first {
            return Error::Authentication {
                code: first.error_code,
                message: first.message,
            };
        }

        if let Ok(oauth) = serde_json::from_str::<OAuthError>(body) {
            return Error::Authentication {
                code: oauth.error,
                message: oauth.error_description,
            };
        }

        Error::Authentication {
            code: String::new(),
            message: body.to_string(),
        }
    }
}

/// Result alias for client operations.
pub type Result<T> = std::result::Result<T, Error>;
