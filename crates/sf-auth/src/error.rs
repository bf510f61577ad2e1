//! Error types for credential operations

/// Errors from building, parsing or persisting credentials.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("credential parse error: {0}")]
    CredentialParse(String),

    #[error("invalid credentials: {0}")]
    InvalidCredentials(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("not found: {0}")]
    NotFound(String),
}

/// Result alias for auth operations.
pub type Result<T> = std::result::Result<T, Error>;
