//! Salesforce OAuth credential handling
//!
//! Represents the access/refresh token bundle, builds it from the token
//! endpoint's response shapes, persists it through a narrow store interface,
//! and prepares the OAuth requests that produce it. Nothing here performs
//! network I/O; requests are handed to `sf-client` for execution.
//!
//! Credential flow:
//! 1. `oauth::password_grant()` or `oauth::authorization_code_grant()` request
//! 2. `CredentialFactory::from_grant()` on the token endpoint's response
//! 3. `CredentialStore::save()` persists a snapshot copy
//! 4. `Credential::needs_refresh()` tells the caller when to refresh
//! 5. `oauth::refresh_grant()` request, then `Credential::refresh()` applies it

pub mod constants;
pub mod credential;
pub mod error;
pub mod factory;
pub mod oauth;
pub mod store;

pub use constants::*;
pub use credential::{Credential, CredentialSnapshot};
pub use error::{Error, Result};
pub use factory::{CredentialFactory, GrantResponse, RefreshResponse};
pub use store::{CredentialStore, FileCredentialStore, MemoryCredentialStore};
