//! Shared types for the Salesforce client workspace
//!
//! Holds the client configuration (login endpoint, connected-app keys, API
//! version) and the `Secret` wrapper used for every value that must never
//! appear in logs.

mod config;
mod error;
mod secret;

pub use config::{
    ClientConfig, DEFAULT_API_VERSION, DEFAULT_TIMEOUT_SECS, PRODUCTION_LOGIN_URL, SANDBOX_LOGIN_URL,
};
pub use error::{Error, Result};
pub use secret::Secret;
