//! Authenticated Salesforce REST client
//!
//! `Client` owns the active credential, injects the bearer header, and turns
//! every failure into one of four error kinds. `Api` layers the record CRUD
//! and SOQL query operations on top.
//!
//! Request lifecycle:
//! 1. Caller obtains a credential (`login`, `authorize_confirm`, `restore`
//!    or `set_credential`)
//! 2. `Api` builds `{instance}/services/data/{version}/{resource}`
//! 3. `Client::execute` attaches `Authorization: Bearer ...` and sends
//! 4. 401 → `Error::Authentication`; other non-2xx → `Error::Request`;
//!    no response → `Error::Transport`
//! 5. Caller checks `needs_refresh()` and calls `refresh_token()` when due;
//!    nothing refreshes in the background

pub mod api;
pub mod client;
pub mod error;
pub mod metrics;

#[cfg(test)]
pub(crate) mod testing;

pub use api::{Api, QueryPage};
pub use client::Client;
pub use error::{Error, Result};
