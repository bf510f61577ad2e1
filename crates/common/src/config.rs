//! Client configuration types and loading
//!
//! Path precedence: CLI arg > `SF_CONFIG` env var > `salesforce.toml`.
//! The client secret may live in the TOML, in `client_secret_file`, or in
//! the `SF_CLIENT_SECRET` env var, which wins over both.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::Secret;
use crate::error::{Error, Result};

/// REST API version used when the config does not name one.
pub const DEFAULT_API_VERSION: &str = "v37.0";

/// Per-request transport timeout used when the config does not name one.
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Production login host, also accepted as `login_url = "production"`
pub const PRODUCTION_LOGIN_URL: &str = "https://login.salesforce.com/";

/// Sandbox login host, also accepted as `login_url = "sandbox"`
pub const SANDBOX_LOGIN_URL: &str = "https://test.salesforce.com/";

/// Connected-app settings for one Salesforce login endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    /// Login host, e.g. `https://login.salesforce.com/`, or one of the
    /// shorthands `production` / `sandbox`. Always a URL ending in `/` after
    /// loading.
    pub login_url: String,
    pub client_id: String,
    #[serde(default = "empty_secret")]
    pub client_secret: Secret<String>,
    #[serde(default)]
    pub client_secret_file: Option<PathBuf>,
    /// Default OAuth callback for the web-server flow
    #[serde(default)]
    pub redirect_url: String,
    #[serde(default = "default_api_version")]
    pub api_version: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn empty_secret() -> Secret<String> {
    Secret::new(String::new())
}

fn default_api_version() -> String {
    DEFAULT_API_VERSION.to_string()
}

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl ClientConfig {
    /// Build a config in code, bypassing the TOML file.
    pub fn new(
        login_url: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        redirect_url: impl Into<String>,
    ) -> Self {
        Self {
            login_url: normalize_login_url(login_url.into()),
            client_id: client_id.into(),
            client_secret: Secret::new(client_secret.into()),
            client_secret_file: None,
            redirect_url: redirect_url.into(),
            api_version: default_api_version(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = version.into();
        self
    }

    /// Load configuration from a TOML file, then overlay the environment.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: ClientConfig = toml::from_str(&contents)?;
        config.login_url = normalize_login_url(config.login_url);

        if !config.login_url.starts_with("http://") && !config.login_url.starts_with("https://") {
            return Err(Error::Config(format!(
                "login_url must start with http:// or https://, got: {}",
                config.login_url
            )));
        }

        if config.client_id.trim().is_empty() {
            return Err(Error::Config("client_id must not be empty".into()));
        }

        if config.timeout_secs == 0 {
            return Err(Error::Config("timeout_secs must be greater than 0".into()));
        }

        if let Ok(secret) = std::env::var("SF_CLIENT_SECRET") {
            debug!("client secret taken from SF_CLIENT_SECRET");
            config.client_secret = Secret::new(secret);
        } else if let Some(ref secret_file) = config.client_secret_file {
            let secret =
                std::fs::read_to_string(secret_file).map_err(|source| Error::SecretFile {
                    path: secret_file.clone(),
                    source,
                })?;
            let secret = secret.trim().to_owned();
            if !secret.is_empty() {
                config.client_secret = Secret::new(secret);
            }
        }

        Ok(config)
    }

    /// Resolve config file path from CLI arg or `SF_CONFIG` env var.
    pub fn resolve_path(cli_path: Option<&str>) -> PathBuf {
        if let Some(p) = cli_path {
            return PathBuf::from(p);
        }
        if let Ok(p) = std::env::var("SF_CONFIG") {
            return PathBuf::from(p);
        }
        PathBuf::from("salesforce.toml")
    }
}

fn normalize_login_url(mut url: String) -> String {
    match url.trim() {
        "production" => return PRODUCTION_LOGIN_URL.to_string(),
        "sandbox" => return SANDBOX_LOGIN_URL.to_string(),
        _ => {}
    }
    if !url.ends_with('/') {
        url.push('/');
    }
    url
}
