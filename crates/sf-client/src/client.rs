//! Authenticated HTTP client
//!
//! Holds one active credential and the instance base URL derived from it.
//! Both live in a single `Session` behind a `RwLock<Option<Arc<Session>>>`,
//! so setting or refreshing a credential replaces them in one write. Readers
//! clone the `Arc` and never see a half-updated pair.
//!
//! The client never decides when to refresh. Callers check `needs_refresh()`
//! and call `refresh_token()`; a 401 surfaces as `Error::Authentication` and
//! is not retried here.

use std::sync::Arc;
use std::time::{Duration, Instant};

use common::{ClientConfig, Secret};
use sf_auth::{Credential, CredentialFactory, CredentialStore, oauth};
use sf_transport::{HttpRequest, HttpResponse, ReqwestTransport, Transport};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};

/// The active credential and the base URL requests are built against.
#[derive(Debug)]
struct Session {
    credential: Credential,
    base_url: String,
}

impl Session {
    fn new(credential: Credential) -> Arc<Self> {
        let base_url = credential.api_url().trim_end_matches('/').to_string();
        Arc::new(Self {
            credential,
            base_url,
        })
    }
}

/// Salesforce REST client with bearer-token injection.
pub struct Client {
    config: ClientConfig,
    transport: Arc<dyn Transport>,
    store: Option<Arc<dyn CredentialStore>>,
    session: RwLock<Option<Arc<Session>>>,
    /// Serializes refresh-token grants
    refresh_lock: Mutex<()>,
}

impl Client {
    pub fn new(config: ClientConfig, transport: Arc<dyn Transport>) -> Self {
        Self {
            config,
            transport,
            store: None,
            session: RwLock::new(None),
            refresh_lock: Mutex::new(()),
        }
    }

    /// Client backed by `ReqwestTransport` with the configured timeout.
    pub fn from_config(config: ClientConfig) -> Result<Self> {
        let transport = ReqwestTransport::new(Duration::from_secs(config.timeout_secs))?;
        Ok(Self::new(config, Arc::new(transport)))
    }

    /// Persist every credential this client obtains to `store`.
    pub fn with_store(mut self, store: Arc<dyn CredentialStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Replace the active credential and base URL.
    pub async fn set_credential(&self, credential: Credential) {
        let session = Session::new(credential);
        debug!(base_url = %session.base_url, "credential set");
        *self.session.write().await = Some(session);
    }

    /// Copy of the active credential.
    pub async fn credential(&self) -> Option<Credential> {
        self.session
            .read()
            .await
            .as_ref()
            .map(|s| s.credential.clone())
    }

    /// Instance URL of the active credential, without a trailing slash.
    pub async fn base_url(&self) -> Result<String> {
        Ok(self.current().await?.base_url.clone())
    }

    /// Whether the active credential has expired.
    pub async fn needs_refresh(&self) -> Result<bool> {
        Ok(self.current().await?.credential.needs_refresh())
    }

    /// `{base}/services/data/{version}/{resource}`
    pub async fn data_url(&self, resource: &str) -> Result<String> {
        let session = self.current().await?;
        Ok(format!(
            "{}/services/data/{}/{}",
            session.base_url, self.config.api_version, resource
        ))
    }

    /// Resolve a server-supplied relative path (e.g. `nextRecordsUrl`)
    /// against the base URL.
    pub async fn resolve(&self, path: &str) -> Result<String> {
        let session = self.current().await?;
        Ok(format!(
            "{}/{}",
            session.base_url,
            path.trim_start_matches('/')
        ))
    }

    /// Send `request` with the bearer header attached.
    ///
    /// Fails with `Error::Unauthenticated` before any I/O when no credential
    /// is set. Returns the raw response on 2xx.
    pub async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        let session = match self.current().await {
            Ok(session) => session,
            Err(e) => {
                crate::metrics::record_error(e.kind());
                return Err(e);
            }
        };
        let request = request.header("Authorization", session.credential.bearer());
        self.dispatch(request).await
    }

    /// Log in with the password grant and make the result the active
    /// credential.
    pub async fn login(&self, username: &str, password: &Secret<String>) -> Result<Credential> {
        let request = oauth::password_grant(&self.config, username, password);
        let response = self.dispatch(request).await?;
        let credential = CredentialFactory::from_grant_body(&response.body)?;
        let credential = self.adopt(credential, None).await?;
        info!(instance_url = credential.api_url(), "logged in with password grant");
        Ok(credential)
    }

    /// URL to redirect the user to for the web-server flow.
    pub fn authorize_url(&self, redirect_url: &str) -> Result<String> {
        Ok(oauth::authorize_url(&self.config, redirect_url)?)
    }

    /// Complete the web-server flow by exchanging the authorization code,
    /// and make the result the active credential.
    pub async fn authorize_confirm(&self, code: &str, redirect_url: &str) -> Result<Credential> {
        let request = oauth::authorization_code_grant(&self.config, code, redirect_url);
        let response = self.dispatch(request).await?;
        let credential = CredentialFactory::from_grant_body(&response.body)?;
        let credential = self.adopt(credential, None).await?;
        info!(instance_url = credential.api_url(), "authorization code exchanged");
        Ok(credential)
    }

    /// Run the refresh-token grant for the active credential.
    ///
    /// The refreshed credential is built from a copy and swapped in as one
    /// step. Id, refresh token, scope and base URL carry over. If another
    /// credential was set while the grant was in flight, that credential
    /// stays active and the call fails with `Error::Superseded`.
    pub async fn refresh_token(&self) -> Result<Credential> {
        let _guard = self.refresh_lock.lock().await;
        let session = self.current().await?;

        let refresh_token = session.credential.refresh_token();
        if refresh_token.is_empty() {
            crate::metrics::record_refresh("failure");
            return Err(sf_auth::Error::InvalidCredentials(
                "credential has no refresh token".into(),
            )
            .into());
        }

        let request = oauth::refresh_grant(&self.config, refresh_token);
        let result: Result<Credential> = async {
            let response = self.dispatch(request).await?;
            let refreshed = CredentialFactory::from_refresh_body(&session.credential, &response.body)?;
            self.adopt(refreshed, Some(&session)).await
        }
        .await;

        match result {
            Ok(refreshed) => {
                crate::metrics::record_refresh("success");
                info!(expires = %refreshed.expires(), "access token refreshed");
                Ok(refreshed)
            }
            Err(e) => {
                warn!(error = %e, "token refresh failed");
                crate::metrics::record_refresh("failure");
                Err(e)
            }
        }
    }

    /// Load the stored credential and make it active.
    pub async fn restore(&self) -> Result<Credential> {
        let store = self.store()?;
        let credential = store.load().await?;
        self.set_credential(credential.clone()).await;
        Ok(credential)
    }

    /// Save a snapshot of the active credential to the store.
    pub async fn persist(&self) -> Result<()> {
        let store = self.store()?;
        let session = self.current().await?;
        store.save(&session.credential).await?;
        Ok(())
    }

    fn store(&self) -> Result<&Arc<dyn CredentialStore>> {
        self.store.as_ref().ok_or_else(|| {
            sf_auth::Error::NotFound("no credential store configured".into()).into()
        })
    }

    async fn current(&self) -> Result<Arc<Session>> {
        self.session
            .read()
            .await
            .clone()
            .ok_or(Error::Unauthenticated)
    }

    /// Persist `credential` when a store is attached, then make it active.
    ///
    /// The session write lock is held across the save. A failed save leaves
    /// the previous credential active, and no reader sees a credential that
    /// is not yet stored. With `expected` set, the swap only happens while
    /// that session is still the active one.
    async fn adopt(
        &self,
        credential: Credential,
        expected: Option<&Arc<Session>>,
    ) -> Result<Credential> {
        let mut active = self.session.write().await;
        if let Some(expected) = expected {
            let unchanged = active
                .as_ref()
                .is_some_and(|current| Arc::ptr_eq(current, expected));
            if !unchanged {
                return Err(Error::Superseded);
            }
        }

        if let Some(store) = &self.store {
            store.save(&credential).await?;
        }

        let session = Session::new(credential.clone());
        debug!(base_url = %session.base_url, "credential adopted");
        *active = Some(session);
        Ok(credential)
    }

    /// Send without auth and classify the outcome.
    async fn dispatch(&self, request: HttpRequest) -> Result<HttpResponse> {
        let method = request.method.clone();
        let url = request.url.clone();
        let started = Instant::now();

        let result = match self.transport.send(request).await {
            Ok(response) => {
                crate::metrics::record_request(
                    response.status,
                    method.as_str(),
                    started.elapsed().as_secs_f64(),
                );
                classify(&method, &url, response)
            }
            Err(e) => {
                warn!(%method, %url, error = %e, "no response from server");
                Err(Error::Transport(e))
            }
        };

        if let Err(ref e) = result {
            crate::metrics::record_error(e.kind());
        }
        result
    }
}

/// Map a response onto success, `Authentication` (401) or `Request`.
pub fn classify(method: &sf_transport::Method, url: &str, response: HttpResponse) -> Result<HttpResponse> {
    if response.is_success() {
        debug!(%method, %url, status = response.status, "request succeeded");
        return Ok(response);
    }

    warn!(%method, %url, status = response.status, "request rejected");
    if response.status == 401 {
        return Err(Error::from_unauthorized(&response.body));
    }

    Err(Error::Request {
        status: response.status,
        message: format!("{method} {url} returned {}", response.status),
        body: response.body,
    })
}
