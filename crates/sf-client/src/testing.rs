//! Scripted transport for unit tests.

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;

use chrono::Utc;
use sf_auth::{Credential, CredentialFactory, CredentialStore};
use sf_transport::{HttpRequest, HttpResponse, Transport, TransportError};
use tokio::sync::{Notify, oneshot};

/// Returns queued outcomes in order and records every request it sees.
#[derive(Default)]
pub struct MockTransport {
    responses: Mutex<VecDeque<Result<HttpResponse, TransportError>>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(self, status: u16, body: &str) -> Self {
        self.responses
            .lock()
            .unwrap()
            .push_back(Ok(HttpResponse::new(status, body)));
        self
    }

    pub fn fail(self, err: TransportError) -> Self {
        self.responses.lock().unwrap().push_back(Err(err));
        self
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl Transport for MockTransport {
    fn send(
        &self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = sf_transport::Result<HttpResponse>> + Send + '_>> {
        self.requests.lock().unwrap().push(request);
        let next = self
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::Other("no scripted response".into())));
        Box::pin(async move { next })
    }
}

/// Holds its single response until released, so a test can act while a
/// request is in flight.
pub struct GatedTransport {
    gate: Mutex<Option<oneshot::Receiver<()>>>,
    entered: Notify,
    response: HttpResponse,
}

impl GatedTransport {
    /// Returns the transport and the sender that releases the response.
    pub fn new(response: HttpResponse) -> (Self, oneshot::Sender<()>) {
        let (release, gate) = oneshot::channel();
        let transport = Self {
            gate: Mutex::new(Some(gate)),
            entered: Notify::new(),
            response,
        };
        (transport, release)
    }

    /// Wait until a request has reached the transport.
    pub async fn entered(&self) {
        self.entered.notified().await;
    }
}

impl Transport for GatedTransport {
    fn send(
        &self,
        _request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = sf_transport::Result<HttpResponse>> + Send + '_>> {
        let gate = self.gate.lock().unwrap().take();
        self.entered.notify_one();
        Box::pin(async move {
            if let Some(gate) = gate {
                let _ = gate.await;
            }
            Ok(self.response.clone())
        })
    }
}

/// Loads nothing and fails every save.
pub struct FailingStore;

impl CredentialStore for FailingStore {
    fn load(&self) -> Pin<Box<dyn Future<Output = sf_auth::Result<Credential>> + Send + '_>> {
        Box::pin(async { Err(sf_auth::Error::NotFound("nothing stored".into())) })
    }

    fn save<'a>(
        &'a self,
        _credential: &'a Credential,
    ) -> Pin<Box<dyn Future<Output = sf_auth::Result<()>> + Send + 'a>> {
        Box::pin(async { Err(sf_auth::Error::Io("disk full".into())) })
    }
}

/// A full grant body issued now.
pub fn grant_body(access_token: &str) -> String {
    grant_body_at(access_token, "https://na1.salesforce.com")
}

/// A full grant body issued now for `instance_url`.
pub fn grant_body_at(access_token: &str, instance_url: &str) -> String {
    serde_json::json!({
        "id": "https://login.salesforce.com/id/00D50000000IZ3ZEAW/00550000001fg5OAAQ",
        "issued_at": Utc::now().timestamp_millis().to_string(),
        "scope": "api refresh_token",
        "token_type": "Bearer",
        "refresh_token": "rt_test",
        "signature": "sig_test",
        "access_token": access_token,
        "instance_url": instance_url,
    })
    .to_string()
}

/// A refresh-only response body issued now.
pub fn refresh_body(access_token: &str) -> String {
    serde_json::json!({
        "issued_at": Utc::now().timestamp_millis().to_string(),
        "signature": "sig_refreshed",
        "access_token": access_token,
    })
    .to_string()
}

pub fn test_credential() -> Credential {
    CredentialFactory::from_grant_body(&grant_body("at_test")).unwrap()
}
