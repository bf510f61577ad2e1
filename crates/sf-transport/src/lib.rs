//! HTTP transport abstraction for the Salesforce client
//!
//! Defines the `Transport` trait that decouples the authenticated client from
//! the HTTP stack. `ReqwestTransport` is the production implementation; tests
//! substitute their own to count calls and script responses.
//!
//! A transport reports exactly two outcomes: a response with any status code,
//! or a `TransportError` when no response arrived. Status classification is
//! the caller's concern.

pub mod reqwest_transport;

pub use reqwest::{Method, Url};
pub use reqwest_transport::ReqwestTransport;

use std::future::Future;
use std::pin::Pin;

use serde::de::DeserializeOwned;

/// Request payload variants used by the REST and OAuth endpoints.
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    Empty,
    /// `application/json`
    Json(serde_json::Value),
    /// `application/x-www-form-urlencoded`, pairs sent in order
    Form(Vec<(String, String)>),
}

/// A fully resolved outbound request.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Body,
}

impl HttpRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            body: Body::Empty,
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn json(mut self, value: serde_json::Value) -> Self {
        self.body = Body::Json(value);
        self
    }

    pub fn form<K, V>(mut self, pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.body = Body::Form(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        );
        self
    }

    /// Case-insensitive header lookup (last value wins).
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .rev()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Status and raw body of a response that reached the client.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Decode the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_str(&self.body)
    }
}

/// Failures where no HTTP response was received.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("transport error: {0}")]
    Other(String),
}

/// Result alias for transport operations.
pub type Result<T> = std::result::Result<T, TransportError>;

/// Abstraction over the HTTP stack.
///
/// Uses `Pin<Box<dyn Future>>` return types so the client can hold an
/// `Arc<dyn Transport>`.
pub trait Transport: Send + Sync {
    /// Send one request. Non-2xx statuses are returned as `Ok`.
    fn send(
        &self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse>> + Send + '_>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_lookup_is_case_insensitive() {
        let request = HttpRequest::new(Method::GET, "https://example.com")
            .header("Authorization", "Bearer a")
            .header("authorization", "Bearer b");
        assert_eq!(request.header_value("AUTHORIZATION"), Some("Bearer b"));
        assert_eq!(request.header_value("accept"), None);
    }

    #[test]
    fn form_preserves_pair_order() {
        let request = HttpRequest::new(Method::POST, "https://example.com/token")
            .form([("grant_type", "password"), ("username", "u")]);
        assert_eq!(
            request.body,
            Body::Form(vec![
                ("grant_type".into(), "password".into()),
                ("username".into(), "u".into()),
            ])
        );
    }

    #[test]
    fn success_range_excludes_redirects_and_errors() {
        assert!(HttpResponse::new(200, "").is_success());
        assert!(HttpResponse::new(204, "").is_success());
        assert!(!HttpResponse::new(302, "").is_success());
        assert!(!HttpResponse::new(401, "").is_success());
    }

    #[test]
    fn response_decodes_json() {
        let response = HttpResponse::new(200, r#"{"id":"001xx"}"#);
        let value: serde_json::Value = response.json().unwrap();
        assert_eq!(value["id"], "001xx");
    }

    #[test]
    fn error_display_includes_detail() {
        let err = TransportError::Timeout("after 60s".into());
        assert_eq!(err.to_string(), "request timed out: after 60s");
    }
}
