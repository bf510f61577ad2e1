//! `Transport` backed by a shared `reqwest::Client`.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use tracing::debug;

use crate::{Body, HttpRequest, HttpResponse, Result, Transport, TransportError};

/// Production transport. Cloning shares the underlying connection pool.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Build a transport whose requests fail with `TransportError::Timeout`
    /// after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Other(format!("building HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

impl Transport for ReqwestTransport {
    fn send(
        &self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse>> + Send + '_>> {
        Box::pin(async move {
            let HttpRequest {
                method,
                url,
                headers,
                body,
            } = request;

            let mut builder = self.client.request(method.clone(), &url);
            for (name, value) in &headers {
                builder = builder.header(name.as_str(), value.as_str());
            }
            builder = match body {
                Body::Empty => builder,
                Body::Json(value) => builder.json(&value),
                Body::Form(pairs) => builder.form(&pairs),
            };

            let response = builder.send().await.map_err(classify)?;
            let status = response.status().as_u16();
            let body = response.text().await.map_err(classify)?;
            debug!(%method, %url, status, "received HTTP response");

            Ok(HttpResponse { status, body })
        })
    }
}

/// Map a reqwest failure onto the transport taxonomy.
fn classify(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout(err.to_string())
    } else if err.is_connect() {
        TransportError::Connect(err.to_string())
    } else {
        TransportError::Other(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Method;
    use wiremock::matchers::{body_json, body_string, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn transport() -> ReqwestTransport {
        ReqwestTransport::new(Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn returns_status_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/services/data/v37.0/sobjects/Account/001"))
            .and(header("Authorization", "Bearer at_test"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"Id":"001"}"#))
            .mount(&server)
            .await;

        let request = HttpRequest::new(
            Method::GET,
            format!("{}/services/data/v37.0/sobjects/Account/001", server.uri()),
        )
        .header("Authorization", "Bearer at_test");
        let response = transport().send(request).await.unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(response.body, r#"{"Id":"001"}"#);
    }

    #[tokio::test]
    async fn error_statuses_are_not_transport_errors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404).set_body_string("missing"))
            .mount(&server)
            .await;

        let response = transport()
            .send(HttpRequest::new(Method::GET, server.uri()))
            .await
            .unwrap();
        assert_eq!(response.status, 404);
        assert_eq!(response.body, "missing");
    }

    #[tokio::test]
    async fn sends_form_body_in_order() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/services/oauth2/token"))
            .and(header("content-type", "application/x-www-form-urlencoded"))
            .and(body_string("grant_type=password&username=user%40example.com"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let request = HttpRequest::new(
            Method::POST,
            format!("{}/services/oauth2/token", server.uri()),
        )
        .form([("grant_type", "password"), ("username", "user@example.com")]);
        let response = transport().send(request).await.unwrap();
        assert_eq!(response.status, 200);
    }

    #[tokio::test]
    async fn sends_json_body() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(body_json(serde_json::json!({"Name": "Acme"})))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let request = HttpRequest::new(Method::PATCH, server.uri())
            .json(serde_json::json!({"Name": "Acme"}));
        let response = transport().send(request).await.unwrap();
        assert_eq!(response.status, 204);
        assert!(response.body.is_empty());
    }

    #[tokio::test]
    async fn slow_response_is_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
            .mount(&server)
            .await;

        let transport = ReqwestTransport::new(Duration::from_millis(50)).unwrap();
        let err = transport
            .send(HttpRequest::new(Method::GET, server.uri()))
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Timeout(_)), "got: {err:?}");
    }

    #[tokio::test]
    async fn refused_connection_is_connect_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = transport()
            .send(HttpRequest::new(Method::GET, format!("http://{addr}/")))
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Connect(_)), "got: {err:?}");
    }
}
