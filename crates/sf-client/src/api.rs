//! Record CRUD and SOQL query operations
//!
//! Thin URL builders over `Client::execute`. Single-record operations are
//! all-or-nothing; a query either returns every page or fails as a whole.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;
use sf_transport::{HttpRequest, HttpResponse, Method, Url};
use tracing::debug;

use crate::client::Client;
use crate::error::{Error, Result};

/// One page of a query result.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryPage {
    #[serde(default)]
    pub records: Vec<Value>,
    pub done: bool,
    #[serde(default)]
    pub next_records_url: Option<String>,
}

/// REST operations against the org the client is authenticated to.
#[derive(Clone)]
pub struct Api {
    client: Arc<Client>,
}

impl Api {
    pub fn new(client: Arc<Client>) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &Arc<Client> {
        &self.client
    }

    /// Fetch one record, optionally limited to `fields`.
    pub async fn get_record(&self, object_type: &str, id: &str, fields: &[&str]) -> Result<Value> {
        let mut resource = format!("sobjects/{object_type}/{id}");
        if !fields.is_empty() {
            resource.push_str("?fields=");
            resource.push_str(&fields.join(","));
        }
        let url = self.client.data_url(&resource).await?;
        let response = self.client.execute(HttpRequest::new(Method::GET, url)).await?;
        decode(&response)
    }

    /// Create a record and return its id.
    pub async fn create_record(&self, object_type: &str, data: &Value) -> Result<String> {
        #[derive(Deserialize)]
        struct Created {
            id: String,
        }

        let url = self.client.data_url(&format!("sobjects/{object_type}")).await?;
        let request = HttpRequest::new(Method::POST, url).json(data.clone());
        let response = self.client.execute(request).await?;
        let created: Created = decode(&response)?;
        debug!(object_type, id = %created.id, "record created");
        Ok(created.id)
    }

    pub async fn update_record(&self, object_type: &str, id: &str, data: &Value) -> Result<()> {
        let url = self
            .client
            .data_url(&format!("sobjects/{object_type}/{id}"))
            .await?;
        let request = HttpRequest::new(Method::PATCH, url).json(data.clone());
        self.client.execute(request).await?;
        Ok(())
    }

    pub async fn delete_record(&self, object_type: &str, id: &str) -> Result<()> {
        let url = self
            .client
            .data_url(&format!("sobjects/{object_type}/{id}"))
            .await?;
        self.client
            .execute(HttpRequest::new(Method::DELETE, url))
            .await?;
        Ok(())
    }

    /// Run a SOQL query and collect the records of every page, in order.
    ///
    /// Pages are followed through `nextRecordsUrl` until one reports
    /// `done`. Large result sets are loaded in full, so queries should be
    /// limited.
    pub async fn search(&self, soql: &str) -> Result<Vec<Value>> {
        let mut url = self.query_url(soql).await?;
        let mut records = Vec::new();
        let mut pages = 0usize;

        loop {
            let response = self.client.execute(HttpRequest::new(Method::GET, url)).await?;
            let page: QueryPage = decode(&response)?;
            pages += 1;
            records.extend(page.records);

            if page.done {
                break;
            }
            let next = page.next_records_url.ok_or_else(|| {
                Error::Decode("query page is not done but has no nextRecordsUrl".into())
            })?;
            url = self.client.resolve(&next).await?;
        }

        debug!(pages, records = records.len(), "query complete");
        Ok(records)
    }

    async fn query_url(&self, soql: &str) -> Result<String> {
        let base = self.client.data_url("query/").await?;
        let mut url = Url::parse(&base).map_err(|e| {
            sf_auth::Error::Config(format!("credential has an invalid instance URL {base:?}: {e}"))
        })?;
        url.query_pairs_mut().append_pair("q", soql);
        Ok(url.to_string())
    }
}

fn decode<T: serde::de::DeserializeOwned>(response: &HttpResponse) -> Result<T> {
    response.json().map_err(|e| Error::Decode(e.to_string()))
}
