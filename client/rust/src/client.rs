//! Default client implementation over HTTP using reqwest.

use async_trait::async_trait;
use reqwest::{RequestBuilder, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::envelope::{BaseResult, ListResult, RecordResult};
use crate::error::{ClientError, Result};
use crate::traits::{ListQuery, ResourceApi};

/// History path segment.
pub const HISTORY_SEGMENT: &str = "+history";

/// HTTP client bound to one resource collection on one server.
#[derive(Debug, Clone)]
pub struct ResourceClient {
    http: reqwest::Client,
    base: Url,
    collection: String,
}

impl ResourceClient {
    /// Create a client for `collection` (e.g. `hosts`) on `server`.
    pub fn new(server: &str, collection: &str) -> Result<Self> {
        Self::with_http(reqwest::Client::new(), server, collection)
    }

    /// Create a client sharing an existing reqwest client.
    pub fn with_http(http: reqwest::Client, server: &str, collection: &str) -> Result<Self> {
        let base = Url::parse(server).map_err(|e| ClientError::InvalidUrl(format!("{server}: {e}")))?;
        if base.cannot_be_a_base() {
            return Err(ClientError::InvalidUrl(server.to_string()));
        }
        Ok(Self {
            http,
            base,
            collection: collection.to_string(),
        })
    }

    /// Collection URL with extra path segments. Segments are percent-encoded,
    /// so identifiers containing `/` or spaces stay one segment.
    fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| ClientError::InvalidUrl(self.base.to_string()))?
            .pop_if_empty()
            .push(&self.collection)
            .extend(segments);
        Ok(url)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;
        debug!(status = status.as_u16(), collection = %self.collection, "response received");

        if !status.is_success() {
            let details = serde_json::from_str::<BaseResult>(&body)
                .map(|envelope| envelope.detail)
                .unwrap_or_default();
            return Err(ClientError::Api {
                status: status.as_u16(),
                details,
                body,
            });
        }
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl ResourceApi for ResourceClient {
    fn collection(&self) -> &str {
        &self.collection
    }

    async fn list(&self, query: &ListQuery) -> Result<ListResult<Value>> {
        let url = self.url(&[])?;
        self.send(self.http.get(url).query(&query.pairs())).await
    }

    async fn list_history(&self, query: &ListQuery) -> Result<ListResult<Value>> {
        let url = self.url(&[HISTORY_SEGMENT])?;
        self.send(self.http.get(url).query(&query.pairs())).await
    }

    async fn get(&self, identifier: &str) -> Result<RecordResult<Value>> {
        let url = self.url(&[identifier])?;
        self.send(self.http.get(url)).await
    }

    async fn history(&self, identifier: &str) -> Result<ListResult<Value>> {
        let url = self.url(&[identifier, HISTORY_SEGMENT])?;
        self.send(self.http.get(url)).await
    }

    async fn create(&self, body: &Value) -> Result<RecordResult<Value>> {
        let url = self.url(&[])?;
        self.send(self.http.post(url).json(body)).await
    }

    async fn update(&self, identifier: &str, body: &Value) -> Result<RecordResult<Value>> {
        let url = self.url(&[identifier])?;
        self.send(self.http.put(url).json(body)).await
    }

    async fn delete(&self, identifier: &str) -> Result<BaseResult> {
        let url = self.url(&[identifier])?;
        self.send(self.http.delete(url)).await
    }
}
