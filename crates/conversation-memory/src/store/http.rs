use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use reqwest::{header, Client, RequestBuilder, Response, StatusCode};
use std::time::Duration;
use tracing::{debug, warn};

use super::{ObjectMeta, ObjectStore};
use crate::error::TransportError;

/// Blob store behind a plain REST gateway.
///
/// `HEAD`/`GET`/`PUT`/`DELETE` on `{base_url}/{path}`. A `404` means absent,
/// age comes from the `Last-Modified` response header.
#[derive(Clone)]
pub struct HttpObjectStore {
    client: Client,
    base_url: String,
    bearer_token: Option<String>,
}

impl HttpObjectStore {
    pub fn new(
        base_url: impl Into<String>,
        bearer_token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, TransportError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, base_url, bearer_token))
    }

    pub fn with_client(
        client: Client,
        base_url: impl Into<String>,
        bearer_token: Option<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            bearer_token: bearer_token.filter(|t| !t.is_empty()),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.bearer_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    fn status_error(response: &Response, path: &str) -> TransportError {
        TransportError::Status {
            status: response.status().as_u16(),
            path: path.to_string(),
        }
    }
}

fn parse_last_modified(response: &Response) -> Option<DateTime<Utc>> {
    let raw = response.headers().get(header::LAST_MODIFIED)?.to_str().ok()?;
    match DateTime::parse_from_rfc2822(raw) {
        Ok(at) => Some(at.with_timezone(&Utc)),
        Err(e) => {
            warn!("Unparseable Last-Modified header {:?}: {}", raw, e);
            None
        }
    }
}

#[async_trait]
impl ObjectStore for HttpObjectStore {
    async fn head(&self, path: &str) -> Result<Option<ObjectMeta>, TransportError> {
        let response = self.authorize(self.client.head(self.url(path))).send().await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            s if s.is_success() => Ok(Some(ObjectMeta {
                last_modified: parse_last_modified(&response),
            })),
            _ => Err(Self::status_error(&response, path)),
        }
    }

    async fn get(&self, path: &str) -> Result<Option<Bytes>, TransportError> {
        let response = self.authorize(self.client.get(self.url(path))).send().await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            s if s.is_success() => Ok(Some(response.bytes().await?)),
            _ => Err(Self::status_error(&response, path)),
        }
    }

    async fn put(&self, path: &str, data: Bytes) -> Result<(), TransportError> {
        let size = data.len();
        let response = self
            .authorize(self.client.put(self.url(path)))
            .header(header::CONTENT_TYPE, "application/x-ndjson; charset=utf-8")
            .body(data)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::status_error(&response, path));
        }

        debug!("PUT {} ({} bytes) -> {}", path, size, response.status());
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<(), TransportError> {
        let response = self.authorize(self.client.delete(self.url(path))).send().await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(()),
            s if s.is_success() => Ok(()),
            _ => Err(Self::status_error(&response, path)),
        }
    }
}
