//! Concrete collaborator clients: REST datastore, Redis cache, HTTP service probes

use std::time::Duration;

use async_trait::async_trait;
use reqwest::RequestBuilder;

use super::config::ServiceEndpoint;
use super::probes::{CacheClient, Datastore, ProbeError, ReadOutcome, ServiceProbe};

use crate::http;

/// Attach `apikey` and bearer headers when a key is configured
fn authorize(request: RequestBuilder, api_key: Option<&str>) -> RequestBuilder {
    match api_key {
        Some(key) => request
            .header("apikey", key)
            .bearer_auth(key),
        None => request,
    }
}

async fn status_error(response: reqwest::Response) -> ProbeError {
    let (status, body) = http::failure(response).await;
    ProbeError::Status { status, body }
}

/// PostgREST-style datastore reached over HTTP
#[derive(Debug, Clone)]
pub struct RestDatastore {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl RestDatastore {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>, timeout: Duration) -> Self {
        Self {
            client: http::client(timeout),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
        }
    }

    fn select(&self, table: &str, limit: usize) -> RequestBuilder {
        let url = format!("{}/rest/v1/{}", self.base_url, table);
        let request = self
            .client
            .get(url)
            .query(&[("select", "*".to_string()), ("limit", limit.to_string())])
            .header("Prefer", "count=exact");
        authorize(request, self.api_key.as_deref())
    }
}

/// Parse the total out of a `Content-Range` header (`0-0/42`, `*/0`, `0-9/*`)
pub fn parse_content_range(value: &str) -> Option<u64> {
    value.rsplit_once('/')?.1.trim().parse().ok()
}

#[async_trait]
impl Datastore for RestDatastore {
    async fn bounded_read(&self, table: &str, limit: usize) -> Result<ReadOutcome, ProbeError> {
        let response = self.select(table, limit).send().await?;

        if !response.status().is_success() {
            return Err(status_error(response).await);
        }

        let row_count = response
            .headers()
            .get(reqwest::header::CONTENT_RANGE)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_content_range);

        Ok(ReadOutcome { row_count })
    }

    async fn table_exists(&self, table: &str) -> Result<bool, ProbeError> {
        let response = self.select(table, 0).send().await?;

        match response.status() {
            s if s.is_success() => Ok(true),
            reqwest::StatusCode::NOT_FOUND => Ok(false),
            _ => Err(status_error(response).await),
        }
    }
}

/// Redis cache reached with the `redis` crate
#[derive(Debug, Clone)]
pub struct RedisCache {
    url: String,
}

impl RedisCache {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

#[async_trait]
impl CacheClient for RedisCache {
    async fn ping(&self, connect_timeout: Duration) -> Result<(), ProbeError> {
        let client = redis::Client::open(self.url.as_str())?;

        let mut conn = tokio::time::timeout(
            connect_timeout,
            client.get_multiplexed_async_connection(),
        )
        .await
        .map_err(|_| ProbeError::Timeout(connect_timeout))??;

        let pong: String = redis::cmd("PING").query_async(&mut conn).await?;
        if pong != "PONG" {
            return Err(ProbeError::Response(format!("PING answered {:?}", pong)));
        }

        Ok(())
    }
}

/// GET probe against an HTTP dependency; any 2xx is healthy
#[derive(Debug, Clone)]
pub struct HttpServiceProbe {
    name: String,
    client: reqwest::Client,
    endpoint: ServiceEndpoint,
}

impl HttpServiceProbe {
    pub fn new(name: impl Into<String>, endpoint: ServiceEndpoint, timeout: Duration) -> Self {
        Self {
            name: name.into(),
            client: http::client(timeout),
            endpoint,
        }
    }
}

#[async_trait]
impl ServiceProbe for HttpServiceProbe {
    fn name(&self) -> &str {
        &self.name
    }

    async fn probe(&self) -> Result<(), ProbeError> {
        let request = authorize(
            self.client.get(&self.endpoint.url),
            self.endpoint.api_key.as_deref(),
        );
        let response = request.send().await?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(status_error(response).await)
        }
    }
}
