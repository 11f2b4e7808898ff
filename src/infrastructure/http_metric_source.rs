// REST-backed metric source implementation
use crate::application::metric_source::MetricSource;
use crate::domain::analytics::{DateRange, Entity, EntityKind, TrafficStats};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Reads the storefront's collections from its data store over HTTP.
#[derive(Debug, Clone)]
pub struct HttpMetricSource {
    base_url: String,
    token: Option<String>,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CollectionResponse {
    Bare(Vec<Entity>),
    Wrapped { data: Vec<Entity> },
}

impl CollectionResponse {
    fn into_entities(self) -> Vec<Entity> {
        match self {
            CollectionResponse::Bare(entities) => entities,
            CollectionResponse::Wrapped { data } => data,
        }
    }
}

impl HttpMetricSource {
    pub fn new(base_url: String, token: Option<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.filter(|t| !t.is_empty()),
            client,
        })
    }

    fn collection_url(&self, collection: &str) -> String {
        format!("{}/{}", self.base_url, urlencoding::encode(collection))
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str, query: &[(&str, String)]) -> Result<T> {
        let mut request = self
            .client
            .get(url)
            .query(query)
            .header("Accept", "application/json");
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("Failed to send request to {}", url))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Data store request to {} failed with status {}: {}", url, status, body);
        }

        response
            .json::<T>()
            .await
            .with_context(|| format!("Failed to parse response from {}", url))
    }
}

#[async_trait]
impl MetricSource for HttpMetricSource {
    async fn list_entities(&self, kind: EntityKind) -> Result<Vec<Entity>> {
        let url = self.collection_url(kind.collection());
        let response: CollectionResponse = self.get_json(&url, &[]).await?;
        let entities = response.into_entities();

        tracing::debug!("Fetched {} {}", entities.len(), kind.collection());
        Ok(entities)
    }

    async fn traffic_stats(&self, range: &DateRange) -> Result<TrafficStats> {
        let url = self.collection_url("traffic");
        let query = [
            ("start", range.start().to_string()),
            ("end", range.end().to_string()),
        ];
        self.get_json(&url, &query).await
    }
}
