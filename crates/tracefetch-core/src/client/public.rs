//! Unauthenticated access to publicly shared traces

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde_json::{json, Value};
use tracing::debug;

use super::{base_url, http_client, parse_run_list, status_error};
use crate::config::ApiConfig;
use crate::crawler::RunSource;
use crate::error::Result;
use crate::models::RunRecord;

/// Client for the `/public/{token}` share endpoints
#[derive(Debug, Clone)]
pub struct PublicClient {
    client: Client,
    base_url: String,
    org_slug: Option<String>,
}

impl PublicClient {
    /// Create a client. The API key in `config` is ignored.
    pub fn new(config: &ApiConfig) -> Result<Self> {
        Ok(Self {
            client: http_client(config)?,
            base_url: base_url(config),
            org_slug: None,
        })
    }

    /// Scope share paths under an organisation slug
    #[must_use]
    pub fn with_org_slug(mut self, org_slug: Option<String>) -> Self {
        self.org_slug = org_slug.filter(|s| !s.is_empty());
        self
    }

    fn share_prefix(&self, token: &str) -> String {
        match &self.org_slug {
            Some(org) => format!("{}/public/{org}/{token}", self.base_url),
            None => format!("{}/public/{token}", self.base_url),
        }
    }

    /// Full JSON of one run inside a shared trace
    pub async fn fetch_run(&self, token: &str, run_id: &str) -> Result<Value> {
        let url = format!("{}/runs/{run_id}", self.share_prefix(token));
        let response = self.client.get(&url).send().await?;
        Ok(ensure_success(response, "Public run", run_id).await?.json().await?)
    }
}

#[async_trait]
impl RunSource for PublicClient {
    async fn fetch_root(&self, token: &str) -> Result<RunRecord> {
        let url = format!("{}/run", self.share_prefix(token));
        debug!(%url, "fetching shared root run");

        let response = self.client.get(&url).send().await?;
        let body: Value = ensure_success(response, "Public trace", token)
            .await?
            .json()
            .await?;
        RunRecord::from_value(body)
    }

    async fn fetch_batch(&self, token: &str, ids: &[String]) -> Result<Vec<RunRecord>> {
        let url = format!("{}/runs/query", self.share_prefix(token));
        let response = self
            .client
            .post(&url)
            .json(&json!({ "id": ids }))
            .send()
            .await?;

        let body: Value = ensure_success(response, "Public runs", token)
            .await?
            .json()
            .await?;
        parse_run_list(body)
    }
}

async fn ensure_success(response: Response, entity: &str, id: &str) -> Result<Response> {
    if response.status().is_success() {
        Ok(response)
    } else {
        Err(status_error(response, entity, id).await)
    }
}
