//! Authenticated LangSmith API client

use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, instrument};

use super::{base_url, http_client, parse_run_list, status_error, TREE_SELECT_FIELDS};
use crate::config::ApiConfig;
use crate::error::{Error, Result};
use crate::models::RunRecord;

/// Page size for run queries
const PAGE_SIZE: usize = 100;

/// Upper bound on followed cursors for one trace
const MAX_PAGES: usize = 1000;

#[derive(Debug, Default, Deserialize)]
struct Cursors {
    #[serde(default)]
    next: Option<String>,
}

/// Client for the key-authenticated LangSmith REST API
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl ApiClient {
    /// Create a client; fails when no API key is configured
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                Error::Auth("LANGSMITH_API_KEY is not set (or set api.api_key in the config file)".to_string())
            })?;

        Ok(Self {
            client: http_client(config)?,
            base_url: base_url(config),
            api_key,
        })
    }

    /// All runs of one trace, following pagination cursors
    #[instrument(skip(self))]
    pub async fn fetch_trace_runs(&self, trace_id: &str) -> Result<Vec<RunRecord>> {
        let url = format!("{}/runs/query", self.base_url);
        let mut runs = Vec::new();
        let mut cursor: Option<String> = None;

        for page in 0..MAX_PAGES {
            let mut body = json!({
                "trace": trace_id,
                "select": TREE_SELECT_FIELDS,
                "limit": PAGE_SIZE,
            });
            if let Some(cursor) = &cursor {
                body["cursor"] = json!(cursor);
            }

            let response = self
                .client
                .post(&url)
                .header("X-API-Key", &self.api_key)
                .json(&body)
                .send()
                .await?;

            let mut payload: Value = ensure_success(response, "Trace", trace_id)
                .await?
                .json()
                .await?;
            let next = payload
                .get_mut("cursors")
                .map(Value::take)
                .and_then(|c| serde_json::from_value::<Cursors>(c).ok())
                .and_then(|c| c.next)
                .filter(|c| !c.is_empty());

            let page_runs = parse_run_list(payload)?;
            debug!(page, count = page_runs.len(), "fetched run page");
            let exhausted = page_runs.is_empty();
            runs.extend(page_runs);

            match next {
                Some(next) if !exhausted => cursor = Some(next),
                _ => break,
            }
        }

        if runs.is_empty() {
            return Err(Error::not_found("Trace", trace_id));
        }
        Ok(runs)
    }

    /// Full JSON of one run, including inputs, outputs and messages
    #[instrument(skip(self))]
    pub async fn fetch_run(&self, run_id: &str) -> Result<Value> {
        let url = format!("{}/runs/{run_id}", self.base_url);
        let response = self
            .client
            .get(&url)
            .header("X-API-Key", &self.api_key)
            .query(&[("include_messages", "true")])
            .send()
            .await?;

        Ok(ensure_success(response, "Run", run_id).await?.json().await?)
    }
}

/// With a key, 403 means the key lacks access rather than an unshared trace
async fn ensure_success(response: Response, entity: &str, id: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status == StatusCode::FORBIDDEN {
        return Err(Error::Auth(format!("API key has no access to {entity} {id}")));
    }
    Err(status_error(response, entity, id).await)
}
