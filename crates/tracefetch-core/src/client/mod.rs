//! HTTP clients for the LangSmith API
//!
//! [`ApiClient`] uses an API key and can list a whole trace in one paginated
//! query. [`PublicClient`] needs no credentials but can only see runs that were
//! shared, one root plus batched lookups by id, and so feeds the
//! [`crate::crawler::PublicTraceCrawler`].

mod api;
mod public;
pub mod url;

use std::time::Duration;

use reqwest::{Client, Response, StatusCode};
use serde_json::Value;

use crate::config::ApiConfig;
use crate::error::{Error, Result};
use crate::models::RunRecord;

pub use api::ApiClient;
pub use public::PublicClient;
pub use self::url::{parse_trace_url, TraceLocator, UrlKind};

/// Fields requested when listing a trace for tree building
pub const TREE_SELECT_FIELDS: &[&str] = &[
    "id",
    "name",
    "run_type",
    "parent_run_id",
    "child_run_ids",
    "dotted_order",
    "status",
    "error",
    "start_time",
    "end_time",
    "first_token_time",
    "total_tokens",
    "prompt_tokens",
    "completion_tokens",
    "total_cost",
    "prompt_cost",
    "completion_cost",
    "extra",
];

/// Longest response body kept in an [`Error::Api`]
const MAX_ERROR_BODY: usize = 500;

fn http_client(config: &ApiConfig) -> Result<Client> {
    Ok(Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .user_agent(concat!("tracefetch/", env!("CARGO_PKG_VERSION")))
        .build()?)
}

fn base_url(config: &ApiConfig) -> String {
    config.base_url.trim_end_matches('/').to_string()
}

/// Turn a non-success response into the matching error variant
async fn status_error(response: Response, entity: &str, id: &str) -> Error {
    let status = response.status();
    match status {
        StatusCode::FORBIDDEN => Error::NotPublic(id.to_string()),
        StatusCode::NOT_FOUND => Error::not_found(entity, id),
        StatusCode::UNAUTHORIZED => Error::Auth("API key was rejected".to_string()),
        _ => {
            let mut body = response.text().await.unwrap_or_default();
            if body.len() > MAX_ERROR_BODY {
                let mut end = MAX_ERROR_BODY;
                while !body.is_char_boundary(end) {
                    end -= 1;
                }
                body.truncate(end);
            }
            Error::Api {
                status: status.as_u16(),
                body,
            }
        }
    }
}

/// Parse a run listing that is either `{"runs": [...]}` or a bare list
fn parse_run_list(body: Value) -> Result<Vec<RunRecord>> {
    let list = match body {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("runs") {
            Some(Value::Array(items)) => items,
            Some(Value::Null) | None => Vec::new(),
            Some(other) => {
                return Err(Error::validation(format!(
                    "expected `runs` to be a list, got {}",
                    json_kind(&other)
                )))
            }
        },
        other => {
            return Err(Error::validation(format!(
                "expected a run listing, got {}",
                json_kind(&other)
            )))
        }
    };

    list.into_iter().map(RunRecord::from_value).collect()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}
