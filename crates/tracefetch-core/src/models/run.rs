//! Run data model
//!
//! A run is one execution unit inside a trace: an LLM call, a tool
//! invocation, a chain step. Records come straight from the remote API and
//! routinely have missing or oddly typed fields (in-flight runs,
//! instrumentation gaps), so every optional field degrades to `None` rather
//! than failing the record.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use serde_with::{serde_as, DefaultOnError, DisplayFromStr, PickFirst};

use crate::error::Result;

/// Status string the API uses for failed runs
pub const STATUS_ERROR: &str = "error";

/// One run record as returned by the API
#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    /// Run identifier, unique within a trace
    pub id: String,

    /// Parent run, `None` for the trace root
    #[serde_as(as = "DefaultOnError")]
    #[serde(default)]
    pub parent_run_id: Option<String>,

    /// Direct children of this run
    #[serde_as(as = "DefaultOnError")]
    #[serde(default)]
    pub child_run_ids: Option<Vec<String>>,

    /// Display name
    #[serde_as(as = "DefaultOnError")]
    #[serde(default)]
    pub name: Option<String>,

    /// Free-form category (llm, chain, tool, retriever, ...)
    #[serde_as(as = "DefaultOnError")]
    #[serde(default)]
    pub run_type: Option<String>,

    /// `success`, `error`, `pending`, ...
    #[serde_as(as = "DefaultOnError")]
    #[serde(default)]
    pub status: Option<String>,

    /// Error message
    #[serde_as(as = "DefaultOnError")]
    #[serde(default)]
    pub error: Option<String>,

    /// ISO-8601 start timestamp
    #[serde_as(as = "DefaultOnError")]
    #[serde(default)]
    pub start_time: Option<String>,

    /// ISO-8601 end timestamp
    #[serde_as(as = "DefaultOnError")]
    #[serde(default)]
    pub end_time: Option<String>,

    /// ISO-8601 timestamp of the first streamed token
    #[serde_as(as = "DefaultOnError")]
    #[serde(default)]
    pub first_token_time: Option<String>,

    /// Total tokens
    #[serde_as(as = "DefaultOnError")]
    #[serde(default)]
    pub total_tokens: Option<u64>,

    /// Prompt tokens
    #[serde_as(as = "DefaultOnError")]
    #[serde(default)]
    pub prompt_tokens: Option<u64>,

    /// Completion tokens
    #[serde_as(as = "DefaultOnError")]
    #[serde(default)]
    pub completion_tokens: Option<u64>,

    /// Total cost in USD (number or decimal string)
    #[serde_as(as = "DefaultOnError<Option<PickFirst<(_, DisplayFromStr)>>>")]
    #[serde(default)]
    pub total_cost: Option<f64>,

    /// Prompt cost in USD
    #[serde_as(as = "DefaultOnError<Option<PickFirst<(_, DisplayFromStr)>>>")]
    #[serde(default)]
    pub prompt_cost: Option<f64>,

    /// Completion cost in USD
    #[serde_as(as = "DefaultOnError<Option<PickFirst<(_, DisplayFromStr)>>>")]
    #[serde(default)]
    pub completion_cost: Option<f64>,

    /// Sort key whose lexicographic order is execution order
    #[serde_as(as = "DefaultOnError")]
    #[serde(default)]
    pub dotted_order: Option<String>,

    /// Nested extras (metadata, runtime, invocation params)
    #[serde(default)]
    pub extra: Option<Value>,

    /// Everything else the API returned (inputs, outputs, tags, ...)
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

impl RunRecord {
    /// Create a bare record with only an id
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    /// Decode a record from an arbitrary JSON value
    pub fn from_value(value: Value) -> Result<Self> {
        Ok(serde_json::from_value(value)?)
    }

    /// Child ids, treating an absent list as empty
    pub fn child_ids(&self) -> &[String] {
        self.child_run_ids.as_deref().unwrap_or(&[])
    }

    /// Whether this record claims to be a trace root
    pub fn is_root(&self) -> bool {
        self.parent_run_id.is_none()
    }

    /// Whether this run failed: a non-empty error message or an error status
    pub fn is_error(&self) -> bool {
        self.error.as_deref().is_some_and(|e| !e.is_empty())
            || self.status.as_deref() == Some(STATUS_ERROR)
    }
}

/// Compact, display-oriented view of one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Run id
    pub id: String,
    /// Run name
    pub name: Option<String>,
    /// Run type such as `chain`, `llm` or `tool`
    pub run_type: Option<String>,
    /// Status reported by the API
    pub status: Option<String>,
    /// Error message, if any
    pub error: Option<String>,
    /// Total token count
    pub tokens: Option<u64>,
    /// Prompt token count
    pub prompt_tokens: Option<u64>,
    /// Completion token count
    pub completion_tokens: Option<u64>,
    /// Total cost in USD
    pub cost: Option<f64>,
    /// Prompt cost in USD
    pub prompt_cost: Option<f64>,
    /// Completion cost in USD
    pub completion_cost: Option<f64>,
    /// Wall-clock duration, `None` when either timestamp is missing or unparseable
    pub duration_ms: Option<i64>,
    /// Model name resolved from the run's extras
    pub model: Option<String>,
    /// Execution-order key
    pub dotted_order: Option<String>,
    /// Start timestamp as received
    pub start_time: Option<String>,
    /// End timestamp as received
    pub end_time: Option<String>,
    /// Time the first streamed token arrived
    pub first_token_time: Option<String>,
    /// Derived from `child_run_ids`, not from the assembled tree
    pub has_children: bool,
    /// Length of `child_run_ids`
    pub child_count: usize,
}

impl RunSummary {
    /// Whether this run is marked as failed
    pub fn is_error(&self) -> bool {
        self.status.as_deref() == Some(STATUS_ERROR)
    }

    /// Name used for display, `unknown` when absent
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("unknown")
    }

    /// Sibling sort key; a missing dotted order sorts first
    pub fn sort_key(&self) -> &str {
        self.dotted_order.as_deref().unwrap_or("")
    }
}
