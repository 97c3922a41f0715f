//! Trace-wide aggregate statistics

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A failed run, as listed in a trace summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorRun {
    /// Run id
    pub id: String,
    /// Run name
    pub name: Option<String>,
    /// Error message, if the run carried one
    pub error: Option<String>,
}

/// Aggregates computed over the flat run list of one trace
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TraceSummary {
    /// Number of run records
    pub total_runs: usize,

    /// Sum of `total_tokens` across all runs
    pub total_tokens: u64,

    /// Sum of `prompt_tokens`
    pub prompt_tokens: u64,

    /// Sum of `completion_tokens`
    pub completion_tokens: u64,

    /// Sum of `total_cost` in USD
    pub total_cost: f64,

    /// Sum of `prompt_cost` in USD
    pub prompt_cost: f64,

    /// Sum of `completion_cost` in USD
    pub completion_cost: f64,

    /// Wall-clock span of the root run only
    pub total_duration_ms: Option<i64>,

    /// Run type histogram
    pub run_types: BTreeMap<String, usize>,

    /// Distinct model names, sorted
    pub models_used: Vec<String>,

    /// Whether any run failed
    pub has_errors: bool,

    /// Number of failed runs
    pub error_count: usize,

    /// Failed runs in input order
    pub error_runs: Vec<ErrorRun>,

    /// Records with no parent; anything above one is a data anomaly
    pub root_count: usize,
}

impl TraceSummary {
    /// Whether more than one record claimed to be the root
    pub fn has_multiple_roots(&self) -> bool {
        self.root_count > 1
    }
}
