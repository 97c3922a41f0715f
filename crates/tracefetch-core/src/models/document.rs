//! The JSON tree document written for one fetched trace

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{RunRecord, RunSummary, TraceSummary};
use crate::tree::{build_tree, extract_run_summary, summarize, TraceTree};

/// Everything known about one trace after a fetch
#[derive(Debug, Clone, Serialize)]
pub struct TraceDocument {
    /// Trace id (or share token for public traces)
    pub trace_id: String,

    /// When the runs were fetched
    pub fetched_at: DateTime<Utc>,

    /// Number of run records
    pub total_runs: usize,

    /// Summary of the root run, if any record has no parent
    pub root: Option<RunSummary>,

    /// Run records as parsed. Unknown fields pass through untouched; known
    /// fields are normalised, so an unusable value becomes `null` and a
    /// string cost becomes a number.
    pub runs_flat: Vec<RunRecord>,

    /// Summaries keyed by run id, including runs unreachable from the root
    pub runs_by_id: BTreeMap<String, RunSummary>,

    /// Nested execution tree
    pub tree: Option<TraceTree>,

    /// Trace-wide aggregates
    pub summary: TraceSummary,
}

impl TraceDocument {
    /// Build the tree, summary and lookup tables from a flat run list
    pub fn assemble(trace_id: impl Into<String>, runs: Vec<RunRecord>) -> Self {
        Self::assemble_at(trace_id, runs, Utc::now())
    }

    /// Like [`TraceDocument::assemble`] with an explicit fetch time
    pub fn assemble_at(
        trace_id: impl Into<String>,
        runs: Vec<RunRecord>,
        fetched_at: DateTime<Utc>,
    ) -> Self {
        let tree = build_tree(&runs);
        let summary = summarize(&runs);

        let mut runs_by_id = BTreeMap::new();
        let mut root = None;
        for run in &runs {
            let run_summary = extract_run_summary(run);
            if run.is_root() {
                root = Some(run_summary.clone());
            }
            runs_by_id.insert(run.id.clone(), run_summary);
        }

        Self {
            trace_id: trace_id.into(),
            fetched_at,
            total_runs: runs.len(),
            root,
            runs_flat: runs,
            runs_by_id,
            tree,
            summary,
        }
    }

    /// Standalone summary document
    pub fn summary_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string_pretty(&self.summary)?)
    }
}
